use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SEARCH_RADIUS_M: u32 = 5000;
pub const DEFAULT_PHOTO_MAX_WIDTH: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePhoto {
    pub photo_reference: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub width: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weekday_text: Vec<String>,
}

/// A venue as returned to clients, reshaped from the upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub place_id: String,
    pub name: String,
    pub formatted_address: String,
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ratings_total: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<PlacePhoto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

impl Restaurant {
    pub fn location(&self) -> LatLng {
        self.geometry.location
    }

    pub fn first_photo_reference(&self) -> Option<&str> {
        self.photos.first().map(|p| p.photo_reference.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGeometry {
    pub location: Option<LatLng>,
}

/// Upstream place record. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlace {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub geometry: Option<RawGeometry>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<i32>,
    pub price_level: Option<i32>,
    pub formatted_phone_number: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub photos: Vec<PlacePhoto>,
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl TryFrom<RawPlace> for Restaurant {
    type Error = &'static str;

    fn try_from(raw: RawPlace) -> Result<Self, Self::Error> {
        let location = raw
            .geometry
            .and_then(|g| g.location)
            .ok_or("geometry.location")?;
        Ok(Restaurant {
            place_id: raw.place_id.filter(|s| !s.is_empty()).ok_or("place_id")?,
            name: raw.name.ok_or("name")?,
            formatted_address: raw.formatted_address.ok_or("formatted_address")?,
            geometry: Geometry { location },
            rating: raw.rating,
            user_ratings_total: raw.user_ratings_total,
            price_level: raw.price_level,
            formatted_phone_number: raw.formatted_phone_number,
            website: raw.website,
            photos: raw.photos,
            opening_hours: raw.opening_hours,
            types: raw.types,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacesStatus {
    Ok,
    ZeroResults,
    NotFound,
    InvalidRequest,
    OverQueryLimit,
    RequestDenied,
    UnknownError,
    #[serde(other)]
    Unrecognized,
}

impl PlacesStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, PlacesStatus::Ok | PlacesStatus::ZeroResults)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextSearchResponse {
    pub status: PlacesStatus,
    #[serde(default)]
    pub results: Vec<RawPlace>,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailsResponse {
    pub status: PlacesStatus,
    pub result: Option<RawPlace>,
    pub error_message: Option<String>,
}

/// Raw photo bytes plus the upstream HTTP status and content type.
#[derive(Debug, Clone)]
pub struct PhotoResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// One upstream text-search call. `query` already carries the " restaurant" suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSearchRequest {
    pub query: String,
    pub location: Option<LatLng>,
    pub radius: u32,
    pub page_token: Option<String>,
}

/// Client-facing search parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub location: Option<LatLng>,
    pub radius: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_place_conversion_requires_core_fields() {
        let raw: RawPlace = serde_json::from_value(serde_json::json!({
            "place_id": "abc",
            "name": "Noodle Bar",
            "formatted_address": "1 Main St",
            "geometry": {"location": {"lat": 1.5, "lng": 2.5}},
            "rating": 4.4,
            "photos": [{"photo_reference": "ref-1", "height": 10, "width": 20}]
        }))
        .unwrap();
        let restaurant = Restaurant::try_from(raw).unwrap();
        assert_eq!(restaurant.location(), LatLng { lat: 1.5, lng: 2.5 });
        assert_eq!(restaurant.first_photo_reference(), Some("ref-1"));

        let missing_geometry = RawPlace {
            place_id: Some("abc".into()),
            name: Some("x".into()),
            formatted_address: Some("y".into()),
            ..Default::default()
        };
        assert_eq!(Restaurant::try_from(missing_geometry), Err("geometry.location"));
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let response: TextSearchResponse =
            serde_json::from_str(r#"{"status": "SOMETHING_NEW"}"#).unwrap();
        assert_eq!(response.status, PlacesStatus::Unrecognized);
        assert!(!response.status.is_success());
        assert!(response.results.is_empty());
    }
}
