use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::entities::{bookmark, tag};
use crate::db::enums::VisitStatus;
use crate::places::types::Restaurant;

/// A bookmark with its tag associations flattened into a list.
#[derive(Debug, Clone, Serialize)]
pub struct BookmarkWithTags {
    #[serde(flatten)]
    pub bookmark: bookmark::Model,
    pub tags: Vec<tag::Model>,
}

/// Optional predicates for bookmark listings. `visit_status == None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BookmarkFilters {
    pub visit_status: Option<VisitStatus>,
    pub search: Option<String>,
    pub tag_ids: Vec<i32>,
}

impl BookmarkFilters {
    /// Trims the search term and sorts tag ids so equivalent filters share a cache entry.
    pub fn normalized(mut self) -> Self {
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.tag_ids.sort_unstable();
        self.tag_ids.dedup();
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookmarkInput {
    pub google_place_id: String,
    pub restaurant_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub google_rating: Option<f64>,
    pub google_rating_count: Option<i32>,
    pub price_level: Option<i32>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub photo_reference: Option<String>,
    pub personal_note: Option<String>,
    #[serde(default)]
    pub visit_status: VisitStatus,
}

impl From<Restaurant> for CreateBookmarkInput {
    /// Snapshot of a search result. Only the first photo reference is kept.
    fn from(restaurant: Restaurant) -> Self {
        let location = restaurant.location();
        let photo_reference = restaurant.first_photo_reference().map(str::to_string);
        Self {
            google_place_id: restaurant.place_id,
            restaurant_name: restaurant.name,
            address: restaurant.formatted_address,
            latitude: location.lat,
            longitude: location.lng,
            google_rating: restaurant.rating,
            google_rating_count: restaurant.user_ratings_total,
            price_level: restaurant.price_level,
            phone: restaurant.formatted_phone_number,
            website: restaurant.website,
            photo_reference,
            personal_note: None,
            visit_status: VisitStatus::default(),
        }
    }
}

/// Partial update. An absent field is left untouched, an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookmarkInput {
    #[serde(default, deserialize_with = "double_option")]
    pub personal_note: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub personal_rating: Option<Option<i32>>,
    pub visit_status: Option<VisitStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub visited_at: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTagInput {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: tag::Model,
    pub bookmark_count: i64,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_input_distinguishes_null_from_absent() {
        let input: UpdateBookmarkInput =
            serde_json::from_str(r#"{"personal_note": null, "visit_status": "visited"}"#).unwrap();
        assert_eq!(input.personal_note, Some(None));
        assert_eq!(input.personal_rating, None);
        assert_eq!(input.visit_status, Some(VisitStatus::Visited));
        assert_eq!(input.visited_at, None);
    }

    #[test]
    fn test_create_input_from_search_result() {
        let restaurant: Restaurant = serde_json::from_value(serde_json::json!({
            "place_id": "p1",
            "name": "Cafe",
            "formatted_address": "2 Side St",
            "geometry": {"location": {"lat": 10.0, "lng": 20.0}},
            "rating": 4.2,
            "photos": [
                {"photo_reference": "first", "height": 1, "width": 1},
                {"photo_reference": "second", "height": 1, "width": 1}
            ]
        }))
        .unwrap();
        let input = CreateBookmarkInput::from(restaurant);
        assert_eq!(input.google_place_id, "p1");
        assert_eq!(input.latitude, 10.0);
        assert_eq!(input.google_rating, Some(4.2));
        assert_eq!(input.photo_reference.as_deref(), Some("first"));
        assert_eq!(input.visit_status, VisitStatus::NotVisited);
    }

    #[test]
    fn test_filters_normalization() {
        let filters = BookmarkFilters {
            visit_status: None,
            search: Some("   ".to_string()),
            tag_ids: vec![3, 1, 3],
        }
        .normalized();
        assert_eq!(filters.search, None);
        assert_eq!(filters.tag_ids, vec![1, 3]);
    }
}
