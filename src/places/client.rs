use async_trait::async_trait;
use reqwest::{Client, header};
use thiserror::Error;

use super::types::{DetailsResponse, PhotoResponse, TextSearchRequest, TextSearchResponse};

pub const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

const DETAILS_FIELDS: &str = "place_id,name,formatted_address,geometry,rating,user_ratings_total,\
price_level,formatted_phone_number,website,photos,opening_hours,types";

#[derive(Error, Debug)]
pub enum PlacesError {
    #[error("Google Maps API key not configured")]
    MissingApiKey,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Upstream(String),
    #[error("Place not found")]
    NotFound,
    #[error("Failed to fetch photo")]
    UpstreamStatus(u16),
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid upstream payload: {0}")]
    InvalidPayload(String),
}

/// The three upstream calls the gateway needs.
#[async_trait]
pub trait PlacesApi: Send + Sync {
    /// Whether requests can be made at all.
    fn is_configured(&self) -> bool;

    async fn text_search(
        &self,
        request: &TextSearchRequest,
    ) -> Result<TextSearchResponse, PlacesError>;

    async fn place_details(&self, place_id: &str) -> Result<DetailsResponse, PlacesError>;

    /// Fetches photo bytes. A non-success upstream status is returned, not raised.
    async fn photo(&self, reference: &str, max_width: u32) -> Result<PhotoResponse, PlacesError>;
}

/// `PlacesApi` backed by the Google Places web service.
pub struct GooglePlacesClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_PLACES_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn key(&self) -> Result<&str, PlacesError> {
        self.api_key.as_deref().ok_or(PlacesError::MissingApiKey)
    }
}

#[async_trait]
impl PlacesApi for GooglePlacesClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn text_search(
        &self,
        request: &TextSearchRequest,
    ) -> Result<TextSearchResponse, PlacesError> {
        let key = self.key()?;
        let mut params: Vec<(&str, String)> = vec![
            ("query", request.query.clone()),
            ("key", key.to_string()),
            ("type", "restaurant".to_string()),
        ];
        if let Some(location) = request.location {
            params.push(("location", format!("{},{}", location.lat, location.lng)));
            params.push(("radius", request.radius.to_string()));
        }
        if let Some(token) = &request.page_token {
            params.push(("pagetoken", token.clone()));
        }

        let response = self
            .client
            .get(format!("{}/textsearch/json", self.base_url))
            .query(&params)
            .send()
            .await?;
        response
            .json::<TextSearchResponse>()
            .await
            .map_err(|e| PlacesError::InvalidPayload(e.to_string()))
    }

    async fn place_details(&self, place_id: &str) -> Result<DetailsResponse, PlacesError> {
        let key = self.key()?;
        let response = self
            .client
            .get(format!("{}/details/json", self.base_url))
            .query(&[("place_id", place_id), ("fields", DETAILS_FIELDS), ("key", key)])
            .send()
            .await?;
        response
            .json::<DetailsResponse>()
            .await
            .map_err(|e| PlacesError::InvalidPayload(e.to_string()))
    }

    async fn photo(&self, reference: &str, max_width: u32) -> Result<PhotoResponse, PlacesError> {
        let key = self.key()?;
        let max_width = max_width.to_string();
        let response = self
            .client
            .get(format!("{}/photo", self.base_url))
            .query(&[
                ("maxwidth", max_width.as_str()),
                ("photo_reference", reference),
                ("key", key),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok(PhotoResponse {
            status,
            content_type,
            body,
        })
    }
}
