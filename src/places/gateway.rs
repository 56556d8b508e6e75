use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::DbConn;
use tracing::{debug, error, instrument, warn};

use super::client::{PlacesApi, PlacesError};
use super::types::{
    DEFAULT_PHOTO_MAX_WIDTH, DEFAULT_SEARCH_RADIUS_M, PhotoResponse, PlacesStatus, RawPlace,
    Restaurant, SearchParams, TextSearchRequest,
};
use crate::db::services::places_cache_service;

/// Upstream text search serves at most this many pages per query.
pub const MAX_SEARCH_PAGES: usize = 3;
/// A continuation token is not valid immediately after it is issued.
pub const PAGE_TOKEN_DELAY: Duration = Duration::from_secs(2);

/// Server-side entry point for search, details and photo lookups.
#[derive(Clone)]
pub struct PlacesGateway {
    api: Arc<dyn PlacesApi>,
}

fn into_restaurants(raw: Vec<RawPlace>) -> impl Iterator<Item = Restaurant> {
    raw.into_iter().filter_map(|place| {
        let place_id = place.place_id.clone();
        match Restaurant::try_from(place) {
            Ok(restaurant) => Some(restaurant),
            Err(missing) => {
                warn!(place_id = ?place_id, missing, "Dropping upstream place with missing field.");
                None
            }
        }
    })
}

impl PlacesGateway {
    pub fn new(api: Arc<dyn PlacesApi>) -> Self {
        Self { api }
    }

    /// Runs a restaurant text search, following continuation tokens up to
    /// `MAX_SEARCH_PAGES` pages with `PAGE_TOKEN_DELAY` between requests.
    ///
    /// Results are concatenated in upstream order. A failure on the first page
    /// is an error; a failure on a later page ends the loop with what was
    /// collected so far.
    #[instrument(skip(self, params), fields(query = ?params.query))]
    pub async fn search_restaurants(
        &self,
        params: &SearchParams,
    ) -> Result<Vec<Restaurant>, PlacesError> {
        let query = params
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| PlacesError::InvalidRequest("Query is required".to_string()))?;
        if !self.api.is_configured() {
            return Err(PlacesError::MissingApiKey);
        }

        let mut request = TextSearchRequest {
            query: format!("{query} restaurant"),
            location: params.location,
            radius: params.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_M),
            page_token: None,
        };
        let mut restaurants = Vec::new();
        let mut pages = 0;

        loop {
            let response = match self.api.text_search(&request).await {
                Ok(response) => response,
                Err(e) if pages == 0 => return Err(e),
                Err(e) => {
                    warn!(page = pages + 1, error = %e, "Stopping pagination after request failure.");
                    break;
                }
            };

            if !response.status.is_success() {
                if pages == 0 {
                    error!(status = ?response.status, message = ?response.error_message, "Places text search failed.");
                    return Err(PlacesError::Upstream(
                        response
                            .error_message
                            .unwrap_or_else(|| "Search failed".to_string()),
                    ));
                }
                warn!(page = pages + 1, status = ?response.status, "Stopping pagination on upstream error.");
                break;
            }

            restaurants.extend(into_restaurants(response.results));
            pages += 1;

            match response.next_page_token {
                Some(token) if pages < MAX_SEARCH_PAGES => {
                    tokio::time::sleep(PAGE_TOKEN_DELAY).await;
                    request.page_token = Some(token);
                }
                _ => break,
            }
        }

        debug!(pages, count = restaurants.len(), "Search finished.");
        Ok(restaurants)
    }

    /// Looks up a single place, reading through the places cache.
    #[instrument(skip(self, db))]
    pub async fn place_details(&self, db: &DbConn, place_id: &str) -> Result<Restaurant, PlacesError> {
        let place_id = place_id.trim();
        if place_id.is_empty() {
            return Err(PlacesError::InvalidRequest("placeId is required".to_string()));
        }

        match places_cache_service::get_cached_place(db, place_id, Utc::now()).await {
            Ok(Some(payload)) => match serde_json::from_str::<Restaurant>(&payload) {
                Ok(restaurant) => {
                    debug!("Places cache hit.");
                    return Ok(restaurant);
                }
                Err(e) => warn!(error = %e, "Discarding unreadable places cache entry."),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Places cache lookup failed."),
        }

        if !self.api.is_configured() {
            return Err(PlacesError::MissingApiKey);
        }
        let response = self.api.place_details(place_id).await?;
        match response.status {
            PlacesStatus::Ok => {}
            PlacesStatus::NotFound => return Err(PlacesError::NotFound),
            status => {
                error!(?status, message = ?response.error_message, "Places details lookup failed.");
                return Err(PlacesError::Upstream(
                    response
                        .error_message
                        .unwrap_or_else(|| "Failed to get details".to_string()),
                ));
            }
        }

        let raw = response
            .result
            .ok_or_else(|| PlacesError::InvalidPayload("missing result".to_string()))?;
        let restaurant = Restaurant::try_from(raw)
            .map_err(|missing| PlacesError::InvalidPayload(format!("missing {missing}")))?;

        match serde_json::to_string(&restaurant) {
            Ok(payload) => {
                if let Err(e) =
                    places_cache_service::cache_place(db, place_id, payload, Utc::now()).await
                {
                    warn!(error = %e, "Failed to write places cache entry.");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize place for caching."),
        }

        Ok(restaurant)
    }

    /// Proxies a photo. Non-success upstream statuses surface as `UpstreamStatus`.
    pub async fn fetch_photo(
        &self,
        reference: Option<&str>,
        max_width: Option<u32>,
    ) -> Result<PhotoResponse, PlacesError> {
        let reference = reference
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| PlacesError::InvalidRequest("Photo reference is required".to_string()))?;
        if !self.api.is_configured() {
            return Err(PlacesError::MissingApiKey);
        }

        let photo = self
            .api
            .photo(reference, max_width.unwrap_or(DEFAULT_PHOTO_MAX_WIDTH))
            .await
            .map_err(|e| match e {
                PlacesError::Http(err) => {
                    warn!(error = %err, "Photo request failed.");
                    PlacesError::Upstream("Failed to fetch photo".to_string())
                }
                other => other,
            })?;
        if !(200..300).contains(&photo.status) {
            return Err(PlacesError::UpstreamStatus(photo.status));
        }
        Ok(photo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::types::{DetailsResponse, LatLng, TextSearchResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct ScriptedApi {
        pages: Mutex<VecDeque<TextSearchResponse>>,
        calls: Mutex<Vec<(Instant, TextSearchRequest)>>,
        unconfigured: bool,
    }

    impl ScriptedApi {
        fn with_pages(pages: Vec<TextSearchResponse>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> Vec<(Instant, TextSearchRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlacesApi for ScriptedApi {
        fn is_configured(&self) -> bool {
            !self.unconfigured
        }

        async fn text_search(
            &self,
            request: &TextSearchRequest,
        ) -> Result<TextSearchResponse, PlacesError> {
            self.calls.lock().unwrap().push((Instant::now(), request.clone()));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| PlacesError::Upstream("script exhausted".to_string()))
        }

        async fn place_details(&self, _place_id: &str) -> Result<DetailsResponse, PlacesError> {
            Err(PlacesError::NotFound)
        }

        async fn photo(&self, _reference: &str, max_width: u32) -> Result<PhotoResponse, PlacesError> {
            Ok(PhotoResponse {
                status: if max_width > 1600 { 400 } else { 200 },
                content_type: None,
                body: bytes::Bytes::from_static(b"img"),
            })
        }
    }

    fn place(id: &str) -> RawPlace {
        RawPlace {
            place_id: Some(id.to_string()),
            name: Some(format!("Place {id}")),
            formatted_address: Some("Somewhere".to_string()),
            geometry: Some(crate::places::types::RawGeometry {
                location: Some(LatLng { lat: 0.0, lng: 0.0 }),
            }),
            ..Default::default()
        }
    }

    fn page(ids: &[&str], token: Option<&str>) -> TextSearchResponse {
        TextSearchResponse {
            status: PlacesStatus::Ok,
            results: ids.iter().map(|id| place(id)).collect(),
            next_page_token: token.map(str::to_string),
            error_message: None,
        }
    }

    fn failed(message: Option<&str>) -> TextSearchResponse {
        TextSearchResponse {
            status: PlacesStatus::RequestDenied,
            results: Vec::new(),
            next_page_token: None,
            error_message: message.map(str::to_string),
        }
    }

    fn params(query: &str) -> SearchParams {
        SearchParams {
            query: Some(query.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_stops_after_three_pages_with_delay() {
        let api = ScriptedApi::with_pages(vec![
            page(&["a", "b"], Some("t1")),
            page(&["c"], Some("t2")),
            page(&["d"], Some("t3")),
            page(&["never"], None),
        ]);
        let gateway = PlacesGateway::new(api.clone());

        let results = gateway.search_restaurants(&params("ramen")).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.place_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);

        let calls = api.calls();
        assert_eq!(calls.len(), MAX_SEARCH_PAGES);
        for pair in calls.windows(2) {
            assert!(pair[1].0.duration_since(pair[0].0) >= PAGE_TOKEN_DELAY);
        }
        assert_eq!(calls[0].1.query, "ramen restaurant");
        assert_eq!(calls[0].1.page_token, None);
        assert_eq!(calls[1].1.page_token.as_deref(), Some("t1"));
        assert_eq!(calls[2].1.page_token.as_deref(), Some("t2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_blank_query_never_calls_upstream() {
        let api = ScriptedApi::with_pages(vec![page(&["a"], None)]);
        let gateway = PlacesGateway::new(api.clone());

        let err = gateway.search_restaurants(&params("   ")).await.unwrap_err();
        assert!(matches!(err, PlacesError::InvalidRequest(ref m) if m == "Query is required"));
        let err = gateway
            .search_restaurants(&SearchParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PlacesError::InvalidRequest(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_without_key_fails_before_upstream() {
        let api = Arc::new(ScriptedApi {
            unconfigured: true,
            ..Default::default()
        });
        let gateway = PlacesGateway::new(api.clone());
        let err = gateway.search_restaurants(&params("tacos")).await.unwrap_err();
        assert!(matches!(err, PlacesError::MissingApiKey));
        assert_eq!(err.to_string(), "Google Maps API key not configured");
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_first_page_error_surfaces_message() {
        let api = ScriptedApi::with_pages(vec![failed(Some("The provided API key is invalid."))]);
        let gateway = PlacesGateway::new(api.clone());
        let err = gateway.search_restaurants(&params("pho")).await.unwrap_err();
        assert_eq!(err.to_string(), "The provided API key is invalid.");

        let api = ScriptedApi::with_pages(vec![failed(None)]);
        let gateway = PlacesGateway::new(api);
        let err = gateway.search_restaurants(&params("pho")).await.unwrap_err();
        assert_eq!(err.to_string(), "Search failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_later_page_error_returns_partial_results() {
        let api = ScriptedApi::with_pages(vec![page(&["a"], Some("t1")), failed(None)]);
        let gateway = PlacesGateway::new(api.clone());
        let results = gateway.search_restaurants(&params("pho")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_drops_incomplete_places_and_keeps_location() {
        let mut incomplete = place("broken");
        incomplete.geometry = None;
        let api = ScriptedApi::with_pages(vec![TextSearchResponse {
            status: PlacesStatus::Ok,
            results: vec![place("a"), incomplete],
            next_page_token: None,
            error_message: None,
        }]);
        let gateway = PlacesGateway::new(api.clone());
        let search = SearchParams {
            query: Some("curry".to_string()),
            location: Some(LatLng { lat: 35.0, lng: 139.0 }),
            radius: None,
        };
        let results = gateway.search_restaurants(&search).await.unwrap();
        assert_eq!(results.len(), 1);

        let calls = api.calls();
        assert_eq!(calls[0].1.location, Some(LatLng { lat: 35.0, lng: 139.0 }));
        assert_eq!(calls[0].1.radius, DEFAULT_SEARCH_RADIUS_M);
    }

    #[tokio::test]
    async fn test_photo_validation_and_status_passthrough() {
        let gateway = PlacesGateway::new(Arc::new(ScriptedApi::default()));
        assert!(matches!(
            gateway.fetch_photo(None, None).await,
            Err(PlacesError::InvalidRequest(_))
        ));
        let photo = gateway.fetch_photo(Some("ref"), None).await.unwrap();
        assert_eq!(photo.status, 200);
        assert!(matches!(
            gateway.fetch_photo(Some("ref"), Some(4000)).await,
            Err(PlacesError::UpstreamStatus(400))
        ));
    }
}
