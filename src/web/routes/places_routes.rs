use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;

use crate::places::SearchParams;
use crate::web::models::{DetailsQuery, PhotoQuery, RestaurantResponse, RestaurantsResponse};
use crate::web::extract::{AppJson, AppQuery};
use crate::web::{AppError, AppState};

const PHOTO_CACHE_CONTROL: &str = "public, max-age=86400";
const DEFAULT_PHOTO_CONTENT_TYPE: &str = "image/jpeg";

async fn search_handler(
    State(app_state): State<Arc<AppState>>,
    AppJson(params): AppJson<SearchParams>,
) -> Result<Json<RestaurantsResponse>, AppError> {
    let restaurants = app_state.places.search_restaurants(&params).await?;
    Ok(Json(RestaurantsResponse { restaurants }))
}

async fn details_handler(
    State(app_state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<DetailsQuery>,
) -> Result<Json<RestaurantResponse>, AppError> {
    let restaurant = app_state
        .places
        .place_details(&app_state.db_pool, query.place_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(RestaurantResponse { restaurant }))
}

async fn photo_handler(
    State(app_state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<PhotoQuery>,
) -> Result<Response, AppError> {
    let photo = app_state
        .places
        .fetch_photo(query.reference.as_deref(), query.maxwidth)
        .await?;
    let content_type = photo
        .content_type
        .unwrap_or_else(|| DEFAULT_PHOTO_CONTENT_TYPE.to_string());
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, PHOTO_CACHE_CONTROL.to_string()),
        ],
        photo.body,
    )
        .into_response())
}

pub fn create_places_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/search", post(search_handler))
        .route("/details", get(details_handler))
        .route("/photo", get(photo_handler))
}
