use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Serialize;
use std::sync::Arc;

use crate::db::entities::tag::{self, TAG_COLORS};
use crate::db::models::{CreateTagInput, TagWithCount, UpdateTagInput};
use crate::web::models::AuthenticatedUser;
use crate::web::extract::{AppJson, AppPath};
use crate::web::{AppError, AppState};

#[derive(Serialize)]
struct PaletteResponse {
    colors: &'static [&'static str],
}

async fn get_palette_handler() -> Json<PaletteResponse> {
    Json(PaletteResponse { colors: &TAG_COLORS })
}

async fn create_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateTagInput>,
) -> Result<(StatusCode, Json<tag::Model>), AppError> {
    let tag = app_state
        .bookmarks
        .create_tag(&authenticated_user.id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn get_user_tags_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TagWithCount>>, AppError> {
    let tags = app_state.bookmarks.list_tags(&authenticated_user.id).await?;
    Ok(Json(tags))
}

async fn update_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(tag_id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateTagInput>,
) -> Result<Json<tag::Model>, AppError> {
    let tag = app_state
        .bookmarks
        .update_tag(&authenticated_user.id, tag_id, payload)
        .await?;
    Ok(Json(tag))
}

async fn delete_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(tag_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    app_state
        .bookmarks
        .delete_tag(&authenticated_user.id, tag_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_user_tags_handler).post(create_tag_handler))
        .route("/palette", get(get_palette_handler))
        .route(
            "/{tag_id}",
            put(update_tag_handler)
                .patch(update_tag_handler)
                .delete(delete_tag_handler),
        )
}
