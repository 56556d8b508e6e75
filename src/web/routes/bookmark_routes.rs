use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post, put},
};
use std::sync::Arc;

use crate::db::entities::bookmark;
use crate::db::models::{BookmarkWithTags, CreateBookmarkInput, UpdateBookmarkInput};
use crate::places::Restaurant;
use crate::web::models::{AuthenticatedUser, BookmarkListQuery, LookupQuery, LookupResponse};
use crate::web::extract::{AppJson, AppPath, AppQuery};
use crate::web::{AppError, AppState};

async fn list_bookmarks_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<BookmarkListQuery>,
) -> Result<Json<Vec<BookmarkWithTags>>, AppError> {
    let filters = query.into_filters().map_err(AppError::InvalidInput)?;
    let rows = app_state.bookmarks.list(&authenticated_user.id, filters).await?;
    Ok(Json(rows.as_ref().clone()))
}

async fn create_bookmark_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateBookmarkInput>,
) -> Result<(StatusCode, Json<bookmark::Model>), AppError> {
    let created = app_state
        .bookmarks
        .create(Some(&authenticated_user.id), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn bookmark_from_place_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppJson(restaurant): AppJson<Restaurant>,
) -> Result<(StatusCode, Json<bookmark::Model>), AppError> {
    let created = app_state
        .bookmarks
        .create(Some(&authenticated_user.id), CreateBookmarkInput::from(restaurant))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn lookup_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<LookupQuery>,
) -> Result<Json<LookupResponse>, AppError> {
    let place_ids: Vec<String> = query
        .place_ids
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    let bookmarks = app_state
        .bookmarks
        .lookup(&authenticated_user.id, &place_ids)
        .await?;
    Ok(Json(LookupResponse { bookmarks }))
}

async fn get_bookmark_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(bookmark_id): AppPath<i32>,
) -> Result<Json<BookmarkWithTags>, AppError> {
    let row = app_state.bookmarks.get(&authenticated_user.id, bookmark_id).await?;
    Ok(Json(row.as_ref().clone()))
}

async fn update_bookmark_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(bookmark_id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateBookmarkInput>,
) -> Result<Json<bookmark::Model>, AppError> {
    let updated = app_state
        .bookmarks
        .update(&authenticated_user.id, bookmark_id, payload)
        .await?;
    Ok(Json(updated))
}

async fn delete_bookmark_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath(bookmark_id): AppPath<i32>,
) -> Result<StatusCode, AppError> {
    app_state.bookmarks.delete(&authenticated_user.id, bookmark_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn attach_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath((bookmark_id, tag_id)): AppPath<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    app_state
        .bookmarks
        .add_tag(&authenticated_user.id, bookmark_id, tag_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn detach_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppPath((bookmark_id, tag_id)): AppPath<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    app_state
        .bookmarks
        .remove_tag(&authenticated_user.id, bookmark_id, tag_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn create_bookmarks_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_bookmarks_handler).post(create_bookmark_handler))
        .route("/from-place", post(bookmark_from_place_handler))
        .route("/lookup", get(lookup_handler))
        .route(
            "/{bookmark_id}",
            get(get_bookmark_handler)
                .patch(update_bookmark_handler)
                .delete(delete_bookmark_handler),
        )
        .route(
            "/{bookmark_id}/tags/{tag_id}",
            put(attach_tag_handler).delete(detach_tag_handler),
        )
}
