use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;
use tracing::debug;

use crate::places::SearchParams;
use crate::search::{DEFAULT_PAGE_SIZE, SearchSession, SearchView};
use crate::web::models::{AuthenticatedUser, SearchSubmitRequest, SearchViewQuery, SearchViewUpdate};
use crate::web::extract::{AppJson, AppQuery};
use crate::web::{AppError, AppState};

const MAX_PAGE_SIZE: usize = 100;

fn validate_min_rating(min_rating: Option<f64>) -> Result<(), AppError> {
    match min_rating {
        Some(r) if !(0.0..=5.0).contains(&r) => Err(AppError::InvalidInput(
            "min_rating must be between 0 and 5".to_string(),
        )),
        _ => Ok(()),
    }
}

fn page_size(query: &SearchViewQuery) -> usize {
    query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

/// Renders a session and marks results the caller has already bookmarked.
async fn render(
    app_state: &AppState,
    user_id: &str,
    session: &SearchSession,
    page_size: usize,
) -> Result<SearchView, AppError> {
    let mut view = session.view(page_size);
    let place_ids: Vec<String> = view
        .results
        .items
        .iter()
        .map(|r| r.restaurant.place_id.clone())
        .collect();
    let bookmarked = app_state.bookmarks.lookup(user_id, &place_ids).await?;
    for item in &mut view.results.items {
        item.bookmark_id = bookmarked.get(&item.restaurant.place_id).copied();
    }
    Ok(view)
}

async fn submit_search_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppQuery(view_query): AppQuery<SearchViewQuery>,
    AppJson(payload): AppJson<SearchSubmitRequest>,
) -> Result<Json<SearchView>, AppError> {
    validate_min_rating(payload.min_rating)?;
    let user_id = authenticated_user.id.as_str();
    let params = SearchParams {
        query: payload
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        location: payload.location,
        radius: payload.radius,
    };

    let generation = app_state
        .search_sessions
        .begin_with(user_id, params.clone(), |session| {
            if let Some(sort) = payload.sort {
                session.set_sort(sort);
            }
            if payload.min_rating.is_some() {
                session.set_min_rating(payload.min_rating);
            }
        });

    // The session lock is not held across the upstream call.
    let outcome = if params.query.is_none() {
        Ok(Vec::new())
    } else {
        app_state
            .places
            .search_restaurants(&params)
            .await
            .map_err(|e| e.to_string())
    };

    if !app_state.search_sessions.complete(user_id, generation, outcome) {
        debug!(user_id, generation, "Discarded superseded search response.");
    }

    let session = app_state.search_sessions.snapshot(user_id);
    Ok(Json(render(&app_state, user_id, &session, page_size(&view_query)).await?))
}

async fn get_search_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppQuery(view_query): AppQuery<SearchViewQuery>,
) -> Result<Json<SearchView>, AppError> {
    let session = app_state.search_sessions.snapshot(&authenticated_user.id);
    Ok(Json(
        render(&app_state, &authenticated_user.id, &session, page_size(&view_query)).await?,
    ))
}

async fn update_search_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    AppQuery(view_query): AppQuery<SearchViewQuery>,
    AppJson(payload): AppJson<SearchViewUpdate>,
) -> Result<Json<SearchView>, AppError> {
    validate_min_rating(payload.min_rating.flatten())?;

    let session = app_state
        .search_sessions
        .update(&authenticated_user.id, |session| {
            if let Some(sort) = payload.sort {
                session.set_sort(sort);
            }
            if let Some(min_rating) = payload.min_rating {
                session.set_min_rating(min_rating);
            }
            // Applied last so an explicit page wins over the reset above.
            if let Some(page) = payload.page {
                session.set_page(page);
            }
            session.clone()
        });
    Ok(Json(
        render(&app_state, &authenticated_user.id, &session, page_size(&view_query)).await?,
    ))
}

async fn clear_search_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> StatusCode {
    app_state.search_sessions.clear(&authenticated_user.id);
    StatusCode::NO_CONTENT
}

pub fn create_search_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/session",
        get(get_search_handler)
            .post(submit_search_handler)
            .patch(update_search_handler)
            .delete(clear_search_handler),
    )
}
