use axum::{
    Router,
    http::Method,
    middleware as axum_middleware,
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::places::{PlacesApi, PlacesGateway};
use crate::search::SearchSessions;
use crate::server::config::ServerConfig;
use crate::services::BookmarkAccessor;
use crate::services::auth_service::CodeExchanger;
use crate::web::{middleware::auth, routes::*};

pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub places: PlacesGateway,
    pub bookmarks: BookmarkAccessor,
    pub search_sessions: Arc<SearchSessions>,
    /// `None` when the auth provider is not configured.
    pub auth_client: Option<Arc<dyn CodeExchanger>>,
    pub config: Arc<ServerConfig>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn build_app_state(
    db_pool: DatabaseConnection,
    places_api: Arc<dyn PlacesApi>,
    auth_client: Option<Arc<dyn CodeExchanger>>,
    config: Arc<ServerConfig>,
) -> Arc<AppState> {
    Arc::new(AppState {
        bookmarks: BookmarkAccessor::new(db_pool.clone()),
        db_pool,
        places: PlacesGateway::new(places_api),
        search_sessions: Arc::new(SearchSessions::new()),
        auth_client,
        config,
    })
}

pub fn create_axum_router(
    db_pool: DatabaseConnection,
    places_api: Arc<dyn PlacesApi>,
    auth_client: Option<Arc<dyn CodeExchanger>>,
    config: Arc<ServerConfig>,
) -> Router {
    create_router(build_app_state(db_pool, places_api, auth_client, config))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/auth", auth_routes::create_public_router())
        .nest(
            "/api/auth",
            auth_routes::create_protected_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .nest("/api/places", places_routes::create_places_router())
        .nest(
            "/api/bookmarks",
            bookmark_routes::create_bookmarks_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .nest(
            "/api/tags",
            tag_routes::create_tags_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .nest(
            "/api/search",
            search_routes::create_search_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .with_state(app_state)
        .layer(cors)
}
