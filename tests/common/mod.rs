#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use bytes::Bytes;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

use platemark::db::models::CreateBookmarkInput;
use platemark::db::schema::ensure_schema;
use platemark::places::types::{
    DetailsResponse, LatLng, PhotoResponse, PlacesStatus, RawGeometry, RawPlace,
    TextSearchRequest, TextSearchResponse,
};
use platemark::places::{PlacesApi, PlacesError};
use platemark::server::config::ServerConfig;
use platemark::services::auth_service::{AuthError, CodeExchanger, SessionTokens};
use platemark::web::create_axum_router;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const FRONTEND_URL: &str = "http://localhost:3000";

/// A fresh in-memory database with the schema applied.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    // One connection, otherwise every pooled connection sees its own empty database.
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    ensure_schema(&db).await.unwrap();
    db
}

pub fn test_config(environment: &str) -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        frontend_url: FRONTEND_URL.to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_audience: None,
        places_api_key: Some("test-key".to_string()),
        places_api_base_url: None,
        auth_token_url: None,
        auth_api_key: None,
        environment: environment.to_string(),
        log_dir: "logs".to_string(),
        cache_cleanup_interval_secs: 3600,
        search_session_idle_secs: 1800,
    }
}

pub fn access_token(user_id: &str) -> String {
    let claims = serde_json::json!({
        "sub": user_id,
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        "email": format!("{user_id}@example.com"),
        "role": "authenticated",
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_ref()),
    )
    .unwrap()
}

pub fn raw_place(id: &str, name: &str, lat: f64, lng: f64, rating: Option<f64>) -> RawPlace {
    RawPlace {
        place_id: Some(id.to_string()),
        name: Some(name.to_string()),
        formatted_address: Some(format!("{id} Street")),
        geometry: Some(RawGeometry {
            location: Some(LatLng { lat, lng }),
        }),
        rating,
        ..Default::default()
    }
}

pub fn bookmark_input(place_id: &str, name: &str) -> CreateBookmarkInput {
    CreateBookmarkInput {
        google_place_id: place_id.to_string(),
        restaurant_name: name.to_string(),
        address: "1 Main St".to_string(),
        latitude: 35.0,
        longitude: 139.0,
        google_rating: Some(4.5),
        google_rating_count: Some(120),
        price_level: Some(2),
        phone: None,
        website: None,
        photo_reference: None,
        personal_note: None,
        visit_status: Default::default(),
    }
}

/// Scripted places backend counting every upstream call.
#[derive(Default)]
pub struct FakePlacesApi {
    pub unconfigured: bool,
    pub search_results: Mutex<Vec<RawPlace>>,
    pub search_status: Mutex<Option<(PlacesStatus, Option<String>)>>,
    pub details: Mutex<HashMap<String, RawPlace>>,
    pub photo_status: Mutex<u16>,
    pub search_calls: AtomicUsize,
    pub details_calls: AtomicUsize,
    pub photo_calls: AtomicUsize,
}

impl FakePlacesApi {
    pub fn new() -> Self {
        Self {
            photo_status: Mutex::new(200),
            ..Default::default()
        }
    }

    pub fn with_results(results: Vec<RawPlace>) -> Self {
        let api = Self::new();
        *api.search_results.lock().unwrap() = results;
        api
    }
}

#[async_trait]
impl PlacesApi for FakePlacesApi {
    fn is_configured(&self) -> bool {
        !self.unconfigured
    }

    async fn text_search(
        &self,
        _request: &TextSearchRequest,
    ) -> Result<TextSearchResponse, PlacesError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((status, error_message)) = self.search_status.lock().unwrap().clone() {
            return Ok(TextSearchResponse {
                status,
                results: Vec::new(),
                next_page_token: None,
                error_message,
            });
        }
        Ok(TextSearchResponse {
            status: PlacesStatus::Ok,
            results: self.search_results.lock().unwrap().clone(),
            next_page_token: None,
            error_message: None,
        })
    }

    async fn place_details(&self, place_id: &str) -> Result<DetailsResponse, PlacesError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        let place = self.details.lock().unwrap().get(place_id).cloned();
        Ok(match place {
            Some(place) => DetailsResponse {
                status: PlacesStatus::Ok,
                result: Some(place),
                error_message: None,
            },
            None => DetailsResponse {
                status: PlacesStatus::NotFound,
                result: None,
                error_message: None,
            },
        })
    }

    async fn photo(&self, _reference: &str, _max_width: u32) -> Result<PhotoResponse, PlacesError> {
        self.photo_calls.fetch_add(1, Ordering::SeqCst);
        Ok(PhotoResponse {
            status: *self.photo_status.lock().unwrap(),
            content_type: None,
            body: Bytes::from_static(b"\xff\xd8\xff"),
        })
    }
}

/// Scripted authorization-code exchange.
pub enum FakeExchanger {
    Session(SessionTokens),
    NoSession,
    Fails(String),
}

#[async_trait]
impl CodeExchanger for FakeExchanger {
    async fn exchange_code(
        &self,
        _code: &str,
        _code_verifier: Option<&str>,
    ) -> Result<Option<SessionTokens>, AuthError> {
        match self {
            FakeExchanger::Session(tokens) => Ok(Some(tokens.clone())),
            FakeExchanger::NoSession => Ok(None),
            FakeExchanger::Fails(message) => Err(AuthError::Exchange(message.clone())),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub places: Arc<FakePlacesApi>,
}

impl TestApp {
    pub async fn new(places: FakePlacesApi) -> Self {
        Self::with_auth(places, None, "production").await
    }

    pub async fn with_auth(
        places: FakePlacesApi,
        exchanger: Option<FakeExchanger>,
        environment: &str,
    ) -> Self {
        let db = setup_db().await;
        let places = Arc::new(places);
        let auth_client = exchanger.map(|e| Arc::new(e) as Arc<dyn CodeExchanger>);
        let router = create_axum_router(
            db.clone(),
            places.clone(),
            auth_client,
            Arc::new(test_config(environment)),
        );
        Self { router, db, places }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (u16, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", access_token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, value)
    }
}
