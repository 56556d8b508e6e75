//! Server-side access to the third-party places catalog.

pub mod client;
pub mod gateway;
pub mod types;

pub use client::{GooglePlacesClient, PlacesApi, PlacesError};
pub use gateway::PlacesGateway;
pub use types::{LatLng, Restaurant, SearchParams};
