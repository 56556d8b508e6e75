pub mod auth_routes;
pub mod bookmark_routes;
pub mod places_routes;
pub mod search_routes;
pub mod tag_routes;
