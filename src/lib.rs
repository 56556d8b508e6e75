pub mod db;
pub mod places;
pub mod search;
pub mod server;
pub mod services;
pub mod version;
pub mod web;
