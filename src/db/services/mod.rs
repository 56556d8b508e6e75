//! Data access for bookmarks, tags and the places cache.
//!
//! Every bookmark and tag operation takes the caller's user id and filters on it.

pub mod bookmark_service;
pub mod places_cache_service;
pub mod tag_service;

pub use bookmark_service::{BookmarkError, BookmarkService};
pub use places_cache_service::*;
pub use tag_service::{TagError, TagService};
