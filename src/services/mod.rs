pub mod auth_service;
pub mod bookmark_accessor;

pub use bookmark_accessor::{BookmarkAccessor, BookmarkCache};
