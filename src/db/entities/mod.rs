//! SeaORM entities for the bookmark store.
//!
//! Every row except the places cache is scoped by `user_id`, the subject
//! claim of the caller's access token.

pub mod bookmark;
pub mod bookmark_tag;
pub mod places_cache;
pub mod tag;

pub mod prelude {
    pub use super::bookmark::Entity as Bookmark;
    pub use super::bookmark_tag::Entity as BookmarkTag;
    pub use super::places_cache::Entity as PlacesCache;
    pub use super::tag::Entity as Tag;
}
