use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;
use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::db::entities::{bookmark, tag};
use crate::db::models::{
    BookmarkFilters, BookmarkWithTags, CreateBookmarkInput, CreateTagInput, TagWithCount,
    UpdateBookmarkInput, UpdateTagInput,
};
use crate::db::services::{BookmarkError, BookmarkService, TagError, TagService};

const READ_CACHE_TTL: Duration = Duration::from_secs(300);
const MAX_CACHED_LISTS: u64 = 10_000;
const MAX_CACHED_DETAILS: u64 = 50_000;
const MAX_TRACKED_USERS: u64 = 100_000;

/// Memoized bookmark reads, keyed by user and that user's cache epoch.
///
/// Invalidating a user moves them to a fresh epoch. Epoch numbers are never
/// reused, so a read that started before the invalidation stores its rows
/// under the old epoch where no later lookup can find them.
pub struct BookmarkCache {
    lists: Cache<(String, u64, BookmarkFilters), Arc<Vec<BookmarkWithTags>>>,
    details: Cache<(String, u64, i32), Arc<BookmarkWithTags>>,
    epochs: Cache<String, u64>,
    next_epoch: AtomicU64,
}

impl Default for BookmarkCache {
    fn default() -> Self {
        Self {
            lists: Cache::builder()
                .time_to_live(READ_CACHE_TTL)
                .max_capacity(MAX_CACHED_LISTS)
                .build(),
            details: Cache::builder()
                .time_to_live(READ_CACHE_TTL)
                .max_capacity(MAX_CACHED_DETAILS)
                .build(),
            epochs: Cache::builder()
                .time_to_idle(READ_CACHE_TTL * 2)
                .max_capacity(MAX_TRACKED_USERS)
                .build(),
            next_epoch: AtomicU64::new(0),
        }
    }
}

impl BookmarkCache {
    fn fresh_epoch(&self) -> u64 {
        self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The user's current epoch. Capture it before reading from the database.
    pub fn epoch(&self, user_id: &str) -> u64 {
        self.epochs
            .get_with(user_id.to_string(), || self.fresh_epoch())
    }

    pub fn get_list(
        &self,
        user_id: &str,
        epoch: u64,
        filters: &BookmarkFilters,
    ) -> Option<Arc<Vec<BookmarkWithTags>>> {
        self.lists.get(&(user_id.to_string(), epoch, filters.clone()))
    }

    pub fn put_list(
        &self,
        user_id: &str,
        epoch: u64,
        filters: BookmarkFilters,
        rows: Arc<Vec<BookmarkWithTags>>,
    ) {
        self.lists.insert((user_id.to_string(), epoch, filters), rows);
    }

    pub fn get_detail(&self, user_id: &str, epoch: u64, bookmark_id: i32) -> Option<Arc<BookmarkWithTags>> {
        self.details.get(&(user_id.to_string(), epoch, bookmark_id))
    }

    pub fn put_detail(&self, user_id: &str, epoch: u64, row: Arc<BookmarkWithTags>) {
        self.details
            .insert((user_id.to_string(), epoch, row.bookmark.id), row);
    }

    /// Makes every cached read belonging to `user_id` unreachable.
    pub fn invalidate_user(&self, user_id: &str) {
        let epoch = self.fresh_epoch();
        self.epochs.insert(user_id.to_string(), epoch);
        debug!(user_id, epoch, "Invalidated cached bookmark reads.");
    }
}

/// Bookmark and tag operations with read caching. Every successful mutation
/// invalidates the caller's cached reads, tags included, since listings embed tags.
#[derive(Clone)]
pub struct BookmarkAccessor {
    db: DatabaseConnection,
    cache: Arc<BookmarkCache>,
}

impl BookmarkAccessor {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            cache: Arc::new(BookmarkCache::default()),
        }
    }

    pub fn cache(&self) -> &BookmarkCache {
        &self.cache
    }

    fn invalidate_on_ok<T, E>(&self, user_id: &str, result: Result<T, E>) -> Result<T, E> {
        if result.is_ok() {
            self.cache.invalidate_user(user_id);
        }
        result
    }

    pub async fn list(
        &self,
        user_id: &str,
        filters: BookmarkFilters,
    ) -> Result<Arc<Vec<BookmarkWithTags>>, BookmarkError> {
        let filters = filters.normalized();
        let epoch = self.cache.epoch(user_id);
        if let Some(rows) = self.cache.get_list(user_id, epoch, &filters) {
            return Ok(rows);
        }
        let rows = Arc::new(BookmarkService::list_bookmarks(&self.db, user_id, &filters).await?);
        self.cache.put_list(user_id, epoch, filters, rows.clone());
        Ok(rows)
    }

    pub async fn get(&self, user_id: &str, bookmark_id: i32) -> Result<Arc<BookmarkWithTags>, BookmarkError> {
        let epoch = self.cache.epoch(user_id);
        if let Some(row) = self.cache.get_detail(user_id, epoch, bookmark_id) {
            return Ok(row);
        }
        let row = Arc::new(BookmarkService::get_bookmark(&self.db, bookmark_id, user_id).await?);
        self.cache.put_detail(user_id, epoch, row.clone());
        Ok(row)
    }

    pub async fn create(
        &self,
        user_id: Option<&str>,
        input: CreateBookmarkInput,
    ) -> Result<bookmark::Model, BookmarkError> {
        let created = BookmarkService::create_bookmark(&self.db, user_id, input).await?;
        self.cache.invalidate_user(&created.user_id);
        Ok(created)
    }

    pub async fn update(
        &self,
        user_id: &str,
        bookmark_id: i32,
        input: UpdateBookmarkInput,
    ) -> Result<bookmark::Model, BookmarkError> {
        let result = BookmarkService::update_bookmark(&self.db, bookmark_id, user_id, input).await;
        self.invalidate_on_ok(user_id, result)
    }

    pub async fn delete(&self, user_id: &str, bookmark_id: i32) -> Result<(), BookmarkError> {
        let result = BookmarkService::delete_bookmark(&self.db, bookmark_id, user_id).await;
        self.invalidate_on_ok(user_id, result)
    }

    pub async fn add_tag(&self, user_id: &str, bookmark_id: i32, tag_id: i32) -> Result<(), BookmarkError> {
        let result = BookmarkService::add_tag(&self.db, bookmark_id, tag_id, user_id).await;
        self.invalidate_on_ok(user_id, result)
    }

    pub async fn remove_tag(&self, user_id: &str, bookmark_id: i32, tag_id: i32) -> Result<(), BookmarkError> {
        let result = BookmarkService::remove_tag(&self.db, bookmark_id, tag_id, user_id).await;
        self.invalidate_on_ok(user_id, result)
    }

    pub async fn lookup(
        &self,
        user_id: &str,
        place_ids: &[String],
    ) -> Result<HashMap<String, i32>, BookmarkError> {
        BookmarkService::find_by_place_ids(&self.db, user_id, place_ids).await
    }

    pub async fn list_tags(&self, user_id: &str) -> Result<Vec<TagWithCount>, TagError> {
        TagService::list_tags(&self.db, user_id).await
    }

    pub async fn create_tag(&self, user_id: &str, input: CreateTagInput) -> Result<tag::Model, TagError> {
        let result = TagService::create_tag(&self.db, user_id, input).await;
        self.invalidate_on_ok(user_id, result)
    }

    pub async fn update_tag(
        &self,
        user_id: &str,
        tag_id: i32,
        input: UpdateTagInput,
    ) -> Result<tag::Model, TagError> {
        let result = TagService::update_tag(&self.db, tag_id, user_id, input).await;
        self.invalidate_on_ok(user_id, result)
    }

    pub async fn delete_tag(&self, user_id: &str, tag_id: i32) -> Result<(), TagError> {
        let result = TagService::delete_tag(&self.db, tag_id, user_id).await;
        self.invalidate_on_ok(user_id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::VisitStatus;
    use chrono::Utc;

    fn row(id: i32, user_id: &str) -> Arc<BookmarkWithTags> {
        Arc::new(BookmarkWithTags {
            bookmark: bookmark::Model {
                id,
                user_id: user_id.to_string(),
                google_place_id: format!("place-{id}"),
                restaurant_name: "Diner".to_string(),
                address: "1 Main St".to_string(),
                latitude: 0.0,
                longitude: 0.0,
                google_rating: None,
                google_rating_count: None,
                price_level: None,
                phone: None,
                website: None,
                photo_reference: None,
                personal_note: None,
                personal_rating: None,
                visit_status: VisitStatus::NotVisited,
                visited_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            tags: Vec::new(),
        })
    }

    #[test]
    fn test_invalidation_is_scoped_to_user() {
        let cache = BookmarkCache::default();
        let alice = cache.epoch("alice");
        let bob = cache.epoch("bob");
        let pho = BookmarkFilters {
            search: Some("pho".to_string()),
            ..Default::default()
        };
        cache.put_detail("alice", alice, row(1, "alice"));
        cache.put_detail("bob", bob, row(2, "bob"));
        cache.put_list("alice", alice, BookmarkFilters::default(), Arc::new(vec![]));
        cache.put_list("alice", alice, pho.clone(), Arc::new(vec![]));
        assert!(cache.get_detail("alice", alice, 1).is_some());

        cache.invalidate_user("alice");
        let alice = cache.epoch("alice");
        assert!(cache.get_detail("alice", alice, 1).is_none());
        assert!(cache.get_list("alice", alice, &BookmarkFilters::default()).is_none());
        assert!(cache.get_list("alice", alice, &pho).is_none());
        assert_eq!(cache.epoch("bob"), bob);
        assert!(cache.get_detail("bob", bob, 2).is_some());
    }

    #[test]
    fn test_read_finishing_after_invalidation_is_not_served() {
        let cache = BookmarkCache::default();
        // A read captures the epoch, then a mutation lands before it stores its rows.
        let before = cache.epoch("alice");
        cache.invalidate_user("alice");
        let stale = Arc::new(vec![row(1, "alice").as_ref().clone()]);
        cache.put_list("alice", before, BookmarkFilters::default(), stale);
        cache.put_detail("alice", before, row(1, "alice"));

        let current = cache.epoch("alice");
        assert_ne!(before, current);
        assert!(cache.get_list("alice", current, &BookmarkFilters::default()).is_none());
        assert!(cache.get_detail("alice", current, 1).is_none());
    }

    #[test]
    fn test_epochs_are_never_reused() {
        let cache = BookmarkCache::default();
        let first = cache.epoch("alice");
        cache.invalidate_user("alice");
        cache.invalidate_user("bob");
        cache.invalidate_user("alice");
        let second = cache.epoch("alice");
        assert!(second > first);
        assert_ne!(second, cache.epoch("bob"));
    }
}
