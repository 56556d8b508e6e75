use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, LoaderTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, instrument};

use crate::db::entities::{
    bookmark, bookmark_tag,
    prelude::{Bookmark, BookmarkTag, Tag},
    tag,
};
use crate::db::enums::VisitStatus;
use crate::db::models::{BookmarkFilters, BookmarkWithTags, CreateBookmarkInput, UpdateBookmarkInput};

#[derive(Debug, thiserror::Error)]
pub enum BookmarkError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Bookmark not found: {0}")]
    NotFound(i32),
    #[error("Tag not found: {0}")]
    TagNotFound(i32),
    #[error("Already bookmarked")]
    AlreadyBookmarked,
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("{0}")]
    InvalidInput(String),
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn validate_rating(rating: Option<i32>) -> Result<(), BookmarkError> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(BookmarkError::InvalidInput(
            "personal_rating must be between 1 and 5".to_string(),
        )),
        _ => Ok(()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_create(input: &CreateBookmarkInput) -> Result<(), BookmarkError> {
    if input.google_place_id.trim().is_empty() {
        return Err(BookmarkError::InvalidInput("google_place_id is required".to_string()));
    }
    if input.restaurant_name.trim().is_empty() {
        return Err(BookmarkError::InvalidInput("restaurant_name is required".to_string()));
    }
    if !(-90.0..=90.0).contains(&input.latitude) || !(-180.0..=180.0).contains(&input.longitude) {
        return Err(BookmarkError::InvalidInput("Coordinates are out of range".to_string()));
    }
    Ok(())
}

pub struct BookmarkService;

impl BookmarkService {
    /// Lists the user's bookmarks, newest first, with tags attached.
    ///
    /// All three filters run inside the query. Tag membership matches bookmarks
    /// carrying at least one of the requested tags.
    #[instrument(skip(db))]
    pub async fn list_bookmarks(
        db: &DbConn,
        user_id: &str,
        filters: &BookmarkFilters,
    ) -> Result<Vec<BookmarkWithTags>, BookmarkError> {
        let mut query = Bookmark::find()
            .filter(bookmark::Column::UserId.eq(user_id))
            .order_by_desc(bookmark::Column::CreatedAt)
            .order_by_desc(bookmark::Column::Id);

        if let Some(status) = filters.visit_status {
            query = query.filter(bookmark::Column::VisitStatus.eq(status));
        }

        if let Some(term) = filters.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            query = query.filter(
                Expr::expr(Func::lower(Expr::col((
                    bookmark::Entity,
                    bookmark::Column::RestaurantName,
                ))))
                .like(LikeExpr::new(pattern).escape('\\')),
            );
        }

        if !filters.tag_ids.is_empty() {
            query = query.filter(
                bookmark::Column::Id.in_subquery(
                    Query::select()
                        .column(bookmark_tag::Column::BookmarkId)
                        .from(bookmark_tag::Entity)
                        .and_where(bookmark_tag::Column::TagId.is_in(filters.tag_ids.clone()))
                        .to_owned(),
                ),
            );
        }

        let bookmarks = query.all(db).await?;
        let tags = bookmarks.load_many_to_many(Tag, BookmarkTag, db).await?;
        debug!(count = bookmarks.len(), "Loaded bookmarks.");

        Ok(bookmarks
            .into_iter()
            .zip(tags)
            .map(|(bookmark, mut tags)| {
                tags.sort_by(|a, b| a.name.cmp(&b.name));
                BookmarkWithTags { bookmark, tags }
            })
            .collect())
    }

    async fn find_owned(
        db: &impl sea_orm::ConnectionTrait,
        bookmark_id: i32,
        user_id: &str,
    ) -> Result<bookmark::Model, BookmarkError> {
        Bookmark::find_by_id(bookmark_id)
            .filter(bookmark::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or(BookmarkError::NotFound(bookmark_id))
    }

    pub async fn get_bookmark(
        db: &DbConn,
        bookmark_id: i32,
        user_id: &str,
    ) -> Result<BookmarkWithTags, BookmarkError> {
        let bookmark = Self::find_owned(db, bookmark_id, user_id).await?;
        let mut tags = vec![bookmark.clone()]
            .load_many_to_many(Tag, BookmarkTag, db)
            .await?
            .pop()
            .unwrap_or_default();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(BookmarkWithTags { bookmark, tags })
    }

    /// Inserts a bookmark for the resolved user. Fails closed without an identity.
    #[instrument(skip(db, input), fields(place_id = %input.google_place_id))]
    pub async fn create_bookmark(
        db: &DbConn,
        user_id: Option<&str>,
        input: CreateBookmarkInput,
    ) -> Result<bookmark::Model, BookmarkError> {
        let user_id = user_id
            .filter(|id| !id.is_empty())
            .ok_or(BookmarkError::Unauthenticated)?;
        validate_create(&input)?;

        let now = Utc::now();
        let new_bookmark = bookmark::ActiveModel {
            user_id: Set(user_id.to_string()),
            google_place_id: Set(input.google_place_id.trim().to_string()),
            restaurant_name: Set(input.restaurant_name.trim().to_string()),
            address: Set(input.address),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            google_rating: Set(input.google_rating),
            google_rating_count: Set(input.google_rating_count),
            price_level: Set(input.price_level),
            phone: Set(non_empty(input.phone)),
            website: Set(non_empty(input.website)),
            photo_reference: Set(non_empty(input.photo_reference)),
            personal_note: Set(non_empty(input.personal_note)),
            personal_rating: Set(None),
            visit_status: Set(input.visit_status),
            visited_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        new_bookmark.insert(db).await.map_err(|db_err| {
            if is_unique_violation(&db_err) {
                BookmarkError::AlreadyBookmarked
            } else {
                BookmarkError::DbErr(db_err)
            }
        })
    }

    pub async fn update_bookmark(
        db: &DbConn,
        bookmark_id: i32,
        user_id: &str,
        input: UpdateBookmarkInput,
    ) -> Result<bookmark::Model, BookmarkError> {
        let existing = Self::find_owned(db, bookmark_id, user_id).await?;
        let status = input.visit_status.unwrap_or(existing.visit_status);
        let mut active_bookmark: bookmark::ActiveModel = existing.into();

        if let Some(note) = input.personal_note {
            active_bookmark.personal_note = Set(non_empty(note));
        }
        if let Some(rating) = input.personal_rating {
            validate_rating(rating)?;
            active_bookmark.personal_rating = Set(rating);
        }
        if let Some(visit_status) = input.visit_status {
            active_bookmark.visit_status = Set(visit_status);
        }
        if let Some(visited_at) = input.visited_at {
            active_bookmark.visited_at = Set(visited_at);
        }
        // A visit date only makes sense on visited bookmarks.
        if status != VisitStatus::Visited {
            active_bookmark.visited_at = Set(None);
        }
        active_bookmark.updated_at = Set(Utc::now());

        Ok(active_bookmark.update(db).await?)
    }

    pub async fn delete_bookmark(
        db: &DbConn,
        bookmark_id: i32,
        user_id: &str,
    ) -> Result<(), BookmarkError> {
        let txn = db.begin().await?;

        let delete_result = Bookmark::delete_many()
            .filter(bookmark::Column::Id.eq(bookmark_id))
            .filter(bookmark::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        if delete_result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(BookmarkError::NotFound(bookmark_id));
        }

        BookmarkTag::delete_many()
            .filter(bookmark_tag::Column::BookmarkId.eq(bookmark_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Attaches a tag. Attaching a tag that is already present is a no-op.
    pub async fn add_tag(
        db: &DbConn,
        bookmark_id: i32,
        tag_id: i32,
        user_id: &str,
    ) -> Result<(), BookmarkError> {
        Self::find_owned(db, bookmark_id, user_id).await?;
        Tag::find_by_id(tag_id)
            .filter(tag::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or(BookmarkError::TagNotFound(tag_id))?;

        let existing = BookmarkTag::find_by_id((bookmark_id, tag_id)).one(db).await?;
        if existing.is_some() {
            return Ok(());
        }

        let association = bookmark_tag::ActiveModel {
            bookmark_id: Set(bookmark_id),
            tag_id: Set(tag_id),
            created_at: Set(Utc::now()),
        };
        match BookmarkTag::insert(association).exec_without_returning(db).await {
            Ok(_) => Ok(()),
            Err(db_err) if is_unique_violation(&db_err) => Ok(()),
            Err(db_err) => Err(db_err.into()),
        }
    }

    pub async fn remove_tag(
        db: &DbConn,
        bookmark_id: i32,
        tag_id: i32,
        user_id: &str,
    ) -> Result<(), BookmarkError> {
        Self::find_owned(db, bookmark_id, user_id).await?;
        BookmarkTag::delete_many()
            .filter(bookmark_tag::Column::BookmarkId.eq(bookmark_id))
            .filter(bookmark_tag::Column::TagId.eq(tag_id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Maps each given place identifier the user has bookmarked to the bookmark id.
    pub async fn find_by_place_ids(
        db: &DbConn,
        user_id: &str,
        place_ids: &[String],
    ) -> Result<HashMap<String, i32>, BookmarkError> {
        if place_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let bookmarks = Bookmark::find()
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::GooglePlaceId.is_in(place_ids.iter().cloned()))
            .all(db)
            .await?;
        Ok(bookmarks
            .into_iter()
            .map(|b| (b.google_place_id, b.id))
            .collect())
    }
}
