use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{info, instrument};

use crate::db::entities::{
    bookmark_tag,
    prelude::{BookmarkTag, Tag},
    tag::{self, TAG_COLORS, is_palette_color},
};
use crate::db::models::{CreateTagInput, TagWithCount, UpdateTagInput};
use crate::db::services::bookmark_service::is_unique_violation;

const MAX_TAG_NAME_LEN: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("Database error: {0}")]
    DbErr(#[from] DbErr),
    #[error("Tag not found: {0}")]
    NotFound(i32),
    #[error("A tag with this name already exists.")]
    DuplicateName,
    #[error("Invalid tag color: {0}")]
    InvalidColor(String),
    #[error("{0}")]
    InvalidInput(String),
}

fn validate_name(name: &str) -> Result<String, TagError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TagError::InvalidInput("Tag name is required".to_string()));
    }
    if name.chars().count() > MAX_TAG_NAME_LEN {
        return Err(TagError::InvalidInput(format!(
            "Tag name must be at most {MAX_TAG_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_color(color: &str) -> Result<String, TagError> {
    if is_palette_color(color) {
        Ok(color.to_ascii_lowercase())
    } else {
        Err(TagError::InvalidColor(color.to_string()))
    }
}

fn map_write_err(db_err: DbErr) -> TagError {
    if is_unique_violation(&db_err) {
        TagError::DuplicateName
    } else {
        TagError::DbErr(db_err)
    }
}

pub struct TagService;

impl TagService {
    /// All tags of a user ordered by name, each with the number of bookmarks carrying it.
    pub async fn list_tags(db: &DbConn, user_id: &str) -> Result<Vec<TagWithCount>, TagError> {
        let tags = Tag::find()
            .filter(tag::Column::UserId.eq(user_id))
            .order_by_asc(tag::Column::Name)
            .all(db)
            .await?;
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let counts: HashMap<i32, i64> = BookmarkTag::find()
            .select_only()
            .column(bookmark_tag::Column::TagId)
            .column_as(Expr::col(bookmark_tag::Column::BookmarkId).count(), "bookmark_count")
            .filter(bookmark_tag::Column::TagId.is_in(tags.iter().map(|t| t.id)))
            .group_by(bookmark_tag::Column::TagId)
            .into_tuple::<(i32, i64)>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        Ok(tags
            .into_iter()
            .map(|tag| {
                let bookmark_count = counts.get(&tag.id).copied().unwrap_or(0);
                TagWithCount { tag, bookmark_count }
            })
            .collect())
    }

    pub async fn get_tag(db: &DbConn, tag_id: i32, user_id: &str) -> Result<tag::Model, TagError> {
        Tag::find_by_id(tag_id)
            .filter(tag::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or(TagError::NotFound(tag_id))
    }

    #[instrument(skip(db, input), fields(name = %input.name))]
    pub async fn create_tag(
        db: &DbConn,
        user_id: &str,
        input: CreateTagInput,
    ) -> Result<tag::Model, TagError> {
        let name = validate_name(&input.name)?;
        let color = match input.color.as_deref() {
            Some(color) => validate_color(color)?,
            None => TAG_COLORS[0].to_string(),
        };

        let new_tag = tag::ActiveModel {
            user_id: Set(user_id.to_string()),
            name: Set(name),
            color: Set(color),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        new_tag.insert(db).await.map_err(map_write_err)
    }

    pub async fn update_tag(
        db: &DbConn,
        tag_id: i32,
        user_id: &str,
        input: UpdateTagInput,
    ) -> Result<tag::Model, TagError> {
        let existing = Self::get_tag(db, tag_id, user_id).await?;
        let mut active_tag: tag::ActiveModel = existing.into();

        if let Some(name) = input.name.as_deref() {
            active_tag.name = Set(validate_name(name)?);
        }
        if let Some(color) = input.color.as_deref() {
            active_tag.color = Set(validate_color(color)?);
        }

        active_tag.update(db).await.map_err(map_write_err)
    }

    /// Deletes the tag and every association to it. Tagged bookmarks are kept.
    pub async fn delete_tag(db: &DbConn, tag_id: i32, user_id: &str) -> Result<(), TagError> {
        let txn = db.begin().await?;

        let tag = Tag::find_by_id(tag_id)
            .filter(tag::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or(TagError::NotFound(tag_id))?;

        let detached = BookmarkTag::delete_many()
            .filter(bookmark_tag::Column::TagId.eq(tag.id))
            .exec(&txn)
            .await?;
        Tag::delete_by_id(tag.id).exec(&txn).await?;

        txn.commit().await?;
        info!(tag_id, detached = detached.rows_affected, "Tag deleted.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Brunch ").unwrap(), "Brunch");
        assert!(matches!(validate_name("   "), Err(TagError::InvalidInput(_))));
        assert!(validate_name(&"x".repeat(MAX_TAG_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_color_normalizes_case() {
        assert_eq!(validate_color("#3B82F6").unwrap(), "#3b82f6");
        assert!(matches!(validate_color("#000000"), Err(TagError::InvalidColor(_))));
    }
}
