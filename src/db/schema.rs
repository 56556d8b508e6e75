//! Creates the tables and unique indexes the store relies on.
//!
//! Uniqueness of (user, place) bookmarks and (user, name) tags is owned by
//! the database; the services only translate the resulting violations.

use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::db::entities::{bookmark, bookmark_tag, places_cache, tag};

pub const BOOKMARK_USER_PLACE_INDEX: &str = "idx_bookmarks_user_place";
pub const TAG_USER_NAME_INDEX: &str = "idx_tags_user_name";

fn table_statements(schema: &Schema) -> Vec<TableCreateStatement> {
    // bookmark_tags references both parents, so it goes last.
    vec![
        schema.create_table_from_entity(bookmark::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(tag::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(bookmark_tag::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(places_cache::Entity).if_not_exists().to_owned(),
    ]
}

fn index_statements() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name(BOOKMARK_USER_PLACE_INDEX)
            .table(bookmark::Entity)
            .col(bookmark::Column::UserId)
            .col(bookmark::Column::GooglePlaceId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name(TAG_USER_NAME_INDEX)
            .table(tag::Entity)
            .col(tag::Column::UserId)
            .col(tag::Column::Name)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_bookmark_tags_tag_id")
            .table(bookmark_tag::Entity)
            .col(bookmark_tag::Column::TagId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_places_cache_expires_at")
            .table(places_cache::Entity)
            .col(places_cache::Column::ExpiresAt)
            .if_not_exists()
            .to_owned(),
    ]
}

/// Idempotently creates every table and index. Safe to run on each start.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    for statement in table_statements(&schema) {
        db.execute(backend.build(&statement)).await?;
    }
    for statement in index_statements() {
        db.execute(backend.build(&statement)).await?;
    }

    info!(backend = ?backend, "Database schema is up to date.");
    Ok(())
}
