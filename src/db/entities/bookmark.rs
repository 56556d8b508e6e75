use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::VisitStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookmarks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    // Subject of the auth provider's access token. Unique together with google_place_id.
    pub user_id: String,
    pub google_place_id: String,
    pub restaurant_name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    // Snapshot of the places catalog at bookmark time.
    pub google_rating: Option<f64>,
    pub google_rating_count: Option<i32>,
    pub price_level: Option<i32>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub photo_reference: Option<String>,
    pub personal_note: Option<String>,
    pub personal_rating: Option<i32>,
    pub visit_status: VisitStatus,
    pub visited_at: Option<ChronoDate>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bookmark_tag::Entity")]
    BookmarkTags,
}

impl Related<super::bookmark_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookmarkTags.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::bookmark_tag::Relation::Tag.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::bookmark_tag::Relation::Bookmark.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
