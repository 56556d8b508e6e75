use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Colours a tag may take. The first entry is the default.
pub const TAG_COLORS: [&str; 10] = [
    "#ef4444", "#f97316", "#f59e0b", "#84cc16", "#22c55e", "#14b8a6", "#3b82f6", "#8b5cf6",
    "#ec4899", "#6b7280",
];

pub fn is_palette_color(color: &str) -> bool {
    TAG_COLORS.iter().any(|c| c.eq_ignore_ascii_case(color))
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    // (user_id, name) is unique, see db::schema.
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: ChronoDateTimeUtc,
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

impl Related<super::bookmark::Entity> for Entity {
    fn to() -> RelationDef {
        super::bookmark_tag::Relation::Bookmark.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::bookmark_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_lookup_is_case_insensitive() {
        assert!(is_palette_color("#EF4444"));
        assert!(is_palette_color(TAG_COLORS[0]));
        assert!(!is_palette_color("#123456"));
        assert!(!is_palette_color("red"));
    }
}
