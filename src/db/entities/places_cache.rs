use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Read-through cache for place details lookups.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "places_cache")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub place_id: String,
    // Serialized `places::types::Restaurant`.
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub cached_at: ChronoDateTimeUtc,
    pub expires_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
