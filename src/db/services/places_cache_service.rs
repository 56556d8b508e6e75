use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, Set};
use tracing::debug;

use crate::db::entities::{places_cache, prelude::PlacesCache};

/// Lifetime of a cached details payload.
pub const PLACES_CACHE_TTL_HOURS: i64 = 24;

/// Returns the cached payload for `place_id` if it has not expired at `now`.
pub async fn get_cached_place(
    db: &DbConn,
    place_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, DbErr> {
    let entry = PlacesCache::find_by_id(place_id.to_string())
        .filter(places_cache::Column::ExpiresAt.gt(now))
        .one(db)
        .await?;
    Ok(entry.map(|e| e.payload))
}

/// Stores or refreshes a payload, resetting its expiry.
pub async fn cache_place(
    db: &DbConn,
    place_id: &str,
    payload: String,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    let entry = places_cache::ActiveModel {
        place_id: Set(place_id.to_string()),
        payload: Set(payload),
        cached_at: Set(now),
        expires_at: Set(now + Duration::hours(PLACES_CACHE_TTL_HOURS)),
    };

    PlacesCache::insert(entry)
        .on_conflict(
            OnConflict::column(places_cache::Column::PlaceId)
                .update_columns([
                    places_cache::Column::Payload,
                    places_cache::Column::CachedAt,
                    places_cache::Column::ExpiresAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    debug!(place_id, "Cached place details.");
    Ok(())
}

/// Deletes every entry that expired at or before `now`. Returns the number removed.
pub async fn cleanup_expired_cache(db: &DbConn, now: DateTime<Utc>) -> Result<u64, DbErr> {
    let result = PlacesCache::delete_many()
        .filter(places_cache::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
