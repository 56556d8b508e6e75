use serde::{Deserialize, Serialize};

use crate::db::enums::VisitStatus;
use crate::db::models::BookmarkFilters;
use crate::places::types::{LatLng, Restaurant};
use crate::search::SortMode;

// Claims of an access token issued by the auth provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RestaurantsResponse {
    pub restaurants: Vec<Restaurant>,
}

#[derive(Debug, Serialize)]
pub struct RestaurantResponse {
    pub restaurant: Restaurant,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsQuery {
    pub place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoQuery {
    pub reference: Option<String>,
    pub maxwidth: Option<u32>,
}

/// Query string of the bookmark listing. `tag_ids` is comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct BookmarkListQuery {
    pub visit_status: Option<String>,
    pub search: Option<String>,
    pub tag_ids: Option<String>,
}

impl BookmarkListQuery {
    pub fn into_filters(self) -> Result<BookmarkFilters, String> {
        let visit_status = match self.visit_status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(status) => Some(status.parse::<VisitStatus>()?),
        };
        let tag_ids = parse_id_list(self.tag_ids.as_deref())?;
        Ok(BookmarkFilters {
            visit_status,
            search: self.search,
            tag_ids,
        }
        .normalized())
    }
}

fn parse_id_list(raw: Option<&str>) -> Result<Vec<i32>, String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| format!("Invalid tag id: {s}")))
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub place_ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub bookmarks: std::collections::HashMap<String, i32>,
}

/// Body of a search submission. `sort` and `min_rating` are optional view settings.
#[derive(Debug, Default, Deserialize)]
pub struct SearchSubmitRequest {
    pub query: Option<String>,
    pub location: Option<LatLng>,
    pub radius: Option<u32>,
    pub sort: Option<SortMode>,
    pub min_rating: Option<f64>,
}

/// View changes on an existing session. `min_rating: null` removes the filter.
#[derive(Debug, Default, Deserialize)]
pub struct SearchViewUpdate {
    pub sort: Option<SortMode>,
    #[serde(default, deserialize_with = "double_option")]
    pub min_rating: Option<Option<f64>>,
    pub page: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchViewQuery {
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub next: Option<String>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
