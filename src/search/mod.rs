//! Sorting, filtering and pagination of search results, and the per-user
//! search session built on top of them.

pub mod paging;
pub mod session;
pub mod sort;

pub use paging::{DEFAULT_PAGE_SIZE, Page, paginate};
pub use session::{SearchPhase, SearchResult, SearchSession, SearchSessions, SearchView};
pub use sort::{SortMode, apply_min_rating, haversine_km, sort_restaurants};
