use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::paging::{Page, paginate};
use super::sort::{SortMode, apply_min_rating, haversine_km, sort_restaurants};
use crate::places::types::{LatLng, Restaurant, SearchParams};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPhase {
    #[default]
    Idle,
    Searching,
    Results,
    Error,
}

/// A result row as shown to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Id of the caller's bookmark for this place, if any.
    pub bookmark_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchView {
    pub phase: SearchPhase,
    pub generation: u64,
    pub query: Option<String>,
    pub location: Option<LatLng>,
    pub sort: SortMode,
    pub min_rating: Option<f64>,
    pub error: Option<String>,
    pub results: Page<SearchResult>,
}

/// Per-user search state.
///
/// Every submission bumps `generation`. A completion is only committed when
/// it carries the current generation, so a slow response to an older query
/// can never overwrite the results of a newer one.
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    generation: u64,
    phase: SearchPhase,
    params: Option<SearchParams>,
    results: Vec<Restaurant>,
    error: Option<String>,
    sort: SortMode,
    min_rating: Option<f64>,
    page: usize,
}

impl SearchSession {
    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Enters `Searching` for new parameters and returns the submission's generation.
    pub fn begin(&mut self, params: SearchParams) -> u64 {
        self.begin_at(self.generation + 1, params)
    }

    /// Like `begin`, with a generation issued by the caller. Generations must
    /// only grow for a given session.
    pub fn begin_at(&mut self, generation: u64, params: SearchParams) -> u64 {
        self.generation = generation;
        self.phase = SearchPhase::Searching;
        self.params = Some(params);
        self.results.clear();
        self.error = None;
        self.page = 1;
        self.generation
    }

    /// Commits the outcome of submission `generation`. Returns `false` when the
    /// submission has been superseded and the outcome was discarded.
    pub fn complete(&mut self, generation: u64, outcome: Result<Vec<Restaurant>, String>) -> bool {
        if generation != self.generation || self.phase != SearchPhase::Searching {
            return false;
        }
        match outcome {
            Ok(results) => {
                self.phase = SearchPhase::Results;
                self.results = results;
            }
            Err(message) => {
                self.phase = SearchPhase::Error;
                self.error = Some(message);
            }
        }
        self.page = 1;
        true
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        if self.sort != sort {
            self.sort = sort;
            self.page = 1;
        }
    }

    pub fn set_min_rating(&mut self, min_rating: Option<f64>) {
        if self.min_rating != min_rating {
            self.min_rating = min_rating;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    fn origin(&self) -> Option<LatLng> {
        self.params.as_ref().and_then(|p| p.location)
    }

    /// Filtered and sorted results, before pagination.
    pub fn visible_results(&self) -> Vec<Restaurant> {
        let mut results = self.results.clone();
        apply_min_rating(&mut results, self.min_rating);
        sort_restaurants(&mut results, self.sort, self.origin());
        results
    }

    pub fn view(&self, page_size: usize) -> SearchView {
        let origin = self.origin();
        let page = paginate(&self.visible_results(), self.page, page_size).map(|restaurant| {
            SearchResult {
                distance_km: origin.map(|o| haversine_km(o, restaurant.location())),
                restaurant,
                bookmark_id: None,
            }
        });
        SearchView {
            phase: self.phase,
            generation: self.generation,
            query: self.params.as_ref().and_then(|p| p.query.clone()),
            location: origin,
            sort: self.sort,
            min_rating: self.min_rating,
            error: self.error.clone(),
            results: page,
        }
    }
}

/// Live search sessions keyed by user id.
///
/// Generations are drawn from one counter shared by every session, so a
/// number is never handed out twice. A search still in flight when its
/// session is cleared or evicted can therefore never commit into a newer one.
#[derive(Debug, Default)]
pub struct SearchSessions {
    sessions: DashMap<String, SessionSlot>,
    next_generation: AtomicU64,
}

#[derive(Debug)]
struct SessionSlot {
    session: SearchSession,
    touched_at: Instant,
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self {
            session: SearchSession::default(),
            touched_at: Instant::now(),
        }
    }
}

impl SearchSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: &str) -> RefMut<'_, String, SessionSlot> {
        let mut slot = self.sessions.entry(user_id.to_string()).or_default();
        slot.touched_at = Instant::now();
        slot
    }

    pub fn begin(&self, user_id: &str, params: SearchParams) -> u64 {
        self.begin_with(user_id, params, |_| {})
    }

    /// Applies `configure` and starts a new submission under one lock.
    pub fn begin_with(
        &self,
        user_id: &str,
        params: SearchParams,
        configure: impl FnOnce(&mut SearchSession),
    ) -> u64 {
        let mut slot = self.slot(user_id);
        configure(&mut slot.session);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        slot.session.begin_at(generation, params)
    }

    pub fn complete(
        &self,
        user_id: &str,
        generation: u64,
        outcome: Result<Vec<Restaurant>, String>,
    ) -> bool {
        self.sessions
            .get_mut(user_id)
            .is_some_and(|mut slot| slot.session.complete(generation, outcome))
    }

    /// Applies `f` to the user's session, creating an idle one if needed.
    pub fn update<R>(&self, user_id: &str, f: impl FnOnce(&mut SearchSession) -> R) -> R {
        let mut slot = self.slot(user_id);
        f(&mut slot.session)
    }

    pub fn snapshot(&self, user_id: &str) -> SearchSession {
        match self.sessions.get_mut(user_id) {
            Some(mut slot) => {
                slot.touched_at = Instant::now();
                slot.session.clone()
            }
            None => SearchSession::default(),
        }
    }

    pub fn clear(&self, user_id: &str) {
        self.sessions.remove(user_id);
    }

    /// Drops sessions untouched for longer than `max_idle`. Returns how many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, slot| slot.touched_at.elapsed() <= max_idle);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::types::Geometry;

    fn restaurant(id: &str, rating: Option<f64>, lng: f64) -> Restaurant {
        Restaurant {
            place_id: id.to_string(),
            name: id.to_string(),
            formatted_address: String::new(),
            geometry: Geometry {
                location: LatLng { lat: 0.0, lng },
            },
            rating,
            user_ratings_total: None,
            price_level: None,
            formatted_phone_number: None,
            website: None,
            photos: Vec::new(),
            opening_hours: None,
            types: Vec::new(),
        }
    }

    fn params(query: &str) -> SearchParams {
        SearchParams {
            query: Some(query.to_string()),
            location: Some(LatLng { lat: 0.0, lng: 0.0 }),
            radius: None,
        }
    }

    #[test]
    fn test_session_transitions() {
        let mut session = SearchSession::default();
        assert_eq!(session.phase(), SearchPhase::Idle);

        let generation = session.begin(params("sushi"));
        assert_eq!(session.phase(), SearchPhase::Searching);
        assert!(session.complete(generation, Ok(vec![restaurant("a", None, 1.0)])));
        assert_eq!(session.phase(), SearchPhase::Results);

        let generation = session.begin(params("ramen"));
        assert!(session.complete(generation, Err("Search failed".to_string())));
        assert_eq!(session.phase(), SearchPhase::Error);
        assert_eq!(session.view(20).error.as_deref(), Some("Search failed"));
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut session = SearchSession::default();
        let first = session.begin(params("slow"));
        let second = session.begin(params("fast"));
        assert!(session.complete(second, Ok(vec![restaurant("fast", None, 1.0)])));
        assert!(!session.complete(first, Ok(vec![restaurant("slow", None, 1.0)])));

        let view = session.view(20);
        assert_eq!(view.query.as_deref(), Some("fast"));
        assert_eq!(view.results.items[0].restaurant.place_id, "fast");
    }

    #[test]
    fn test_sort_and_filter_reset_page() {
        let mut session = SearchSession::default();
        let generation = session.begin(params("pizza"));
        let results = (0..5)
            .map(|i| restaurant(&format!("r{i}"), Some(3.0 + i as f64 * 0.5), i as f64))
            .collect();
        session.complete(generation, Ok(results));

        session.set_page(3);
        assert_eq!(session.view(2).results.page, 3);
        session.set_sort(SortMode::Rating);
        assert_eq!(session.view(2).results.page, 1);

        session.set_page(2);
        session.set_min_rating(Some(4.0));
        let view = session.view(2);
        assert_eq!(view.results.page, 1);
        assert_eq!(view.results.total_items, 3);
        assert_eq!(view.results.items[0].restaurant.place_id, "r4");
    }

    #[test]
    fn test_sessions_are_per_user() {
        let sessions = SearchSessions::new();
        let generation = sessions.begin("alice", params("tapas"));
        assert!(sessions.complete("alice", generation, Ok(Vec::new())));
        assert!(!sessions.complete("bob", generation, Ok(Vec::new())));
        assert_eq!(sessions.snapshot("alice").phase(), SearchPhase::Results);
        assert_eq!(sessions.snapshot("bob").phase(), SearchPhase::Idle);

        sessions.clear("alice");
        assert_eq!(sessions.snapshot("alice").phase(), SearchPhase::Idle);
    }

    #[test]
    fn test_search_from_before_clear_cannot_commit() {
        let sessions = SearchSessions::new();
        let old = sessions.begin("alice", params("old"));
        sessions.clear("alice");
        let new = sessions.begin("alice", params("new"));
        assert_ne!(old, new);

        assert!(!sessions.complete("alice", old, Ok(vec![restaurant("old", None, 1.0)])));
        assert_eq!(sessions.snapshot("alice").phase(), SearchPhase::Searching);
        assert!(sessions.complete("alice", new, Ok(vec![restaurant("new", None, 1.0)])));

        let view = sessions.snapshot("alice").view(20);
        assert_eq!(view.query.as_deref(), Some("new"));
        assert_eq!(view.results.items[0].restaurant.place_id, "new");
    }

    #[test]
    fn test_begin_with_configures_before_starting() {
        let sessions = SearchSessions::new();
        let generation = sessions.begin_with("alice", params("noodles"), |session| {
            session.set_sort(SortMode::Name);
        });
        let snapshot = sessions.snapshot("alice");
        assert_eq!(snapshot.generation(), generation);
        assert_eq!(snapshot.view(20).sort, SortMode::Name);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let sessions = SearchSessions::new();
        let stale = sessions.begin("alice", params("old"));
        tokio::time::advance(Duration::from_secs(90)).await;
        sessions.begin("bob", params("fresh"));

        assert_eq!(sessions.evict_idle(Duration::from_secs(60)), 1);
        assert_eq!(sessions.len(), 1);
        assert!(!sessions.complete("alice", stale, Ok(Vec::new())));
        assert_eq!(sessions.snapshot("alice").phase(), SearchPhase::Idle);
        assert_eq!(sessions.snapshot("bob").phase(), SearchPhase::Searching);
    }
}
