use uuid::Uuid;

use teahouse_types::Profile;

use crate::api::{ApiResult, Repository};
use crate::cancel::{CancelToken, ViewScope};

/// Queries shorter than this (after trimming) never reach the backend
pub const MIN_QUERY_LEN: usize = 2;

/// A search to run on behalf of the controller
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub generation: u64,
    pub term: String,
    pub token: CancelToken,
}

/// Profile search by name. Results for a query that is no longer current are
/// discarded.
#[derive(Debug, Default)]
pub struct SearchController {
    pub query: String,
    pub results: Vec<Profile>,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
    generation: u64,
    scope: ViewScope,
}

impl SearchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
    }

    pub fn pop_char(&mut self) {
        self.query.pop();
    }

    /// Start a search for the current query. Short queries clear the results
    /// locally and return `None`.
    pub fn begin(&mut self) -> Option<SearchRequest> {
        self.generation += 1;
        self.selected = 0;
        self.error = None;

        let term = self.query.trim();
        if term.chars().count() < MIN_QUERY_LEN {
            self.results.clear();
            self.loading = false;
            return None;
        }

        self.loading = true;
        Some(SearchRequest {
            generation: self.generation,
            term: term.to_string(),
            token: self.scope.token(),
        })
    }

    /// Apply results. Returns false if they were stale and discarded.
    pub fn apply(&mut self, generation: u64, result: ApiResult<Vec<Profile>>) -> bool {
        if generation != self.generation {
            log::debug!("Discarding stale search results (generation {})", generation);
            return false;
        }
        self.loading = false;
        match result {
            Ok(profiles) => self.results = profiles,
            Err(e) if e.is_cancelled() => return false,
            Err(e) => {
                self.results.clear();
                self.error = Some(crate::app::alert_for(&e));
            }
        }
        true
    }

    /// Run a search inline
    pub async fn search(&mut self, repo: &Repository) -> ApiResult<()> {
        let Some(request) = self.begin() else {
            return Ok(());
        };
        let result = request.token.run(repo.search_profiles(&request.term)).await;
        if let Err(e) = &result {
            if !e.is_cancelled() {
                log::warn!("Profile search failed: {}", e);
            }
        }
        self.apply(request.generation, result);
        Ok(())
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.results.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Pick the highlighted profile and reset the search
    pub fn choose(&mut self) -> Option<Uuid> {
        let id = self.results.get(self.selected).map(|p| p.id)?;
        self.reset();
        Some(id)
    }

    pub fn reset(&mut self) {
        self.query.clear();
        self.results.clear();
        self.selected = 0;
        self.loading = false;
        self.error = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            bio: None,
            avatar_url: None,
            cover_url: None,
        }
    }

    #[test]
    fn test_short_query_clears_without_request() {
        let mut search = SearchController::new();
        search.results = vec![profile("Sara")];
        search.query = " s ".to_string();
        assert!(search.begin().is_none());
        assert!(search.results.is_empty());
    }

    #[test]
    fn test_stale_results_discarded() {
        let mut search = SearchController::new();
        search.query = "sa".to_string();
        let first = search.begin().unwrap();
        search.query = "sar".to_string();
        let second = search.begin().unwrap();

        assert!(!search.apply(first.generation, Ok(vec![profile("Salim")])));
        assert!(search.results.is_empty());
        assert!(search.apply(second.generation, Ok(vec![profile("Sara")])));
        assert_eq!(search.results[0].full_name, "Sara");
    }

    #[test]
    fn test_choose_resets_state() {
        let mut search = SearchController::new();
        let sara = profile("Sara");
        search.query = "sa".to_string();
        search.results = vec![sara.clone()];
        assert_eq!(search.choose(), Some(sara.id));
        assert!(search.query.is_empty());
        assert!(search.results.is_empty());
    }
}
