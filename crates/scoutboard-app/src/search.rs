// Player search: input debounce, the FIFO result cache, and the request path.
//
// Every keystroke restarts the debounce timer and bumps the search
// generation. When the timer fires the query is served from the cache or
// fetched; a response whose generation is no longer current is cached but
// not shown.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use scoutboard_core::api::PipelineApi;
use scoutboard_core::error::PipelineError;
use scoutboard_core::model::PlayerSearchResult;
use scoutboard_core::search_cache::SearchCache;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

// ---------------------------------------------------------------------------
// Debounce timer
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SearchDebounce {
    delay: Duration,
    pending: Option<(String, Instant)>,
    generation: u64,
}

impl SearchDebounce {
    pub fn new(delay: Duration) -> Self {
        SearchDebounce {
            delay,
            pending: None,
            generation: 0,
        }
    }

    /// Record new input text, restarting the timer. Returns the generation
    /// the query will be dispatched under.
    pub fn input(&mut self, query: &str) -> u64 {
        self.generation += 1;
        self.pending = Some((query.to_string(), Instant::now() + self.delay));
        self.generation
    }

    /// When the pending query is due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Take the pending query if its timer has expired by `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<(String, u64)> {
        let due = matches!(&self.pending, Some((_, at)) if *at <= now);
        if !due {
            return None;
        }
        let (query, _) = self.pending.take()?;
        Some((query, self.generation))
    }

    /// Drop any pending query and invalidate in-flight responses.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.generation += 1;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ---------------------------------------------------------------------------
// Search session
// ---------------------------------------------------------------------------

/// What to do with a query whose debounce timer has fired.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchDispatch {
    /// Blank query: clear the results, send nothing.
    Cleared,
    /// Served from the cache.
    Cached(Vec<PlayerSearchResult>),
    /// Not cached: fetch under this generation.
    Fetch { query: String, generation: u64 },
}

#[derive(Debug)]
pub struct SearchSession {
    debounce: SearchDebounce,
    cache: SearchCache<PlayerSearchResult>,
}

impl SearchSession {
    pub fn new(delay: Duration, cache_capacity: usize) -> Self {
        SearchSession {
            debounce: SearchDebounce::new(delay),
            cache: SearchCache::new(cache_capacity),
        }
    }

    pub fn input(&mut self, query: &str) -> u64 {
        self.debounce.input(query)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn cancel(&mut self) {
        self.debounce.cancel();
    }

    pub fn cache(&self) -> &SearchCache<PlayerSearchResult> {
        &self.cache
    }

    /// Fire the pending query if it is due.
    pub fn poll(&mut self, now: Instant) -> Option<(String, SearchDispatch)> {
        let (query, generation) = self.debounce.take_due(now)?;
        let dispatch = self.dispatch(&query, generation);
        Some((query, dispatch))
    }

    /// Decide how a fired query is served. The cache is keyed on the text as
    /// typed.
    pub fn dispatch(&self, query: &str, generation: u64) -> SearchDispatch {
        if query.trim().is_empty() {
            return SearchDispatch::Cleared;
        }
        if let Some(results) = self.cache.get(query) {
            debug!(query, "search cache hit");
            return SearchDispatch::Cached(results.to_vec());
        }
        debug!(query, generation, "search cache miss");
        SearchDispatch::Fetch {
            query: query.to_string(),
            generation,
        }
    }

    /// Handle a finished request. Successful results are always cached; the
    /// outcome is returned only if no newer input has arrived since.
    pub fn complete(
        &mut self,
        query: &str,
        generation: u64,
        outcome: Result<Vec<PlayerSearchResult>, PipelineError>,
    ) -> Option<Result<Vec<PlayerSearchResult>, PipelineError>> {
        if let Ok(results) = &outcome {
            if let Some(evicted) = self.cache.insert(query, results.clone()) {
                debug!(evicted, "search cache eviction");
            }
        }
        if self.debounce.is_current(generation) {
            Some(outcome)
        } else {
            debug!(query, generation, "discarding stale search response");
            None
        }
    }
}

/// Send one search request. Surrounding whitespace is not sent.
pub async fn run_search(
    api: &dyn PipelineApi,
    query: &str,
) -> Result<Vec<PlayerSearchResult>, PipelineError> {
    api.search_players(query.trim()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoutboard_core::identity::PlayerIdentity;
    use scoutboard_core::memory::{ApiOp, MemoryApi};
    use scoutboard_core::model::PlayerProfile;

    fn catalog_api() -> MemoryApi {
        let api = MemoryApi::new("scout");
        for (id, name) in [(1, "Roy Keane"), (2, "Robbie Keane"), (3, "Paul McGrath")] {
            api.add_to_catalog(PlayerSearchResult {
                identity: PlayerIdentity::External(id),
                profile: PlayerProfile {
                    player_name: name.into(),
                    ..PlayerProfile::default()
                },
            });
        }
        api
    }

    /// Type `query`, let the debounce expire, and run whatever it dispatches.
    async fn type_and_wait(
        session: &mut SearchSession,
        api: &MemoryApi,
        query: &str,
    ) -> Option<Vec<PlayerSearchResult>> {
        session.input(query);
        tokio::time::advance(DEFAULT_DEBOUNCE).await;
        let (query, dispatch) = session.poll(Instant::now())?;
        match dispatch {
            SearchDispatch::Cleared => Some(Vec::new()),
            SearchDispatch::Cached(results) => Some(results),
            SearchDispatch::Fetch { generation, .. } => {
                let outcome = run_search(api, &query).await;
                session.complete(&query, generation, outcome)?.ok()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tests: debounce
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn fires_only_after_quiet_period() {
        let mut debounce = SearchDebounce::new(DEFAULT_DEBOUNCE);
        debounce.input("k");
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(debounce.take_due(Instant::now()).is_none());

        debounce.input("ke");
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(debounce.take_due(Instant::now()).is_none());

        tokio::time::advance(Duration::from_millis(100)).await;
        let (query, generation) = debounce.take_due(Instant::now()).unwrap();
        assert_eq!(query, "ke");
        assert_eq!(generation, 2);
        assert!(debounce.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_query() {
        let mut debounce = SearchDebounce::new(DEFAULT_DEBOUNCE);
        let generation = debounce.input("keane");
        debounce.cancel();
        tokio::time::advance(DEFAULT_DEBOUNCE).await;
        assert!(debounce.take_due(Instant::now()).is_none());
        assert!(!debounce.is_current(generation));
    }

    // -----------------------------------------------------------------------
    // Tests: session
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn repeated_query_hits_network_once() {
        let api = catalog_api();
        let mut session = SearchSession::new(DEFAULT_DEBOUNCE, 20);

        let first = type_and_wait(&mut session, &api, "keane").await.unwrap();
        let second = type_and_wait(&mut session, &api, "keane").await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(api.call_count(|op| matches!(op, ApiOp::Search(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_query_clears_without_request() {
        let api = catalog_api();
        let mut session = SearchSession::new(DEFAULT_DEBOUNCE, 20);

        let results = type_and_wait(&mut session, &api, "   ").await.unwrap();
        assert!(results.is_empty());
        assert!(api.calls().is_empty());
        assert!(session.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn request_is_trimmed_but_cache_keeps_typed_text() {
        let api = catalog_api();
        let mut session = SearchSession::new(DEFAULT_DEBOUNCE, 20);

        type_and_wait(&mut session, &api, " mcgrath ").await.unwrap();
        assert_eq!(api.calls(), vec![ApiOp::Search("mcgrath".into())]);
        assert!(session.cache().contains(" mcgrath "));
        assert!(!session.cache().contains("mcgrath"));
    }

    #[tokio::test(start_paused = true)]
    async fn twenty_first_query_evicts_the_first() {
        let api = catalog_api();
        let mut session = SearchSession::new(DEFAULT_DEBOUNCE, 20);

        for n in 0..21 {
            type_and_wait(&mut session, &api, &format!("query {n}")).await;
        }
        assert_eq!(session.cache().len(), 20);
        assert!(!session.cache().contains("query 0"));

        type_and_wait(&mut session, &api, "query 0").await;
        assert_eq!(
            api.call_count(|op| *op == ApiOp::Search("query 0".into())),
            2
        );
        // Query 1 was the oldest survivor and is now gone too.
        assert!(!session.cache().contains("query 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_cached_but_not_shown() {
        let api = catalog_api();
        let mut session = SearchSession::new(DEFAULT_DEBOUNCE, 20);

        session.input("keane");
        tokio::time::advance(DEFAULT_DEBOUNCE).await;
        let (query, dispatch) = session.poll(Instant::now()).unwrap();
        let SearchDispatch::Fetch { generation, .. } = dispatch else {
            panic!("expected a fetch, got {dispatch:?}");
        };

        // User keeps typing before the response lands.
        session.input("keane r");
        let outcome = run_search(&api, &query).await;
        assert!(session.complete(&query, generation, outcome).is_none());
        assert!(session.cache().contains("keane"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_is_reported_and_not_cached() {
        let api = catalog_api();
        api.fail_next(
            ApiOp::Search("keane".into()),
            PipelineError::Transport("timed out".into()),
        );
        let mut session = SearchSession::new(DEFAULT_DEBOUNCE, 20);

        session.input("keane");
        tokio::time::advance(DEFAULT_DEBOUNCE).await;
        let (query, dispatch) = session.poll(Instant::now()).unwrap();
        let SearchDispatch::Fetch { generation, .. } = dispatch else {
            panic!("expected a fetch, got {dispatch:?}");
        };
        let outcome = run_search(&api, &query).await;
        let shown = session.complete(&query, generation, outcome).unwrap();
        assert!(shown.is_err());
        assert!(!session.cache().contains("keane"));
    }
}
