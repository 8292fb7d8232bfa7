//! Paginated playlist listing with the search overlay on top

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::gateway::RemoteDataGateway;
use super::content::{Playlist, PlaylistCollection};
use super::debounce::Debouncer;
use super::search_cache::SearchOverlayCache;
use super::types::{PaginationState, SearchState};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const PLAYLISTS_ERROR: &str = "Failed to load Spotify playlists. Please try again.";

/// Everything the playlist list renders from
#[derive(Clone, Debug)]
pub struct PlaylistState {
    /// Current server page window
    pub page: Vec<Playlist>,
    pub pagination: PaginationState,
    pub search: SearchState,
    /// Every cached playlist matching the active query
    pub filtered: Vec<Playlist>,
    pub search_pagination: PaginationState,
    pub loading: bool,
    pub error: Option<String>,
}

impl PlaylistState {
    fn new(limit: u32) -> Self {
        Self {
            page: Vec::new(),
            pagination: PaginationState::new(limit),
            search: SearchState::default(),
            filtered: Vec::new(),
            search_pagination: PaginationState::new(limit),
            loading: false,
            error: None,
        }
    }

    /// The playlists to show: the filtered slice while searching, the server page otherwise
    pub fn displayed(&self) -> &[Playlist] {
        if !self.search.active {
            return &self.page;
        }
        let len = self.filtered.len();
        let start = (self.search_pagination.offset as usize).min(len);
        let end = start
            .saturating_add(self.search_pagination.limit as usize)
            .min(len);
        &self.filtered[start..end]
    }

    pub fn active_pagination(&self) -> PaginationState {
        if self.search.active {
            self.search_pagination
        } else {
            self.pagination
        }
    }

    fn apply_page(&mut self, collection: PlaylistCollection) {
        self.pagination = PaginationState {
            offset: collection.offset,
            limit: collection.limit,
            total: collection.total,
            has_next: collection.has_next(),
            has_previous: collection.has_previous(),
        };
        self.page = collection.items;
        self.error = None;
    }
}

/// Owns the playlist page window and answers searches from the overlay cache.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct PlaylistStore {
    gateway: Arc<dyn RemoteDataGateway>,
    state: Arc<watch::Sender<PlaylistState>>,
    overlay: SearchOverlayCache,
    debouncer: Arc<Debouncer>,
    page_size: u32,
    last_query: Arc<Mutex<Option<String>>>,
    page_generation: Arc<AtomicU64>,
    query_generation: Arc<AtomicU64>,
}

impl PlaylistStore {
    pub fn new(gateway: Arc<dyn RemoteDataGateway>, page_size: u32) -> Self {
        Self::with_debounce(gateway, page_size, SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(gateway: Arc<dyn RemoteDataGateway>, page_size: u32, delay: Duration) -> Self {
        let page_size = page_size.max(1);
        Self {
            overlay: SearchOverlayCache::new(gateway.clone()),
            gateway,
            state: Arc::new(watch::Sender::new(PlaylistState::new(page_size))),
            debouncer: Arc::new(Debouncer::new(delay)),
            page_size,
            last_query: Arc::new(Mutex::new(None)),
            page_generation: Arc::new(AtomicU64::new(0)),
            query_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaylistState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PlaylistState {
        self.state.borrow().clone()
    }

    pub fn overlay(&self) -> &SearchOverlayCache {
        &self.overlay
    }

    /// Load the first page
    pub async fn load_initial(&self) {
        self.fetch_page(self.page_size, 0).await;
    }

    /// Replace the page window with the page at `offset`.
    ///
    /// If another page request is issued before this one completes, this
    /// one's result is dropped.
    pub async fn fetch_page(&self, limit: u32, offset: u32) {
        let generation = self.page_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| s.loading = true);
        tracing::debug!(limit, offset, "Fetching playlist page");

        let result = self.gateway.list_playlists(limit, offset).await;

        if self.page_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(offset, "Superseded playlist page discarded");
            return;
        }

        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(collection) => {
                    tracing::info!(
                        offset = collection.offset,
                        count = collection.items.len(),
                        total = collection.total,
                        "Playlist page loaded"
                    );
                    s.apply_page(collection);
                }
                Err(e) => {
                    tracing::error!(error = %e, offset, "Failed to load playlist page");
                    s.error = Some(PLAYLISTS_ERROR.to_string());
                }
            }
        });
    }

    pub async fn next_page(&self) {
        let state = self.snapshot();
        if state.search.active {
            let current = state.search_pagination;
            let offset = current.offset.saturating_add(current.limit);
            if offset as usize >= state.filtered.len() {
                return;
            }
            self.state.send_modify(|s| {
                s.search_pagination = PaginationState::local(offset, current.limit, s.filtered.len());
            });
            return;
        }

        let current = state.pagination;
        if !current.has_next {
            tracing::debug!("No next page");
            return;
        }
        self.fetch_page(current.limit, current.offset.saturating_add(current.limit))
            .await;
    }

    pub async fn previous_page(&self) {
        let state = self.snapshot();
        if state.search.active {
            let current = state.search_pagination;
            if current.offset == 0 {
                return;
            }
            let offset = current.offset.saturating_sub(current.limit);
            self.state.send_modify(|s| {
                s.search_pagination = PaginationState::local(offset, current.limit, s.filtered.len());
            });
            return;
        }

        let current = state.pagination;
        if !current.has_previous {
            tracing::debug!("No previous page");
            return;
        }
        self.fetch_page(current.limit, current.offset.saturating_sub(current.limit))
            .await;
    }

    /// Debounced search input. Repeating the last applied value does nothing.
    pub fn set_query(&self, query: &str) {
        let store = self.clone();
        let query = query.to_string();
        self.debouncer.schedule(async move {
            store.apply_distinct(query).await;
        });
    }

    /// Drop any pending input and leave search mode now
    pub async fn clear_search(&self) {
        self.debouncer.cancel();
        self.apply_distinct(String::new()).await;
    }

    async fn apply_distinct(&self, query: String) {
        {
            let mut last = self.last_query.lock().unwrap_or_else(PoisonError::into_inner);
            if last.as_deref() == Some(query.as_str()) {
                return;
            }
            *last = Some(query.clone());
        }
        self.apply_query(&query).await;
    }

    /// Enter search mode for `query`, or leave it when the query is blank.
    pub async fn apply_query(&self, query: &str) {
        let generation = self.query_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let search = SearchState::from_query(query);
        let limit = self.page_size;

        if !search.active {
            self.state.send_modify(|s| {
                s.search = search;
                s.filtered.clear();
                s.search_pagination = PaginationState::new(limit);
                s.loading = false;
            });
            return;
        }

        let needs_prefetch = !self.overlay.is_fetched();
        self.state.send_modify(|s| {
            s.search = search;
            if needs_prefetch {
                s.loading = true;
            }
        });
        tracing::debug!(query, needs_prefetch, "Applying search");

        let result = self.overlay.search(query).await;

        if self.query_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(query, "Superseded search discarded");
            return;
        }

        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(filtered) => {
                    tracing::info!(query, matches = filtered.len(), "Search applied");
                    s.search_pagination = PaginationState::local(0, limit, filtered.len());
                    s.filtered = filtered;
                    s.error = None;
                }
                Err(e) => {
                    tracing::error!(error = %e, query, "Search prefetch failed");
                    s.error = Some(PLAYLISTS_ERROR.to_string());
                }
            }
        });
    }

    pub fn clear_cache(&self) {
        self.overlay.clear_cache();
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::content::{PlaylistOwner, PlaylistTracksRef};

    fn playlist(id: u32) -> Playlist {
        Playlist {
            id: id.to_string(),
            name: format!("Playlist {}", id),
            description: None,
            images: vec![],
            owner: PlaylistOwner::default(),
            tracks: PlaylistTracksRef::default(),
            public: None,
            collaborative: false,
            uri: String::new(),
        }
    }

    #[test]
    fn displayed_slices_filtered_results_while_searching() {
        let mut state = PlaylistState::new(2);
        state.page = vec![playlist(100)];
        state.filtered = (0..5).map(playlist).collect();
        assert_eq!(state.displayed().len(), 1);

        state.search = SearchState::from_query("p");
        state.search_pagination = PaginationState::local(4, 2, 5);
        let shown: Vec<_> = state.displayed().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(shown, vec!["4"]);
        assert!(!state.active_pagination().has_next);
    }

    #[test]
    fn displayed_tolerates_offset_past_end() {
        let mut state = PlaylistState::new(2);
        state.search = SearchState::from_query("p");
        state.search_pagination = PaginationState::local(10, 2, 3);
        state.filtered = (0..3).map(playlist).collect();
        assert!(state.displayed().is_empty());
    }
}
