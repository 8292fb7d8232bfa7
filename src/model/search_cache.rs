//! Full-collection playlist cache backing the search overlay

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::GatewayResult;
use crate::gateway::RemoteDataGateway;
use super::content::Playlist;

/// Largest page the listing endpoint serves
pub const PREFETCH_BATCH_SIZE: u32 = 50;

type Prefetch = Shared<BoxFuture<'static, GatewayResult<Arc<Vec<Playlist>>>>>;

/// Read-only view of the cache
#[derive(Clone, Debug, Default)]
pub struct AllPlaylistsCache {
    pub items: Arc<Vec<Playlist>>,
    pub fetched: bool,
    pub fetching: bool,
}

#[derive(Default)]
struct CacheInner {
    items: Arc<Vec<Playlist>>,
    fetched: bool,
    in_flight: Option<Prefetch>,
    generation: u64,
}

/// Lazily fetches every playlist once, then answers searches from memory.
///
/// At most one prefetch runs at a time; concurrent searches await the same one.
#[derive(Clone)]
pub struct SearchOverlayCache {
    gateway: Arc<dyn RemoteDataGateway>,
    inner: Arc<Mutex<CacheInner>>,
}

impl SearchOverlayCache {
    pub fn new(gateway: Arc<dyn RemoteDataGateway>) -> Self {
        Self {
            gateway,
            inner: Arc::new(Mutex::new(CacheInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> AllPlaylistsCache {
        let inner = self.lock();
        AllPlaylistsCache {
            items: inner.items.clone(),
            fetched: inner.fetched,
            fetching: inner.in_flight.is_some(),
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.lock().fetched
    }

    pub fn is_fetching(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Every playlist, fetching them on first use
    pub async fn load_all(&self) -> GatewayResult<Arc<Vec<Playlist>>> {
        let prefetch = {
            let mut inner = self.lock();
            if inner.fetched {
                return Ok(inner.items.clone());
            }
            match &inner.in_flight {
                Some(prefetch) => {
                    tracing::debug!("Prefetch already in flight, awaiting it");
                    prefetch.clone()
                }
                None => {
                    let prefetch = prefetch_all(self.gateway.clone(), self.inner.clone(), inner.generation)
                        .boxed()
                        .shared();
                    inner.in_flight = Some(prefetch.clone());

                    // Drive to completion even if every searcher gives up
                    let driver = prefetch.clone();
                    tokio::spawn(async move {
                        let _ = driver.await;
                    });
                    prefetch
                }
            }
        };
        prefetch.await
    }

    /// Playlists whose name or description contains `query`
    pub async fn search(&self, query: &str) -> GatewayResult<Vec<Playlist>> {
        let all = self.load_all().await?;
        Ok(filter_playlists(&all, query))
    }

    /// Forget everything fetched. A prefetch still in flight will not commit.
    pub fn clear_cache(&self) {
        let mut inner = self.lock();
        inner.items = Arc::new(Vec::new());
        inner.fetched = false;
        inner.in_flight = None;
        inner.generation += 1;
        tracing::debug!(generation = inner.generation, "Playlist cache cleared");
    }
}

async fn prefetch_all(
    gateway: Arc<dyn RemoteDataGateway>,
    inner: Arc<Mutex<CacheInner>>,
    generation: u64,
) -> GatewayResult<Arc<Vec<Playlist>>> {
    let total = match gateway.list_playlists(1, 0).await {
        Ok(probe) => probe.total,
        Err(e) => {
            tracing::error!(error = %e, "Failed to discover playlist count");
            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.generation == generation {
                inner.in_flight = None;
            }
            return Err(e);
        }
    };

    let batch_count = total.div_ceil(PREFETCH_BATCH_SIZE);
    tracing::info!(total, batch_count, "Prefetching all playlists");

    let requests = (0..batch_count).map(|batch| {
        let gateway = gateway.clone();
        async move {
            let offset = batch * PREFETCH_BATCH_SIZE;
            match gateway.list_playlists(PREFETCH_BATCH_SIZE, offset).await {
                Ok(page) => page.items,
                Err(e) => {
                    tracing::warn!(batch, offset, error = %e, "Playlist batch failed, skipping it");
                    Vec::new()
                }
            }
        }
    });
    let batches = futures::future::join_all(requests).await;
    let merged = Arc::new(merge_playlists(batches));

    let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
    if inner.generation == generation {
        inner.items = merged.clone();
        inner.fetched = true;
        inner.in_flight = None;
        tracing::info!(count = merged.len(), "All playlists cached");
    } else {
        tracing::debug!("Cache cleared during prefetch, discarding result");
    }
    Ok(merged)
}

/// Concatenate batches in order, keep the first playlist per id, sort by name
pub fn merge_playlists(batches: Vec<Vec<Playlist>>) -> Vec<Playlist> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Playlist> = batches
        .into_iter()
        .flatten()
        .filter(|p| seen.insert(p.id.clone()))
        .collect();
    merged.sort_by(|a, b| compare_names(&a.name, &b.name));
    merged
}

/// Case-insensitive ordering; on a tie lowercase sorts first
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

pub fn filter_playlists(playlists: &[Playlist], query: &str) -> Vec<Playlist> {
    let normalized = query.trim().to_lowercase();
    playlists
        .iter()
        .filter(|p| p.matches(&normalized))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::content::{PlaylistOwner, PlaylistTracksRef};

    fn playlist(id: &str, name: &str) -> Playlist {
        Playlist {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            images: vec![],
            owner: PlaylistOwner::default(),
            tracks: PlaylistTracksRef::default(),
            public: Some(true),
            collaborative: false,
            uri: format!("spotify:playlist:{}", id),
        }
    }

    #[test]
    fn merge_keeps_first_occurrence_per_id() {
        let mut first = playlist("1", "Zebra");
        first.description = Some("first".into());
        let mut dup = playlist("1", "Zebra");
        dup.description = Some("second".into());

        let merged = merge_playlists(vec![
            vec![first, playlist("2", "apple")],
            vec![dup, playlist("3", "Mango")],
        ]);

        let ids: Vec<_> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        assert_eq!(merged[2].description.as_deref(), Some("first"));
    }

    #[test]
    fn names_sort_case_insensitively() {
        let mut names = vec!["beta", "Alpha", "alpha", "Gamma"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["alpha", "Alpha", "beta", "Gamma"]);
    }

    #[test]
    fn filter_trims_query() {
        let playlists = vec![playlist("1", "Chill Vibes"), playlist("2", "Rock Anthems")];
        let found = filter_playlists(&playlists, "  VIBES ");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
    }
}
