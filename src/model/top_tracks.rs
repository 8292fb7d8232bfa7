//! The user's top tracks for a listening-history window

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::gateway::RemoteDataGateway;
use super::content::Track;
use super::types::TimeRange;

pub const TOP_TRACKS_LIMIT: u32 = 20;
pub const TOP_TRACKS_ERROR: &str = "Failed to load your top tracks. Please try again.";

#[derive(Clone, Debug, Default)]
pub struct TopTracksState {
    pub time_range: TimeRange,
    pub tracks: Vec<Track>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct TopTracksStore {
    gateway: Arc<dyn RemoteDataGateway>,
    state: Arc<watch::Sender<TopTracksState>>,
    generation: Arc<AtomicU64>,
}

impl TopTracksStore {
    pub fn new(gateway: Arc<dyn RemoteDataGateway>) -> Self {
        Self {
            gateway,
            state: Arc::new(watch::Sender::new(TopTracksState::default())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TopTracksState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TopTracksState {
        self.state.borrow().clone()
    }

    /// Load top tracks for `time_range`; the latest request wins
    pub async fn load(&self, time_range: TimeRange) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            if s.time_range != time_range {
                s.tracks.clear();
            }
            s.time_range = time_range;
            s.loading = true;
            s.error = None;
        });

        let result = self
            .gateway
            .list_top_tracks(time_range, TOP_TRACKS_LIMIT, 0)
            .await;

        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(tracks) => {
                    tracing::info!(range = %time_range, count = tracks.len(), "Top tracks loaded");
                    s.tracks = tracks;
                }
                Err(e) => {
                    tracing::error!(error = %e, range = %time_range, "Failed to load top tracks");
                    s.error = Some(TOP_TRACKS_ERROR.to_string());
                }
            }
        });
    }
}
