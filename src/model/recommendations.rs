//! Look-ahead buffer of recommendation batches

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::gateway::{RecommendationRequest, RemoteDataGateway};
use super::content::RecommendationItem;
use super::types::{RecommendationContext, RecommendationSource};

pub const RECOMMENDATIONS_ERROR: &str = "Failed to get song recommendations. Please try again.";

/// Batch size and refill threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    pub batch_size: u32,
    pub threshold: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            threshold: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BufferStatus {
    #[default]
    Idle,
    FetchingInitial,
    FetchingMore,
    Ready,
    Error,
}

impl BufferStatus {
    pub fn is_fetching(self) -> bool {
        matches!(self, BufferStatus::FetchingInitial | BufferStatus::FetchingMore)
    }
}

/// What happened to a requested fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not issued: a fetch was already in flight, or there was nothing to fetch for
    Ignored,
    /// Applied; `added` items survived deduplication
    Applied { added: usize },
    /// The backend returned no items
    Empty,
    /// The buffer was reset while the fetch was in flight
    Stale,
    Failed,
}

#[derive(Clone, Debug, Default)]
pub struct RecommendationBufferState {
    pub items: Vec<RecommendationItem>,
    pub cursor: usize,
    /// Raw count of items received since the last reset, used as the next offset
    pub total_fetched: u32,
    pub status: BufferStatus,
    pub error: Option<String>,
    pub context: Option<RecommendationContext>,
    pub generation: u64,
    received_batch: bool,
}

impl RecommendationBufferState {
    pub fn current(&self) -> Option<&RecommendationItem> {
        self.items.get(self.cursor)
    }

    pub fn fetching(&self) -> bool {
        self.status.is_fetching()
    }

    pub fn has_next(&self) -> bool {
        self.cursor + 1 < self.items.len()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    /// Items buffered after `index`
    pub fn remaining_after(&self, index: usize) -> usize {
        self.items.len().saturating_sub(index + 1)
    }

    fn apply_batch(&mut self, batch: Vec<RecommendationItem>) -> FetchOutcome {
        self.status = BufferStatus::Ready;
        self.error = None;
        if batch.is_empty() {
            return FetchOutcome::Empty;
        }

        self.total_fetched += batch.len() as u32;
        if !self.received_batch {
            self.received_batch = true;
            self.items = batch;
            return FetchOutcome::Applied { added: self.items.len() };
        }

        let fresh = unique_items(batch, &self.items);
        let added = fresh.len();
        self.items.extend(fresh);
        FetchOutcome::Applied { added }
    }
}

/// Items of `batch` whose (title, artist) is not already in `existing` or earlier in the batch
pub fn unique_items(batch: Vec<RecommendationItem>, existing: &[RecommendationItem]) -> Vec<RecommendationItem> {
    let mut seen: HashSet<(String, String)> = existing
        .iter()
        .map(identity_key)
        .collect();
    batch
        .into_iter()
        .filter(|item| seen.insert(identity_key(item)))
        .collect()
}

fn identity_key(item: &RecommendationItem) -> (String, String) {
    let (title, artist) = item.identity();
    (title.to_string(), artist.to_string())
}

/// Accumulates recommendation batches for one context and refills ahead of the cursor.
///
/// At most one fetch is in flight. A reset bumps the generation so that a
/// fetch issued before it cannot touch the new buffer.
#[derive(Clone)]
pub struct RecommendationBuffer {
    gateway: Arc<dyn RemoteDataGateway>,
    state: Arc<watch::Sender<RecommendationBufferState>>,
    config: BufferConfig,
}

impl RecommendationBuffer {
    pub fn new(gateway: Arc<dyn RemoteDataGateway>, config: BufferConfig) -> Self {
        Self {
            gateway,
            state: Arc::new(watch::Sender::new(RecommendationBufferState::default())),
            config,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RecommendationBufferState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RecommendationBufferState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<RecommendationItem> {
        self.state.borrow().current().cloned()
    }

    /// Start over for `context`, discarding everything buffered
    pub async fn reset(&self, context: RecommendationContext) -> FetchOutcome {
        let mut generation = 0;
        self.state.send_modify(|s| {
            generation = s.generation + 1;
            *s = RecommendationBufferState {
                generation,
                status: BufferStatus::FetchingInitial,
                context: Some(context.clone()),
                ..RecommendationBufferState::default()
            };
        });
        tracing::info!(
            source = %context.source.label(),
            prompt = ?context.custom_prompt,
            generation,
            "Recommendation buffer reset"
        );
        self.run_fetch(generation, context, 0, true).await
    }

    /// Request the next batch unless one is already in flight
    pub async fn fetch_more(&self, clear_cache: bool) -> FetchOutcome {
        let mut accepted = None;
        self.state.send_if_modified(|s| {
            if s.status.is_fetching() {
                return false;
            }
            let Some(context) = s.context.clone() else {
                return false;
            };
            s.status = BufferStatus::FetchingMore;
            accepted = Some((s.generation, context, s.total_fetched));
            true
        });

        let Some((generation, context, offset)) = accepted else {
            tracing::debug!("Recommendation fetch skipped");
            return FetchOutcome::Ignored;
        };
        self.run_fetch(generation, context, offset, clear_cache).await
    }

    /// Refill when `current_index` is within the threshold of the end
    pub async fn check_buffer(&self, current_index: usize) -> FetchOutcome {
        let (empty, remaining, fetching) = {
            let state = self.state.borrow();
            (
                state.items.is_empty(),
                state.remaining_after(current_index),
                state.fetching(),
            )
        };
        if empty || fetching || remaining > self.config.threshold {
            return FetchOutcome::Ignored;
        }
        tracing::debug!(current_index, remaining, "Buffer low, fetching more");
        self.fetch_more(false).await
    }

    async fn run_fetch(
        &self,
        generation: u64,
        context: RecommendationContext,
        offset: u32,
        clear_cache: bool,
    ) -> FetchOutcome {
        let request = RecommendationRequest {
            include_preview_urls: true,
            limit: self.config.batch_size,
            offset,
            clear_cache,
            custom_prompt: context.custom_prompt.clone(),
        };
        let result = match &context.source {
            RecommendationSource::Playlist { id, .. } => {
                self.gateway.get_recommendations(id, &request).await
            }
            RecommendationSource::TopTracks(range) => {
                self.gateway.get_top_track_recommendations(*range, &request).await
            }
        };

        let mut outcome = FetchOutcome::Stale;
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            outcome = match result {
                Ok(batch) => {
                    let received = batch.len();
                    let outcome = s.apply_batch(batch);
                    tracing::info!(
                        offset,
                        received,
                        buffered = s.items.len(),
                        total_fetched = s.total_fetched,
                        "Recommendation batch applied"
                    );
                    outcome
                }
                Err(e) => {
                    tracing::error!(error = %e, offset, "Failed to get recommendations");
                    s.status = BufferStatus::Error;
                    s.error = Some(RECOMMENDATIONS_ERROR.to_string());
                    FetchOutcome::Failed
                }
            };
            true
        });
        if outcome == FetchOutcome::Stale {
            tracing::debug!(generation, "Stale recommendation batch discarded");
        }
        outcome
    }

    pub fn advance(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.has_next() {
                s.cursor += 1;
                true
            } else {
                false
            }
        })
    }

    pub fn retreat(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.has_previous() {
                s.cursor -= 1;
                true
            } else {
                false
            }
        })
    }

    /// Jump to `index` if it is buffered
    pub fn set_cursor(&self, index: usize) -> bool {
        self.state.send_if_modified(|s| {
            if index < s.items.len() && index != s.cursor {
                s.cursor = index;
                true
            } else {
                false
            }
        })
    }

    /// Restart the current context under `prompt`. Blank prompts are ignored.
    pub async fn apply_prompt(&self, prompt: &str) -> FetchOutcome {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return FetchOutcome::Ignored;
        }
        let Some(context) = self.snapshot().context else {
            return FetchOutcome::Ignored;
        };
        self.reset(context.with_prompt(Some(prompt.to_string()))).await
    }

    /// Restart the current context without a custom prompt
    pub async fn clear_prompt(&self) -> FetchOutcome {
        let Some(context) = self.snapshot().context else {
            return FetchOutcome::Ignored;
        };
        self.reset(context.with_prompt(None)).await
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }
}
