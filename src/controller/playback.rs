//! Playback control methods

use crate::model::{FetchOutcome, RecommendationSource, RECOMMENDATIONS_ERROR};
use super::AppController;

pub const SEEK_STEP_SECS: f64 = 5.0;
pub const VOLUME_STEP: f32 = 0.05;

impl AppController {
    /// Play the recommendation under the cursor from the start
    pub(crate) async fn play_current(&self) {
        let (buffer, player) = {
            let model = self.model.lock().await;
            (model.recommendations.clone(), model.player.clone())
        };
        let Some(item) = buffer.current() else {
            return;
        };
        let outcome = player.lock().await.play(&item);
        tracing::debug!(title = item.title(), ?outcome, "Play current recommendation");
        self.report_play_outcome(outcome).await;
    }

    pub async fn toggle_playback(&self) {
        let (buffer, player) = {
            let model = self.model.lock().await;
            (model.recommendations.clone(), model.player.clone())
        };
        let Some(item) = buffer.current() else {
            return;
        };
        let outcome = player.lock().await.toggle(&item);
        if let Some(outcome) = outcome {
            self.report_play_outcome(outcome).await;
        }
    }

    pub async fn next_song(&self) {
        let (buffer, player) = {
            let model = self.model.lock().await;
            (model.recommendations.clone(), model.player.clone())
        };
        if !buffer.snapshot().has_next() {
            return;
        }
        player.lock().await.stop();
        if buffer.advance() {
            self.spawn_check_buffer(buffer.snapshot().cursor);
            self.play_current().await;
        }
    }

    pub async fn previous_song(&self) {
        let (buffer, player) = {
            let model = self.model.lock().await;
            (model.recommendations.clone(), model.player.clone())
        };
        if !buffer.snapshot().has_previous() {
            return;
        }
        player.lock().await.stop();
        if buffer.retreat() {
            self.play_current().await;
        }
    }

    /// Jump straight to the recommendation at `index`
    pub async fn jump_to(&self, index: usize) {
        let (buffer, player) = {
            let model = self.model.lock().await;
            (model.recommendations.clone(), model.player.clone())
        };
        if index >= buffer.snapshot().items.len() {
            return;
        }
        player.lock().await.stop();
        buffer.set_cursor(index);
        self.spawn_check_buffer(index);
        self.play_current().await;
    }

    /// Refill the buffer in the background if `index` is close to its end
    pub(crate) fn spawn_check_buffer(&self, index: usize) {
        let controller = self.clone();
        tokio::spawn(async move {
            let buffer = controller.model.lock().await.recommendations.clone();
            if buffer.check_buffer(index).await == FetchOutcome::Failed {
                controller.report_error(RECOMMENDATIONS_ERROR).await;
            }
        });
    }

    pub async fn seek_forward(&self) {
        let player = self.model.lock().await.player.clone();
        player.lock().await.seek_by(SEEK_STEP_SECS);
    }

    pub async fn seek_backward(&self) {
        let player = self.model.lock().await.player.clone();
        player.lock().await.seek_by(-SEEK_STEP_SECS);
    }

    pub async fn volume_up(&self) {
        let player = self.model.lock().await.player.clone();
        let mut player = player.lock().await;
        let volume = player.volume();
        player.set_volume(volume + VOLUME_STEP);
        tracing::debug!(volume = player.volume(), "Volume up");
    }

    pub async fn volume_down(&self) {
        let player = self.model.lock().await.player.clone();
        let mut player = player.lock().await;
        let volume = player.volume();
        player.set_volume(volume - VOLUME_STEP);
        tracing::debug!(volume = player.volume(), "Volume down");
    }

    /// Save the current recommendation to the playlist it was generated from
    pub async fn add_current_to_playlist(&self) {
        let (buffer, gateway) = {
            let model = self.model.lock().await;
            (model.recommendations.clone(), model.gateway.clone())
        };
        let state = buffer.snapshot();
        let Some(RecommendationSource::Playlist { id, name }) = state.context.map(|c| c.source) else {
            self.report_notice("Open a playlist's recommendations to add songs to it").await;
            return;
        };
        let Some(track) = state.items.get(state.cursor).and_then(|item| item.track.clone()) else {
            self.report_notice("This song is not available in the catalog").await;
            return;
        };

        match gateway.add_track_to_playlist(&id, &track.uri).await {
            Ok(()) => {
                let playlist_name = name.unwrap_or(id);
                tracing::info!(track = %track.name, playlist = %playlist_name, "Track added to playlist");
                self.report_notice(format!(
                    "\"{}\" has been added to \"{}\"",
                    track.name, playlist_name
                ))
                .await;
            }
            Err(e) => {
                tracing::error!(error = %e, track = %track.name, "Failed to add track to playlist");
                let error_msg = Self::format_error(&anyhow::Error::new(e));
                self.report_error(error_msg).await;
            }
        }
    }
}
