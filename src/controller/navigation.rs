//! Navigation-related controller methods (playlists, search, recommendation contexts)

use crate::model::{
    ActiveSection, FetchOutcome, RecommendationContext, RecommendationSource, RECOMMENDATIONS_ERROR,
};
use super::AppController;

impl AppController {
    pub async fn load_user_playlists(&self) {
        let playlists = self.model.lock().await.playlists.clone();
        playlists.load_initial().await;
        if let Some(error) = playlists.snapshot().error {
            self.report_error(error).await;
        }
    }

    pub async fn next_page(&self) {
        let playlists = self.model.lock().await.playlists.clone();
        playlists.next_page().await;
        self.after_page_change().await;
    }

    pub async fn previous_page(&self) {
        let playlists = self.model.lock().await.playlists.clone();
        playlists.previous_page().await;
        self.after_page_change().await;
    }

    async fn after_page_change(&self) {
        let model = self.model.lock().await;
        model.reset_playlist_selection().await;
        if let Some(error) = model.playlists.snapshot().error {
            model.set_error(error).await;
        }
    }

    /// Forget the search cache and reload the current page
    pub async fn refresh_playlists(&self) {
        let playlists = self.model.lock().await.playlists.clone();
        playlists.clear_cache();
        let pagination = playlists.snapshot().pagination;
        playlists.fetch_page(pagination.limit, pagination.offset).await;
        let model = self.model.lock().await;
        model.clamp_playlist_selection().await;
        if let Some(error) = model.playlists.snapshot().error {
            model.set_error(error).await;
        }
    }

    pub async fn open_selected_playlist(&self) {
        let (playlist, prompt) = {
            let model = self.model.lock().await;
            let prompt = model.get_ui_state().await.prompt_input;
            (model.get_selected_playlist().await, prompt)
        };
        let Some(playlist) = playlist else {
            return;
        };
        tracing::info!(playlist_id = %playlist.id, name = %playlist.name, "Opening recommendations");
        let context = RecommendationContext::new(RecommendationSource::Playlist {
            id: playlist.id,
            name: Some(playlist.name),
        })
        .with_prompt(Some(prompt));
        self.start_recommendations(context).await;
    }

    /// Recommendations seeded from the user's top tracks in the selected range
    pub async fn open_top_track_recommendations(&self) {
        let (range, prompt, top_tracks) = {
            let model = self.model.lock().await;
            let ui_state = model.get_ui_state().await;
            (ui_state.top_tracks_range, ui_state.prompt_input, model.top_tracks.clone())
        };
        tokio::spawn(async move {
            top_tracks.load(range).await;
        });
        let context = RecommendationContext::new(RecommendationSource::TopTracks(range))
            .with_prompt(Some(prompt));
        self.start_recommendations(context).await;
    }

    /// Switch to the next time range; restarts top-track recommendations if they are showing
    pub async fn cycle_top_tracks_range(&self) {
        let (range, current) = {
            let model = self.model.lock().await;
            let range = model.cycle_top_tracks_range().await;
            (range, model.recommendations.snapshot().context)
        };
        tracing::debug!(range = %range, "Top tracks range changed");
        if let Some(context) = current {
            if matches!(context.source, RecommendationSource::TopTracks(_)) {
                let context = RecommendationContext::new(RecommendationSource::TopTracks(range))
                    .with_prompt(context.custom_prompt);
                self.open_context(context).await;
            }
        }
    }

    pub async fn start_recommendations(&self, context: RecommendationContext) {
        {
            let model = self.model.lock().await;
            model.set_active_section(ActiveSection::Recommendations).await;
        }
        self.open_context(context).await;
    }

    async fn open_context(&self, context: RecommendationContext) {
        let (buffer, player) = {
            let model = self.model.lock().await;
            (model.recommendations.clone(), model.player.clone())
        };
        player.lock().await.stop();
        let outcome = buffer.reset(context).await;
        self.after_reset(outcome).await;
    }

    async fn after_reset(&self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Applied { .. } => self.play_current().await,
            FetchOutcome::Failed => self.report_error(RECOMMENDATIONS_ERROR).await,
            _ => {}
        }
    }

    /// Restart the current recommendations under the typed prompt
    pub async fn apply_prompt(&self) {
        let (prompt, buffer, player) = {
            let model = self.model.lock().await;
            (
                model.finish_prompt_edit().await,
                model.recommendations.clone(),
                model.player.clone(),
            )
        };
        if prompt.trim().is_empty() || buffer.snapshot().context.is_none() {
            return;
        }
        player.lock().await.stop();
        let outcome = buffer.apply_prompt(&prompt).await;
        self.after_reset(outcome).await;
    }

    pub async fn clear_prompt(&self) {
        let (buffer, player) = {
            let model = self.model.lock().await;
            model.clear_prompt_input().await;
            (model.recommendations.clone(), model.player.clone())
        };
        let had_prompt = buffer
            .snapshot()
            .context
            .is_some_and(|c| c.custom_prompt.is_some());
        if !had_prompt {
            return;
        }
        player.lock().await.stop();
        let outcome = buffer.clear_prompt().await;
        self.after_reset(outcome).await;
    }
}
