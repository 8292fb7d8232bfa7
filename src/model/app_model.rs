//! Main application model with state management

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;

use crate::audio::{AudioOutput, PlayerMessage};
use crate::config::AppConfig;
use crate::gateway::RemoteDataGateway;
use super::content::Playlist;
use super::playback::AudioPlaybackController;
use super::playlist_store::PlaylistStore;
use super::recommendations::RecommendationBuffer;
use super::top_tracks::TopTracksStore;
use super::types::{ActiveSection, TimeRange, UiState};

/// Errors and notices disappear after this long
pub const MESSAGE_TTL: Duration = Duration::from_secs(5);

/// Main application model containing all state
pub struct AppModel {
    pub gateway: Arc<dyn RemoteDataGateway>,
    pub playlists: PlaylistStore,
    pub top_tracks: TopTracksStore,
    pub recommendations: RecommendationBuffer,
    pub player: Arc<Mutex<AudioPlaybackController>>,
    pub ui_state: Arc<Mutex<UiState>>,
    pub should_quit: Arc<Mutex<bool>>,
}

impl AppModel {
    /// Build the stores for one session. The receiver feeds the player event listener.
    pub fn new(
        gateway: Arc<dyn RemoteDataGateway>,
        output: Arc<dyn AudioOutput>,
        config: &AppConfig,
    ) -> (Self, UnboundedReceiver<PlayerMessage>) {
        let (player, player_events) = AudioPlaybackController::new(output, config.volume);
        let model = Self {
            playlists: PlaylistStore::new(gateway.clone(), config.page_size),
            top_tracks: TopTracksStore::new(gateway.clone()),
            recommendations: RecommendationBuffer::new(gateway.clone(), config.buffer_config()),
            gateway,
            player: Arc::new(Mutex::new(player)),
            ui_state: Arc::new(Mutex::new(UiState::default())),
            should_quit: Arc::new(Mutex::new(false)),
        };
        (model, player_events)
    }

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    pub async fn get_ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    pub async fn cycle_section_forward(&self) {
        let mut state = self.ui_state.lock().await;
        state.active_section = state.active_section.next();
    }

    pub async fn cycle_section_backward(&self) {
        let mut state = self.ui_state.lock().await;
        state.active_section = state.active_section.prev();
    }

    pub async fn set_active_section(&self, section: ActiveSection) {
        let mut state = self.ui_state.lock().await;
        state.active_section = section;
    }

    pub async fn move_selection_up(&self) {
        let mut state = self.ui_state.lock().await;
        if state.playlist_selected > 0 {
            state.playlist_selected -= 1;
        }
    }

    pub async fn move_selection_down(&self) {
        let shown = self.playlists.snapshot().displayed().len();
        let mut state = self.ui_state.lock().await;
        if state.playlist_selected < shown.saturating_sub(1) {
            state.playlist_selected += 1;
        }
    }

    /// Keep the selection inside the list after it changed
    pub async fn clamp_playlist_selection(&self) {
        let shown = self.playlists.snapshot().displayed().len();
        let mut state = self.ui_state.lock().await;
        state.playlist_selected = state.playlist_selected.min(shown.saturating_sub(1));
    }

    pub async fn reset_playlist_selection(&self) {
        self.ui_state.lock().await.playlist_selected = 0;
    }

    pub async fn get_selected_playlist(&self) -> Option<Playlist> {
        let index = self.ui_state.lock().await.playlist_selected;
        self.playlists.snapshot().displayed().get(index).cloned()
    }

    pub async fn append_to_search(&self, c: char) {
        let query = {
            let mut state = self.ui_state.lock().await;
            state.search_input.push(c);
            state.playlist_selected = 0;
            state.search_input.clone()
        };
        self.playlists.set_query(&query);
    }

    pub async fn backspace_search(&self) {
        let query = {
            let mut state = self.ui_state.lock().await;
            state.search_input.pop();
            state.playlist_selected = 0;
            state.search_input.clone()
        };
        self.playlists.set_query(&query);
    }

    pub async fn clear_search_input(&self) {
        {
            let mut state = self.ui_state.lock().await;
            state.search_input.clear();
            state.playlist_selected = 0;
        }
        self.playlists.clear_search().await;
    }

    pub async fn start_prompt_edit(&self) {
        let mut state = self.ui_state.lock().await;
        state.editing_prompt = true;
    }

    pub async fn append_to_prompt(&self, c: char) {
        self.ui_state.lock().await.prompt_input.push(c);
    }

    pub async fn backspace_prompt(&self) {
        self.ui_state.lock().await.prompt_input.pop();
    }

    /// Leave prompt editing, returning what was typed
    pub async fn finish_prompt_edit(&self) -> String {
        let mut state = self.ui_state.lock().await;
        state.editing_prompt = false;
        state.prompt_input.clone()
    }

    pub async fn cancel_prompt_edit(&self) {
        let mut state = self.ui_state.lock().await;
        state.editing_prompt = false;
    }

    pub async fn clear_prompt_input(&self) {
        let mut state = self.ui_state.lock().await;
        state.prompt_input.clear();
        state.editing_prompt = false;
    }

    pub async fn is_editing_prompt(&self) -> bool {
        self.ui_state.lock().await.editing_prompt
    }

    pub async fn cycle_top_tracks_range(&self) -> TimeRange {
        let mut state = self.ui_state.lock().await;
        state.top_tracks_range = state.top_tracks_range.next();
        state.top_tracks_range
    }

    pub async fn set_error(&self, message: String) {
        let mut state = self.ui_state.lock().await;
        state.error_message = Some(message);
        state.error_timestamp = Some(Instant::now());
    }

    pub async fn clear_error(&self) {
        let mut state = self.ui_state.lock().await;
        state.error_message = None;
        state.error_timestamp = None;
    }

    pub async fn has_error(&self) -> bool {
        self.ui_state.lock().await.error_message.is_some()
    }

    pub async fn set_notice(&self, message: String) {
        let mut state = self.ui_state.lock().await;
        state.notice = Some(message);
        state.notice_timestamp = Some(Instant::now());
    }

    /// Drop errors and notices older than [`MESSAGE_TTL`]
    pub async fn auto_clear_old_messages(&self) {
        let mut state = self.ui_state.lock().await;
        if state.error_timestamp.is_some_and(|t| t.elapsed() > MESSAGE_TTL) {
            state.error_message = None;
            state.error_timestamp = None;
        }
        if state.notice_timestamp.is_some_and(|t| t.elapsed() > MESSAGE_TTL) {
            state.notice = None;
            state.notice_timestamp = None;
        }
    }

    pub async fn show_help_popup(&self) {
        let mut state = self.ui_state.lock().await;
        state.show_help_popup = true;
    }

    pub async fn hide_help_popup(&self) {
        let mut state = self.ui_state.lock().await;
        state.show_help_popup = false;
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }
}
