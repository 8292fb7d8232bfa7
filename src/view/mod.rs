//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `layout`: Main layout structure (top bar, playlist sidebar)
//! - `content`: Recommendation carousel
//! - `progress`: Progress bar rendering
//! - `overlays`: Modal overlays (error, notice, help)

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

pub use utils::format_time;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{PlaybackState, PlaylistState, RecommendationBufferState, TopTracksState, UiState};

pub struct AppView;

impl AppView {
    pub fn render(
        frame: &mut Frame,
        playback: &PlaybackState,
        ui_state: &UiState,
        playlists: &PlaylistState,
        recommendations: &RecommendationBufferState,
        top_tracks: &TopTracksState,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search bar + prompt
                Constraint::Min(0),    // Main content (sidebar + carousel)
                Constraint::Length(3), // Progress bar with playback info
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], ui_state);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(35), // Playlists + top tracks
                Constraint::Percentage(65), // Recommendations
            ])
            .split(chunks[1]);

        layout::render_sidebar(frame, main_chunks[0], ui_state, playlists, top_tracks);
        content::render_recommendations(frame, main_chunks[1], ui_state, recommendations, playback);

        progress::render_progress_bar(frame, chunks[2], playback, recommendations);

        if ui_state.notice.is_some() {
            overlays::render_notice(frame, ui_state);
        }

        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }
    }
}
