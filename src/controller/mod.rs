//! Controller module - Application logic and event handling
//!
//! This module contains the application controller that handles user input,
//! coordinates between the stores and the view, and drives preview playback.
//! It is organized into submodules by responsibility:
//!
//! - `input`: Key event handling
//! - `playback`: Preview playback and recommendation cursor control
//! - `navigation`: Playlist paging, search and recommendation contexts
//! - `player_events`: Audio event listener with auto-advance

mod input;
mod playback;
mod navigation;
mod player_events;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::GatewayError;
use crate::model::{AppModel, PlayOutcome};

pub const NO_PREVIEW_NOTICE: &str = "No preview available for this song";
pub const UNPLAYABLE_NOTICE: &str = "Preview unavailable for this song";

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<Mutex<AppModel>>,
}

impl AppController {
    pub fn new(model: Arc<Mutex<AppModel>>) -> Self {
        Self { model }
    }

    pub(crate) fn format_error(error: &anyhow::Error) -> String {
        let status = error
            .downcast_ref::<GatewayError>()
            .and_then(GatewayError::status_code);

        match status {
            Some(401) => "Session expired. Please restart the app.".to_string(),
            Some(403) => "Action forbidden. You may not own this playlist.".to_string(),
            Some(404) => "Not found. The playlist may have been removed.".to_string(),
            Some(429) => "Rate limited. Please wait a moment.".to_string(),
            _ => format!("Error: {}", error),
        }
    }

    pub(crate) async fn report_error(&self, message: impl Into<String>) {
        let model = self.model.lock().await;
        model.set_error(message.into()).await;
    }

    pub(crate) async fn report_notice(&self, message: impl Into<String>) {
        let model = self.model.lock().await;
        model.set_notice(message.into()).await;
    }

    /// Tell the user when a play request could not start
    pub(crate) async fn report_play_outcome(&self, outcome: PlayOutcome) {
        match outcome {
            PlayOutcome::Started => {}
            PlayOutcome::NoPreview => self.report_notice(NO_PREVIEW_NOTICE).await,
            PlayOutcome::Unplayable => self.report_notice(UNPLAYABLE_NOTICE).await,
        }
    }
}
