//! Player event listener for preview playback

use tokio::sync::mpsc::UnboundedReceiver;

use crate::audio::PlayerMessage;
use crate::model::{advance_and_play, PlaybackEvent};
use super::{AppController, UNPLAYABLE_NOTICE};

impl AppController {
    /// Feed audio events and progress ticks to the player; chain to the next
    /// recommendation when a preview ends.
    pub fn start_player_event_listener(&self, mut events: UnboundedReceiver<PlayerMessage>) {
        let controller = self.clone();
        tracing::info!("Starting player event listener");

        tokio::spawn(async move {
            while let Some(message) = events.recv().await {
                let (player, buffer) = {
                    let model = controller.model.lock().await;
                    if model.should_quit().await {
                        tracing::debug!("Player event listener shutting down");
                        break;
                    }
                    (model.player.clone(), model.recommendations.clone())
                };

                let mut player = player.lock().await;
                match player.handle_message(message) {
                    PlaybackEvent::TrackEnded => {
                        let advanced = advance_and_play(&mut player, &buffer);
                        drop(player);
                        match advanced {
                            Some((cursor, outcome)) => {
                                tracing::info!(cursor, ?outcome, "Auto-advanced to next recommendation");
                                controller.spawn_check_buffer(cursor);
                                controller.report_play_outcome(outcome).await;
                            }
                            None => tracing::debug!("Reached the end of the recommendations"),
                        }
                    }
                    PlaybackEvent::FallbackStarted { index } => {
                        tracing::info!(index, "Switched to fallback preview URL");
                    }
                    PlaybackEvent::Unplayable => {
                        drop(player);
                        controller.report_notice(UNPLAYABLE_NOTICE).await;
                    }
                    PlaybackEvent::MetadataLoaded => {
                        tracing::trace!("Preview metadata loaded");
                    }
                    PlaybackEvent::Progress | PlaybackEvent::Ignored => {}
                }
            }
        });
    }
}
