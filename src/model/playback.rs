//! Preview playback state and the controller that owns the audio resource

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::audio::{AudioEvent, AudioHandle, AudioOutput, PlayerMessage};
use super::content::RecommendationItem;
use super::recommendations::RecommendationBuffer;

pub const TICK_INTERVAL: Duration = Duration::from_millis(100);
/// Preview clips are 30 seconds unless the resource says otherwise
pub const DEFAULT_DURATION: f64 = 30.0;
pub const DEFAULT_VOLUME: f32 = 0.7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Empty,
    Loading,
    Playing,
    Paused,
    Ended,
    /// Every preview URL of the current item failed
    Error,
}

/// Playback information for rendering
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub playing_url: Option<String>,
    pub volume: f32,
    /// Seconds
    pub current_time: f64,
    pub duration: f64,
    pub progress_ticking: bool,
}

impl PlaybackState {
    fn new(volume: f32) -> Self {
        Self {
            status: PlaybackStatus::Empty,
            playing_url: None,
            volume,
            current_time: 0.0,
            duration: DEFAULT_DURATION,
            progress_ticking: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    /// Progress through the clip in [0, 1]
    pub fn ratio(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// The item carries no preview URL
    NoPreview,
    /// Every preview URL failed, now or earlier this session
    Unplayable,
}

/// What a player message meant for the consumer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Stale or uninteresting
    Ignored,
    Progress,
    MetadataLoaded,
    /// The previous URL failed; playback moved to the URL at this index
    FallbackStarted { index: usize },
    Unplayable,
    /// Finished naturally; the consumer decides whether to advance
    TrackEnded,
}

/// Plays one recommendation at a time, walking its preview URLs on failure.
///
/// At most one audio handle is alive. Messages from released handles are ignored.
pub struct AudioPlaybackController {
    output: Arc<dyn AudioOutput>,
    events: UnboundedSender<PlayerMessage>,
    state: watch::Sender<PlaybackState>,
    handle: Option<Box<dyn AudioHandle>>,
    handle_id: Option<u64>,
    last_handle_id: u64,
    item: Option<RecommendationItem>,
    url_index: usize,
    unplayable: HashSet<(String, String)>,
    ticker: Option<JoinHandle<()>>,
}

impl AudioPlaybackController {
    /// The receiver carries audio events and progress ticks; feed each one to
    /// [`AudioPlaybackController::handle_message`].
    pub fn new(output: Arc<dyn AudioOutput>, volume: f32) -> (Self, UnboundedReceiver<PlayerMessage>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            output,
            events,
            state: watch::Sender::new(PlaybackState::new(volume.clamp(0.0, 1.0))),
            handle: None,
            handle_id: None,
            last_handle_id: 0,
            item: None,
            url_index: 0,
            unplayable: HashSet::new(),
            ticker: None,
        };
        (controller, receiver)
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    pub fn has_resource(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_unplayable(&self, item: &RecommendationItem) -> bool {
        self.unplayable.contains(&identity_key(item))
    }

    /// Play `item` from its first preview URL, releasing whatever was loaded
    pub fn play(&mut self, item: &RecommendationItem) -> PlayOutcome {
        self.release_resource();
        self.item = Some(item.clone());

        if !item.has_preview() {
            tracing::info!(title = item.title(), "No preview available");
            self.state.send_modify(|s| {
                s.status = PlaybackStatus::Empty;
                s.playing_url = None;
                s.current_time = 0.0;
                s.duration = DEFAULT_DURATION;
            });
            return PlayOutcome::NoPreview;
        }
        if self.is_unplayable(item) {
            tracing::debug!(title = item.title(), "Skipping unplayable preview");
            self.state.send_modify(|s| {
                s.status = PlaybackStatus::Error;
                s.playing_url = None;
            });
            return PlayOutcome::Unplayable;
        }

        match self.start_from(0) {
            Some(_) => PlayOutcome::Started,
            None => {
                self.mark_unplayable();
                PlayOutcome::Unplayable
            }
        }
    }

    /// Load URLs from `first` onward until one starts
    fn start_from(&mut self, first: usize) -> Option<usize> {
        let urls = self
            .item
            .as_ref()
            .map(|item| item.preview_urls.clone())
            .unwrap_or_default();
        let volume = self.volume();

        for (index, url) in urls.iter().enumerate().skip(first) {
            self.release_resource();
            self.last_handle_id += 1;
            let id = self.last_handle_id;

            let mut handle = self.output.load(url, id, self.events.clone());
            handle.set_volume(volume);
            self.state.send_modify(|s| {
                s.status = PlaybackStatus::Loading;
                s.playing_url = Some(url.clone());
                s.current_time = 0.0;
                s.duration = DEFAULT_DURATION;
            });

            match handle.play() {
                Ok(()) => {
                    tracing::info!(url, index, handle = id, "Preview playing");
                    self.handle = Some(handle);
                    self.handle_id = Some(id);
                    self.url_index = index;
                    self.state.send_modify(|s| s.status = PlaybackStatus::Playing);
                    self.start_ticker(id);
                    return Some(index);
                }
                Err(e) => {
                    tracing::warn!(url, index, error = %e, "Preview failed to start");
                }
            }
        }
        None
    }

    fn mark_unplayable(&mut self) {
        self.release_resource();
        if let Some(item) = &self.item {
            tracing::warn!(title = item.title(), "All preview URLs failed");
            self.unplayable.insert(identity_key(item));
        }
        self.state.send_modify(|s| {
            s.status = PlaybackStatus::Error;
            s.playing_url = None;
        });
    }

    pub fn pause(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        handle.pause();
        let position = handle.current_time();
        self.stop_ticker();
        self.state.send_modify(|s| {
            s.status = PlaybackStatus::Paused;
            s.current_time = position;
        });
    }

    /// Continue `item` in place if it is the one loaded, otherwise play it
    pub fn resume(&mut self, item: &RecommendationItem) -> PlayOutcome {
        let playing_url = self.state.borrow().playing_url.clone();
        let same = self.handle.is_some()
            && playing_url.is_some_and(|url| item.preview_urls.contains(&url));
        if !same {
            return self.play(item);
        }

        let Some(id) = self.handle_id else {
            return self.play(item);
        };
        let resumed = match self.handle.as_mut() {
            Some(handle) => handle.play(),
            None => return self.play(item),
        };
        match resumed {
            Ok(()) => {
                self.state.send_modify(|s| s.status = PlaybackStatus::Playing);
                self.start_ticker(id);
                PlayOutcome::Started
            }
            Err(e) => {
                tracing::warn!(error = %e, "Resume failed, trying next preview URL");
                let next = self.url_index + 1;
                match self.start_from(next) {
                    Some(_) => PlayOutcome::Started,
                    None => {
                        self.mark_unplayable();
                        PlayOutcome::Unplayable
                    }
                }
            }
        }
    }

    /// Pause when playing, otherwise resume `item`
    pub fn toggle(&mut self, item: &RecommendationItem) -> Option<PlayOutcome> {
        if self.state.borrow().is_playing() {
            self.pause();
            None
        } else {
            Some(self.resume(item))
        }
    }

    /// Jump to `seconds`, clamped to the clip
    pub fn seek(&mut self, seconds: f64) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        let duration = self.state.borrow().duration;
        let target = if seconds.is_finite() { seconds.clamp(0.0, duration) } else { 0.0 };
        handle.set_current_time(target);
        self.state.send_modify(|s| s.current_time = target);
    }

    pub fn seek_by(&mut self, delta: f64) {
        let current = self.state.borrow().current_time;
        self.seek(current + delta);
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { DEFAULT_VOLUME };
        if let Some(handle) = self.handle.as_mut() {
            handle.set_volume(volume);
        }
        self.state.send_modify(|s| s.volume = volume);
    }

    /// Release the resource and reset progress
    pub fn stop(&mut self) {
        self.release_resource();
        self.state.send_modify(|s| {
            s.status = PlaybackStatus::Empty;
            s.playing_url = None;
            s.current_time = 0.0;
            s.duration = DEFAULT_DURATION;
        });
    }

    /// Apply one message from the receiver returned by [`AudioPlaybackController::new`]
    pub fn handle_message(&mut self, message: PlayerMessage) -> PlaybackEvent {
        match message {
            PlayerMessage::Tick { handle } if self.handle_id == Some(handle) => {
                let Some(audio) = self.handle.as_ref() else {
                    return PlaybackEvent::Ignored;
                };
                if audio.is_paused() {
                    return PlaybackEvent::Ignored;
                }
                let position = audio.current_time();
                self.state.send_modify(|s| s.current_time = position);
                PlaybackEvent::Progress
            }
            PlayerMessage::Audio { handle, event } if self.handle_id == Some(handle) => {
                self.handle_audio_event(event)
            }
            _ => PlaybackEvent::Ignored,
        }
    }

    fn handle_audio_event(&mut self, event: AudioEvent) -> PlaybackEvent {
        match event {
            AudioEvent::MetadataReady { duration } => {
                if duration.is_finite() && duration > 0.0 {
                    self.state.send_modify(|s| s.duration = duration);
                }
                PlaybackEvent::MetadataLoaded
            }
            AudioEvent::Ended => {
                tracing::debug!("Preview ended");
                self.release_resource();
                self.state.send_modify(|s| {
                    s.status = PlaybackStatus::Ended;
                    s.playing_url = None;
                    s.current_time = s.duration;
                });
                PlaybackEvent::TrackEnded
            }
            AudioEvent::Error(message) => {
                tracing::warn!(error = %message, url_index = self.url_index, "Preview errored");
                let next = self.url_index + 1;
                match self.start_from(next) {
                    Some(index) => PlaybackEvent::FallbackStarted { index },
                    None => {
                        self.mark_unplayable();
                        PlaybackEvent::Unplayable
                    }
                }
            }
        }
    }

    fn start_ticker(&mut self, handle: u64) {
        self.stop_ticker();
        let events = self.events.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if events.send(PlayerMessage::Tick { handle }).is_err() {
                    break;
                }
            }
        }));
        self.state.send_modify(|s| s.progress_ticking = true);
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.state.send_if_modified(|s| std::mem::replace(&mut s.progress_ticking, false));
    }

    /// Pause and drop the handle, stop the timer and stop listening to it
    pub fn release_resource(&mut self) {
        self.stop_ticker();
        self.handle_id = None;
        if let Some(mut handle) = self.handle.take() {
            handle.pause();
        }
    }
}

impl Drop for AudioPlaybackController {
    fn drop(&mut self) {
        self.release_resource();
    }
}

fn identity_key(item: &RecommendationItem) -> (String, String) {
    let (title, artist) = item.identity();
    (title.to_string(), artist.to_string())
}

/// After a track ends, move to the next buffered item and play it.
///
/// Returns `None` when the cursor is already on the last item.
pub fn advance_and_play(
    player: &mut AudioPlaybackController,
    buffer: &RecommendationBuffer,
) -> Option<(usize, PlayOutcome)> {
    if !buffer.advance() {
        return None;
    }
    let state = buffer.snapshot();
    let item = state.current()?;
    Some((state.cursor, player.play(item)))
}
