//! Audio module - the playback primitive the preview player drives
//!
//! - `AudioOutput` loads a preview URL into an `AudioHandle`
//! - `device`: implementation over reqwest, symphonia and cpal
//!
//! Handles report back through an unbounded channel, every message tagged with
//! the id the handle was loaded under. Dropping a handle releases it.

mod device;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::AudioError;

pub use device::CpalOutput;

/// Notifications a loaded handle emits
#[derive(Clone, Debug, PartialEq)]
pub enum AudioEvent {
    /// Duration in seconds is known
    MetadataReady { duration: f64 },
    /// Played through to the end
    Ended,
    /// The URL could not be fetched, decoded or played
    Error(String),
}

/// Everything the preview player listens to
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerMessage {
    Audio { handle: u64, event: AudioEvent },
    /// Progress timer fired for `handle`
    Tick { handle: u64 },
}

/// One loaded preview
pub trait AudioHandle: Send {
    /// Start or continue playback. Playback may begin once loading completes.
    fn play(&mut self) -> Result<(), AudioError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// Position in seconds
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// Length in seconds, once known
    fn duration(&self) -> Option<f64>;
    fn set_volume(&mut self, volume: f32);
}

pub trait AudioOutput: Send + Sync {
    fn load(&self, url: &str, handle: u64, events: UnboundedSender<PlayerMessage>) -> Box<dyn AudioHandle>;
}
