//! Command-line and environment configuration

use std::path::PathBuf;

use clap::Parser;

use crate::model::BufferConfig;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 50;
pub const DEFAULT_BATCH_SIZE: u32 = 10;
pub const DEFAULT_BUFFER_THRESHOLD: usize = 5;
pub const DEFAULT_VOLUME: f32 = 0.7;

#[derive(Parser, Debug, Clone)]
#[command(name = "playlist-muse")]
#[command(about = "Browse your playlists and listen to AI song recommendations", long_about = None)]
pub struct AppConfig {
    /// Base URL of the recommendation service
    #[arg(long, env = "PLAYLIST_MUSE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Session cookie sent to the recommendation service
    #[arg(long, env = "PLAYLIST_MUSE_SESSION")]
    pub session_cookie: Option<String>,

    /// Playlists per page
    #[arg(long, env = "PLAYLIST_MUSE_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Recommendations requested per batch
    #[arg(long, env = "PLAYLIST_MUSE_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: u32,

    /// Remaining recommendations that trigger a refill
    #[arg(long, env = "PLAYLIST_MUSE_BUFFER_THRESHOLD", default_value_t = DEFAULT_BUFFER_THRESHOLD)]
    pub buffer_threshold: usize,

    /// Initial preview volume (0.0 - 1.0)
    #[arg(long, env = "PLAYLIST_MUSE_VOLUME", default_value_t = DEFAULT_VOLUME)]
    pub volume: f32,

    /// Directory for log files
    #[arg(long, env = "PLAYLIST_MUSE_LOG_DIR", default_value = ".logs")]
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_cookie: None,
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            buffer_threshold: DEFAULT_BUFFER_THRESHOLD,
            volume: DEFAULT_VOLUME,
            log_dir: PathBuf::from(".logs"),
        }
    }
}

impl AppConfig {
    /// Bring out-of-range values back into range, reporting what changed
    pub fn validate(mut self) -> anyhow::Result<Self> {
        if self.api_url.trim().is_empty() {
            anyhow::bail!("api url must not be empty");
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            tracing::warn!(page_size = self.page_size, "Page size out of range, clamping");
            self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        }
        if self.batch_size == 0 {
            tracing::warn!("Batch size must be at least 1");
            self.batch_size = 1;
        }
        if !self.volume.is_finite() {
            self.volume = DEFAULT_VOLUME;
        }
        self.volume = self.volume.clamp(0.0, 1.0);
        Ok(self)
    }

    pub fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            batch_size: self.batch_size,
            threshold: self.buffer_threshold,
        }
    }
}
