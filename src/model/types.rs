//! Core type definitions for the application

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Which section of the UI is currently active/focused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActiveSection {
    Search,
    Playlists,
    Recommendations,
}

impl ActiveSection {
    pub fn next(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Playlists,
            ActiveSection::Playlists => ActiveSection::Recommendations,
            ActiveSection::Recommendations => ActiveSection::Search,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActiveSection::Search => ActiveSection::Recommendations,
            ActiveSection::Playlists => ActiveSection::Search,
            ActiveSection::Recommendations => ActiveSection::Playlists,
        }
    }
}

/// Listening-history window used for top tracks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [TimeRange::ShortTerm, TimeRange::MediumTerm, TimeRange::LongTerm];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "Last 4 Weeks",
            TimeRange::MediumTerm => "Last 6 Months",
            TimeRange::LongTerm => "All Time",
        }
    }

    pub fn next(self) -> Self {
        match self {
            TimeRange::ShortTerm => TimeRange::MediumTerm,
            TimeRange::MediumTerm => TimeRange::LongTerm,
            TimeRange::LongTerm => TimeRange::ShortTerm,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a recommendation batch is generated from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecommendationSource {
    Playlist { id: String, name: Option<String> },
    TopTracks(TimeRange),
}

impl RecommendationSource {
    pub fn playlist_id(&self) -> Option<&str> {
        match self {
            RecommendationSource::Playlist { id, .. } => Some(id),
            RecommendationSource::TopTracks(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            RecommendationSource::Playlist { id, name } => name.clone().unwrap_or_else(|| id.clone()),
            RecommendationSource::TopTracks(range) => format!("Top tracks ({})", range.label()),
        }
    }
}

/// Recommendations are scoped by source and custom prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendationContext {
    pub source: RecommendationSource,
    pub custom_prompt: Option<String>,
}

impl RecommendationContext {
    pub fn new(source: RecommendationSource) -> Self {
        Self { source, custom_prompt: None }
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.custom_prompt = prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }
}

/// Pagination metadata for a page window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationState {
    pub offset: u32,
    pub limit: u32,
    pub total: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PaginationState {
    pub fn new(limit: u32) -> Self {
        Self {
            offset: 0,
            limit,
            total: 0,
            has_next: false,
            has_previous: false,
        }
    }

    /// Pagination over a locally held list of `count` items
    pub fn local(offset: u32, limit: u32, count: usize) -> Self {
        let count = count as u32;
        Self {
            offset,
            limit,
            total: count,
            has_next: offset.saturating_add(limit) < count,
            has_previous: offset > 0,
        }
    }

    /// 1-based page number for display
    pub fn page(&self) -> u32 {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }

    pub fn page_count(&self) -> u32 {
        if self.limit == 0 {
            1
        } else {
            self.total.div_ceil(self.limit).max(1)
        }
    }
}

/// The current search input as seen by the store
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub active: bool,
}

impl SearchState {
    pub fn from_query(query: &str) -> Self {
        Self {
            query: query.to_string(),
            active: !query.trim().is_empty(),
        }
    }
}

/// UI state for the application
#[derive(Clone)]
pub struct UiState {
    pub active_section: ActiveSection,
    pub search_input: String,
    pub playlist_selected: usize,
    pub prompt_input: String,
    pub editing_prompt: bool,
    pub top_tracks_range: TimeRange,
    pub error_message: Option<String>,
    pub error_timestamp: Option<Instant>,
    pub notice: Option<String>,
    pub notice_timestamp: Option<Instant>,
    pub show_help_popup: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_section: ActiveSection::Playlists,
            search_input: String::new(),
            playlist_selected: 0,
            prompt_input: String::new(),
            editing_prompt: false,
            top_tracks_range: TimeRange::default(),
            error_message: None,
            error_timestamp: None,
            notice: None,
            notice_timestamp: None,
            show_help_popup: false,
        }
    }
}
