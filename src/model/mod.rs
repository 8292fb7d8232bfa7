//! Model module - Application state and data types
//!
//! This module contains all the data structures and state management for the application.
//! It is organized into submodules by responsibility:
//!
//! - `types`: Core type definitions (sections, pagination, contexts, UI state)
//! - `content`: Catalog data (playlists, tracks, recommendation items)
//! - `debounce`: Timer-reset primitive for search input
//! - `search_cache`: Full-collection playlist cache behind search
//! - `playlist_store`: Paginated playlist listing with the search overlay
//! - `recommendations`: Look-ahead recommendation buffer
//! - `top_tracks`: The user's top tracks
//! - `playback`: Preview playback controller
//! - `app_model`: Main application model with state management methods

mod types;
mod content;
mod debounce;
mod search_cache;
mod playlist_store;
mod recommendations;
mod top_tracks;
mod playback;
mod app_model;

// Re-export all public types for convenient access
pub use types::{
    ActiveSection, PaginationState, RecommendationContext, RecommendationSource,
    SearchState, TimeRange, UiState,
};

pub use content::{
    Album, Artist, Image, Playlist, PlaylistCollection, PlaylistOwner, PlaylistTracksRef,
    Recommendation, RecommendationItem, Track,
};

pub use debounce::Debouncer;

pub use search_cache::{
    compare_names, filter_playlists, merge_playlists, AllPlaylistsCache, SearchOverlayCache,
    PREFETCH_BATCH_SIZE,
};

pub use playlist_store::{PlaylistState, PlaylistStore, PLAYLISTS_ERROR, SEARCH_DEBOUNCE};

pub use recommendations::{
    unique_items, BufferConfig, BufferStatus, FetchOutcome, RecommendationBuffer,
    RecommendationBufferState, RECOMMENDATIONS_ERROR,
};

pub use top_tracks::{TopTracksState, TopTracksStore, TOP_TRACKS_ERROR, TOP_TRACKS_LIMIT};

pub use playback::{
    advance_and_play, AudioPlaybackController, PlayOutcome, PlaybackEvent, PlaybackState,
    PlaybackStatus, DEFAULT_DURATION, DEFAULT_VOLUME, TICK_INTERVAL,
};

pub use app_model::AppModel;
