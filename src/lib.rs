//! Playlist browsing with paged and searchable playlists, buffered AI song
//! recommendations and preview playback in the terminal.

pub mod audio;
pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod view;
