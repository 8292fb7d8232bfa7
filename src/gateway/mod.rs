//! Gateway module - the remote data the stores consume
//!
//! - `RemoteDataGateway`: the operations the stores call, independent of transport
//! - `spotify`: implementation over rspotify (catalog) and reqwest (recommendation service)

mod spotify;

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::model::{PlaylistCollection, RecommendationItem, TimeRange, Track};

pub use spotify::{RecommendationService, SpotifyGateway};

/// Paging and scoping parameters for a recommendation batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendationRequest {
    pub include_preview_urls: bool,
    pub limit: u32,
    pub offset: u32,
    pub clear_cache: bool,
    pub custom_prompt: Option<String>,
}

/// Authenticated access to the catalog and the recommendation service.
///
/// The session credential is ambient; callers never see it. Implementations
/// must tolerate several calls in flight at once.
#[async_trait]
pub trait RemoteDataGateway: Send + Sync {
    async fn list_playlists(&self, limit: u32, offset: u32) -> GatewayResult<PlaylistCollection>;

    async fn list_top_tracks(&self, time_range: TimeRange, limit: u32, offset: u32) -> GatewayResult<Vec<Track>>;

    async fn get_recommendations(
        &self,
        playlist_id: &str,
        request: &RecommendationRequest,
    ) -> GatewayResult<Vec<RecommendationItem>>;

    async fn get_top_track_recommendations(
        &self,
        time_range: TimeRange,
        request: &RecommendationRequest,
    ) -> GatewayResult<Vec<RecommendationItem>>;

    async fn add_track_to_playlist(&self, playlist_id: &str, track_uri: &str) -> GatewayResult<()>;
}
