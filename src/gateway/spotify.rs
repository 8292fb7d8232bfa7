//! Gateway backed by the Spotify Web API and the recommendation service

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use rspotify::{
    model::{FullTrack, PlayableId, PlaylistId, SimplifiedPlaylist, TrackId},
    prelude::*,
    AuthCodeSpotify,
};

use crate::error::{GatewayError, GatewayResult};
use crate::model::{
    Album, Artist, Image, Playlist, PlaylistCollection, PlaylistOwner, PlaylistTracksRef,
    RecommendationItem, TimeRange, Track,
};
use crate::{log_api_request, log_api_result};
use super::{RecommendationRequest, RemoteDataGateway};

/// HTTP client for the AI recommendation backend.
///
/// The backend resolves each recommendation against the catalog and attaches
/// preview URLs; it authenticates through the session cookie.
#[derive(Clone)]
pub struct RecommendationService {
    http: reqwest::Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl RecommendationService {
    pub fn new(base_url: impl Into<String>, session_cookie: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            session_cookie,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch(
        &self,
        path: &str,
        params: Vec<(&'static str, String)>,
    ) -> GatewayResult<Vec<RecommendationItem>> {
        let mut request = self.http.get(self.endpoint(path)).query(&params);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request.send().await?.error_for_status()?;
        let items = response.json::<Vec<RecommendationItem>>().await?;
        Ok(items)
    }
}

/// Query parameters for a recommendation request. A blank custom prompt is
/// omitted entirely.
pub(crate) fn recommendation_params(request: &RecommendationRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("includePreviewUrls", request.include_preview_urls.to_string()),
        ("limit", request.limit.to_string()),
        ("offset", request.offset.to_string()),
        ("clearCache", request.clear_cache.to_string()),
    ];
    if let Some(prompt) = request.custom_prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        params.push(("customPrompt", prompt.to_string()));
    }
    params
}

/// Spotify API client plus recommendation service, with token refresh support
#[derive(Clone)]
pub struct SpotifyGateway {
    client: Arc<AuthCodeSpotify>,
    recommendations: RecommendationService,
    refresh_token: Arc<RwLock<String>>,
    token_expires_at: Arc<RwLock<Option<chrono::DateTime<chrono::Utc>>>>,
}

impl SpotifyGateway {
    pub fn new(
        client: AuthCodeSpotify,
        recommendations: RecommendationService,
        refresh_token: String,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Self {
        Self {
            client: Arc::new(client),
            recommendations,
            refresh_token: Arc::new(RwLock::new(refresh_token)),
            token_expires_at: Arc::new(RwLock::new(expires_at)),
        }
    }

    pub async fn token_needs_refresh(&self) -> bool {
        let expires_at = self.token_expires_at.read().await;
        if let Some(exp) = *expires_at {
            let remaining = exp - chrono::Utc::now();
            // Refresh if less than 5 minutes remaining
            remaining.num_seconds() < 300
        } else {
            false
        }
    }

    pub async fn refresh_token_if_needed(&self) -> anyhow::Result<bool> {
        if !self.token_needs_refresh().await {
            return Ok(false);
        }

        let refresh_token = self.refresh_token.read().await.clone();
        tracing::info!("Token expiring soon, refreshing...");

        match crate::auth::refresh_access_token(&refresh_token).await {
            Ok(refreshed) => {
                let token = crate::auth::rspotify_token(refreshed.access_token, refreshed.expires_at);
                *self
                    .client
                    .token
                    .lock()
                    .await
                    .map_err(|_| anyhow::anyhow!("Spotify token lock unavailable"))? = Some(token);

                *self.refresh_token.write().await = refreshed.refresh_token;
                *self.token_expires_at.write().await = Some(refreshed.expires_at);

                tracing::info!("Token refreshed successfully");
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to refresh token");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RemoteDataGateway for SpotifyGateway {
    async fn list_playlists(&self, limit: u32, offset: u32) -> GatewayResult<PlaylistCollection> {
        log_api_request!("list_playlists", limit, offset);
        let result = self
            .client
            .current_user_playlists_manual(Some(limit), Some(offset))
            .await
            .map_err(GatewayError::from);
        log_api_result!("list_playlists", result);

        let page = result?;
        Ok(PlaylistCollection {
            items: page.items.into_iter().map(convert_playlist).collect(),
            offset: page.offset,
            limit: page.limit,
            total: page.total,
            next: page.next,
            previous: page.previous,
        })
    }

    async fn list_top_tracks(&self, time_range: TimeRange, limit: u32, offset: u32) -> GatewayResult<Vec<Track>> {
        log_api_request!("list_top_tracks", time_range = %time_range, limit, offset);
        let range = match time_range {
            TimeRange::ShortTerm => rspotify::model::TimeRange::ShortTerm,
            TimeRange::MediumTerm => rspotify::model::TimeRange::MediumTerm,
            TimeRange::LongTerm => rspotify::model::TimeRange::LongTerm,
        };
        let result = self
            .client
            .current_user_top_tracks_manual(Some(range), Some(limit), Some(offset))
            .await
            .map_err(GatewayError::from);
        log_api_result!("list_top_tracks", result);

        Ok(result?.items.into_iter().map(convert_track).collect())
    }

    async fn get_recommendations(
        &self,
        playlist_id: &str,
        request: &RecommendationRequest,
    ) -> GatewayResult<Vec<RecommendationItem>> {
        log_api_request!("get_recommendations", playlist_id, offset = request.offset, clear_cache = request.clear_cache);
        let mut params = vec![("playlistId", playlist_id.to_string())];
        params.extend(recommendation_params(request));

        let result = self.recommendations.fetch("gemini/recommendations", params).await;
        log_api_result!("get_recommendations", result);
        result
    }

    async fn get_top_track_recommendations(
        &self,
        time_range: TimeRange,
        request: &RecommendationRequest,
    ) -> GatewayResult<Vec<RecommendationItem>> {
        log_api_request!("get_top_track_recommendations", time_range = %time_range, offset = request.offset);
        let mut params = vec![("timeRange", time_range.as_str().to_string())];
        params.extend(recommendation_params(request));

        let result = self
            .recommendations
            .fetch("gemini/top-tracks-recommendations", params)
            .await;
        log_api_result!("get_top_track_recommendations", result);
        result
    }

    async fn add_track_to_playlist(&self, playlist_id: &str, track_uri: &str) -> GatewayResult<()> {
        log_api_request!("add_track_to_playlist", playlist_id, track_uri);
        let playlist = PlaylistId::from_id(playlist_id)?;
        // Extract track ID from URI (format: spotify:track:ID)
        let track_id = track_uri.rsplit(':').next().unwrap_or(track_uri);
        let track = TrackId::from_id(track_id)?;

        let result = self
            .client
            .playlist_add_items(playlist, [PlayableId::Track(track)], None)
            .await
            .map(|_| ())
            .map_err(GatewayError::from);
        log_api_result!("add_track_to_playlist", result);
        result
    }
}

fn convert_images(images: Vec<rspotify::model::Image>) -> Vec<Image> {
    images
        .into_iter()
        .map(|i| Image {
            url: i.url,
            height: i.height,
            width: i.width,
        })
        .collect()
}

fn convert_playlist(playlist: SimplifiedPlaylist) -> Playlist {
    let id = playlist.id.id().to_string();
    Playlist {
        uri: format!("spotify:playlist:{}", id),
        id,
        name: playlist.name,
        // The listing endpoint's simplified object carries no description
        description: None,
        images: convert_images(playlist.images),
        owner: PlaylistOwner {
            id: playlist.owner.id.id().to_string(),
            display_name: playlist.owner.display_name,
        },
        tracks: PlaylistTracksRef {
            href: String::new(),
            total: playlist.tracks.total,
        },
        public: playlist.public,
        collaborative: playlist.collaborative,
    }
}

fn convert_track(track: FullTrack) -> Track {
    let id = track.id.as_ref().map(|id| id.id().to_string()).unwrap_or_default();
    Track {
        uri: format!("spotify:track:{}", id),
        id,
        name: track.name,
        duration_ms: track.duration.num_milliseconds() as u32,
        preview_url: track.preview_url,
        explicit: track.explicit,
        popularity: track.popularity,
        artists: track
            .artists
            .into_iter()
            .map(|a| Artist {
                id: a.id.as_ref().map(|id| id.id().to_string()).unwrap_or_default(),
                name: a.name,
            })
            .collect(),
        album: Album {
            id: track.album.id.as_ref().map(|id| id.id().to_string()).unwrap_or_default(),
            name: track.album.name,
            images: convert_images(track.album.images),
            release_date: track.album.release_date,
        },
    }
}
