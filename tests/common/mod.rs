#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;

use playlist_muse::audio::{AudioEvent, AudioHandle, AudioOutput, PlayerMessage};
use playlist_muse::error::{AudioError, GatewayError, GatewayResult};
use playlist_muse::gateway::{RecommendationRequest, RemoteDataGateway};
use playlist_muse::model::{
    Playlist, PlaylistCollection, PlaylistOwner, PlaylistTracksRef, Recommendation, RecommendationItem,
    TimeRange, Track, PREFETCH_BATCH_SIZE,
};

pub fn playlist(id: &str, name: &str) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        images: vec![],
        owner: PlaylistOwner::default(),
        tracks: PlaylistTracksRef::default(),
        public: Some(true),
        collaborative: false,
        uri: format!("spotify:playlist:{}", id),
    }
}

/// `count` playlists named "Playlist NNN"
pub fn playlists(count: usize) -> Vec<Playlist> {
    (0..count)
        .map(|i| playlist(&format!("p{}", i), &format!("Playlist {:03}", i)))
        .collect()
}

pub fn rec(title: &str, artist: &str, urls: &[&str]) -> RecommendationItem {
    RecommendationItem {
        success: true,
        recommendation: Recommendation {
            song_title: title.to_string(),
            artist: artist.to_string(),
        },
        track: None,
        preview_urls: urls.iter().map(|u| u.to_string()).collect(),
        error: None,
    }
}

/// `count` distinct recommendations "<prefix> i" with one preview URL each
pub fn recs(prefix: &str, count: usize) -> Vec<RecommendationItem> {
    (0..count)
        .map(|i| {
            let title = format!("{} {}", prefix, i);
            let url = format!("https://p.example/{}-{}.mp3", prefix, i);
            rec(&title, "Artist", &[&url])
        })
        .collect()
}

pub fn track(id: &str, name: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        uri: format!("spotify:track:{}", id),
        duration_ms: 180_000,
        ..Default::default()
    }
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Scripted gateway. Every call is recorded; a gate holds back the next call
/// made under its key until the test releases it.
#[derive(Default)]
pub struct FakeGateway {
    pub playlists: Mutex<Vec<Playlist>>,
    pub fail_playlists: AtomicBool,
    pub fail_batch_offsets: Mutex<HashSet<u32>>,
    pub playlist_calls: Mutex<Vec<(u32, u32)>>,

    pub recommendations: Mutex<HashMap<String, VecDeque<GatewayResult<Vec<RecommendationItem>>>>>,
    pub recommendation_calls: Mutex<Vec<(String, RecommendationRequest)>>,

    pub top_tracks: Mutex<Vec<Track>>,
    pub top_track_calls: Mutex<Vec<(TimeRange, u32, u32)>>,

    pub fail_add: AtomicBool,
    pub added: Mutex<Vec<(String, String)>>,

    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_playlists(items: Vec<Playlist>) -> Arc<Self> {
        let gateway = Self::default();
        *gateway.playlists.lock().unwrap() = items;
        Arc::new(gateway)
    }

    /// Hold back the next call made under `key`; `notify_one` releases it
    pub fn gate(&self, key: impl Into<String>) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(key.into(), notify.clone());
        notify
    }

    async fn pass_gate(&self, key: &str) {
        let gate = self.gates.lock().unwrap().remove(key);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    /// Queue a response for recommendations sourced from `key`
    /// (a playlist id, or `top:<range>`)
    pub fn script(&self, key: &str, response: GatewayResult<Vec<RecommendationItem>>) {
        self.recommendations
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn playlist_calls(&self) -> Vec<(u32, u32)> {
        self.playlist_calls.lock().unwrap().clone()
    }

    pub fn recommendation_calls(&self) -> Vec<(String, RecommendationRequest)> {
        self.recommendation_calls.lock().unwrap().clone()
    }

    async fn next_recommendations(
        &self,
        key: String,
        request: &RecommendationRequest,
    ) -> GatewayResult<Vec<RecommendationItem>> {
        self.recommendation_calls
            .lock()
            .unwrap()
            .push((key.clone(), request.clone()));
        self.pass_gate(&format!("recs:{}", key)).await;
        self.recommendations
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl RemoteDataGateway for FakeGateway {
    async fn list_playlists(&self, limit: u32, offset: u32) -> GatewayResult<PlaylistCollection> {
        self.playlist_calls.lock().unwrap().push((limit, offset));
        self.pass_gate(&format!("playlists:{}:{}", limit, offset)).await;

        if self.fail_playlists.load(Ordering::SeqCst) {
            return Err(GatewayError::Network("connection reset".into()));
        }
        if limit == PREFETCH_BATCH_SIZE && self.fail_batch_offsets.lock().unwrap().contains(&offset) {
            return Err(GatewayError::Status { status: 500, message: "batch failed".into() });
        }

        let all = self.playlists.lock().unwrap().clone();
        let total = all.len() as u32;
        let items: Vec<Playlist> = all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(PlaylistCollection {
            items,
            offset,
            limit,
            total,
            next: (offset + limit < total).then(|| format!("offset={}", offset + limit)),
            previous: (offset > 0).then(|| format!("offset={}", offset.saturating_sub(limit))),
        })
    }

    async fn list_top_tracks(&self, time_range: TimeRange, limit: u32, offset: u32) -> GatewayResult<Vec<Track>> {
        self.top_track_calls.lock().unwrap().push((time_range, limit, offset));
        self.pass_gate(&format!("top:{}", time_range)).await;
        Ok(self.top_tracks.lock().unwrap().clone())
    }

    async fn get_recommendations(
        &self,
        playlist_id: &str,
        request: &RecommendationRequest,
    ) -> GatewayResult<Vec<RecommendationItem>> {
        self.next_recommendations(playlist_id.to_string(), request).await
    }

    async fn get_top_track_recommendations(
        &self,
        time_range: TimeRange,
        request: &RecommendationRequest,
    ) -> GatewayResult<Vec<RecommendationItem>> {
        self.next_recommendations(format!("top:{}", time_range), request).await
    }

    async fn add_track_to_playlist(&self, playlist_id: &str, track_uri: &str) -> GatewayResult<()> {
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(GatewayError::Status { status: 403, message: "forbidden".into() });
        }
        self.added
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), track_uri.to_string()));
        Ok(())
    }
}

/// What a fake handle has been told
#[derive(Debug, Default)]
pub struct HandleProbe {
    pub url: String,
    pub id: u64,
    pub paused: bool,
    pub position: f64,
    pub volume: f32,
}

/// Audio output that never touches a device. Counts live handles and fails
/// `play()` for URLs in `fail_play`.
#[derive(Default)]
pub struct FakeOutput {
    pub live: Arc<AtomicUsize>,
    pub fail_play: Mutex<HashSet<String>>,
    pub loads: Mutex<Vec<String>>,
    pub probes: Mutex<Vec<Arc<Mutex<HandleProbe>>>>,
    events: Mutex<Option<UnboundedSender<PlayerMessage>>>,
}

impl FakeOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }

    /// Probe of the most recently loaded handle
    pub fn last(&self) -> Arc<Mutex<HandleProbe>> {
        self.probes
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("nothing loaded")
    }

    /// Id of the most recent handle loaded for `url`
    pub fn handle_id(&self, url: &str) -> u64 {
        self.probes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .map(|p| p.lock().unwrap())
            .find(|p| p.url == url)
            .map(|p| p.id)
            .expect("url never loaded")
    }

    /// Send `event` as if the latest handle for `url` raised it
    pub fn emit(&self, url: &str, event: AudioEvent) {
        let handle = self.handle_id(url);
        let events = self.events.lock().unwrap().clone().expect("nothing loaded");
        events.send(PlayerMessage::Audio { handle, event }).unwrap();
    }
}

impl AudioOutput for FakeOutput {
    fn load(&self, url: &str, handle: u64, events: UnboundedSender<PlayerMessage>) -> Box<dyn AudioHandle> {
        *self.events.lock().unwrap() = Some(events);
        self.live.fetch_add(1, Ordering::SeqCst);
        self.loads.lock().unwrap().push(url.to_string());
        let probe = Arc::new(Mutex::new(HandleProbe {
            url: url.to_string(),
            id: handle,
            paused: true,
            ..Default::default()
        }));
        self.probes.lock().unwrap().push(probe.clone());
        Box::new(FakeHandle {
            probe,
            fails: self.fail_play.lock().unwrap().contains(url),
            live: self.live.clone(),
        })
    }
}

struct FakeHandle {
    probe: Arc<Mutex<HandleProbe>>,
    fails: bool,
    live: Arc<AtomicUsize>,
}

impl AudioHandle for FakeHandle {
    fn play(&mut self) -> Result<(), AudioError> {
        if self.fails {
            return Err(AudioError::Stream("unsupported source".into()));
        }
        self.probe.lock().unwrap().paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.lock().unwrap().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.probe.lock().unwrap().paused
    }

    fn current_time(&self) -> f64 {
        self.probe.lock().unwrap().position
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.probe.lock().unwrap().position = seconds;
    }

    fn duration(&self) -> Option<f64> {
        Some(30.0)
    }

    fn set_volume(&mut self, volume: f32) {
        self.probe.lock().unwrap().volume = volume;
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
