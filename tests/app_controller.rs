mod common;

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::Mutex;

use common::{playlist, rec, recs, settle, track, FakeGateway, FakeOutput};
use playlist_muse::audio::AudioEvent;
use playlist_muse::config::AppConfig;
use playlist_muse::controller::{AppController, NO_PREVIEW_NOTICE};
use playlist_muse::model::{
    ActiveSection, AppModel, BufferStatus, PlaybackStatus, RecommendationContext, RecommendationSource, TimeRange,
};

struct Harness {
    gateway: Arc<FakeGateway>,
    output: Arc<FakeOutput>,
    model: Arc<Mutex<AppModel>>,
    controller: AppController,
}

fn harness() -> Harness {
    let gateway = FakeGateway::new();
    let output = FakeOutput::new();
    let (model, events) = AppModel::new(gateway.clone(), output.clone(), &AppConfig::default());
    let model = Arc::new(Mutex::new(model));
    let controller = AppController::new(model.clone());
    controller.start_player_event_listener(events);
    Harness { gateway, output, model, controller }
}

fn road_trip() -> RecommendationContext {
    RecommendationContext::new(RecommendationSource::Playlist {
        id: "pl1".into(),
        name: Some("Road Trip".into()),
    })
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

impl Harness {
    async fn cursor(&self) -> usize {
        self.model.lock().await.recommendations.snapshot().cursor
    }

    async fn playback_status(&self) -> PlaybackStatus {
        let player = self.model.lock().await.player.clone();
        let status = player.lock().await.snapshot().status;
        status
    }
}

#[tokio::test]
async fn opening_recommendations_autoplays_first_preview() {
    let h = harness();
    h.gateway.script("pl1", Ok(recs("song", 10)));

    h.controller.start_recommendations(road_trip()).await;

    let ui = h.model.lock().await.get_ui_state().await;
    assert_eq!(ui.active_section, ActiveSection::Recommendations);
    assert_eq!(h.output.loads(), vec!["https://p.example/song-0.mp3"]);
    assert_eq!(h.playback_status().await, PlaybackStatus::Playing);
}

#[tokio::test]
async fn next_and_previous_song_move_cursor_and_play() {
    let h = harness();
    h.gateway.script("pl1", Ok(recs("song", 10)));
    h.controller.start_recommendations(road_trip()).await;

    h.controller.next_song().await;
    assert_eq!(h.cursor().await, 1);
    h.controller.previous_song().await;
    assert_eq!(h.cursor().await, 0);
    h.controller.previous_song().await;
    assert_eq!(h.cursor().await, 0);

    assert_eq!(h.output.loads().len(), 3);
    assert_eq!(h.output.live(), 1);
}

#[tokio::test]
async fn jumping_near_the_end_refills_the_buffer() {
    let h = harness();
    h.gateway.script("pl1", Ok(recs("song", 10)));
    h.gateway.script("pl1", Ok(recs("more", 10)));
    h.controller.start_recommendations(road_trip()).await;

    h.controller.jump_to(7).await;
    settle().await;

    assert_eq!(h.cursor().await, 7);
    let calls = h.gateway.recommendation_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1.offset, 10);
    assert_eq!(h.model.lock().await.recommendations.snapshot().items.len(), 20);
    assert_eq!(h.output.loads().last().map(String::as_str), Some("https://p.example/song-7.mp3"));
}

#[tokio::test]
async fn ended_preview_advances_to_the_next_song() {
    let h = harness();
    h.gateway.script("pl1", Ok(recs("song", 10)));
    h.controller.start_recommendations(road_trip()).await;

    h.output.emit("https://p.example/song-0.mp3", AudioEvent::Ended);
    settle().await;

    assert_eq!(h.cursor().await, 1);
    assert_eq!(h.output.loads().last().map(String::as_str), Some("https://p.example/song-1.mp3"));
    assert_eq!(h.playback_status().await, PlaybackStatus::Playing);
}

#[tokio::test]
async fn song_without_preview_shows_notice() {
    let h = harness();
    h.gateway.script("pl1", Ok(vec![rec("Silent", "Artist", &[])]));

    h.controller.start_recommendations(road_trip()).await;

    let ui = h.model.lock().await.get_ui_state().await;
    assert_eq!(ui.notice.as_deref(), Some(NO_PREVIEW_NOTICE));
    assert!(h.output.loads().is_empty());
}

#[tokio::test]
async fn adds_current_song_to_source_playlist() {
    let h = harness();
    let mut item = rec("Song", "Artist", &["u1"]);
    item.track = Some(track("t1", "Song"));
    h.gateway.script("pl1", Ok(vec![item]));
    h.controller.start_recommendations(road_trip()).await;

    h.controller.add_current_to_playlist().await;

    assert_eq!(
        h.gateway.added.lock().unwrap().clone(),
        vec![("pl1".to_string(), "spotify:track:t1".to_string())]
    );
    let ui = h.model.lock().await.get_ui_state().await;
    assert_eq!(ui.notice.as_deref(), Some("\"Song\" has been added to \"Road Trip\""));
}

#[tokio::test]
async fn add_failure_is_reported_as_error() {
    let h = harness();
    let mut item = rec("Song", "Artist", &["u1"]);
    item.track = Some(track("t1", "Song"));
    h.gateway.script("pl1", Ok(vec![item]));
    h.gateway.fail_add.store(true, std::sync::atomic::Ordering::SeqCst);
    h.controller.start_recommendations(road_trip()).await;

    h.controller.add_current_to_playlist().await;

    let ui = h.model.lock().await.get_ui_state().await;
    assert_eq!(
        ui.error_message.as_deref(),
        Some("Action forbidden. You may not own this playlist.")
    );
}

#[tokio::test]
async fn top_track_recommendations_cannot_be_added() {
    let h = harness();
    let mut item = rec("Song", "Artist", &["u1"]);
    item.track = Some(track("t1", "Song"));
    h.gateway.script("top:medium_term", Ok(vec![item]));
    let context = RecommendationContext::new(RecommendationSource::TopTracks(TimeRange::MediumTerm));
    h.controller.start_recommendations(context).await;

    h.controller.add_current_to_playlist().await;

    assert!(h.gateway.added.lock().unwrap().is_empty());
    assert!(h.model.lock().await.get_ui_state().await.notice.is_some());
}

#[tokio::test]
async fn failed_recommendations_surface_an_error() {
    let h = harness();
    h.gateway.script(
        "pl1",
        Err(playlist_muse::error::GatewayError::Network("down".into())),
    );

    h.controller.start_recommendations(road_trip()).await;

    let ui = h.model.lock().await.get_ui_state().await;
    assert_eq!(
        ui.error_message.as_deref(),
        Some(playlist_muse::model::RECOMMENDATIONS_ERROR)
    );
}

#[tokio::test]
async fn help_popup_opens_and_closes_from_keys() {
    let h = harness();

    h.controller.handle_key_event(key(KeyCode::Char('h'))).await.unwrap();
    assert!(h.model.lock().await.is_help_popup_open().await);

    h.controller.handle_key_event(key(KeyCode::Esc)).await.unwrap();
    assert!(!h.model.lock().await.is_help_popup_open().await);
}

#[tokio::test]
async fn prompt_edit_applies_on_enter() {
    let h = harness();
    h.gateway.script("pl1", Ok(recs("song", 10)));
    h.gateway.script("pl1", Ok(recs("calm", 10)));
    h.controller.start_recommendations(road_trip()).await;

    h.controller.handle_key_event(key(KeyCode::Char('e'))).await.unwrap();
    for c in "calm".chars() {
        h.controller.handle_key_event(key(KeyCode::Char(c))).await.unwrap();
    }
    h.controller.handle_key_event(key(KeyCode::Enter)).await.unwrap();
    settle().await;

    let (_, request) = h.gateway.recommendation_calls().pop().unwrap();
    assert_eq!(request.custom_prompt.as_deref(), Some("calm"));
    assert_eq!(request.offset, 0);
    assert!(!h.model.lock().await.is_editing_prompt().await);
    assert_eq!(h.output.loads().last().map(String::as_str), Some("https://p.example/calm-0.mp3"));
}

#[tokio::test]
async fn quit_key_sets_flag() {
    let h = harness();
    h.controller.handle_key_event(key(KeyCode::Char('q'))).await.unwrap();
    assert!(h.model.lock().await.should_quit().await);
}

#[tokio::test]
async fn keys_stay_responsive_while_recommendations_load() {
    let h = harness();
    *h.gateway.playlists.lock().unwrap() = vec![playlist("pl1", "Road Trip")];
    h.controller.load_user_playlists().await;
    h.gateway.script("pl1", Ok(recs("song", 10)));
    let slow = h.gateway.gate("recs:pl1");

    h.controller.handle_key_event(key(KeyCode::Enter)).await.unwrap();
    settle().await;
    assert_eq!(
        h.model.lock().await.recommendations.snapshot().status,
        BufferStatus::FetchingInitial
    );

    h.controller.handle_key_event(key(KeyCode::Char('h'))).await.unwrap();
    assert!(h.model.lock().await.is_help_popup_open().await);
    assert!(h.output.loads().is_empty());

    slow.notify_one();
    settle().await;
    assert_eq!(h.output.loads(), vec!["https://p.example/song-0.mp3"]);
    assert_eq!(h.playback_status().await, PlaybackStatus::Playing);
}
