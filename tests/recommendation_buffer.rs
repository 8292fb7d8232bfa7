mod common;

use common::{rec, recs, settle, FakeGateway};
use playlist_muse::error::GatewayError;
use playlist_muse::model::{
    BufferConfig, BufferStatus, FetchOutcome, RecommendationBuffer, RecommendationContext,
    RecommendationSource, TimeRange, RECOMMENDATIONS_ERROR,
};

fn playlist_context(id: &str) -> RecommendationContext {
    RecommendationContext::new(RecommendationSource::Playlist {
        id: id.to_string(),
        name: Some(format!("Playlist {}", id)),
    })
}

fn buffer(gateway: &std::sync::Arc<FakeGateway>) -> RecommendationBuffer {
    RecommendationBuffer::new(gateway.clone(), BufferConfig::default())
}

#[tokio::test]
async fn reset_requests_first_batch_with_cache_cleared() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("song", 10)));
    let buffer = buffer(&gateway);

    let outcome = buffer.reset(playlist_context("pl1")).await;

    assert_eq!(outcome, FetchOutcome::Applied { added: 10 });
    let (source, request) = &gateway.recommendation_calls()[0];
    assert_eq!(source, "pl1");
    assert!(request.include_preview_urls);
    assert!(request.clear_cache);
    assert_eq!((request.limit, request.offset), (10, 0));
    assert_eq!(request.custom_prompt, None);

    let state = buffer.snapshot();
    assert_eq!(state.status, BufferStatus::Ready);
    assert_eq!(state.items.len(), 10);
    assert_eq!(state.cursor, 0);
    assert_eq!(state.total_fetched, 10);
}

#[tokio::test]
async fn duplicates_are_dropped_but_still_counted() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("song", 10)));
    gateway.script(
        "pl1",
        Ok(vec![
            rec("song 3", "Artist", &["https://p.example/dup.mp3"]),
            rec("fresh", "Artist", &[]),
            rec("fresh", "Artist", &[]),
        ]),
    );
    let buffer = buffer(&gateway);
    buffer.reset(playlist_context("pl1")).await;

    let outcome = buffer.fetch_more(false).await;

    assert_eq!(outcome, FetchOutcome::Applied { added: 1 });
    let state = buffer.snapshot();
    assert_eq!(state.items.len(), 11);
    assert_eq!(state.items[10].title(), "fresh");
    assert_eq!(state.total_fetched, 13);

    let (_, request) = &gateway.recommendation_calls()[1];
    assert_eq!(request.offset, 10);
    assert!(!request.clear_cache);
}

#[tokio::test]
async fn next_fetch_offset_follows_raw_count() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("a", 10)));
    gateway.script("pl1", Ok(recs("a", 10)));
    gateway.script("pl1", Ok(recs("b", 10)));
    let buffer = buffer(&gateway);
    buffer.reset(playlist_context("pl1")).await;

    assert_eq!(buffer.fetch_more(false).await, FetchOutcome::Applied { added: 0 });
    buffer.fetch_more(false).await;

    let offsets: Vec<u32> = gateway
        .recommendation_calls()
        .iter()
        .map(|(_, r)| r.offset)
        .collect();
    assert_eq!(offsets, vec![0, 10, 20]);
    let state = buffer.snapshot();
    assert_eq!(state.items.len(), 20);
    assert_eq!(state.total_fetched, 30);
}

#[tokio::test]
async fn check_buffer_fires_at_threshold() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("song", 10)));
    let buffer = buffer(&gateway);
    buffer.reset(playlist_context("pl1")).await;

    assert_eq!(buffer.check_buffer(3).await, FetchOutcome::Ignored);
    assert_eq!(gateway.recommendation_calls().len(), 1);

    gateway.script("pl1", Ok(recs("more", 10)));
    assert_eq!(buffer.check_buffer(4).await, FetchOutcome::Applied { added: 10 });

    let calls = gateway.recommendation_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1.offset, 10);
    assert!(!calls[1].1.clear_cache);
    assert_eq!(buffer.snapshot().items.len(), 20);
}

#[tokio::test]
async fn check_buffer_ignores_empty_buffer() {
    let gateway = FakeGateway::new();
    let buffer = buffer(&gateway);
    buffer.reset(playlist_context("pl1")).await;

    assert_eq!(buffer.snapshot().status, BufferStatus::Ready);
    assert_eq!(buffer.check_buffer(0).await, FetchOutcome::Ignored);
    assert_eq!(gateway.recommendation_calls().len(), 1);
}

#[tokio::test]
async fn only_one_fetch_in_flight() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("song", 10)));
    let buffer = buffer(&gateway);
    buffer.reset(playlist_context("pl1")).await;

    gateway.script("pl1", Ok(recs("more", 10)));
    let slow = gateway.gate("recs:pl1");
    let pending = tokio::spawn({
        let buffer = buffer.clone();
        async move { buffer.check_buffer(8).await }
    });
    settle().await;
    assert_eq!(buffer.snapshot().status, BufferStatus::FetchingMore);

    for index in 5..10 {
        assert_eq!(buffer.check_buffer(index).await, FetchOutcome::Ignored);
    }
    assert_eq!(buffer.fetch_more(false).await, FetchOutcome::Ignored);
    assert_eq!(gateway.recommendation_calls().len(), 2);

    slow.notify_one();
    assert_eq!(pending.await.unwrap(), FetchOutcome::Applied { added: 10 });
    assert_eq!(buffer.snapshot().status, BufferStatus::Ready);
}

#[tokio::test]
async fn results_from_before_a_reset_are_discarded() {
    let gateway = FakeGateway::new();
    gateway.script("old", Ok(recs("old", 10)));
    gateway.script("new", Ok(recs("new", 10)));
    let buffer = buffer(&gateway);
    let slow = gateway.gate("recs:old");

    let stale = tokio::spawn({
        let buffer = buffer.clone();
        async move { buffer.reset(playlist_context("old")).await }
    });
    settle().await;

    assert_eq!(buffer.reset(playlist_context("new")).await, FetchOutcome::Applied { added: 10 });
    slow.notify_one();
    assert_eq!(stale.await.unwrap(), FetchOutcome::Stale);

    let state = buffer.snapshot();
    assert_eq!(state.items[0].title(), "new 0");
    assert_eq!(state.total_fetched, 10);
    assert_eq!(state.status, BufferStatus::Ready);
}

#[tokio::test]
async fn refill_in_flight_during_reset_is_discarded() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("song", 10)));
    gateway.script("pl1", Ok(recs("late", 10)));
    gateway.script("pl2", Ok(recs("other", 10)));
    let buffer = buffer(&gateway);
    buffer.reset(playlist_context("pl1")).await;

    let slow = gateway.gate("recs:pl1");
    let refill = tokio::spawn({
        let buffer = buffer.clone();
        async move { buffer.fetch_more(false).await }
    });
    settle().await;

    buffer.reset(playlist_context("pl2")).await;
    slow.notify_one();
    assert_eq!(refill.await.unwrap(), FetchOutcome::Stale);

    let state = buffer.snapshot();
    assert_eq!(state.items.len(), 10);
    assert!(state.items.iter().all(|i| i.title().starts_with("other")));
}

#[tokio::test]
async fn failure_keeps_items_and_allows_retry() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("song", 10)));
    gateway.script("pl1", Err(GatewayError::Network("timeout".into())));
    gateway.script("pl1", Ok(recs("retry", 10)));
    let buffer = buffer(&gateway);
    buffer.reset(playlist_context("pl1")).await;

    assert_eq!(buffer.fetch_more(false).await, FetchOutcome::Failed);
    let state = buffer.snapshot();
    assert_eq!(state.status, BufferStatus::Error);
    assert_eq!(state.error.as_deref(), Some(RECOMMENDATIONS_ERROR));
    assert_eq!(state.items.len(), 10);
    assert_eq!(state.total_fetched, 10);

    assert_eq!(buffer.fetch_more(false).await, FetchOutcome::Applied { added: 10 });
    let state = buffer.snapshot();
    assert_eq!(state.status, BufferStatus::Ready);
    assert!(state.error.is_none());
    assert_eq!(state.items.len(), 20);
}

#[tokio::test]
async fn cursor_stays_in_range() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("song", 3)));
    let buffer = buffer(&gateway);

    assert!(!buffer.advance());
    buffer.reset(playlist_context("pl1")).await;

    assert!(!buffer.retreat());
    assert!(buffer.advance());
    assert!(buffer.advance());
    assert!(!buffer.advance());
    assert_eq!(buffer.snapshot().cursor, 2);
    assert!(buffer.retreat());
    assert_eq!(buffer.current().map(|i| i.title().to_string()), Some("song 1".into()));

    assert!(buffer.set_cursor(0));
    assert!(!buffer.set_cursor(3));
    assert_eq!(buffer.snapshot().cursor, 0);
}

#[tokio::test]
async fn prompt_restarts_from_offset_zero() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(recs("song", 10)));
    gateway.script("pl1", Ok(recs("song", 10)));
    gateway.script("pl1", Ok(recs("moody", 10)));
    let buffer = buffer(&gateway);
    buffer.reset(playlist_context("pl1")).await;
    buffer.fetch_more(false).await;
    buffer.advance();

    assert_eq!(buffer.apply_prompt("   ").await, FetchOutcome::Ignored);
    assert_eq!(gateway.recommendation_calls().len(), 2);

    assert_eq!(buffer.apply_prompt("  rainy day ").await, FetchOutcome::Applied { added: 10 });
    let (_, request) = gateway.recommendation_calls().pop().unwrap();
    assert_eq!(request.custom_prompt.as_deref(), Some("rainy day"));
    assert_eq!(request.offset, 0);
    assert!(request.clear_cache);

    let state = buffer.snapshot();
    assert_eq!(state.cursor, 0);
    assert_eq!(state.total_fetched, 10);
    assert_eq!(state.items[0].title(), "moody 0");
    assert_eq!(
        state.context.and_then(|c| c.custom_prompt).as_deref(),
        Some("rainy day")
    );

    gateway.script("pl1", Ok(recs("plain", 10)));
    buffer.clear_prompt().await;
    let (_, request) = gateway.recommendation_calls().pop().unwrap();
    assert_eq!(request.custom_prompt, None);
}

#[tokio::test]
async fn top_tracks_source_uses_time_range() {
    let gateway = FakeGateway::new();
    gateway.script("top:short_term", Ok(recs("top", 10)));
    let buffer = buffer(&gateway);

    let context = RecommendationContext::new(RecommendationSource::TopTracks(TimeRange::ShortTerm));
    assert_eq!(buffer.reset(context).await, FetchOutcome::Applied { added: 10 });

    let (source, _) = &gateway.recommendation_calls()[0];
    assert_eq!(source, "top:short_term");
}

#[tokio::test]
async fn empty_first_batch_leaves_buffer_ready_and_empty() {
    let gateway = FakeGateway::new();
    gateway.script("pl1", Ok(vec![]));
    gateway.script("pl1", Ok(recs("late", 4)));
    let buffer = buffer(&gateway);

    assert_eq!(buffer.reset(playlist_context("pl1")).await, FetchOutcome::Empty);
    let state = buffer.snapshot();
    assert!(state.items.is_empty());
    assert_eq!(state.status, BufferStatus::Ready);

    assert_eq!(buffer.fetch_more(false).await, FetchOutcome::Applied { added: 4 });
    assert_eq!(buffer.snapshot().items.len(), 4);
}
