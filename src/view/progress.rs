//! Progress bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::{PlaybackState, PlaybackStatus, RecommendationBufferState};
use super::utils::format_time;

pub fn render_progress_bar(
    frame: &mut Frame,
    area: Rect,
    playback: &PlaybackState,
    buffer: &RecommendationBufferState,
) {
    let now_playing = buffer
        .current()
        .map(|item| format!("{} | {}", item.title(), item.artist_name()));

    let status_text = match (playback.status, now_playing) {
        (PlaybackStatus::Empty, _) | (_, None) => " Nothing playing".to_string(),
        (PlaybackStatus::Loading, Some(label)) => format!(" … {}", label),
        (PlaybackStatus::Playing, Some(label)) => format!(" ▶ {}", label),
        (PlaybackStatus::Paused, Some(label)) => format!("⏸  {}", label),
        (PlaybackStatus::Ended, Some(label)) => format!(" ■ {}", label),
        (PlaybackStatus::Error, Some(label)) => format!(" ✕ {}", label),
    };

    let volume_text = format!(" Vol: {}% ", (playback.volume * 100.0).round() as u32);
    let time_str = format!(
        "{} / {}",
        format_time(playback.current_time),
        format_time(playback.duration)
    );

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ", status_text))
                .title_bottom(Line::from(volume_text).right_aligned()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(playback.ratio())
        .label(time_str);

    frame.render_widget(gauge, area);
}
