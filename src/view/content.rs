//! Recommendation carousel rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, ListItem, Paragraph, Wrap},
    Frame,
};
use ratatui::widgets::Padding;

use crate::model::{
    ActiveSection, BufferStatus, PlaybackState, RecommendationBufferState, RecommendationItem, UiState,
};
use super::utils::{focus_style, render_scrollable_list, truncate_string};

pub fn render_recommendations(
    frame: &mut Frame,
    area: Rect,
    ui_state: &UiState,
    buffer: &RecommendationBufferState,
    playback: &PlaybackState,
) {
    let focused = ui_state.active_section == ActiveSection::Recommendations;
    let title = match &buffer.context {
        Some(context) => match &context.custom_prompt {
            Some(prompt) => format!(" Recommendations · {} · \"{}\" ", context.source.label(), prompt),
            None => format!(" Recommendations · {} ", context.source.label()),
        },
        None => " Recommendations ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_bottom(Line::from(status_line(buffer)).right_aligned())
        .padding(Padding::horizontal(1))
        .border_style(focus_style(focused));

    if buffer.items.is_empty() {
        let message = match buffer.status {
            BufferStatus::FetchingInitial => "Asking for recommendations...",
            BufferStatus::Error => "Could not load recommendations. Reopen the playlist to retry.",
            _ if buffer.context.is_some() => "No recommendations for this selection",
            _ => "Select a playlist and press Enter, or press t for your top tracks",
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Current card
            Constraint::Min(0),    // Carousel
        ])
        .split(inner);

    if let Some(item) = buffer.current() {
        render_current_card(frame, chunks[0], item, buffer, playback);
    }
    render_carousel(frame, chunks[1], buffer, focused);
}

fn status_line(buffer: &RecommendationBufferState) -> String {
    match buffer.status {
        BufferStatus::FetchingInitial => " Loading... ".to_string(),
        BufferStatus::FetchingMore => format!(" {} songs · loading more... ", buffer.items.len()),
        BufferStatus::Error => " Failed to load ".to_string(),
        _ => format!(" {} songs ", buffer.items.len()),
    }
}

fn render_current_card(
    frame: &mut Frame,
    area: Rect,
    item: &RecommendationItem,
    buffer: &RecommendationBufferState,
    playback: &PlaybackState,
) {
    let playing_this = playback
        .playing_url
        .as_ref()
        .is_some_and(|url| item.preview_urls.contains(url));
    let icon = if playing_this && playback.is_playing() { "▶" } else { "⏸" };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} {}", icon, item.title()),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}/{}", buffer.cursor + 1, buffer.items.len()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::styled(
            item.artist_name().to_string(),
            Style::default().fg(Color::White),
        )),
    ];
    if let Some(track) = &item.track {
        lines.push(Line::from(Span::styled(
            track.album.name.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if !item.has_preview() {
        lines.push(Line::from(Span::styled(
            "No preview available",
            Style::default().fg(Color::Yellow),
        )));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_carousel(frame: &mut Frame, area: Rect, buffer: &RecommendationBufferState, focused: bool) {
    let width = area.width.saturating_sub(8) as usize;
    let items: Vec<ListItem> = buffer
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if i < 9 { format!("{}", i + 1) } else { " ".to_string() };
            let label = format!("{} - {}", item.title(), item.artist_name());
            let style = if i == buffer.cursor && focused {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if i == buffer.cursor {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else if !item.has_preview() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(format!("{} {}", marker, truncate_string(&label, width))).style(style)
        })
        .collect();

    let block = Block::default().borders(Borders::TOP).title(" Up next ");
    render_scrollable_list(frame, area, items, buffer.cursor, block);
}
