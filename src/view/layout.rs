//! Layout rendering (top bar, playlist sidebar, top tracks panel)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, ListItem, Paragraph},
    Frame,
};
use ratatui::widgets::Padding;

use crate::model::{ActiveSection, PlaylistState, TopTracksState, UiState};
use super::utils::{focus_style, format_duration, render_scrollable_list, truncate_string};

pub fn render_top_bar(frame: &mut Frame, area: Rect, ui_state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50), // Playlist search
            Constraint::Percentage(50), // Custom prompt
        ])
        .split(area);

    let searching = ui_state.active_section == ActiveSection::Search;
    let search_text = if ui_state.search_input.is_empty() && !searching {
        "Press / to search playlists..."
    } else {
        &ui_state.search_input
    };
    let search = Paragraph::new(search_text)
        .style(if searching {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::White)
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search ")
                .padding(Padding::horizontal(1))
                .border_style(focus_style(searching)),
        );
    frame.render_widget(search, chunks[0]);

    let prompt_text = if ui_state.editing_prompt {
        format!("{}▏", ui_state.prompt_input)
    } else if ui_state.prompt_input.is_empty() {
        "Press e to describe the vibe you want".to_string()
    } else {
        ui_state.prompt_input.clone()
    };
    let prompt = Paragraph::new(prompt_text)
        .style(if ui_state.editing_prompt {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Custom prompt ")
                .padding(Padding::horizontal(1))
                .border_style(if ui_state.editing_prompt {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                }),
        );
    frame.render_widget(prompt, chunks[1]);
}

pub fn render_sidebar(
    frame: &mut Frame,
    area: Rect,
    ui_state: &UiState,
    playlists: &PlaylistState,
    top_tracks: &TopTracksState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(65), // Playlists page
            Constraint::Percentage(35), // Top tracks
        ])
        .split(area);

    render_playlists(frame, chunks[0], ui_state, playlists);
    render_top_tracks(frame, chunks[1], ui_state, top_tracks);
}

fn render_playlists(frame: &mut Frame, area: Rect, ui_state: &UiState, playlists: &PlaylistState) {
    let focused = ui_state.active_section == ActiveSection::Playlists;
    let pagination = playlists.active_pagination();

    let title = if playlists.search.active {
        format!(" Playlists matching \"{}\" ", playlists.search.query.trim())
    } else {
        " Playlists ".to_string()
    };
    let footer = if playlists.loading {
        " Loading... ".to_string()
    } else {
        format!(
            " Page {}/{} · {} total ",
            pagination.page(),
            pagination.page_count(),
            pagination.total
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_bottom(Line::from(footer).right_aligned())
        .padding(Padding::horizontal(1))
        .border_style(focus_style(focused));

    let displayed = playlists.displayed();
    if displayed.is_empty() {
        let message = if playlists.loading {
            "Loading playlists..."
        } else if playlists.search.active {
            "No playlists match your search"
        } else if playlists.error.is_some() {
            "Could not load playlists (r to retry)"
        } else {
            "No playlists yet"
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let name_width = area.width.saturating_sub(14) as usize;
    let items: Vec<ListItem> = displayed
        .iter()
        .enumerate()
        .map(|(i, playlist)| {
            let style = if i == ui_state.playlist_selected && focused {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if i == ui_state.playlist_selected {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(format!(
                "{}  ({})",
                truncate_string(&playlist.name, name_width),
                playlist.tracks.total
            ))
            .style(style)
        })
        .collect();

    render_scrollable_list(frame, area, items, ui_state.playlist_selected, block);
}

fn render_top_tracks(frame: &mut Frame, area: Rect, ui_state: &UiState, top_tracks: &TopTracksState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Top tracks · {} (y) ", ui_state.top_tracks_range.label()))
        .padding(Padding::horizontal(1));

    if top_tracks.loading || top_tracks.tracks.is_empty() {
        let message = if top_tracks.loading {
            "Loading top tracks..."
        } else if top_tracks.error.is_some() {
            "Could not load top tracks"
        } else {
            "Press t for recommendations from your top tracks"
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let width = area.width.saturating_sub(12) as usize;
    let items: Vec<ListItem> = top_tracks
        .tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let label = format!(
                "{} - {}",
                track.name,
                track.primary_artist().unwrap_or("Unknown Artist")
            );
            ListItem::new(format!(
                "{:>2}. {} {}",
                i + 1,
                truncate_string(&label, width),
                format_duration(track.duration_ms)
            ))
            .style(Style::default().fg(Color::White))
        })
        .collect();

    render_scrollable_list(frame, area, items, 0, block);
}
