//! Overlay rendering (error notification, notice toast, help popup)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::model::UiState;

const HELP: &[(&str, &str)] = &[
    ("", "── Navigation ──"),
    ("Tab / Shift+Tab", "Cycle sections"),
    ("↑ / ↓", "Move selection"),
    ("/ or G", "Search playlists"),
    ("L", "Focus playlists"),
    ("← / → or [ / ]", "Previous / next page"),
    ("Enter", "Recommend from playlist"),
    ("R", "Reload playlists"),
    ("", ""),
    ("", "── Recommendations ──"),
    ("T", "Recommend from top tracks"),
    ("Y", "Cycle top tracks range"),
    ("E", "Edit custom prompt"),
    ("X", "Clear custom prompt"),
    ("A", "Add song to playlist"),
    ("1-9", "Jump to song"),
    ("", ""),
    ("", "── Playback ──"),
    ("Space / Enter", "Play / Pause"),
    ("N / P or ← / →", "Next / previous song"),
    ("< / >", "Seek 5 seconds"),
    ("+ / -", "Volume up / down"),
    ("", ""),
    ("", "── General ──"),
    ("H", "Toggle this help"),
    ("Q", "Quit"),
];

/// A `width` x `height` rect centred in `area`, shrunk to leave a margin
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

fn popup_block(title: Option<&str>, color: Color) -> Block<'_> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(Color::Black));
    match title {
        Some(title) => block
            .title(title)
            .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        None => block,
    }
}

pub fn render_error_notification(frame: &mut Frame, ui_state: &UiState) {
    let Some(message) = ui_state.error_message.as_deref() else {
        return;
    };
    let width: u16 = 52;
    // Borders and padding take four columns
    let text_width = usize::from(width.saturating_sub(4)).max(1);
    let wrapped_lines = message.chars().count().div_ceil(text_width).max(1) as u16;
    let popup = centered(frame.area(), width, wrapped_lines + 2);

    frame.render_widget(Clear, popup);
    let widget = Paragraph::new(message)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false })
        .block(popup_block(Some(" Error (Esc to dismiss) "), Color::Red));
    frame.render_widget(widget, popup);
}

/// Transient confirmation in the bottom-right corner
pub fn render_notice(frame: &mut Frame, ui_state: &UiState) {
    let Some(notice) = ui_state.notice.as_deref() else {
        return;
    };
    let area = frame.area();
    let width = (notice.chars().count() as u16 + 4).min(area.width.saturating_sub(4));
    let popup = Rect {
        x: area.width.saturating_sub(width + 2),
        y: area.height.saturating_sub(7),
        width,
        height: 3.min(area.height),
    };

    frame.render_widget(Clear, popup);
    let widget = Paragraph::new(notice)
        .style(Style::default().fg(Color::Cyan))
        .block(popup_block(None, Color::Cyan));
    frame.render_widget(widget, popup);
}

pub fn render_help_popup(frame: &mut Frame) {
    let popup = centered(frame.area(), 62, HELP.len() as u16 + 2);

    let heading = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let key_style = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
    let lines: Vec<Line> = HELP
        .iter()
        .map(|&(key, description)| match key {
            "" => Line::from(Span::styled(format!("{:^38}", description), heading)),
            _ => Line::from(vec![
                Span::styled(format!("{:>18}", key), key_style),
                Span::raw("  "),
                Span::styled(description, Style::default().fg(Color::White)),
            ]),
        })
        .collect();

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(popup_block(Some(" Help (H or Esc to close) "), Color::Cyan)),
        popup,
    );
}
