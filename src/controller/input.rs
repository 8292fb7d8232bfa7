//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::{ActiveSection, AppModel};
use super::AppController;

/// Work that needs the network or the player, run after the model lock is released
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    NextPage,
    PreviousPage,
    RefreshPlaylists,
    OpenSelectedPlaylist,
    OpenTopTracks,
    CycleTopTracksRange,
    ApplyPrompt,
    ClearPrompt,
    TogglePlayback,
    NextSong,
    PreviousSong,
    JumpTo(usize),
    SeekForward,
    SeekBackward,
    VolumeUp,
    VolumeDown,
    AddToPlaylist,
}

impl Action {
    /// Waits on the network, so it runs in the background
    fn is_remote(self) -> bool {
        matches!(
            self,
            Action::NextPage
                | Action::PreviousPage
                | Action::RefreshPlaylists
                | Action::OpenSelectedPlaylist
                | Action::OpenTopTracks
                | Action::CycleTopTracksRange
                | Action::ApplyPrompt
                | Action::ClearPrompt
                | Action::AddToPlaylist
        )
    }
}

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let action = {
            let model = self.model.lock().await;
            resolve_key(&model, key).await
        };
        let Some(action) = action else {
            return Ok(());
        };
        tracing::trace!(?action, "Key action");
        if action.is_remote() {
            let controller = self.clone();
            tokio::spawn(async move {
                controller.dispatch(action).await;
            });
        } else {
            self.dispatch(action).await;
        }
        Ok(())
    }

    async fn dispatch(&self, action: Action) {
        match action {
            Action::NextPage => self.next_page().await,
            Action::PreviousPage => self.previous_page().await,
            Action::RefreshPlaylists => self.refresh_playlists().await,
            Action::OpenSelectedPlaylist => self.open_selected_playlist().await,
            Action::OpenTopTracks => self.open_top_track_recommendations().await,
            Action::CycleTopTracksRange => self.cycle_top_tracks_range().await,
            Action::ApplyPrompt => self.apply_prompt().await,
            Action::ClearPrompt => self.clear_prompt().await,
            Action::TogglePlayback => self.toggle_playback().await,
            Action::NextSong => self.next_song().await,
            Action::PreviousSong => self.previous_song().await,
            Action::JumpTo(index) => self.jump_to(index).await,
            Action::SeekForward => self.seek_forward().await,
            Action::SeekBackward => self.seek_backward().await,
            Action::VolumeUp => self.volume_up().await,
            Action::VolumeDown => self.volume_down().await,
            Action::AddToPlaylist => self.add_current_to_playlist().await,
        }
    }
}

/// Apply UI-only effects of `key` and return the action it asks for, if any.
///
/// An open error swallows every key except dismissal, then help, then prompt
/// editing, then the search box take priority over section and global keys.
async fn resolve_key(model: &AppModel, key: KeyEvent) -> Option<Action> {
    if model.has_error().await {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            model.clear_error().await;
        }
        return None;
    }

    if model.is_help_popup_open().await {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('h' | 'H')) {
            model.hide_help_popup().await;
        }
        return None;
    }

    if model.is_editing_prompt().await {
        match key.code {
            KeyCode::Enter => return Some(Action::ApplyPrompt),
            KeyCode::Esc => model.cancel_prompt_edit().await,
            KeyCode::Backspace => model.backspace_prompt().await,
            KeyCode::Char(c) => model.append_to_prompt(c).await,
            _ => {}
        }
        return None;
    }

    let section = model.get_ui_state().await.active_section;
    let backwards = key.modifiers.contains(KeyModifiers::SHIFT);

    if section == ActiveSection::Search {
        match key.code {
            KeyCode::Tab if backwards => model.cycle_section_backward().await,
            KeyCode::Tab => model.cycle_section_forward().await,
            KeyCode::BackTab => model.cycle_section_backward().await,
            KeyCode::Enter | KeyCode::Down => model.set_active_section(ActiveSection::Playlists).await,
            // Blank queries never fetch, so this returns promptly
            KeyCode::Esc => model.clear_search_input().await,
            KeyCode::Backspace => model.backspace_search().await,
            KeyCode::Char('q' | 'Q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                model.set_should_quit(true).await
            }
            KeyCode::Char(c) => model.append_to_search(c).await,
            _ => {}
        }
        return None;
    }

    match (section, key.code) {
        (ActiveSection::Playlists, KeyCode::Right) => return Some(Action::NextPage),
        (ActiveSection::Playlists, KeyCode::Left) => return Some(Action::PreviousPage),
        (ActiveSection::Playlists, KeyCode::Enter) => return Some(Action::OpenSelectedPlaylist),
        (ActiveSection::Recommendations, KeyCode::Right) => return Some(Action::NextSong),
        (ActiveSection::Recommendations, KeyCode::Left) => return Some(Action::PreviousSong),
        (ActiveSection::Recommendations, KeyCode::Enter) => return Some(Action::TogglePlayback),
        (ActiveSection::Recommendations, KeyCode::Char(c @ '1'..='9')) => {
            return Some(Action::JumpTo(c as usize - '1' as usize));
        }
        _ => {}
    }

    let action = match key.code {
        KeyCode::PageDown | KeyCode::Char(']') => Action::NextPage,
        KeyCode::PageUp | KeyCode::Char('[') => Action::PreviousPage,
        KeyCode::Char('r' | 'R') => Action::RefreshPlaylists,
        KeyCode::Char(' ') => Action::TogglePlayback,
        KeyCode::Char('n' | 'N') => Action::NextSong,
        KeyCode::Char('p' | 'P') => Action::PreviousSong,
        KeyCode::Char('.' | '>') => Action::SeekForward,
        KeyCode::Char(',' | '<') => Action::SeekBackward,
        KeyCode::Char('+' | '=') => Action::VolumeUp,
        KeyCode::Char('-') => Action::VolumeDown,
        KeyCode::Char('t' | 'T') => Action::OpenTopTracks,
        KeyCode::Char('y' | 'Y') => Action::CycleTopTracksRange,
        KeyCode::Char('x' | 'X') => Action::ClearPrompt,
        KeyCode::Char('a' | 'A') => Action::AddToPlaylist,
        code => {
            match code {
                KeyCode::Char('q' | 'Q') => model.set_should_quit(true).await,
                KeyCode::Tab if backwards => model.cycle_section_backward().await,
                KeyCode::Tab => model.cycle_section_forward().await,
                KeyCode::BackTab => model.cycle_section_backward().await,
                KeyCode::Up => model.move_selection_up().await,
                KeyCode::Down => model.move_selection_down().await,
                KeyCode::Char('e' | 'E') => model.start_prompt_edit().await,
                KeyCode::Char('/' | 'g' | 'G') => model.set_active_section(ActiveSection::Search).await,
                KeyCode::Char('l' | 'L') => model.set_active_section(ActiveSection::Playlists).await,
                KeyCode::Char('h' | 'H') => model.show_help_popup().await,
                _ => {}
            }
            return None;
        }
    };
    Some(action)
}
