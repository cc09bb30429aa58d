//! FriendList component — the friend activity feed.
//!
//! Rows are keyed by `user.uri`, so the cursor stays on the same friend when
//! a poll reorders or replaces the list.

use std::time::Instant;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use listen_core::activity::{open_url, FriendActivity};
use listen_core::freshness;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    intent::RenderHint,
    theme::{
        style_muted, C_ARTIST, C_CONTEXT, C_ERROR, C_LISTENING, C_LIVE, C_MUTED, C_PENDING,
        C_PRIMARY, C_SECONDARY, C_SELECTION_BG,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

const NAME_WIDTH: usize = 18;
const DOUBLE_CLICK_MS: u128 = 400;

pub struct FriendList {
    list: ScrollableList<FriendActivity>,
    filter_input: FilterInput,
    list_state: ListState,
    /// (row, time) of the last click, for double-click detection.
    last_click: Option<(usize, Instant)>,
}

impl FriendList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(
                |f: &FriendActivity| f.user.uri.clone(),
                |f: &FriendActivity, q: &str| friend_matches(f, q),
            ),
            filter_input: FilterInput::new("friend, track, artist, album, playlist…"),
            list_state: ListState::default(),
            last_click: None,
        }
    }

    /// Pull the latest feed into the list (display order).
    pub fn sync(&mut self, state: &AppState) {
        let friends = state.feed.display_order().into_iter().cloned().collect();
        self.list.set_items(friends);
    }

    pub fn selected(&self) -> Option<&FriendActivity> {
        self.list.selected_item()
    }

    pub fn is_filter_active(&self) -> bool {
        self.filter_input.is_active()
    }

    fn toggle_selected(&self) -> Vec<Action> {
        self.selected()
            .map(|f| vec![Action::Toggle(f.user.uri.clone())])
            .unwrap_or_default()
    }

    fn copy_link(&self, what: &str, pick: fn(&FriendActivity) -> &str) -> Vec<Action> {
        let Some(friend) = self.selected() else {
            return vec![];
        };
        match open_url(pick(friend)) {
            Some(url) => vec![Action::CopyToClipboard(url)],
            None => vec![Action::Notify(format!("no {} link for {}", what, friend.user.name))],
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Vec<Action> {
        match key.code {
            KeyCode::Up => {
                self.list.select_up(1);
                return vec![];
            }
            KeyCode::Down => {
                self.list.select_down(1);
                return vec![];
            }
            _ => {}
        }
        match self.filter_input.handle_key(key) {
            FilterAction::Changed(q) => {
                self.list.set_filter(&q);
                vec![]
            }
            FilterAction::Confirmed => vec![Action::CloseFilter],
            FilterAction::Cancelled => {
                self.list.set_filter("");
                vec![Action::CloseFilter]
            }
        }
    }

    fn render_row(&self, friend: &FriendActivity, selected: bool, width: usize, state: &AppState) -> ListItem<'static> {
        let uri = friend.user.uri.as_str();
        let live = freshness::is_active_at(friend.timestamp, state.now_ms);

        let (marker, marker_color): (&str, Color) = if state.is_pending_for(uri) {
            match state.pending_hint {
                RenderHint::PendingVisible => ("◔", C_PENDING),
                RenderHint::PendingHidden => (" ", C_PENDING),
                RenderHint::Slow => ("◔", C_ERROR),
                RenderHint::Normal => (" ", C_MUTED),
            }
        } else if state.session.is_listening_to(uri) {
            ("▶", C_LISTENING)
        } else {
            (" ", C_MUTED)
        };

        let (dot, dot_color) = if live { ("●", C_LIVE) } else { ("·", C_MUTED) };

        let name_color = if state.session.is_listening_to(uri) {
            C_LISTENING
        } else if selected || live {
            C_PRIMARY
        } else {
            C_SECONDARY
        };
        let mut name_style = Style::default().fg(name_color);
        if selected {
            name_style = name_style.add_modifier(Modifier::BOLD);
        }

        let elapsed = freshness::elapsed_label_at(friend.timestamp, state.now_ms);
        let context = &friend.track.context;
        let glyph = context.kind().glyph();

        // " ● ▶ name            track · artist   ≡ context      1:30 "
        let name = pad(&fit(&friend.user.name, NAME_WIDTH), NAME_WIDTH);
        let fixed = 6 + NAME_WIDTH + 2 + elapsed.width() + 1;
        let mut budget = width.saturating_sub(fixed);

        let track = fit(&friend.track.name, budget);
        budget = budget.saturating_sub(track.width());
        let artist = if friend.track.artist.name.is_empty() || budget < 4 {
            String::new()
        } else {
            format!(" · {}", fit(&friend.track.artist.name, budget - 3))
        };
        budget = budget.saturating_sub(artist.width());
        let context_text = if context.name.is_empty() || budget < 5 {
            String::new()
        } else {
            format!("   {} {}", glyph, fit(&context.name, budget - 5))
        };
        budget = budget.saturating_sub(context_text.width());

        let dim = if live { C_SECONDARY } else { C_MUTED };
        let spans = vec![
            Span::raw(" "),
            Span::styled(dot, Style::default().fg(dot_color)),
            Span::raw(" "),
            Span::styled(marker, Style::default().fg(marker_color).add_modifier(Modifier::BOLD)),
            Span::raw(" "),
            Span::styled(name, name_style),
            Span::raw("  "),
            Span::styled(track, Style::default().fg(if live { C_PRIMARY } else { C_SECONDARY })),
            Span::styled(artist, Style::default().fg(if live { C_ARTIST } else { dim })),
            Span::styled(context_text, Style::default().fg(if live { C_CONTEXT } else { dim })),
            Span::raw(" ".repeat(budget)),
            Span::styled(elapsed, Style::default().fg(if live { C_LIVE } else { C_MUTED })),
            Span::raw(" "),
        ];

        let bg = if selected {
            Style::default().bg(C_SELECTION_BG)
        } else {
            Style::default()
        };
        ListItem::new(Line::from(spans)).style(bg)
    }

    fn badge(state: &AppState) -> Option<Badge> {
        if state.feed.error().is_some() {
            return Some(Badge {
                text: "ERR".to_string(),
                color: C_ERROR,
            });
        }
        let live = state.feed.live_count(state.now_ms);
        (live > 0).then(|| Badge {
            text: format!("{} live", live),
            color: C_LIVE,
        })
    }
}

impl Default for FriendList {
    fn default() -> Self {
        Self::new()
    }
}

fn friend_matches(friend: &FriendActivity, query: &str) -> bool {
    let text = [
        friend.user.name.as_str(),
        friend.track.name.as_str(),
        friend.track.artist.name.as_str(),
        friend.track.album.name.as_str(),
        friend.track.context.name.as_str(),
    ]
    .join(" ")
    .to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .all(|term| text.contains(term))
}

/// Truncate to `max` display columns, ending in "…" when cut.
fn fit(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn pad(s: &str, width: usize) -> String {
    format!("{}{}", s, " ".repeat(width.saturating_sub(s.width())))
}

impl Component for FriendList {
    fn id(&self) -> ComponentId {
        ComponentId::FriendList
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if self.filter_input.is_active() {
            return self.handle_filter_key(key);
        }

        let step = if key.modifiers.contains(KeyModifiers::SHIFT) { 5 } else { 1 };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(step),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(step),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),

            KeyCode::Enter | KeyCode::Char(' ') => return self.toggle_selected(),

            KeyCode::Char('/') => {
                self.filter_input.activate();
                return vec![Action::OpenFilter];
            }

            KeyCode::Char('y') => return self.copy_link("track", |f| f.track.uri.as_str()),
            KeyCode::Char('u') => return self.copy_link("profile", |f| f.user.uri.as_str()),
            KeyCode::Char('c') => return self.copy_link("context", |f| f.track.context.uri.as_str()),
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        let row = event.row.saturating_sub(area.y + 1) as usize; // +1 for the border
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let is_double = self
                    .last_click
                    .map_or(false, |(r, t)| r == row && t.elapsed().as_millis() < DOUBLE_CLICK_MS);
                if self.list.handle_click(row) && is_double {
                    self.last_click = None;
                    return self.toggle_selected();
                }
                self.last_click = Some((row, Instant::now()));
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        match action {
            Action::CloseFilter => self.filter_input.deactivate(),
            // A click elsewhere leaves filter mode too.
            Action::FocusPane(id) if *id != ComponentId::FriendList && self.is_filter_active() => {
                self.filter_input.deactivate();
                return vec![Action::CloseFilter];
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        // Keep the query visible after the filter bar closes.
        let query = self.filter_input.text();
        let title = if query.is_empty() {
            "friends".to_string()
        } else {
            format!("friends /{} ({}/{})", query, self.list.len(), self.list.total_len())
        };
        let block = pane_chrome(&title, Some('1'), focused, Self::badge(state), Borders::ALL);
        let mut inner = block.inner(area);
        frame.render_widget(block, area);

        if self.filter_input.is_active() && inner.height > 1 {
            let filter_area = Rect {
                y: inner.y + inner.height - 1,
                height: 1,
                ..inner
            };
            self.filter_input.draw(frame, filter_area);
            inner.height -= 1;
        }

        let empty_message = if state.feed.is_loading() {
            Some(format!("  loading friend activity from {}…", state.server_url))
        } else if self.list.total_len() == 0 {
            Some("  no friend activity yet".to_string())
        } else if self.list.is_empty() {
            Some("  no friends match filter".to_string())
        } else {
            None
        };
        if let Some(msg) = empty_message {
            frame.render_widget(Paragraph::new(Span::styled(msg, style_muted())), inner);
            return;
        }

        let height = inner.height as usize;
        self.list.ensure_visible(height);
        let sel_in_view = self.list.selected_in_view(height);
        let items: Vec<ListItem> = self
            .list
            .visible_items(height)
            .into_iter()
            .enumerate()
            .map(|(row, friend)| self.render_row(friend, row == sel_in_view, inner.width as usize, state))
            .collect();

        self.list_state.select(Some(sel_in_view));
        frame.render_stateful_widget(List::new(items), inner, &mut self.list_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listen_core::activity::{NamedRef, PlayContext, Track, User};
    use std::path::PathBuf;

    fn friend(uri: &str, name: &str, track: &str, context_uri: &str) -> FriendActivity {
        FriendActivity {
            timestamp: 0,
            user: User {
                uri: uri.to_string(),
                name: name.to_string(),
                image_url: String::new(),
            },
            track: Track {
                uri: format!("spotify:track:{}", track.len()),
                name: track.to_string(),
                artist: NamedRef {
                    uri: "spotify:artist:1".to_string(),
                    name: "Rick Astley".to_string(),
                },
                context: PlayContext {
                    uri: context_uri.to_string(),
                    name: "80s Hits".to_string(),
                    index: 0,
                },
                ..Default::default()
            },
        }
    }

    fn state_with(friends: Vec<FriendActivity>) -> AppState {
        let mut state = AppState::new(String::new(), PathBuf::new(), 0);
        state.feed.apply_friends(friends);
        state
    }

    fn press(list: &mut FriendList, state: &AppState, code: KeyCode) -> Vec<Action> {
        list.handle_key(KeyEvent::new(code, KeyModifiers::NONE), state)
    }

    #[test]
    fn test_rows_follow_display_order_and_keep_selection() {
        let a = friend("spotify:user:a", "Alice", "Song", "spotify:playlist:1");
        let b = friend("spotify:user:b", "Bob", "Tune", "spotify:album:1");
        let mut state = state_with(vec![a.clone(), b.clone()]);

        let mut list = FriendList::new();
        list.sync(&state);
        // Reversed: Bob first.
        assert_eq!(list.selected().unwrap().user.name, "Bob");

        press(&mut list, &state, KeyCode::Char('j'));
        assert_eq!(list.selected().unwrap().user.name, "Alice");

        state.feed.apply_friends(vec![b, a]);
        list.sync(&state);
        assert_eq!(list.selected().unwrap().user.name, "Alice");
    }

    #[test]
    fn test_enter_toggles_selected_friend() {
        let state = state_with(vec![friend("spotify:user:a", "Alice", "Song", "")]);
        let mut list = FriendList::new();
        list.sync(&state);
        assert_eq!(
            press(&mut list, &state, KeyCode::Enter),
            vec![Action::Toggle("spotify:user:a".to_string())]
        );
    }

    #[test]
    fn test_copy_links() {
        let state = state_with(vec![friend("spotify:user:a", "Alice", "Song", "")]);
        let mut list = FriendList::new();
        list.sync(&state);

        assert_eq!(
            press(&mut list, &state, KeyCode::Char('u')),
            vec![Action::CopyToClipboard("https://open.spotify.com/user/a".to_string())]
        );
        assert!(matches!(
            press(&mut list, &state, KeyCode::Char('c')).as_slice(),
            [Action::Notify(_)]
        ));
    }

    #[test]
    fn test_filter_matches_any_field() {
        let f = friend("spotify:user:a", "Alice", "Never Gonna", "spotify:playlist:1");
        assert!(friend_matches(&f, "alice"));
        assert!(friend_matches(&f, "rick gonna"));
        assert!(friend_matches(&f, "80s"));
        assert!(!friend_matches(&f, "metal"));
    }

    #[test]
    fn test_fit_truncates_by_display_width() {
        assert_eq!(fit("short", 10), "short");
        assert_eq!(fit("a longer title", 6), "a lon…");
        assert_eq!(fit("日本語タイトル", 5), "日本…");
        assert_eq!(fit("anything", 0), "");
        assert_eq!(pad("ab", 4), "ab  ");
    }
}
