//! Header component — 2-row top bar.
//!
//! Row 1: title, listen-along session status, session error, feed banner.
//! Row 2: server URL, last successful update, friend and live counts.
//!
//! Not focusable; draws to a 2-row area.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use listen_core::session::{SessionState, ToggleKind};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    intent::RenderHint,
    theme::{
        style_bold, C_ACCENT, C_ERROR, C_LISTENING, C_LIVE, C_MUTED, C_PENDING, C_PRIMARY,
        C_SECONDARY, C_TOAST_WARNING,
    },
};

pub struct Header;

impl Header {
    pub fn new() -> Self {
        Self
    }
}

impl Component for Header {
    fn id(&self) -> ComponentId {
        ComponentId::Header
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        if area.height < 2 {
            frame.render_widget(Clear, area);
            frame.render_widget(Paragraph::new(build_row1(state)), area);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        frame.render_widget(Clear, rows[0]);
        frame.render_widget(Paragraph::new(build_row1(state)), rows[0]);
        frame.render_widget(Clear, rows[1]);
        frame.render_widget(Paragraph::new(build_row2(state)), rows[1]);
    }
}

// ── Row 1: title / session / errors ───────────────────────────────────────────

fn build_row1(state: &AppState) -> Line<'static> {
    let mut spans = vec![
        Span::styled(" listen-along ", style_bold(C_ACCENT)),
        Span::styled("│ ", Style::default().fg(C_MUTED)),
    ];
    spans.extend(session_spans(state));

    if let Some(err) = &state.session_error {
        spans.push(Span::styled(format!("  ✗ {}", err), Style::default().fg(C_ERROR)));
    }

    if let Some(err) = state.feed.error() {
        spans.push(Span::styled(
            format!("  ⚠ {}", err),
            Style::default().fg(C_ERROR).add_modifier(Modifier::BOLD),
        ));
    } else if state.feed.is_loading() {
        spans.push(Span::styled("  loading friend activity…", Style::default().fg(C_MUTED)));
    }
    Line::from(spans)
}

/// The confirmed session, or the toggle in flight while one is pending.
pub fn session_spans(state: &AppState) -> Vec<Span<'static>> {
    if let Some(kind) = &state.pending {
        let glyph = match state.pending_hint {
            RenderHint::PendingHidden => " ",
            _ => "◔",
        };
        let text = match kind {
            ToggleKind::Start { target } => {
                format!("{} starting listen-along with {}…", glyph, state.display_name(target))
            }
            ToggleKind::Stop { target } => {
                format!("{} stopping listen-along with {}…", glyph, state.display_name(target))
            }
            ToggleKind::Switch { to, .. } => {
                format!("{} switching to {}…", glyph, state.display_name(to))
            }
        };
        let mut spans = vec![Span::styled(text, Style::default().fg(C_PENDING))];
        if state.pending_hint == RenderHint::Slow {
            spans.push(Span::styled(" (slow)", style_bold(C_TOAST_WARNING)));
        }
        return spans;
    }

    match &state.session {
        SessionState::ListeningTo(target) => vec![
            Span::styled("▶ listening along with ", Style::default().fg(C_LISTENING)),
            Span::styled(state.display_name(target).to_string(), style_bold(C_LISTENING)),
        ],
        SessionState::Idle => vec![Span::styled("■ idle", Style::default().fg(C_SECONDARY))],
    }
}

// ── Row 2: server / freshness / counts ────────────────────────────────────────

fn build_row2(state: &AppState) -> Line<'static> {
    let updated = state
        .feed
        .last_updated()
        .map(|t| format!("updated {}", t.format("%H:%M:%S")))
        .unwrap_or_else(|| "not updated yet".to_string());
    let total = state.feed.friends().len();
    let live = state.feed.live_count(state.now_ms);

    Line::from(vec![
        Span::styled(format!(" {}", state.server_url), Style::default().fg(C_SECONDARY)),
        Span::styled("  ·  ", Style::default().fg(C_MUTED)),
        Span::styled(updated, Style::default().fg(C_MUTED)),
        Span::styled("  ·  ", Style::default().fg(C_MUTED)),
        Span::styled(
            format!("{} friend{}", total, if total == 1 { "" } else { "s" }),
            Style::default().fg(C_PRIMARY),
        ),
        Span::styled("  ·  ", Style::default().fg(C_MUTED)),
        Span::styled(
            format!("{} live", live),
            Style::default().fg(if live > 0 { C_LIVE } else { C_MUTED }),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use listen_core::activity::{FriendActivity, User};
    use std::path::PathBuf;

    fn text(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn state() -> AppState {
        let mut state = AppState::new("http://localhost:3000".into(), PathBuf::new(), 0);
        state.feed.apply_friends(vec![FriendActivity {
            user: User {
                uri: "spotify:user:bob".to_string(),
                name: "Bob".to_string(),
                image_url: String::new(),
            },
            ..Default::default()
        }]);
        state
    }

    #[test]
    fn test_idle_and_listening() {
        let mut s = state();
        assert_eq!(text(&session_spans(&s)), "■ idle");

        s.session = SessionState::ListeningTo("spotify:user:bob".into());
        assert_eq!(text(&session_spans(&s)), "▶ listening along with Bob");
    }

    #[test]
    fn test_pending_overrides_confirmed_state() {
        let mut s = state();
        s.session = SessionState::ListeningTo("spotify:user:gone".into());
        s.pending = Some(ToggleKind::Switch {
            from: "spotify:user:gone".into(),
            to: "spotify:user:bob".into(),
        });
        s.pending_hint = RenderHint::PendingVisible;
        assert_eq!(text(&session_spans(&s)), "◔ switching to Bob…");

        s.pending_hint = RenderHint::Slow;
        assert!(text(&session_spans(&s)).ends_with("(slow)"));
    }

    #[test]
    fn test_row2_counts() {
        let s = state();
        let line = build_row2(&s);
        let rendered: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(rendered.contains("http://localhost:3000"));
        assert!(rendered.contains("1 friend "));
        assert!(rendered.contains("1 live"));
    }
}
