//! LogPanel component — tail of tui.log below the friend list.
//!
//! Hidden until toggled with `L`. Follows the end of the file unless the user
//! has scrolled up.

use std::path::Path;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Borders, Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_ERROR, C_MUTED, C_PENDING, C_SECONDARY},
    widgets::pane_chrome::pane_chrome,
};

/// Lines kept from the end of tui.log.
pub const LOG_TAIL_LINES: usize = 200;

pub struct LogPanel {
    scroll: usize,
    /// Stick to the newest line as the log grows.
    follow: bool,
}

impl LogPanel {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            follow: true,
        }
    }

    fn scroll_up(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
        self.follow = false;
    }

    fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_add(n);
    }
}

impl Component for LogPanel {
    fn id(&self) -> ComponentId {
        ComponentId::LogPanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(10),
            KeyCode::PageDown => self.scroll_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.scroll_up(usize::MAX),
            KeyCode::End | KeyCode::Char('G') => self.follow = true,
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_up(3),
            MouseEventKind::ScrollDown => self.scroll_down(3),
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if *action == Action::ToggleLogs {
            self.follow = true;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);

        let block = pane_chrome("log", Some('2'), focused, None, Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let logs = &state.tui_log_lines;
        if logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("  no log entries yet ({})", state.tui_log_path.display()),
                    Style::default().fg(C_MUTED),
                )),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let max_scroll = logs.len().saturating_sub(height);
        if self.follow || self.scroll >= max_scroll {
            self.scroll = max_scroll;
            self.follow = true;
        }

        let lines: Vec<Line> = logs
            .iter()
            .skip(self.scroll)
            .take(height)
            .map(|raw| {
                let line = compact_log_line(raw);
                let color = level_color(&line);
                Line::from(vec![Span::raw(" "), Span::styled(line, Style::default().fg(color))])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

/// Last `n` lines of the log file. A missing or unreadable file reads as empty.
pub fn read_log_tail(path: &Path, n: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    lines[lines.len().saturating_sub(n)..]
        .iter()
        .map(|l| l.to_string())
        .collect()
}

// ── Log line formatting ───────────────────────────────────────────────────────

fn level_color(compact: &str) -> Color {
    // The level follows a one- or two-token timestamp.
    compact
        .split_whitespace()
        .take(3)
        .find_map(|tok| match tok {
            "ERROR" => Some(C_ERROR),
            "WARN" => Some(C_PENDING),
            "INFO" => Some(C_SECONDARY),
            _ => None,
        })
        .unwrap_or(C_MUTED)
}

/// `2026-01-02T10:11:12.345Z  INFO listen_core::session: msg` becomes
/// `10:11:12 INFO msg` (local time; date shown when not today).
fn compact_log_line(raw: &str) -> String {
    let clean = strip_ansi(raw);
    let mut rest = clean.trim();
    let mut head: Vec<String> = Vec::new();

    if let Some((tok, rem)) = split_first_token(rest) {
        if let Some(ts) = compact_timestamp(tok) {
            head.push(ts);
            rest = rem.trim_start();
        }
    }

    if let Some((tok, rem)) = split_first_token(rest) {
        let upper = tok.to_ascii_uppercase();
        if matches!(upper.as_str(), "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR") {
            head.push(upper);
            rest = rem.trim_start();
        }
    }

    // Module path target, e.g. "listen_core::poller: "
    if let Some((target, msg)) = rest.split_once(": ") {
        if !target.is_empty()
            && target.len() <= 48
            && target
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':'))
        {
            rest = msg.trim_start();
        }
    }

    match (head.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => head.join(" "),
        (false, false) => format!("{} {}", head.join(" "), rest),
    }
}

fn compact_timestamp(token: &str) -> Option<String> {
    let local = chrono::DateTime::parse_from_rfc3339(token)
        .ok()?
        .with_timezone(&chrono::Local);
    let fmt = if local.date_naive() == chrono::Local::now().date_naive() {
        "%H:%M:%S"
    } else {
        "%m-%d %H:%M"
    };
    Some(local.format(fmt).to_string())
}

fn split_first_token(s: &str) -> Option<(&str, &str)> {
    let mut parts = s.splitn(2, char::is_whitespace);
    let first = parts.next().filter(|t| !t.is_empty())?;
    Some((first, parts.next().unwrap_or("")))
}

/// Drop CSI escape sequences (`ESC [ ... final`).
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;
    for ch in s.chars() {
        if in_escape {
            if ('@'..='~').contains(&ch) && ch != '[' {
                in_escape = false;
            }
            continue;
        }
        if ch == '\u{1b}' {
            in_escape = true;
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\u{1b}[32m INFO\u{1b}[0m ready"), " INFO ready");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn test_compact_drops_target_and_keeps_level() {
        let line = compact_log_line("WARN listen_core::session: start failed");
        assert_eq!(line, "WARN start failed");
        assert_eq!(compact_log_line("just text"), "just text");
    }

    #[test]
    fn test_compact_shortens_timestamp() {
        let line = compact_log_line("2020-01-02T10:11:12.345Z ERROR listen_tui::app: boom");
        // Not today, so the date is shown.
        assert!(line.ends_with(" ERROR boom"), "got {line}");
        assert_eq!(level_color(&line), C_ERROR);
        assert_eq!(level_color("10:11:12 DEBUG noise"), C_MUTED);
    }

    #[test]
    fn test_read_log_tail_missing_file_is_empty() {
        let path = std::env::temp_dir().join("listen-along-does-not-exist.log");
        assert!(read_log_tail(&path, 10).is_empty());
    }
}
