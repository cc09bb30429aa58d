//! Keys bar — bottom line with input mode, session lamp and keybindings.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{style_bold, C_LISTENING, C_MODE_FILTER, C_MODE_NORMAL, C_MUTED, C_PENDING};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Filter => "FILTER",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Filter => C_MODE_FILTER,
        }
    }
}

/// Lamp next to the mode label: listening, waiting on the server, or idle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionLamp {
    Idle,
    Pending,
    Listening,
}

impl SessionLamp {
    fn color(self) -> Color {
        match self {
            Self::Idle => C_MUTED,
            Self::Pending => C_PENDING,
            Self::Listening => C_LISTENING,
        }
    }
}

pub fn keys_for(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => {
            " ↑↓/jk select  Enter listen along  x stop  r refresh  y/u/c copy link  / filter  Tab panes  K keys  L logs  ? help  q quit"
        }
        InputMode::Filter => " type to filter  Up/Down move  Enter keep  Esc clear+close  Tab next pane",
    }
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, lamp: SessionLamp) {
    let mut spans = vec![Span::styled(format!(" {} ", mode.label()), style_bold(mode.color()))];
    if mode == InputMode::Normal {
        spans.push(Span::styled("●", style_bold(lamp.color())));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(keys_for(mode), Style::default().fg(C_MUTED)));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
