//! Color palette and style constants for the listen-along TUI.
//!
//! Green marks anything live or joined, amber anything waiting on the server.

use ratatui::style::{Color, Modifier, Style};

// ── Palette ───────────────────────────────────────────────────────────────────

pub const C_BG: Color = Color::Rgb(14, 15, 16);
pub const C_ACCENT: Color = Color::Rgb(30, 215, 96);
pub const C_LISTENING: Color = Color::Rgb(30, 215, 96);
pub const C_LIVE: Color = Color::Rgb(94, 196, 128);
pub const C_PENDING: Color = Color::Rgb(240, 178, 72);
pub const C_ERROR: Color = Color::Rgb(236, 86, 86);
pub const C_MUTED: Color = Color::Rgb(84, 88, 96);
pub const C_SECONDARY: Color = Color::Rgb(132, 138, 148);
pub const C_PRIMARY: Color = Color::Rgb(224, 226, 230);
pub const C_SELECTION_BG: Color = Color::Rgb(30, 36, 34);
pub const C_PANEL_BORDER: Color = Color::Rgb(44, 48, 52);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(70, 150, 100);
pub const C_NUMBER_HINT: Color = Color::Rgb(100, 106, 116);
pub const C_FILTER_BG: Color = Color::Rgb(22, 26, 28);
pub const C_FILTER_FG: Color = C_PENDING;
pub const C_ARTIST: Color = Color::Rgb(176, 150, 224);
pub const C_CONTEXT: Color = Color::Rgb(96, 156, 210);
pub const C_HELP_BG: Color = Color::Rgb(18, 20, 22);

// Toasts
pub const C_TOAST_INFO: Color = C_CONTEXT;
pub const C_TOAST_SUCCESS: Color = C_LIVE;
pub const C_TOAST_WARNING: Color = C_PENDING;
pub const C_TOAST_ERROR: Color = C_ERROR;

// Keys bar mode labels
pub const C_MODE_NORMAL: Color = C_SECONDARY;
pub const C_MODE_FILTER: Color = C_PENDING;

// ── Styles ────────────────────────────────────────────────────────────────────

pub fn style_focused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER_FOCUSED)
}

pub fn style_unfocused_border() -> Style {
    Style::default().fg(C_PANEL_BORDER)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

pub fn style_bold(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}
