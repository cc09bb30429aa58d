//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this but never mutate it; the App event loop is the only
//! writer. Session fields mirror the `ListenSessionController` the App owns.

use std::path::PathBuf;

use listen_core::poller::FeedState;
use listen_core::session::{SessionState, ToggleKind};

use crate::intent::RenderHint;
use crate::widgets::status_bar::InputMode;

pub struct AppState {
    // ── Feed ────────────────────────────────────────────────────────────────
    pub feed: FeedState,
    /// Wall clock (epoch ms) as of the last refresh tick; every freshness
    /// label in a frame is computed against this one value.
    pub now_ms: i64,
    pub server_url: String,

    // ── Session ─────────────────────────────────────────────────────────────
    /// Server-confirmed session.
    pub session: SessionState,
    /// Toggle waiting for the server, if any.
    pub pending: Option<ToggleKind>,
    pub pending_hint: RenderHint,
    pub session_error: Option<String>,

    // ── UI ──────────────────────────────────────────────────────────────────
    pub input_mode: InputMode,
    /// Cached tail of tui.log (refreshed periodically by App).
    pub tui_log_lines: Vec<String>,
    pub tui_log_path: PathBuf,
}

impl AppState {
    pub fn new(server_url: String, tui_log_path: PathBuf, now_ms: i64) -> Self {
        Self {
            feed: FeedState::new(),
            now_ms,
            server_url,
            session: SessionState::Idle,
            pending: None,
            pending_hint: RenderHint::Normal,
            session_error: None,
            input_mode: InputMode::Normal,
            tui_log_lines: Vec::new(),
            tui_log_path,
        }
    }

    /// Display name for a user URI; falls back to the URI once the friend
    /// has dropped out of the feed.
    pub fn display_name<'a>(&'a self, user_uri: &'a str) -> &'a str {
        self.feed
            .find(user_uri)
            .map(|f| f.user.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(user_uri)
    }

    /// True while a toggle touching this friend is in flight.
    pub fn is_pending_for(&self, user_uri: &str) -> bool {
        self.pending
            .as_ref()
            .map_or(false, |kind| kind.involves(user_uri))
    }
}
