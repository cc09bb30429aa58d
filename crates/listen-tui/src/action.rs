//! Action enum — all user-initiated intents and internal events.

/// Identifies a component for focus and mouse hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Header,
    FriendList,
    LogPanel,
    HelpOverlay,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Listen along ─────────────────────────────────────────────────────────
    /// Listen-along pressed on the friend with this user URI.
    Toggle(String),
    /// End the current session whatever the friend's freshness.
    StopListening,
    /// Poll now instead of waiting for the next interval.
    RefreshNow,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),

    // ── Filter/search ────────────────────────────────────────────────────────
    OpenFilter,
    CloseFilter,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleLogs,
    ToggleHelp,
    ToggleKeys,
    CopyToClipboard(String),
    /// Shown as a toast (e.g. "no link for this item").
    Notify(String),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
