//! App — component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks:
//!   terminal input, poll results and finished listen-along toggles.
//! - The event loop draws each frame, then awaits the next message or timer.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Toggles run as spawned tasks; their outcome comes back as a message and is
//!   the only thing that changes the session shown on screen.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use listen_core::activity::FriendActivity;
use listen_core::client::ApiClient;
use listen_core::config::Config;
use listen_core::error::{ApiError, SessionError};
use listen_core::freshness;
use listen_core::poller::{ActivityPoller, PollHandle};
use listen_core::session::{
    ListenSessionController, SessionState, ToggleKind, ToggleOutcome, TogglePlan, ToggleSkipped,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{
        friend_list::FriendList,
        header::Header,
        help_overlay::HelpOverlay,
        log_panel::{read_log_tail, LogPanel, LOG_TAIL_LINES},
    },
    focus::FocusRing,
    intent,
    widgets::{
        status_bar::{self, InputMode, SessionLamp},
        toast::ToastManager,
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    PollData(Vec<FriendActivity>),
    PollError(ApiError),
    ToggleDone(ToggleOutcome),
}

const LOG_PANEL_HEIGHT: u16 = 10;

/// Screen areas from the last frame, for mouse hit-testing.
#[derive(Debug, Clone, Copy, Default)]
struct PaneAreas {
    friend_list: Rect,
    log_panel: Rect,
}

pub struct App {
    state: AppState,

    // ── Components ────────────────────────────────────────────────────────────
    header: Header,
    friend_list: FriendList,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,

    focus: FocusRing,
    show_log_panel: bool,
    show_keys_bar: bool,
    toast: ToastManager,
    pane_areas: PaneAreas,

    // ── Server side ───────────────────────────────────────────────────────────
    api: Arc<ApiClient>,
    controller: ListenSessionController,
    poll_interval: Duration,
    clock_refresh: Duration,
    poll: Option<PollHandle>,
    /// Cancels every toggle task still waiting on the server.
    toggles: CancellationToken,

    tx: Option<mpsc::Sender<AppMessage>>,
    should_quit: bool,
}

impl App {
    pub fn new(api: ApiClient, config: &Config, tui_log_path: PathBuf) -> Self {
        let state = AppState::new(
            api.base_url().to_string(),
            tui_log_path,
            freshness::now_millis(),
        );
        Self {
            state,
            header: Header::new(),
            friend_list: FriendList::new(),
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay::new(),
            focus: FocusRing::new(vec![ComponentId::FriendList]),
            show_log_panel: false,
            show_keys_bar: true,
            toast: ToastManager::new(),
            pane_areas: PaneAreas::default(),
            api: Arc::new(api),
            controller: ListenSessionController::new(config.session.switch_policy),
            poll_interval: config.polling.interval(),
            clock_refresh: config.display.refresh(),
            poll: None,
            toggles: CancellationToken::new(),
            tx: None,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, rx) = mpsc::channel::<AppMessage>(256);
        self.tx = Some(tx.clone());
        info!("listen-along started, server {}", self.state.server_url);

        // ── Background task: keyboard/mouse events ────────────────────────────
        // Polls with a timeout so the task notices when the loop has exited.
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            if event_tx.is_closed() {
                break;
            }
            match event::poll(Duration::from_millis(250)) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        });

        // ── Background task: activity polling ─────────────────────────────────
        // Callbacks run under the poller's delivery lock, so they only post.
        let data_tx = tx.clone();
        let error_tx = tx.clone();
        let poller = ActivityPoller::new(self.api.clone(), self.poll_interval);
        self.poll = Some(poller.start(
            move |friends| {
                if let Err(e) = data_tx.try_send(AppMessage::PollData(friends)) {
                    warn!("poll result not delivered to ui: {}", e);
                }
            },
            move |err| {
                if let Err(e) = error_tx.try_send(AppMessage::PollError(err)) {
                    warn!("poll error not delivered to ui: {}", e);
                }
            },
        ));
        drop(tx);

        let result = self.event_loop(&mut terminal, rx).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        if let Some(poll) = self.poll.take() {
            poll.cancel();
        }
        self.toggles.cancel();
        self.controller.reset();
        self.tx = None;
        info!("listen-along stopped");

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut rx: mpsc::Receiver<AppMessage>,
    ) -> anyhow::Result<()> {
        // ── Periodic timers ───────────────────────────────────────────────────
        // Elapsed labels and live markers.
        let mut clock_tick = tokio::time::interval(self.clock_refresh);
        clock_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Toast expiry + spinner + pending pulse.
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // tui.log tail refresh: only while the log panel is open.
        let mut log_refresh = tokio::time::interval(Duration::from_secs(2));
        log_refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    let mut redraw = self.handle_message(msg).await;
                    // Drain whatever queued up behind it before drawing again.
                    while let Ok(next) = rx.try_recv() {
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }

                _ = clock_tick.tick() => {
                    self.state.now_ms = freshness::now_millis();
                    needs_redraw = true;
                }

                _ = toast_tick.tick() => {
                    let had_toasts = !self.toast.is_empty();
                    self.toast.tick();
                    self.state.pending_hint = intent::pending_hint(
                        self.controller.pending().map(|p| p.since),
                        Instant::now(),
                    );
                    needs_redraw = had_toasts || self.state.pending.is_some();
                }

                _ = log_refresh.tick() => {
                    if self.show_log_panel {
                        self.reload_tui_log();
                        needs_redraw = true;
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns true when the screen needs a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return false;
                }
                for action in self.handle_key(key) {
                    self.dispatch(action).await;
                }
                true
            }
            AppMessage::Event(Event::Mouse(mouse)) => {
                for action in self.handle_mouse(mouse) {
                    self.dispatch(action).await;
                }
                true
            }
            AppMessage::Event(Event::Resize(_, _)) => true,
            AppMessage::Event(_) => false,

            AppMessage::PollData(friends) => {
                debug!("poll delivered {} friends", friends.len());
                let recovered = self.state.feed.error().is_some();
                self.state.feed.apply_friends(friends);
                self.state.now_ms = freshness::now_millis();
                self.friend_list.sync(&self.state);
                if recovered {
                    self.toast.info("reconnected to server");
                }
                true
            }
            AppMessage::PollError(err) => {
                warn!("poll failed: {}", err);
                let first = self.state.feed.error().is_none();
                self.state.feed.apply_error(&err);
                if first {
                    if let Some(msg) = self.state.feed.error() {
                        self.toast.warning(msg.to_string());
                    }
                }
                true
            }
            AppMessage::ToggleDone(outcome) => self.on_toggle_done(outcome),
        }
    }

    // ── Listen-along ──────────────────────────────────────────────────────────

    fn start_toggle(&mut self, user_uri: &str) {
        let Some(friend) = self.state.feed.find(user_uri).cloned() else {
            self.toast.warning("that friend is no longer in the feed");
            return;
        };
        match self.controller.begin_toggle(&friend, freshness::now_millis()) {
            Ok(plan) => self.spawn_toggle(plan),
            Err(ToggleSkipped::Stale) => {
                self.toast
                    .warning(format!("{} is not listening right now", friend.user.name));
            }
            Err(ToggleSkipped::InFlight) => self.toast.info("still waiting for the server…"),
        }
    }

    fn stop_listening(&mut self) {
        match self.controller.begin_stop() {
            Some(plan) => self.spawn_toggle(plan),
            None if self.controller.is_pending() => self.toast.info("still waiting for the server…"),
            None => self.toast.info("not listening along with anyone"),
        }
    }

    /// Run `plan` off the event loop; its outcome comes back as `ToggleDone`.
    fn spawn_toggle(&mut self, plan: TogglePlan) {
        let Some(tx) = self.tx.clone() else {
            return;
        };
        self.toast.spinner(pending_text(&plan.kind, &self.state));
        self.sync_session();

        let api = self.api.clone();
        let cancel = self.toggles.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("toggle abandoned: {:?}", plan.kind);
                }
                outcome = plan.clone().execute(&*api) => {
                    let _ = tx.send(AppMessage::ToggleDone(outcome)).await;
                }
            }
        });
    }

    fn on_toggle_done(&mut self, outcome: ToggleOutcome) -> bool {
        let kind = outcome.kind.clone();
        let error = outcome.error.clone();
        if !self.controller.finish(outcome) {
            return false;
        }
        self.toast.dismiss_spinner();
        match error {
            Some(err) => self.toast.error(session_error_message(&err, &self.state)),
            None => self.toast.info(done_text(&kind, &self.state)),
        }
        self.sync_session();
        true
    }

    /// Mirror the controller into `AppState` for the components.
    fn sync_session(&mut self) {
        self.state.session = self.controller.state().clone();
        self.state.pending = self.controller.pending().map(|p| p.kind.clone());
        self.state.pending_hint = intent::pending_hint(
            self.controller.pending().map(|p| p.since),
            Instant::now(),
        );
        let error = self
            .controller
            .last_error()
            .map(|e| session_error_message(e, &self.state));
        self.state.session_error = error;
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let normal = self.state.input_mode == InputMode::Normal;

        // Global keys, active regardless of focus
        match key.code {
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit];
            }
            KeyCode::Char('q') if normal && key.modifiers == KeyModifiers::NONE => {
                return vec![Action::Quit];
            }
            KeyCode::Char('?') if normal => return vec![Action::ToggleHelp],
            _ => {}
        }

        // Help overlay captures all keys when visible
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }

        // Tab / Shift-Tab always cycle focus (closing the filter first)
        match key.code {
            KeyCode::Tab if normal => return vec![Action::FocusNext],
            KeyCode::Tab => return vec![Action::CloseFilter, Action::FocusNext],
            KeyCode::BackTab if normal => return vec![Action::FocusPrev],
            KeyCode::BackTab => return vec![Action::CloseFilter, Action::FocusPrev],
            _ => {}
        }

        if normal {
            match key.code {
                KeyCode::Char('L') => return vec![Action::ToggleLogs],
                KeyCode::Char('K') => return vec![Action::ToggleKeys],
                KeyCode::Char('r') => return vec![Action::RefreshNow],
                KeyCode::Char('x') => return vec![Action::StopListening],
                KeyCode::Char('1') => return vec![Action::FocusPane(ComponentId::FriendList)],
                KeyCode::Char('2') if self.show_log_panel => {
                    return vec![Action::FocusPane(ComponentId::LogPanel)];
                }
                _ => {}
            }
        }

        // Dispatch to the focused component
        let s = &self.state;
        match self.focus.current() {
            Some(ComponentId::FriendList) => self.friend_list.handle_key(key, s),
            Some(ComponentId::LogPanel) => self.log_panel.handle_key(key, s),
            Some(ComponentId::Header | ComponentId::HelpOverlay) | None => vec![],
        }
    }

    // ── Mouse handling ────────────────────────────────────────────────────────

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let relevant = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !relevant || self.help_overlay.visible {
            return vec![];
        }

        fn hit(r: Rect, col: u16, row: u16) -> bool {
            r.width > 0
                && r.height > 0
                && col >= r.x
                && col < r.x + r.width
                && row >= r.y
                && row < r.y + r.height
        }

        let areas = self.pane_areas;
        let (col, row) = (event.column, event.row);
        let s = &self.state;

        let (id, mut actions) = if hit(areas.friend_list, col, row) {
            (
                self.friend_list.id(),
                self.friend_list.handle_mouse(event, areas.friend_list, s),
            )
        } else if hit(areas.log_panel, col, row) {
            (
                self.log_panel.id(),
                self.log_panel.handle_mouse(event, areas.log_panel, s),
            )
        } else {
            return vec![];
        };

        // Focus follows the click.
        if !self.focus.is_focused(id) {
            actions.insert(0, Action::FocusPane(id));
        }
        actions
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        // Components see every action first (filter close, help toggle, ...)
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.friend_list.on_action(&action, s));
            out.extend(self.log_panel.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out
        };

        self.apply_action(action);

        // Depth-limited to one level
        for a in secondary {
            self.apply_action(a);
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Toggle(user_uri) => self.start_toggle(&user_uri),
            Action::StopListening => self.stop_listening(),
            Action::RefreshNow => {
                if let Some(poll) = &self.poll {
                    poll.refresh();
                    self.toast.info("refreshing…");
                }
            }

            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => self.focus.set(id),

            Action::OpenFilter => self.state.input_mode = InputMode::Filter,
            Action::CloseFilter => self.state.input_mode = InputMode::Normal,

            Action::ToggleLogs => {
                self.show_log_panel = !self.show_log_panel;
                if self.show_log_panel {
                    self.reload_tui_log();
                    self.focus
                        .set_items(vec![ComponentId::FriendList, ComponentId::LogPanel]);
                } else {
                    self.focus.set_items(vec![ComponentId::FriendList]);
                }
            }
            // Visibility lives in the overlay component (on_action).
            Action::ToggleHelp => {}
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,

            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = if text.chars().count() > 40 {
                            format!("{}…", text.chars().take(40).collect::<String>())
                        } else {
                            text
                        };
                        self.toast.success(format!("copied: {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.error(format!("clipboard error: {}", e));
                    }
                }
            }
            Action::Notify(msg) => self.toast.info(msg),

            Action::Quit => self.should_quit = true,
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        use crate::theme::C_BG;
        use ratatui::widgets::Block;
        let area = frame.area();

        frame.render_widget(
            Block::default().style(ratatui::style::Style::default().bg(C_BG)),
            area,
        );

        // ── Outer layout: header | body | (log) | (keys bar) ─────────────────
        let keys_h = if self.show_keys_bar { 1u16 } else { 0 };
        let log_h = if self.show_log_panel { LOG_PANEL_HEIGHT } else { 0 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(log_h),
                Constraint::Length(keys_h),
            ])
            .split(area);

        self.header.draw(frame, outer[0], false, &self.state);

        let list_focused = self.focus.is_focused(ComponentId::FriendList);
        self.friend_list.draw(frame, outer[1], list_focused, &self.state);
        self.pane_areas.friend_list = outer[1];

        if self.show_log_panel {
            let log_focused = self.focus.is_focused(ComponentId::LogPanel);
            self.log_panel.draw(frame, outer[2], log_focused, &self.state);
            self.pane_areas.log_panel = outer[2];
        } else {
            self.pane_areas.log_panel = Rect::default();
        }

        if self.show_keys_bar {
            status_bar::draw_keys_bar(frame, outer[3], self.state.input_mode, self.session_lamp());
        }

        // ── Help overlay (on top of everything) ──────────────────────────────
        self.help_overlay.draw(frame, area, false, &self.state);

        // ── Toast notifications (topmost layer) ──────────────────────────────
        self.toast.draw(frame, area);
    }

    fn session_lamp(&self) -> SessionLamp {
        if self.state.pending_hint.is_pending() {
            SessionLamp::Pending
        } else if matches!(self.state.session, SessionState::ListeningTo(_)) {
            SessionLamp::Listening
        } else {
            SessionLamp::Idle
        }
    }

    fn reload_tui_log(&mut self) {
        self.state.tui_log_lines = read_log_tail(&self.state.tui_log_path, LOG_TAIL_LINES);
    }
}

// ── User-facing text ──────────────────────────────────────────────────────────

fn pending_text(kind: &ToggleKind, state: &AppState) -> String {
    match kind {
        ToggleKind::Start { target } => format!("joining {}…", state.display_name(target)),
        ToggleKind::Stop { target } => format!("leaving {}…", state.display_name(target)),
        ToggleKind::Switch { to, .. } => format!("switching to {}…", state.display_name(to)),
    }
}

fn done_text(kind: &ToggleKind, state: &AppState) -> String {
    match kind {
        ToggleKind::Start { target } | ToggleKind::Switch { to: target, .. } => {
            format!("listening along with {}", state.display_name(target))
        }
        ToggleKind::Stop { .. } => "stopped listening along".to_string(),
    }
}

fn session_error_message(err: &SessionError, state: &AppState) -> String {
    let reason = match err.api_error() {
        ApiError::Api { message, .. } => message.clone(),
        ApiError::Transport(_) => "server unreachable".to_string(),
        ApiError::Decode(_) => "unexpected server response".to_string(),
    };
    match err {
        SessionError::Start(_) => format!("Could not start listening along: {}", reason),
        SessionError::Stop(_) => format!("Could not stop listening: {}", reason),
        SessionError::Switch { to, restored, .. } => format!(
            "Could not switch to {}: {}{}",
            state.display_name(to),
            reason,
            if *restored {
                " (still on previous friend)"
            } else {
                " (session ended)"
            }
        ),
    }
}
