//! ActivityPoller — periodic `get-activity` fetches and the friend list they
//! feed.
//!
//! Every tick spawns its own fetch task, so a slow server can have several
//! polls in flight at once. Each fetch carries a sequence number taken when it
//! was issued; delivery goes through one small mutex that remembers the last
//! delivered number:
//!
//! ```text
//!  tick ──► seq=1 ─────────────── fetch ──────────────┐
//!  tick ──► seq=2 ─── fetch ───┐                      │
//!                              ▼                      ▼
//!                      deliver(2)  last=2      deliver(1)  1 < 2, dropped
//! ```
//!
//! Callbacks run while that mutex is held, which is what lets `cancel()`
//! promise that nothing fires once it has returned. Keep them short and
//! non-blocking (post into a channel), and never cancel from inside one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::activity::FriendActivity;
use crate::client::ActivityApi;
use crate::error::ApiError;
use crate::freshness;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct ActivityPoller<A> {
    api: Arc<A>,
    interval: Duration,
}

impl<A: ActivityApi + 'static> ActivityPoller<A> {
    pub fn new(api: Arc<A>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Start polling: one fetch right away, then one per interval until the
    /// returned handle is cancelled or dropped. Must be called inside a tokio
    /// runtime.
    pub fn start<D, E>(self, on_data: D, on_error: E) -> PollHandle
    where
        D: Fn(Vec<FriendActivity>) + Send + Sync + 'static,
        E: Fn(ApiError) + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let refresh = Arc::new(Notify::new());
        let delivery = Arc::new(Delivery {
            last_delivered: Mutex::new(0),
            cancel: cancel.clone(),
            on_data: Box::new(on_data),
            on_error: Box::new(on_error),
        });

        tokio::spawn(schedule(
            self.api,
            self.interval,
            delivery.clone(),
            refresh.clone(),
            cancel.clone(),
        ));

        PollHandle {
            cancel,
            refresh,
            delivery,
        }
    }
}

async fn schedule<A: ActivityApi + 'static>(
    api: Arc<A>,
    interval: Duration,
    delivery: Arc<Delivery>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut next_seq: u64 = 1;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = refresh.notified() => {
                // A manual refresh restarts the countdown.
                ticker.reset();
            }
        }

        let seq = next_seq;
        next_seq += 1;
        debug!("poll #{} issued", seq);

        let api = api.clone();
        let delivery = delivery.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = api.fetch_activity() => result,
            };
            delivery.deliver(seq, result);
        });
    }
    debug!("poller stopped");
}

type DataCallback = Box<dyn Fn(Vec<FriendActivity>) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(ApiError) + Send + Sync>;

struct Delivery {
    /// Sequence number of the newest delivered response (0 = none yet).
    last_delivered: Mutex<u64>,
    cancel: CancellationToken,
    on_data: DataCallback,
    on_error: ErrorCallback,
}

impl Delivery {
    fn deliver(&self, seq: u64, result: Result<Vec<FriendActivity>, ApiError>) {
        let mut last = self
            .last_delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.cancel.is_cancelled() {
            debug!("poll #{} finished after cancel, dropped", seq);
            return;
        }
        if seq < *last {
            debug!("poll #{} is older than delivered #{}, dropped", seq, *last);
            return;
        }
        *last = seq;

        match result {
            Ok(friends) => {
                debug!("poll #{}: {} friends", seq, friends.len());
                (self.on_data)(friends);
            }
            Err(err) => {
                warn!("poll #{} failed: {}", seq, err);
                (self.on_error)(err);
            }
        }
    }
}

/// Controls a running poller. Dropping it cancels.
pub struct PollHandle {
    cancel: CancellationToken,
    refresh: Arc<Notify>,
    delivery: Arc<Delivery>,
}

impl PollHandle {
    /// Issue a fetch now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stop polling. No callback runs after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
        // Wait out a delivery that is already running.
        drop(
            self.delivery
                .last_delivered
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── FeedState ──

/// The locally held friend list, as last reported by the server.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    friends: Vec<FriendActivity>,
    error: Option<String>,
    loaded: bool,
    last_updated: Option<DateTime<Local>>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list wholesale with a successful poll result.
    pub fn apply_friends(&mut self, friends: Vec<FriendActivity>) {
        self.friends = friends;
        self.error = None;
        self.loaded = true;
        self.last_updated = Some(Local::now());
    }

    /// Record a failed poll. The previous list stays visible.
    pub fn apply_error(&mut self, err: &ApiError) {
        self.error = Some(feed_error_message(err));
        self.loaded = true;
    }

    /// Friends as received (server order).
    pub fn friends(&self) -> &[FriendActivity] {
        &self.friends
    }

    /// Friends in display order: the server list reversed.
    pub fn display_order(&self) -> Vec<&FriendActivity> {
        self.friends.iter().rev().collect()
    }

    pub fn find(&self, user_uri: &str) -> Option<&FriendActivity> {
        self.friends.iter().find(|f| f.user.uri == user_uri)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        !self.loaded
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    pub fn live_count(&self, now: i64) -> usize {
        self.friends
            .iter()
            .filter(|f| freshness::is_active_at(f.timestamp, now))
            .count()
    }
}

/// User-facing text for a failed poll.
pub fn feed_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Api { message, .. } => format!("Failed to load friends: {}", message),
        ApiError::Transport(_) | ApiError::Decode(_) => "Failed to connect to server".to_string(),
    }
}
