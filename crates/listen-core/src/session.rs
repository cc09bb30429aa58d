//! ListenSessionController — who, if anyone, we are listening along with.
//!
//! A toggle runs in three steps so the caller can keep its event loop free
//! while the server is busy:
//!
//! ```text
//!  begin_toggle(friend)  -> TogglePlan      (pure: decides, marks pending)
//!  plan.execute(api)     -> ToggleOutcome   (async: talks to the server)
//!  finish(outcome)                          (pure: applies confirmed state)
//! ```
//!
//! Local state only changes in `finish`, i.e. after the server has answered.
//! `toggle` chains the three for sequential callers.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activity::FriendActivity;
use crate::client::ActivityApi;
use crate::error::SessionError;
use crate::freshness;

/// Confirmed listen-along state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Listening along with the friend with this user URI.
    ListeningTo(String),
}

impl SessionState {
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::ListeningTo(uri) => Some(uri.as_str()),
        }
    }

    pub fn is_listening_to(&self, user_uri: &str) -> bool {
        self.target() == Some(user_uri)
    }
}

/// How a switch from one friend to another is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwitchPolicy {
    /// `stop-listening`, then `listen-along` for the new friend; on a failed
    /// start the previous friend is restarted.
    #[default]
    StopThenStart,
    /// A single `listen-along`; the server stops the running session itself.
    ServerReplaces,
}

/// The requests a toggle resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleKind {
    Start { target: String },
    Stop { target: String },
    Switch { from: String, to: String },
}

impl ToggleKind {
    /// The user URI the toggle is heading for (`None` when stopping).
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Start { target } => Some(target),
            Self::Stop { .. } => None,
            Self::Switch { to, .. } => Some(to),
        }
    }

    /// Every user URI the toggle touches.
    pub fn involves(&self, user_uri: &str) -> bool {
        match self {
            Self::Start { target } | Self::Stop { target } => target == user_uri,
            Self::Switch { from, to } => from == user_uri || to == user_uri,
        }
    }
}

/// Why `begin_toggle` declined to issue any request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleSkipped {
    /// The friend's activity is outside the live window.
    Stale,
    /// Another toggle is still waiting for the server.
    InFlight,
}

/// A decided toggle, ready to run against the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TogglePlan {
    pub kind: ToggleKind,
    policy: SwitchPolicy,
    epoch: u64,
}

/// What the server confirmed. `state` is the session state to adopt,
/// `error` the failure to surface, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub kind: ToggleKind,
    pub state: SessionState,
    pub error: Option<SessionError>,
    epoch: u64,
}

#[derive(Debug, Clone)]
pub struct PendingToggle {
    pub kind: ToggleKind,
    pub since: Instant,
}

pub struct ListenSessionController {
    state: SessionState,
    pending: Option<PendingToggle>,
    last_error: Option<SessionError>,
    policy: SwitchPolicy,
    /// Bumped by `reset`; outcomes from an older epoch are dropped.
    epoch: u64,
}

impl ListenSessionController {
    pub fn new(policy: SwitchPolicy) -> Self {
        Self {
            state: SessionState::Idle,
            pending: None,
            last_error: None,
            policy,
            epoch: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn policy(&self) -> SwitchPolicy {
        self.policy
    }

    pub fn pending(&self) -> Option<&PendingToggle> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Decide what pressing listen-along on `friend` means right now.
    ///
    /// Stale friends and a toggle already in flight never reach the network.
    pub fn begin_toggle(
        &mut self,
        friend: &FriendActivity,
        now: i64,
    ) -> Result<TogglePlan, ToggleSkipped> {
        if !freshness::is_active_at(friend.timestamp, now) {
            debug!("toggle ignored: {} is not active", friend.user.uri);
            return Err(ToggleSkipped::Stale);
        }
        if self.pending.is_some() {
            debug!("toggle ignored: another toggle is in flight");
            return Err(ToggleSkipped::InFlight);
        }

        let uri = friend.user.uri.clone();
        let kind = match &self.state {
            SessionState::Idle => ToggleKind::Start { target: uri },
            SessionState::ListeningTo(current) if *current == uri => {
                ToggleKind::Stop { target: uri }
            }
            SessionState::ListeningTo(current) => ToggleKind::Switch {
                from: current.clone(),
                to: uri,
            },
        };
        Ok(self.open(kind))
    }

    /// Stop the current session whatever the target's freshness.
    pub fn begin_stop(&mut self) -> Option<TogglePlan> {
        if self.pending.is_some() {
            return None;
        }
        let target = self.state.target()?.to_string();
        Some(self.open(ToggleKind::Stop { target }))
    }

    fn open(&mut self, kind: ToggleKind) -> TogglePlan {
        info!("listen toggle: {:?}", kind);
        self.last_error = None;
        self.pending = Some(PendingToggle {
            kind: kind.clone(),
            since: Instant::now(),
        });
        TogglePlan {
            kind,
            policy: self.policy,
            epoch: self.epoch,
        }
    }

    /// Adopt the server-confirmed result of a toggle.
    ///
    /// Returns `false` when the outcome belongs to a session that was reset
    /// after the request was issued; such outcomes change nothing.
    pub fn finish(&mut self, outcome: ToggleOutcome) -> bool {
        if outcome.epoch != self.epoch {
            debug!("dropping toggle outcome from a previous session: {:?}", outcome.kind);
            return false;
        }
        match &outcome.error {
            Some(err) => warn!("listen toggle failed: {}", err),
            None => info!("listen state: {:?}", outcome.state),
        }
        self.state = outcome.state;
        self.last_error = outcome.error;
        self.pending = None;
        true
    }

    /// begin + execute + finish. A skipped toggle is a silent no-op.
    pub async fn toggle<A: ActivityApi>(
        &mut self,
        api: &A,
        friend: &FriendActivity,
        now: i64,
    ) -> Result<(), SessionError> {
        let plan = match self.begin_toggle(friend, now) {
            Ok(plan) => plan,
            Err(_) => return Ok(()),
        };
        let outcome = plan.execute(api).await;
        let error = outcome.error.clone();
        self.finish(outcome);
        error.map_or(Ok(()), Err)
    }

    /// Tear down: forget the session and ignore anything still in flight.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = SessionState::Idle;
        self.pending = None;
        self.last_error = None;
    }
}

impl Default for ListenSessionController {
    fn default() -> Self {
        Self::new(SwitchPolicy::default())
    }
}

impl TogglePlan {
    /// Issue the requests for this toggle. Never panics and never mutates
    /// controller state; the returned outcome carries the state to adopt.
    pub async fn execute<A: ActivityApi>(self, api: &A) -> ToggleOutcome {
        let (state, error) = match &self.kind {
            ToggleKind::Start { target } => match api.listen_along(target).await {
                Ok(_) => (SessionState::ListeningTo(target.clone()), None),
                Err(e) => (SessionState::Idle, Some(SessionError::Start(e))),
            },
            ToggleKind::Stop { target } => match api.stop_listening().await {
                Ok(_) => (SessionState::Idle, None),
                Err(e) => (
                    SessionState::ListeningTo(target.clone()),
                    Some(SessionError::Stop(e)),
                ),
            },
            ToggleKind::Switch { from, to } => match self.policy {
                SwitchPolicy::StopThenStart => switch_stop_then_start(api, from, to).await,
                SwitchPolicy::ServerReplaces => match api.listen_along(to).await {
                    Ok(_) => (SessionState::ListeningTo(to.clone()), None),
                    Err(e) => (
                        SessionState::ListeningTo(from.clone()),
                        Some(SessionError::Switch {
                            to: to.clone(),
                            source: e,
                            restored: true,
                        }),
                    ),
                },
            },
        };
        ToggleOutcome {
            kind: self.kind,
            state,
            error,
            epoch: self.epoch,
        }
    }
}

async fn switch_stop_then_start<A: ActivityApi>(
    api: &A,
    from: &str,
    to: &str,
) -> (SessionState, Option<SessionError>) {
    if let Err(e) = api.stop_listening().await {
        return (
            SessionState::ListeningTo(from.to_string()),
            Some(SessionError::Switch {
                to: to.to_string(),
                source: e,
                restored: true,
            }),
        );
    }

    let start_err = match api.listen_along(to).await {
        Ok(_) => return (SessionState::ListeningTo(to.to_string()), None),
        Err(e) => e,
    };

    // Roll back: put the previous session back on the server.
    match api.listen_along(from).await {
        Ok(_) => (
            SessionState::ListeningTo(from.to_string()),
            Some(SessionError::Switch {
                to: to.to_string(),
                source: start_err,
                restored: true,
            }),
        ),
        Err(restore_err) => {
            warn!("could not restore session with {}: {}", from, restore_err);
            (
                SessionState::Idle,
                Some(SessionError::Switch {
                    to: to.to_string(),
                    source: start_err,
                    restored: false,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::User;

    const NOW: i64 = 1_700_000_000_000;

    fn friend(uri: &str, age_ms: i64) -> FriendActivity {
        FriendActivity {
            timestamp: NOW - age_ms,
            user: User {
                uri: uri.to_string(),
                name: uri.to_string(),
                image_url: String::new(),
            },
            ..Default::default()
        }
    }

    fn confirm(plan: TogglePlan, state: SessionState) -> ToggleOutcome {
        ToggleOutcome {
            kind: plan.kind,
            state,
            error: None,
            epoch: plan.epoch,
        }
    }

    #[test]
    fn test_begin_toggle_plans() {
        let mut ctl = ListenSessionController::default();
        let alice = friend("spotify:user:alice", 1_000);
        let bob = friend("spotify:user:bob", 1_000);

        let plan = ctl.begin_toggle(&alice, NOW).unwrap();
        assert_eq!(plan.kind, ToggleKind::Start { target: alice.user.uri.clone() });
        assert!(ctl.is_pending());
        // Nothing confirmed yet.
        assert_eq!(ctl.state(), &SessionState::Idle);

        ctl.finish(confirm(plan, SessionState::ListeningTo(alice.user.uri.clone())));
        assert!(!ctl.is_pending());

        let plan = ctl.begin_toggle(&alice, NOW).unwrap();
        assert_eq!(plan.kind, ToggleKind::Stop { target: alice.user.uri.clone() });
        ctl.finish(confirm(plan, SessionState::ListeningTo(alice.user.uri.clone())));

        let plan = ctl.begin_toggle(&bob, NOW).unwrap();
        assert_eq!(
            plan.kind,
            ToggleKind::Switch {
                from: alice.user.uri.clone(),
                to: bob.user.uri.clone()
            }
        );
    }

    #[test]
    fn test_stale_friend_is_skipped() {
        let mut ctl = ListenSessionController::default();
        let stale = friend("spotify:user:carol", 11 * 60 * 1000);
        assert_eq!(ctl.begin_toggle(&stale, NOW), Err(ToggleSkipped::Stale));
        assert!(!ctl.is_pending());
    }

    #[test]
    fn test_second_toggle_while_pending_is_skipped() {
        let mut ctl = ListenSessionController::default();
        let alice = friend("spotify:user:alice", 0);
        let _plan = ctl.begin_toggle(&alice, NOW).unwrap();
        assert_eq!(ctl.begin_toggle(&alice, NOW), Err(ToggleSkipped::InFlight));
        assert!(ctl.begin_stop().is_none());
    }

    #[test]
    fn test_begin_stop_requires_session() {
        let mut ctl = ListenSessionController::default();
        assert!(ctl.begin_stop().is_none());

        let alice = friend("spotify:user:alice", 0);
        let plan = ctl.begin_toggle(&alice, NOW).unwrap();
        ctl.finish(confirm(plan, SessionState::ListeningTo(alice.user.uri.clone())));

        let stop = ctl.begin_stop().unwrap();
        assert_eq!(stop.kind, ToggleKind::Stop { target: alice.user.uri });
    }

    #[test]
    fn test_outcome_after_reset_is_ignored() {
        let mut ctl = ListenSessionController::default();
        let alice = friend("spotify:user:alice", 0);
        let plan = ctl.begin_toggle(&alice, NOW).unwrap();
        ctl.reset();

        let applied = ctl.finish(confirm(plan, SessionState::ListeningTo(alice.user.uri)));
        assert!(!applied);
        assert_eq!(ctl.state(), &SessionState::Idle);
        assert!(!ctl.is_pending());
    }

    #[test]
    fn test_toggle_kind_helpers() {
        let switch = ToggleKind::Switch {
            from: "a".to_string(),
            to: "b".to_string(),
        };
        assert_eq!(switch.destination(), Some("b"));
        assert!(switch.involves("a"));
        assert!(switch.involves("b"));
        assert!(!switch.involves("c"));
        assert_eq!(ToggleKind::Stop { target: "a".to_string() }.destination(), None);
    }

    #[test]
    fn test_switch_policy_serde_names() {
        #[derive(Deserialize)]
        struct Wrap {
            policy: SwitchPolicy,
        }
        let w: Wrap = toml::from_str(r#"policy = "stop-then-start""#).unwrap();
        assert_eq!(w.policy, SwitchPolicy::StopThenStart);
        let w: Wrap = toml::from_str(r#"policy = "server-replaces""#).unwrap();
        assert_eq!(w.policy, SwitchPolicy::ServerReplaces);
    }
}
