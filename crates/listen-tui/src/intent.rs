//! Pending-toggle rendering.
//!
//! A listen-along toggle shows its target state only once the server has
//! answered. Until then the affected row and the header pulse:
//!
//! ```text
//!  Normal           nothing in flight
//!  PendingVisible   in flight, pulse-on frame
//!  PendingHidden    in flight, pulse-off frame
//!  Slow             in flight for longer than SLOW_AFTER; still waiting
//! ```
//!
//! There is no client-side timeout: `Slow` only changes how the wait looks.

use std::time::{Duration, Instant};

/// How long a toggle may be in flight before it is flagged as slow.
pub const SLOW_AFTER: Duration = Duration::from_millis(3000);

const PULSE_MS: u128 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderHint {
    #[default]
    Normal,
    PendingVisible,
    PendingHidden,
    Slow,
}

impl RenderHint {
    pub fn is_pending(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Render hint for a toggle issued at `since` (`None` = nothing in flight).
pub fn pending_hint(since: Option<Instant>, now: Instant) -> RenderHint {
    let Some(since) = since else {
        return RenderHint::Normal;
    };
    let elapsed = now.saturating_duration_since(since);
    if elapsed >= SLOW_AFTER {
        return RenderHint::Slow;
    }
    if (elapsed.as_millis() / PULSE_MS) % 2 == 0 {
        RenderHint::PendingVisible
    } else {
        RenderHint::PendingHidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_hint_phases() {
        let start = Instant::now();
        assert_eq!(pending_hint(None, start), RenderHint::Normal);
        assert_eq!(pending_hint(Some(start), start), RenderHint::PendingVisible);
        assert_eq!(
            pending_hint(Some(start), start + Duration::from_millis(500)),
            RenderHint::PendingHidden
        );
        assert_eq!(
            pending_hint(Some(start), start + Duration::from_millis(900)),
            RenderHint::PendingVisible
        );
        assert_eq!(pending_hint(Some(start), start + SLOW_AFTER), RenderHint::Slow);
        assert!(RenderHint::Slow.is_pending());
        assert!(!RenderHint::Normal.is_pending());
    }
}
