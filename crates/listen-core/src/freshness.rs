//! Activity freshness — is a friend live right now, and how long ago did
//! they last report?
//!
//! Everything here is a pure function of `(timestamp, now)`. The `*_at`
//! variants take `now` explicitly; the plain variants read the wall clock at
//! call time and are cheap enough to run on every render tick.

/// A friend is live while their last event is younger than this.
pub const ACTIVE_WINDOW_MS: i64 = 600_000;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn is_active(timestamp: i64) -> bool {
    is_active_at(timestamp, now_millis())
}

pub fn is_active_at(timestamp: i64, now: i64) -> bool {
    now.saturating_sub(timestamp) < ACTIVE_WINDOW_MS
}

pub fn elapsed_label(timestamp: i64) -> String {
    elapsed_label_at(timestamp, now_millis())
}

/// `"{d}d"`, `"{h}h"` or `"{m}:{ss}"` for the time since `timestamp`.
///
/// Timestamps ahead of `now` count as zero elapsed.
pub fn elapsed_label_at(timestamp: i64, now: i64) -> String {
    let diff = now.saturating_sub(timestamp).max(0) / 1000;

    let days = diff / SECS_PER_DAY;
    if days > 0 {
        return format!("{}d", days);
    }
    let hours = (diff / SECS_PER_HOUR) % 24;
    if hours > 0 {
        return format!("{}h", hours);
    }
    let minutes = (diff / SECS_PER_MINUTE) % 60;
    let seconds = diff % SECS_PER_MINUTE;
    format!("{}:{:02}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_active_window_boundary() {
        assert!(is_active_at(NOW - 599_999, NOW));
        assert!(!is_active_at(NOW - 600_000, NOW));
        assert!(is_active_at(NOW, NOW));
    }

    #[test]
    fn test_is_active_reads_clock() {
        assert!(is_active(now_millis() - 1_000));
        assert!(!is_active(now_millis() - 11 * 60 * 1000));
    }

    #[test]
    fn test_elapsed_label_minutes_seconds() {
        assert_eq!(elapsed_label_at(NOW - 90_000, NOW), "1:30");
        assert_eq!(elapsed_label_at(NOW - 5_000, NOW), "0:05");
        assert_eq!(elapsed_label_at(NOW - 599_999, NOW), "9:59");
        assert_eq!(elapsed_label_at(NOW - 3_599_000, NOW), "59:59");
    }

    #[test]
    fn test_elapsed_label_hours_and_days() {
        assert_eq!(elapsed_label_at(NOW - 3_661_000, NOW), "1h");
        assert_eq!(elapsed_label_at(NOW - 23 * 3_600_000, NOW), "23h");
        assert_eq!(elapsed_label_at(NOW - 90_000_000, NOW), "1d");
        assert_eq!(elapsed_label_at(NOW - 8 * 86_400_000, NOW), "8d");
    }

    #[test]
    fn test_elapsed_label_ignores_sub_second_remainder() {
        assert_eq!(elapsed_label_at(NOW - 90_999, NOW), "1:30");
    }

    #[test]
    fn test_future_timestamp_does_not_panic() {
        assert_eq!(elapsed_label_at(NOW + 5_000, NOW), "0:00");
        assert!(is_active_at(NOW + 5_000, NOW));
    }
}
