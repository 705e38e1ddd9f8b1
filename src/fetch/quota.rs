//! Daily request quota gate
//!
//! One process-wide instance shared by every fetch worker. The counter
//! resets on a rolling 24-hour window, not at midnight.

use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Quota gate enforcing a daily request budget
pub struct QuotaGate {
    daily_limit: u32,
    state: Mutex<QuotaState>,
}

struct QuotaState {
    request_count: u32,
    last_reset: DateTime<Utc>,
}

/// Snapshot of the gate's current state
#[derive(Debug, Clone)]
pub struct QuotaStatus {
    pub daily_limit: u32,
    pub requests_used: u32,
    pub requests_left: u32,
    pub last_reset: DateTime<Utc>,
    pub next_reset: DateTime<Utc>,
}

impl QuotaGate {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            daily_limit,
            state: Mutex::new(QuotaState {
                request_count: 0,
                last_reset: Utc::now(),
            }),
        }
    }

    /// Check whether another request may be sent. Never blocks: either
    /// returns success or fails immediately with QuotaExceeded.
    pub fn check(&self) -> Result<()> {
        let mut state = self.state.lock();

        if Utc::now() - state.last_reset >= Duration::hours(24) {
            state.request_count = 0;
            state.last_reset = Utc::now();
        }

        if state.request_count >= self.daily_limit {
            let until_reset = Duration::hours(24) - (Utc::now() - state.last_reset);
            return Err(AppError::QuotaExceeded {
                used: state.request_count,
                limit: self.daily_limit,
                hours: until_reset.num_hours(),
                minutes: until_reset.num_minutes() % 60,
            });
        }

        Ok(())
    }

    /// Record that a request was sent. Called after the request is issued,
    /// whether or not it succeeded at the HTTP layer.
    pub fn record(&self) {
        let mut state = self.state.lock();
        state.request_count += 1;
    }

    /// Current usage snapshot.
    pub fn status(&self) -> QuotaStatus {
        let state = self.state.lock();
        QuotaStatus {
            daily_limit: self.daily_limit,
            requests_used: state.request_count,
            requests_left: self.daily_limit.saturating_sub(state.request_count),
            last_reset: state.last_reset,
            next_reset: state.last_reset + Duration::hours(24),
        }
    }

    /// Administrative reset: clear the count and restart the window now.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.request_count = 0;
        state.last_reset = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exhaustion_reports_usage_and_reset() {
        let gate = QuotaGate::new(3);

        for _ in 0..3 {
            gate.check().unwrap();
            gate.record();
        }

        let err = gate.check().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("3/3 requests used"), "got: {msg}");
        assert!(msg.contains("Quota resets in 23h59m"), "got: {msg}");
        assert!(msg.contains("CSV import"), "got: {msg}");
    }

    #[test]
    fn used_plus_remaining_equals_limit() {
        let gate = QuotaGate::new(25);

        for used in 0..=25u32 {
            let status = gate.status();
            assert_eq!(status.requests_used, used);
            assert_eq!(status.requests_used + status.requests_left, 25);
            gate.record();
        }

        // Over-recording never drives remaining negative
        gate.record();
        let status = gate.status();
        assert_eq!(status.requests_left, 0);
    }

    #[test]
    fn window_elapse_resets_count() {
        let gate = QuotaGate::new(1);
        gate.check().unwrap();
        gate.record();
        assert!(gate.check().is_err());

        // Age the window past 24 hours
        gate.state.lock().last_reset = Utc::now() - Duration::hours(25);

        gate.check().unwrap();
        let status = gate.status();
        assert_eq!(status.requests_used, 0);
        assert!(Utc::now() - status.last_reset < Duration::minutes(1));
    }

    #[test]
    fn manual_reset_clears_state() {
        let gate = QuotaGate::new(2);
        gate.record();
        gate.record();
        assert!(gate.check().is_err());

        gate.reset();
        gate.check().unwrap();
        assert_eq!(gate.status().requests_used, 0);
    }

    #[test]
    fn next_reset_is_24_hours_after_last() {
        let gate = QuotaGate::new(5);
        let status = gate.status();
        assert_eq!(status.next_reset - status.last_reset, Duration::hours(24));
    }
}
