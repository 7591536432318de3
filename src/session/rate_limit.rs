use std::time::{Duration, SystemTime};
use thiserror::Error;

use super::state::SessionState;
use crate::config::LimitsConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitExceeded {
    #[error("cooldown active, {wait_secs}s remaining")]
    Cooldown { wait_secs: u64 },

    #[error("session request ceiling reached")]
    SessionCap,
}

impl RateLimitExceeded {
    pub fn user_message(&self) -> String {
        match self {
            Self::Cooldown { wait_secs } => format!(
                "Please wait {} seconds before submitting again.",
                wait_secs
            ),
            Self::SessionCap => {
                "Session limit reached. Please restart the session to continue.".to_string()
            }
        }
    }
}

/// Per-session throttle for generation calls. Counters live in
/// [`SessionState`] so a reset also clears them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    min_interval: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, max_requests: u32) -> Self {
        Self {
            min_interval,
            max_requests,
        }
    }

    pub fn from_limits(limits: &LimitsConfig) -> Self {
        Self::new(
            Duration::from_secs(limits.min_interval_secs),
            limits.max_requests_per_session,
        )
    }

    /// Whether a call may be made at `now`. Does not consume anything.
    pub fn check(&self, state: &SessionState, now: SystemTime) -> Result<(), RateLimitExceeded> {
        if state.request_count >= self.max_requests {
            return Err(RateLimitExceeded::SessionCap);
        }
        if let Some(last) = state.last_request_at {
            // A clock that went backwards counts as zero elapsed
            let elapsed = now.duration_since(last).unwrap_or(Duration::ZERO);
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                let wait_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                return Err(RateLimitExceeded::Cooldown { wait_secs });
            }
        }
        Ok(())
    }

    pub fn record(&self, state: &mut SessionState, now: SystemTime) {
        state.last_request_at = Some(now);
        state.request_count = state.request_count.saturating_add(1);
    }

    /// [`check`](Self::check) then [`record`](Self::record).
    pub fn acquire(
        &self,
        state: &mut SessionState,
        now: SystemTime,
    ) -> Result<(), RateLimitExceeded> {
        self.check(state, now)?;
        self.record(state, now);
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_limits(&LimitsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + secs)
    }

    #[test]
    fn test_first_call_allowed() {
        let limiter = RateLimiter::default();
        assert!(limiter.check(&SessionState::new(), t(0)).is_ok());
    }

    #[test]
    fn test_cooldown_reports_remaining_seconds() {
        let limiter = RateLimiter::new(Duration::from_secs(10), 20);
        let mut state = SessionState::new();
        limiter.record(&mut state, t(0));

        assert_eq!(
            limiter.check(&state, t(3)),
            Err(RateLimitExceeded::Cooldown { wait_secs: 7 })
        );
        assert!(limiter.check(&state, t(10)).is_ok());
    }

    #[test]
    fn test_partial_second_rounds_up() {
        let limiter = RateLimiter::new(Duration::from_secs(10), 20);
        let mut state = SessionState::new();
        limiter.record(&mut state, t(0));
        let now = t(9) + Duration::from_millis(500);
        assert_eq!(
            limiter.check(&state, now),
            Err(RateLimitExceeded::Cooldown { wait_secs: 1 })
        );
    }

    #[test]
    fn test_session_cap_and_reset() {
        let limiter = RateLimiter::new(Duration::ZERO, 3);
        let mut state = SessionState::new();
        for i in 0..3 {
            limiter.acquire(&mut state, t(i)).unwrap();
        }
        assert_eq!(
            limiter.acquire(&mut state, t(100)),
            Err(RateLimitExceeded::SessionCap)
        );
        assert_eq!(state.request_count, 3);

        state.reset();
        assert!(limiter.acquire(&mut state, t(101)).is_ok());
    }

    #[test]
    fn test_check_does_not_consume() {
        let limiter = RateLimiter::new(Duration::ZERO, 1);
        let state = SessionState::new();
        assert!(limiter.check(&state, t(0)).is_ok());
        assert!(limiter.check(&state, t(0)).is_ok());
        assert_eq!(state.request_count, 0);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            RateLimitExceeded::Cooldown { wait_secs: 4 }.user_message(),
            "Please wait 4 seconds before submitting again."
        );
        assert!(RateLimitExceeded::SessionCap
            .user_message()
            .starts_with("Session limit reached."));
    }
}
