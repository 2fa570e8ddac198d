//! Caller/dealer CALL timeout racing: a CALL with a `timeout` option races
//! its RESULT/ERROR against a deadline, cancelling (per [`super::CancelMode`])
//! if the deadline wins.

use tokio::time::{self, Duration, Instant};

/// Tracks the deadline for a single in-flight call awaiting its outcome.
pub struct TimeoutRace {
    deadline: Option<Instant>,
}

impl TimeoutRace {
    /// `timeout_ms == 0` means "no timeout", matching WAMP's CALL.Options
    /// convention where an absent/zero `timeout` disables the feature.
    pub fn new(timeout_ms: u64) -> Self {
        TimeoutRace {
            deadline: if timeout_ms == 0 { None } else { Some(Instant::now() + Duration::from_millis(timeout_ms)) },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves once the deadline passes; never resolves if disabled, so
    /// it can be raced unconditionally inside a `select!` alongside the
    /// real RESULT/ERROR future.
    pub async fn expired(&self) {
        match self.deadline {
            Some(d) => time::sleep_until(d).await,
            None => std::future::pending().await,
        }
    }

    pub fn is_expired_now(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_race_never_expires_immediately() {
        let race = TimeoutRace::new(0);
        assert!(!race.is_enabled());
        assert!(!race.is_expired_now());
    }

    #[tokio::test]
    async fn enabled_race_expires_after_deadline() {
        let race = TimeoutRace::new(1);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(race.is_expired_now());
    }
}
