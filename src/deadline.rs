//! Server-side deadline tracking for the HTTP admission front-end and raw
//! transports: handshake/header/body/response/linger/idle timeouts that
//! extend as bytes flow, so a slow-but-progressing peer isn't punished
//! the same as a stalled one.

use tokio::time::{Duration, Instant};

use crate::error::TransportErrc;

/// A deadline that extends in proportion to bytes transferred, banking
/// any fractional-second remainder so small writes still eventually earn
/// their extension, capped at `max_deadline`.
#[derive(Debug, Clone)]
pub struct ProgressiveDeadline {
    deadline: Option<Instant>,
    max_deadline: Option<Instant>,
    bytes_banked: u64,
    rate_bytes_per_sec: u64,
}

impl ProgressiveDeadline {
    pub fn disabled() -> Self {
        ProgressiveDeadline {
            deadline: None,
            max_deadline: None,
            bytes_banked: 0,
            rate_bytes_per_sec: 0,
        }
    }

    /// Starts a deadline `timeout` from `now`. `max_timeout`, if set,
    /// caps how far byte-rate credit can push the deadline out.
    pub fn start(timeout: Option<Duration>, max_timeout: Option<Duration>, now: Instant) -> Self {
        ProgressiveDeadline {
            deadline: timeout.map(|t| now + t),
            max_deadline: max_timeout.map(|t| now + t),
            bytes_banked: 0,
            rate_bytes_per_sec: 0,
        }
    }

    pub fn with_rate(mut self, rate_bytes_per_sec: u64) -> Self {
        self.rate_bytes_per_sec = rate_bytes_per_sec;
        self
    }

    /// Extends the deadline in proportion to `bytes_transferred`,
    /// banking any remainder below a whole second of credit.
    pub fn update(&mut self, bytes_transferred: u64) {
        let (deadline, rate) = match (self.deadline, self.rate_bytes_per_sec) {
            (Some(d), r) if r > 0 => (d, r),
            _ => return,
        };

        let total = self.bytes_banked + bytes_transferred;
        let secs = total / rate;
        self.bytes_banked = total - secs * rate;
        if secs > 0 {
            let mut extended = deadline + Duration::from_secs(secs);
            if let Some(max) = self.max_deadline {
                if extended > max {
                    extended = max;
                }
            }
            self.deadline = Some(extended);
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(d) if now >= d)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Which phase of request handling a [`ServerTimeoutMonitor`] is
/// currently tracking.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Reading,
    Writing,
}

/// Composes the handshake/header/body/response/linger/idle deadlines a
/// server-side connection must enforce into one state machine, returning
/// the first fault encountered in priority order: idle, then read, then
/// write.
pub struct ServerTimeoutMonitor {
    idle_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    byte_rate: u64,
    phase: Phase,
    read_deadline: ProgressiveDeadline,
    write_deadline: ProgressiveDeadline,
    activity_deadline: Option<Instant>,
}

impl ServerTimeoutMonitor {
    pub fn new(
        idle_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
        byte_rate: u64,
    ) -> Self {
        ServerTimeoutMonitor {
            idle_timeout,
            read_timeout,
            write_timeout,
            byte_rate,
            phase: Phase::Idle,
            read_deadline: ProgressiveDeadline::disabled(),
            write_deadline: ProgressiveDeadline::disabled(),
            activity_deadline: None,
        }
    }

    pub fn bump_activity_deadline(&mut self, now: Instant) {
        self.activity_deadline = self.idle_timeout.map(|t| now + t);
    }

    pub fn start_read(&mut self, now: Instant) {
        self.phase = Phase::Reading;
        self.read_deadline = ProgressiveDeadline::start(self.read_timeout, None, now)
            .with_rate(self.byte_rate);
    }

    pub fn update_read(&mut self, bytes: u64, now: Instant) {
        self.read_deadline.update(bytes);
        self.bump_activity_deadline(now);
    }

    pub fn end_read(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn start_write(&mut self, now: Instant) {
        self.phase = Phase::Writing;
        self.write_deadline = ProgressiveDeadline::start(self.write_timeout, None, now)
            .with_rate(self.byte_rate);
    }

    pub fn update_write(&mut self, bytes: u64, now: Instant) {
        self.write_deadline.update(bytes);
        self.bump_activity_deadline(now);
    }

    pub fn end_write(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Checked on every scheduler tick; returns the first fault observed,
    /// in idle > read > write priority order.
    pub fn check(&self, now: Instant) -> Option<TransportErrc> {
        if matches!(self.activity_deadline, Some(d) if now >= d) {
            return Some(TransportErrc::IdleTimeout);
        }
        if self.phase == Phase::Reading && self.read_deadline.is_expired(now) {
            return Some(TransportErrc::ReadTimeout);
        }
        if self.phase == Phase::Writing && self.write_deadline.is_expired(now) {
            return Some(TransportErrc::WriteTimeout);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progressive_deadline_extends_with_banked_bytes() {
        let now = Instant::now();
        let mut deadline =
            ProgressiveDeadline::start(Some(Duration::from_secs(1)), None, now).with_rate(100);
        let before = deadline.deadline().unwrap();
        deadline.update(250);
        let after = deadline.deadline().unwrap();
        assert!(after > before);
    }

    #[test]
    fn progressive_deadline_caps_at_max() {
        let now = Instant::now();
        let mut deadline = ProgressiveDeadline::start(
            Some(Duration::from_secs(1)),
            Some(Duration::from_secs(2)),
            now,
        )
        .with_rate(1);
        deadline.update(10_000);
        assert_eq!(deadline.deadline(), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn monitor_reports_idle_before_read_or_write() {
        let now = Instant::now();
        let mut monitor = ServerTimeoutMonitor::new(
            Some(Duration::from_millis(1)),
            Some(Duration::from_secs(60)),
            Some(Duration::from_secs(60)),
            0,
        );
        monitor.bump_activity_deadline(now);
        monitor.start_read(now);
        let later = now + Duration::from_millis(5);
        assert_eq!(monitor.check(later), Some(TransportErrc::IdleTimeout));
    }
}
