//! Heartbeat ping scheduling shared by both transport implementations.
//!
//! Each ping frame carries a random per-connection base id plus a
//! monotonically increasing sequence number, both serialized big-endian.
//! Exactly one ping is ever in flight; a pong is only accepted if its
//! bytes match the most recently sent frame exactly.

use tokio::time::{Duration, Instant};

use crate::error::TransportErrc;

/// 16 bytes: an 8-byte base id followed by an 8-byte sequence number.
pub type PingBytes = [u8; 16];

#[derive(Debug, Clone)]
struct PingFrame {
    base_id: u64,
    sequence: u64,
}

impl PingFrame {
    fn new(base_id: u64) -> Self {
        PingFrame { base_id, sequence: 0 }
    }

    fn count(&self) -> u64 {
        self.sequence
    }

    fn increment(&mut self) {
        self.sequence += 1;
    }

    fn serialize(&self) -> PingBytes {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&self.base_id.to_be_bytes());
        bytes[8..16].copy_from_slice(&self.sequence.to_be_bytes());
        bytes
    }
}

/// Drives a single connection's ping/pong heartbeat. Call [`Pinger::tick`]
/// every `interval`; it returns the next ping frame to send, or a
/// [`TransportErrc::HeartbeatTimeout`] if the previous ping was never
/// answered.
pub struct Pinger {
    frame: PingFrame,
    last_bytes: PingBytes,
    interval: Duration,
    matching_pong_received: bool,
    deadline: Instant,
}

impl Pinger {
    pub fn new(base_id: u64, interval: Duration) -> Self {
        Pinger {
            frame: PingFrame::new(base_id),
            last_bytes: [0u8; 16],
            interval,
            matching_pong_received: false,
            deadline: Instant::now() + interval,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Called when the scheduler's timer fires. Returns the bytes of the
    /// next ping frame to send, or an error if the prior ping was not
    /// answered with a matching pong in time.
    pub fn tick(&mut self) -> Result<PingBytes, TransportErrc> {
        if self.frame.count() > 0 && !self.matching_pong_received {
            return Err(TransportErrc::HeartbeatTimeout);
        }

        self.matching_pong_received = false;
        self.frame.increment();
        self.last_bytes = self.frame.serialize();
        self.deadline = Instant::now() + self.interval;
        Ok(self.last_bytes)
    }

    /// Called when a pong frame is received; only marks a match if the
    /// bytes are identical to the last ping sent.
    pub fn pong(&mut self, bytes: &[u8]) {
        if self.frame.count() == 0 || bytes.len() != self.last_bytes.len() {
            return;
        }
        if bytes == self.last_bytes {
            self.matching_pong_received = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_always_succeeds() {
        let mut pinger = Pinger::new(42, Duration::from_secs(30));
        assert!(pinger.tick().is_ok());
    }

    #[test]
    fn matching_pong_allows_next_tick() {
        let mut pinger = Pinger::new(42, Duration::from_secs(30));
        let bytes = pinger.tick().unwrap();
        pinger.pong(&bytes);
        assert!(pinger.tick().is_ok());
    }

    #[test]
    fn missing_pong_fails_next_tick() {
        let mut pinger = Pinger::new(42, Duration::from_secs(30));
        let _ = pinger.tick().unwrap();
        assert_eq!(pinger.tick(), Err(TransportErrc::HeartbeatTimeout));
    }

    #[test]
    fn mismatched_pong_is_ignored() {
        let mut pinger = Pinger::new(42, Duration::from_secs(30));
        let _ = pinger.tick().unwrap();
        pinger.pong(&[0u8; 16]);
        assert_eq!(pinger.tick(), Err(TransportErrc::HeartbeatTimeout));
    }
}
