//! The outbound frame queue shared by both transport implementations.
//!
//! Frames are pushed to the back of a FIFO and drained in order, except
//! for a single "poisoned" frame (a close/abort frame queued while a
//! shutdown is in progress) which jumps to the front so it's always the
//! next thing written, ahead of whatever regular traffic was already
//! queued.
//!
//! An async-timer-based linger bouncer is used for client connections
//! and a polling-based one for server connections, both driving the
//! same decision ("has this close handshake taken too long, time to
//! give up"). [`LingerBouncer`] keeps that split as a small enum the
//! caller selects rather than monomorphizing over a generic parameter.

use std::collections::VecDeque;

use tokio::time::{self, Duration, Instant};

/// A single item of outbound data along with whether it's the poisoned
/// "goes first" frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub payload: Vec<u8>,
    pub poisoned: bool,
}

impl Frame {
    pub fn regular(payload: Vec<u8>) -> Self {
        Frame { payload, poisoned: false }
    }

    pub fn poisoned(payload: Vec<u8>) -> Self {
        Frame { payload, poisoned: true }
    }
}

/// A FIFO outbound queue where a poisoned frame always sits at the
/// front, ahead of regular traffic queued earlier.
#[derive(Debug, Default)]
pub struct TransportQueue {
    frames: VecDeque<Frame>,
}

impl TransportQueue {
    pub fn new() -> Self {
        TransportQueue { frames: VecDeque::new() }
    }

    pub fn push(&mut self, frame: Frame) {
        if frame.poisoned {
            self.frames.push_front(frame);
        } else {
            self.frames.push_back(frame);
        }
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

/// Decides when to give up waiting for a graceful close handshake to
/// finish and tear the transport down unilaterally.
pub enum LingerBouncer {
    /// Client-side: an async timer fires once after `duration`.
    Timer { duration: Duration },
    /// Server-side: checked against a deadline on every poll tick,
    /// since a server tracks many connections with one shared clock
    /// rather than a timer per connection.
    Polling { deadline: Instant },
    /// No linger enforcement at all.
    Disabled,
}

impl LingerBouncer {
    pub fn timer(duration: Duration) -> Self {
        LingerBouncer::Timer { duration }
    }

    pub fn polling(now: Instant, duration: Duration) -> Self {
        LingerBouncer::Polling { deadline: now + duration }
    }

    /// Waits for the linger period to elapse. For the client-side timer
    /// variant this actually sleeps; for the polling variant this
    /// returns immediately once `deadline` is in the past.
    pub async fn expire(&self) {
        match self {
            LingerBouncer::Timer { duration } => time::sleep(*duration).await,
            LingerBouncer::Polling { deadline } => {
                let now = Instant::now();
                if *deadline > now {
                    time::sleep(*deadline - now).await;
                }
            }
            LingerBouncer::Disabled => std::future::pending().await,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            LingerBouncer::Polling { deadline } => now >= *deadline,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_frame_jumps_to_front() {
        let mut q = TransportQueue::new();
        q.push(Frame::regular(vec![1]));
        q.push(Frame::regular(vec![2]));
        q.push(Frame::poisoned(vec![9]));
        assert_eq!(q.pop().unwrap().payload, vec![9]);
        assert_eq!(q.pop().unwrap().payload, vec![1]);
        assert_eq!(q.pop().unwrap().payload, vec![2]);
    }

    #[test]
    fn polling_bouncer_expires_after_deadline() {
        let now = Instant::now();
        let bouncer = LingerBouncer::polling(now, Duration::from_millis(1));
        assert!(!bouncer.is_expired(now));
        assert!(bouncer.is_expired(now + Duration::from_millis(2)));
    }
}
