//! The session peer: a transport-agnostic state machine shared by both
//! ends of a WAMP session (client or router-side realm member), sitting
//! one layer above [`crate::core`]'s client-only event loop.
//!
//! Generalizes the `select!`-over-peer/local-channel shape of
//! `core::mod::Core::event_loop` into an explicit state machine with a
//! listener interface, so router code (which has no `Client` handle to
//! react through) can drive the same transitions.

use std::fmt;

use crate::common::WampId;
use crate::error::{MiscErrc, WampError};
use crate::message::Msg;

/// Every state a peer's session can be in over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// No transport established yet.
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Transport is up, HELLO/WELCOME has not yet completed.
    Establishing,
    /// A CHALLENGE was sent and we're waiting on AUTHENTICATE (router
    /// side) or vice versa (client side).
    Authenticating,
    /// HELLO/WELCOME completed; session is live.
    Established,
    /// GOODBYE sent, waiting for the peer's GOODBYE_AND_OUT.
    ShuttingDown,
    /// Transport closed, session over. Terminal unless [`Peer::reset`]
    /// is called to start a fresh session.
    Closed,
    /// An unrecoverable protocol violation or transport fault occurred.
    /// Terminal unless reset.
    Failed,
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeerState::Disconnected => "disconnected",
            PeerState::Connecting => "connecting",
            PeerState::Establishing => "establishing",
            PeerState::Authenticating => "authenticating",
            PeerState::Established => "established",
            PeerState::ShuttingDown => "shuttingDown",
            PeerState::Closed => "closed",
            PeerState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

impl PeerState {
    /// Whether this state can still make forward progress without a
    /// [`Peer::reset`] call first.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PeerState::Closed | PeerState::Failed)
    }
}

/// Reactions a peer's owner (client event loop, realm, or a test
/// harness) registers to observe session-level events. Unlike
/// `core::recv`'s hard-coded per-message functions, this is the explicit
/// contract spec'd for a reusable core: a router-side realm implements
/// it exactly the same way a client does.
pub trait PeerEventListener: Send {
    /// A state transition occurred.
    fn on_state_change(&mut self, old: PeerState, new: PeerState) {
        let _ = (old, new);
    }

    /// A message was received from the peer while established.
    fn on_message(&mut self, msg: &Msg) {
        let _ = msg;
    }

    /// The session failed irrecoverably.
    fn on_failure(&mut self, err: &WampError) {
        let _ = err;
    }
}

/// A no-op listener, useful when only the state machine's bookkeeping is
/// wanted (e.g. in unit tests).
#[derive(Default)]
pub struct NullListener;
impl PeerEventListener for NullListener {}

/// Drives the session lifecycle: legal transitions only, session id once
/// established, and session-ending detail (the ABORT/GOODBYE reason or
/// fault) once closed or failed.
pub struct Peer {
    state: PeerState,
    session_id: Option<WampId>,
    close_reason: Option<String>,
}

impl Peer {
    pub fn new() -> Self {
        Peer { state: PeerState::Disconnected, session_id: None, close_reason: None }
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn session_id(&self) -> Option<WampId> {
        self.session_id
    }

    pub fn close_reason(&self) -> Option<&str> {
        self.close_reason.as_deref()
    }

    fn transition(&mut self, new: PeerState, listener: &mut dyn PeerEventListener) {
        let old = self.state;
        self.state = new;
        listener.on_state_change(old, new);
    }

    /// Every transition below refuses (returns [`MiscErrc::InvalidState`])
    /// rather than panicking when called from a state that doesn't permit
    /// it. A malformed peer or a message arriving out of order is a
    /// refusal the caller can act on, not a reason to crash the process.
    pub fn start_connecting(&mut self, listener: &mut dyn PeerEventListener) -> Result<(), MiscErrc> {
        if self.state != PeerState::Disconnected {
            return Err(MiscErrc::InvalidState);
        }
        self.transition(PeerState::Connecting, listener);
        Ok(())
    }

    pub fn transport_established(&mut self, listener: &mut dyn PeerEventListener) -> Result<(), MiscErrc> {
        if self.state != PeerState::Connecting {
            return Err(MiscErrc::InvalidState);
        }
        self.transition(PeerState::Establishing, listener);
        Ok(())
    }

    pub fn challenge_received(&mut self, listener: &mut dyn PeerEventListener) -> Result<(), MiscErrc> {
        if self.state != PeerState::Establishing {
            return Err(MiscErrc::InvalidState);
        }
        self.transition(PeerState::Authenticating, listener);
        Ok(())
    }

    pub fn session_established(&mut self, session_id: WampId, listener: &mut dyn PeerEventListener) -> Result<(), MiscErrc> {
        if !matches!(self.state, PeerState::Establishing | PeerState::Authenticating) {
            return Err(MiscErrc::InvalidState);
        }
        self.session_id = Some(session_id);
        self.transition(PeerState::Established, listener);
        Ok(())
    }

    pub fn begin_shutdown(&mut self, listener: &mut dyn PeerEventListener) -> Result<(), MiscErrc> {
        if self.state != PeerState::Established {
            return Err(MiscErrc::InvalidState);
        }
        self.transition(PeerState::ShuttingDown, listener);
        Ok(())
    }

    pub fn closed(&mut self, reason: Option<String>, listener: &mut dyn PeerEventListener) {
        self.close_reason = reason;
        self.session_id = None;
        self.transition(PeerState::Closed, listener);
    }

    pub fn failed(&mut self, err: &WampError, listener: &mut dyn PeerEventListener) {
        self.close_reason = Some(err.to_string());
        self.session_id = None;
        let old = self.state;
        self.state = PeerState::Failed;
        listener.on_state_change(old, PeerState::Failed);
        listener.on_failure(err);
    }

    /// Resets a terminal peer back to [`PeerState::Disconnected`] so the
    /// same `Peer` can be reused for a fresh connection attempt. Refuses
    /// if the peer hasn't reached a terminal state yet.
    pub fn reset(&mut self, listener: &mut dyn PeerEventListener) -> Result<(), MiscErrc> {
        if !self.state.is_terminal() {
            return Err(MiscErrc::InvalidState);
        }
        self.session_id = None;
        self.close_reason = None;
        self.transition(PeerState::Disconnected, listener);
        Ok(())
    }

    /// Whether `kind` of outbound message is legal to send from the
    /// current state: HELLO only before a session exists, session
    /// traffic (CALL/PUBLISH/...) only once established, GOODBYE only
    /// from an established session.
    pub fn can_send(&self, msg: &Msg) -> bool {
        match msg {
            Msg::Hello { .. } => self.state == PeerState::Establishing,
            Msg::Authenticate { .. } => self.state == PeerState::Authenticating,
            Msg::Goodbye { .. } => matches!(self.state, PeerState::Established | PeerState::ShuttingDown),
            Msg::Abort { .. } => !self.state.is_terminal(),
            _ => self.state == PeerState::Established,
        }
    }
}

impl Default for Peer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        transitions: Vec<(PeerState, PeerState)>,
    }
    impl PeerEventListener for Recorder {
        fn on_state_change(&mut self, old: PeerState, new: PeerState) {
            self.transitions.push((old, new));
        }
    }

    #[test]
    fn happy_path_reaches_established_with_session_id() {
        let mut peer = Peer::new();
        let mut rec = Recorder::default();
        peer.start_connecting(&mut rec).unwrap();
        peer.transport_established(&mut rec).unwrap();
        peer.session_established(42, &mut rec).unwrap();
        assert_eq!(peer.state(), PeerState::Established);
        assert_eq!(peer.session_id(), Some(42));
        assert_eq!(
            rec.transitions,
            vec![
                (PeerState::Disconnected, PeerState::Connecting),
                (PeerState::Connecting, PeerState::Establishing),
                (PeerState::Establishing, PeerState::Established),
            ]
        );
    }

    #[test]
    fn failure_is_terminal_until_reset() {
        let mut peer = Peer::new();
        let mut rec = Recorder::default();
        peer.start_connecting(&mut rec).unwrap();
        peer.failed(&WampError::NoHostInUri, &mut rec);
        assert!(peer.state().is_terminal());
        peer.reset(&mut rec).unwrap();
        assert_eq!(peer.state(), PeerState::Disconnected);
    }

    #[test]
    fn session_established_before_establishing_is_refused() {
        let mut peer = Peer::new();
        let mut rec = Recorder::default();
        let err = peer.session_established(1, &mut rec).unwrap_err();
        assert_eq!(err, MiscErrc::InvalidState);
        assert_eq!(peer.state(), PeerState::Disconnected);
    }

    #[test]
    fn reset_before_terminal_is_refused() {
        let mut peer = Peer::new();
        let mut rec = Recorder::default();
        peer.start_connecting(&mut rec).unwrap();
        assert_eq!(peer.reset(&mut rec).unwrap_err(), MiscErrc::InvalidState);
    }
}
