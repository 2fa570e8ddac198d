//! Progressive call/invocation streaming: a callee answering a CALL that
//! set `receive_progress` can emit zero or more intermediate RESULTs
//! before its final one, and a caller issuing progressive CALLs can send
//! zero or more intermediate CALL chunks before the last one. Modeled as
//! an explicit `Outcome` sum type rather than a shared mutable request
//! object.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::common::{CancelMode, WampArgs, WampKwArgs};
use crate::error::WampError;

/// What a registered endpoint (or a caller continuing a progressive call)
/// produces for one chunk of a streamed exchange.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// An intermediate chunk; more are expected.
    Progress(Option<WampArgs>, Option<WampKwArgs>),
    /// The final chunk; the stream is now complete.
    Final(Option<WampArgs>, Option<WampKwArgs>),
    /// The handler accepted the invocation but produces no chunk of its
    /// own right now; data will arrive later over the channel it was
    /// handed (`accept`/`respond`).
    Deferred,
}

impl Outcome {
    pub fn is_final(&self) -> bool {
        matches!(self, Outcome::Final(..))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Outcome::Deferred)
    }

    pub fn into_parts(self) -> (Option<WampArgs>, Option<WampKwArgs>) {
        match self {
            Outcome::Progress(a, k) | Outcome::Final(a, k) => (a, k),
            Outcome::Deferred => (None, None),
        }
    }
}

/// The lifecycle of one streamed exchange, from the callee's point of
/// view, per the termination table: a channel is either waiting on the
/// callee's first reply, flowing normally, finished cleanly, abandoned
/// by the caller's session leaving, or detached when the callee drops
/// its handle without completing the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// The registration declared `invitation_expected`; no chunk may
    /// flow until `accept` or `respond` runs.
    AwaitingRsvp,
    /// Chunks may flow in either direction.
    Open,
    /// A final chunk or `fail` closed the channel normally.
    Closed,
    /// The caller's session left while the channel was still open.
    Abandoned,
    /// The callee dropped its handle without sending a final chunk.
    Detached,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamState::AwaitingRsvp | StreamState::Open)
    }
}

/// A channel carrying a sequence of [`Outcome`]s for one streamed
/// call/invocation, terminated either by a `Final` outcome or an error.
pub struct StreamChannel {
    sender: UnboundedSender<Result<Outcome, WampError>>,
    receiver: Option<UnboundedReceiver<Result<Outcome, WampError>>>,
    state: StreamState,
}

impl StreamChannel {
    /// `expects_invitation` mirrors [`super::Registration::expects_invitation`]:
    /// when true, the channel starts in [`StreamState::AwaitingRsvp`] and
    /// refuses chunks until `accept`/`respond` runs.
    pub fn new(expects_invitation: bool) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = if expects_invitation { StreamState::AwaitingRsvp } else { StreamState::Open };
        StreamChannel { sender, receiver: Some(receiver), state }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn sender(&self) -> UnboundedSender<Result<Outcome, WampError>> {
        self.sender.clone()
    }

    /// Takes the receive half; only the first caller gets it, matching
    /// the single-consumer contract a subscription queue has.
    pub fn take_receiver(&mut self) -> Option<UnboundedReceiver<Result<Outcome, WampError>>> {
        self.receiver.take()
    }

    /// Accepts the invocation without sending an RSVP chunk: the initial
    /// CALL payload is delivered as the first chunk instead. Only legal
    /// when the registration did not declare `invitation_expected`.
    pub fn accept(&mut self) -> Result<(), WampError> {
        match self.state {
            StreamState::Open => Ok(()),
            StreamState::AwaitingRsvp => Err(WampError::ProtocolError(
                "registration expects an RSVP; call respond() instead of accept()".to_string(),
            )),
            _ => Err(WampError::ProtocolError("channel is no longer open".to_string())),
        }
    }

    /// Sends the first chunk as an RSVP, opening the channel for further
    /// traffic (or closing it immediately if this is also the final one).
    pub fn respond(&mut self, arguments: Option<WampArgs>, arguments_kw: Option<WampKwArgs>, is_final: bool) -> Result<(), WampError> {
        if self.state != StreamState::AwaitingRsvp {
            return Err(WampError::ProtocolError("RSVP already sent or channel is closed".to_string()));
        }
        let outcome = if is_final { Outcome::Final(arguments, arguments_kw) } else { Outcome::Progress(arguments, arguments_kw) };
        let _ = self.sender.send(Ok(outcome));
        self.state = if is_final { StreamState::Closed } else { StreamState::Open };
        Ok(())
    }

    /// Sends one data chunk. Refuses once the channel has left
    /// [`StreamState::Open`] (a chunk after the final one is the
    /// protocol violation the spec calls out).
    pub fn send_chunk(&mut self, arguments: Option<WampArgs>, arguments_kw: Option<WampKwArgs>, is_final: bool) -> Result<(), WampError> {
        if self.state != StreamState::Open {
            return Err(WampError::ProtocolError("chunk sent on a channel that is not open".to_string()));
        }
        let outcome = if is_final { Outcome::Final(arguments, arguments_kw) } else { Outcome::Progress(arguments, arguments_kw) };
        let _ = self.sender.send(Ok(outcome));
        if is_final {
            self.state = StreamState::Closed;
        }
        Ok(())
    }

    /// Fails the channel with `err`, closing it. A fail issued on an
    /// already-closed channel is silently dropped (a late RSVP/error
    /// after close never reaches the peer).
    pub fn fail(&mut self, err: WampError) {
        if self.state.is_terminal() {
            return;
        }
        let _ = self.sender.send(Err(err));
        self.state = StreamState::Closed;
    }

    /// The caller's session left while this channel was still in flight.
    pub fn abandon(&mut self) {
        if !self.state.is_terminal() {
            self.state = StreamState::Abandoned;
        }
    }

    /// Marks the channel detached without sending anything further;
    /// used when the callee drops its handle (see the `Drop` impl,
    /// which calls this automatically).
    fn detach(&mut self) {
        if !self.state.is_terminal() {
            self.state = StreamState::Detached;
        }
    }
}

impl Default for StreamChannel {
    fn default() -> Self {
        Self::new(false)
    }
}

/// A callee that drops its channel handle before sending a final chunk
/// never explicitly failed or completed it; the caller must still be
/// unblocked. Per the termination table this surfaces as `cancelled` at
/// the caller and `detached` state at the callee, not a hang.
impl Drop for StreamChannel {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            let _ = self.sender.send(Err(WampError::Cancelled(CancelMode::KillNoWait)));
            self.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn progressive_then_final_outcome_is_observed_in_order() {
        let mut chan = StreamChannel::new(false);
        let mut rx = chan.take_receiver().unwrap();

        chan.send_chunk(None, None, false).unwrap();
        chan.send_chunk(Some(vec![1i64.into()]), None, true).unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert!(!first.is_final());
        let second = rx.recv().await.unwrap().unwrap();
        assert!(second.is_final());
        assert_eq!(chan.state(), StreamState::Closed);
    }

    #[test]
    fn take_receiver_is_single_consumer() {
        let mut chan = StreamChannel::new(false);
        assert!(chan.take_receiver().is_some());
        assert!(chan.take_receiver().is_none());
    }

    #[test]
    fn chunk_before_rsvp_is_refused_when_invitation_expected() {
        let mut chan = StreamChannel::new(true);
        assert_eq!(chan.state(), StreamState::AwaitingRsvp);
        assert!(chan.send_chunk(None, None, false).is_err());
    }

    #[tokio::test]
    async fn respond_sends_rsvp_and_opens_the_channel() {
        let mut chan = StreamChannel::new(true);
        let mut rx = chan.take_receiver().unwrap();
        chan.respond(Some(vec![1i64.into()]), None, false).unwrap();
        assert_eq!(chan.state(), StreamState::Open);
        let rsvp = rx.recv().await.unwrap().unwrap();
        assert!(!rsvp.is_final());
    }

    #[tokio::test]
    async fn fail_after_close_is_dropped() {
        let mut chan = StreamChannel::new(false);
        let mut rx = chan.take_receiver().unwrap();
        chan.send_chunk(None, None, true).unwrap();
        chan.fail(WampError::from("late failure".to_string()));
        let only = rx.recv().await.unwrap().unwrap();
        assert!(only.is_final());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropping_an_open_channel_injects_a_cancellation() {
        let mut chan = StreamChannel::new(false);
        let mut rx = chan.take_receiver().unwrap();
        drop(chan);
        let result = rx.recv().await.unwrap();
        assert!(matches!(result, Err(WampError::Cancelled(CancelMode::KillNoWait))));
    }

    #[test]
    fn dropping_a_closed_channel_does_not_reinject_cancellation() {
        let mut chan = StreamChannel::new(false);
        let mut rx = chan.take_receiver().unwrap();
        chan.send_chunk(None, None, true).unwrap();
        drop(chan);
        let first = rx.try_recv().unwrap().unwrap();
        assert!(first.is_final());
        assert!(rx.try_recv().is_err());
    }
}
