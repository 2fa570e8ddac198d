//! Direct in-process connection: bridges a caller and a callee through a
//! shared [`Realm`] without any byte I/O. WELCOME is produced
//! synchronously by [`DirectRouter::join`]; CALL/INVOCATION/YIELD and
//! PUBLISH/EVENT traffic is posted directly onto the destination
//! session's channel instead of being encoded, sent, and decoded.
//!
//! Each joined session is its own logical strand: a dedicated inbox
//! (`mpsc::UnboundedReceiver`) it alone drains, matching the
//! one-owner-per-channel idiom the transport-backed [`crate::core`]
//! engine already uses for its control channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};

use crate::common::{generate_id, InvocationPolicy, MatchPolicy, WampArgs, WampDict, WampId, WampKwArgs, WampUri};
use crate::error::{WampErrc, WampError};
use crate::pubsub::{filter_recipients, PublishFilter};
use crate::realm::Realm;
use crate::rpc::{CancelMode, Outcome, TimeoutRace};

/// One INVOCATION delivered to a callee's inbox.
pub struct Invocation {
    pub request: WampId,
    pub caller_session: Option<WampId>,
    pub arguments: Option<WampArgs>,
    pub arguments_kw: Option<WampKwArgs>,
    /// Fires with the cancel mode the caller used, once.
    pub interrupt: oneshot::Receiver<CancelMode>,
    outcome: mpsc::UnboundedSender<Result<Outcome, WampError>>,
}

impl Invocation {
    /// Sends one chunk back to the caller. `Outcome::Final` ends the call;
    /// anything sent after it is silently dropped by the caller's receiver.
    pub fn send(&self, outcome: Result<Outcome, WampError>) {
        let _ = self.outcome.send(outcome);
    }
}

/// One EVENT delivered to a subscriber's inbox.
pub struct Event {
    pub subscription: WampId,
    pub publisher_session: Option<WampId>,
    pub arguments: Option<WampArgs>,
    pub arguments_kw: Option<WampKwArgs>,
}

struct PendingCall {
    interrupt: Option<oneshot::Sender<CancelMode>>,
    done: bool,
}

type InvocationInboxes = Arc<Mutex<HashMap<WampId, mpsc::UnboundedSender<Invocation>>>>;
type EventInboxes = Arc<Mutex<HashMap<WampId, mpsc::UnboundedSender<Event>>>>;

/// The tables a [`Realm`] of joined [`DirectSession`]s shares: every
/// session's inboxes live here, keyed by registration/subscription id,
/// so a CALL or PUBLISH issued by one session can reach an endpoint
/// owned by another.
#[derive(Default)]
struct RealmInboxes {
    invocations: InvocationInboxes,
    events: EventInboxes,
}

/// A session admitted to a realm, able to register/call/subscribe/publish
/// against it.
pub struct DirectSession {
    pub session_id: WampId,
    realm: Arc<Mutex<Realm>>,
    inboxes: Arc<RealmInboxes>,
    pending_calls: Arc<Mutex<HashMap<WampId, PendingCall>>>,
}

impl DirectSession {
    /// Registers a procedure, returning the registration id and the inbox
    /// this session must drain to serve INVOCATIONs for it.
    pub fn register(&self, procedure: WampUri, policy: MatchPolicy) -> Result<(WampId, mpsc::UnboundedReceiver<Invocation>), WampError> {
        self.register_ex(procedure, policy, InvocationPolicy::Single, false, false)
    }

    /// Registers a procedure with the full set of shared-registration and
    /// streaming metadata a plain [`DirectSession::register`] defaults
    /// away.
    pub fn register_ex(
        &self,
        procedure: WampUri,
        policy: MatchPolicy,
        invocation_policy: InvocationPolicy,
        is_stream: bool,
        expects_invitation: bool,
    ) -> Result<(WampId, mpsc::UnboundedReceiver<Invocation>), WampError> {
        let id = generate_id();
        self.realm
            .lock()
            .unwrap()
            .registrations
            .register(id, procedure, policy, self.session_id, invocation_policy, is_stream, expects_invitation)
            .map_err(|_| WampError::from_error_uri(WampErrc::ProcedureAlreadyExists.to_uri().to_string(), WampDict::new()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.invocations.lock().unwrap().insert(id, tx);
        Ok((id, rx))
    }

    pub fn unregister(&self, registration_id: WampId) {
        self.realm.lock().unwrap().registrations.unregister(registration_id);
        self.inboxes.invocations.lock().unwrap().remove(&registration_id);
    }

    pub fn subscribe(&self, topic: WampUri, policy: MatchPolicy) -> (WampId, mpsc::UnboundedReceiver<Event>) {
        let id = generate_id();
        self.realm.lock().unwrap().subscriptions.subscribe(id, topic, policy, self.session_id);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.events.lock().unwrap().insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, subscription_id: WampId) {
        self.realm.lock().unwrap().subscriptions.unsubscribe(subscription_id);
        self.inboxes.events.lock().unwrap().remove(&subscription_id);
    }

    /// Publishes to every matching subscriber that survives `filter`'s
    /// exclusion/allowlist rules, returning how many received it.
    pub fn publish(
        &self,
        topic: &str,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        disclose_me: bool,
        filter: &PublishFilter,
    ) -> usize {
        let realm = self.realm.lock().unwrap();
        let matches = realm.subscriptions.matching(topic);
        let subscriber_ids = filter_recipients(&matches, Some(self.session_id), filter);
        drop(realm);

        let inboxes = self.inboxes.events.lock().unwrap();
        let mut delivered = 0;
        for sub_id in subscriber_ids {
            if let Some(tx) = inboxes.get(&sub_id) {
                let event = Event {
                    subscription: sub_id,
                    publisher_session: disclose_me.then_some(self.session_id),
                    arguments: arguments.clone(),
                    arguments_kw: arguments_kw.clone(),
                };
                if tx.send(event).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Issues a CALL, returning a receiver of every [`Outcome`] chunk the
    /// callee emits plus a handle to cancel it. `timeout_ms` of 0 disables
    /// the caller-side timeout race entirely.
    pub fn call(
        &self,
        procedure: &str,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        disclose_me: bool,
        timeout_ms: u64,
    ) -> Result<PendingCallHandle, WampError> {
        let registration = self
            .realm
            .lock()
            .unwrap()
            .registrations
            .resolve(procedure)
            .cloned()
            .ok_or_else(|| WampError::from_error_uri(WampErrc::NoSuchProcedure.to_uri().to_string(), WampDict::new()))?;

        let request = generate_id();
        let (interrupt_tx, interrupt_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        self.pending_calls.lock().unwrap().insert(request, PendingCall { interrupt: Some(interrupt_tx), done: false });

        let inboxes = self.inboxes.invocations.lock().unwrap();
        let callee_inbox = inboxes
            .get(&registration.id)
            .ok_or_else(|| WampError::from_error_uri(WampErrc::NoSuchRegistration.to_uri().to_string(), WampDict::new()))?;

        callee_inbox
            .send(Invocation {
                request,
                caller_session: disclose_me.then_some(self.session_id),
                arguments,
                arguments_kw,
                interrupt: interrupt_rx,
                outcome: outcome_tx,
            })
            .map_err(|_| WampError::from_error_uri(WampErrc::NoAvailableCallee.to_uri().to_string(), WampDict::new()))?;

        Ok(PendingCallHandle {
            request,
            outcome_rx,
            pending_calls: self.pending_calls.clone(),
            timeout: TimeoutRace::new(timeout_ms),
        })
    }
}

/// A live CALL the caller is waiting on.
pub struct PendingCallHandle {
    request: WampId,
    outcome_rx: mpsc::UnboundedReceiver<Result<Outcome, WampError>>,
    pending_calls: Arc<Mutex<HashMap<WampId, PendingCall>>>,
    pub timeout: TimeoutRace,
}

impl PendingCallHandle {
    /// Awaits the next chunk, racing the configured timeout. A caller
    /// timeout always cancels with `killnowait`, never a caller-chosen
    /// mode: once the deadline passes there's no more point waiting for
    /// the callee's cooperation, so the call is torn down unilaterally
    /// and the caller observes `cancelled` immediately.
    pub async fn next(&mut self) -> Result<Outcome, WampError> {
        tokio::select! {
            chunk = self.outcome_rx.recv() => {
                let result = chunk.unwrap_or_else(|| Err(WampError::from_error_uri(WampErrc::NoSuchSession.to_uri().to_string(), WampDict::new())));
                if matches!(&result, Ok(o) if o.is_final()) || result.is_err() {
                    self.mark_done();
                }
                result
            }
            _ = self.timeout.expired() => {
                self.cancel(CancelMode::KillNoWait);
                self.mark_done();
                Err(WampError::Cancelled(CancelMode::KillNoWait))
            }
        }
    }

    /// Emits a cancel signal for this call. A no-op once the call has
    /// already produced its final outcome (spec invariant: cancel after
    /// completion never produces an additional event).
    pub fn cancel(&self, mode: CancelMode) {
        let mut calls = self.pending_calls.lock().unwrap();
        if let Some(entry) = calls.get_mut(&self.request) {
            if entry.done {
                return;
            }
            if mode != CancelMode::Skip {
                if let Some(tx) = entry.interrupt.take() {
                    let _ = tx.send(mode);
                }
            }
        }
    }

    fn mark_done(&self) {
        if let Some(entry) = self.pending_calls.lock().unwrap().get_mut(&self.request) {
            entry.done = true;
        }
    }
}

/// Owns the realms a process serves and admits [`DirectSession`]s into
/// them without any transport or serializer in the loop.
#[derive(Default)]
pub struct DirectRouter {
    realms: HashMap<WampUri, (Arc<Mutex<Realm>>, Arc<RealmInboxes>)>,
}

impl DirectRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a new session to `realm_uri`, creating the realm on first
    /// use. This is the synchronous WELCOME spec.md §4.I calls for: no
    /// handshake, no frame round-trip.
    ///
    /// The inbox tables are shared per-realm rather than per-session: a
    /// registration/subscription made by one session must be reachable
    /// by a CALL/PUBLISH issued from any other session joined to the
    /// same realm.
    pub fn join(&mut self, realm_uri: WampUri) -> DirectSession {
        let (realm, inboxes) = self
            .realms
            .entry(realm_uri.clone())
            .or_insert_with(|| (Arc::new(Mutex::new(Realm::new(realm_uri))), Arc::new(RealmInboxes::default())))
            .clone();
        let session_id = realm.lock().unwrap().admit(None);
        DirectSession {
            session_id,
            realm,
            inboxes,
            pending_calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_admits_distinct_sessions_to_shared_realm() {
        let mut router = DirectRouter::new();
        let a = router.join("realm1".into());
        let b = router.join("realm1".into());
        assert_ne!(a.session_id, b.session_id);
    }

    #[tokio::test]
    async fn call_with_no_callee_fails_fast() {
        let mut router = DirectRouter::new();
        let caller = router.join("realm1".into());
        let err = caller.call("com.missing", None, None, false, 0).unwrap_err();
        assert!(matches!(err, WampError::ServerError(WampErrc::NoSuchProcedure, ..)));
    }

    #[tokio::test]
    async fn cancel_after_completion_is_a_no_op() {
        let mut router = DirectRouter::new();
        let callee = router.join("realm1".into());
        let caller = router.join("realm1".into());

        let (_reg_id, mut inbox) = callee.register("com.example.echo".into(), MatchPolicy::Exact).unwrap();
        tokio::spawn(async move {
            if let Some(inv) = inbox.recv().await {
                inv.send(Ok(Outcome::Final(inv.arguments.clone(), inv.arguments_kw.clone())));
            }
        });

        let mut call = caller.call("com.example.echo", None, None, false, 0).unwrap();
        let outcome = call.next().await.unwrap();
        assert!(outcome.is_final());

        // cancelling after completion must not produce another event
        call.cancel(CancelMode::Kill);
    }

    #[tokio::test]
    async fn publish_reaches_a_subscription_owned_by_another_session() {
        let mut router = DirectRouter::new();
        let publisher = router.join("realm1".into());
        let subscriber = router.join("realm1".into());

        let (_sub_id, mut events) = subscriber.subscribe("com.example.topic".into(), MatchPolicy::Exact);
        let delivered = publisher.publish("com.example.topic", None, None, false, &PublishFilter::default());
        assert_eq!(delivered, 1);
        assert!(events.recv().await.is_some());
    }

    #[tokio::test]
    async fn exclude_me_suppresses_delivery_to_the_publisher_itself() {
        let mut router = DirectRouter::new();
        let session = router.join("realm1".into());
        let (_sub_id, mut events) = session.subscribe("com.example.topic".into(), MatchPolicy::Exact);

        let filter = PublishFilter { exclude_me: true, ..Default::default() };
        let delivered = session.publish("com.example.topic", None, None, false, &filter);
        assert_eq!(delivered, 0);
        assert!(events.try_recv().is_err());
    }
}
