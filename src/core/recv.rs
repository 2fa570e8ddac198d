//! Handlers for unsolicited messages arriving from the peer, dispatched
//! by [`super::Core::handle_peer_msg`]. Each function resolves (or logs
//! and drops, if unsolicited) the pending request the message answers.

use log::*;

use crate::core::*;
use crate::peer::PeerState;

pub async fn subscribed(core: &mut Core<'_>, request: WampId, sub_id: WampId) -> Status {
    let res = match core.pending_sub.remove(&request) {
        Some(v) => v,
        None => {
            warn!("Server sent subscribed event for ID we never asked for : {}", request);
            return Status::Ok;
        }
    };

    if core.subscriptions.contains_key(&sub_id) {
        warn!("Server sent subcribed event for ID we already we subscribed to...");
        return Status::Ok;
    }

    let (evt_queue_w, evt_queue_r) = mpsc::unbounded_channel();
    let _ = core.subscriptions.insert(sub_id, evt_queue_w);

    let _ = res.send(Ok((sub_id, evt_queue_r)));

    Status::Ok
}

pub async fn unsubscribed(core: &mut Core<'_>, request: WampId) -> Status {
    let res = match core.pending_transactions.remove(&request) {
        Some(v) => v,
        None => {
            warn!("Server sent unsubscribed event for ID we never asked for : {}", request);
            return Status::Ok;
        }
    };

    let _ = res.send(Ok(None));

    Status::Ok
}

pub async fn published(core: &mut Core<'_>, request: WampId, pub_id: WampId) -> Status {
    let res = match core.pending_transactions.remove(&request) {
        Some(v) => v,
        None => {
            warn!("Server sent published event for ID we never asked for : {}", request);
            return Status::Ok;
        }
    };
    let _ = res.send(Ok(Some(pub_id)));

    Status::Ok
}

pub async fn event(
    core: &mut Core<'_>,
    subscription: WampId,
    publication: WampId,
    _details: WampDict,
    arguments: Option<WampList>,
    arguments_kw: Option<WampDict>,
) -> Status {
    let evt_queue = match core.subscriptions.get(&subscription) {
        Some(e) => e,
        None => {
            warn!("Server sent event for sub ID we are not subscribed to : {}", subscription);
            return Status::Ok;
        }
    };

    if evt_queue.send((publication, arguments, arguments_kw)).is_err() {
        warn!("Client not listenning to subscription {} but did not unsubscribe...", subscription);
    }

    Status::Ok
}

pub async fn registered(core: &mut Core<'_>, request: WampId, registration: WampId) -> Status {
    let (func_ptr, res) = match core.pending_register.remove(&request) {
        Some(v) => v,
        None => {
            warn!("Server sent registered event for ID we never asked for : {}", request);
            return Status::Ok;
        }
    };

    core.rpc_endpoints.insert(registration, func_ptr);
    let _ = res.send(Ok(registration));

    Status::Ok
}

pub async fn unregistered(core: &mut Core<'_>, request: WampId) -> Status {
    let res = match core.pending_transactions.remove(&request) {
        Some(v) => v,
        None => {
            warn!("Server sent unregistered event for ID we never asked for : {}", request);
            return Status::Ok;
        }
    };
    let _ = res.send(Ok(None));

    Status::Ok
}

/// An INVOCATION is answered asynchronously: the registered endpoint is
/// invoked and the resulting future is pushed onto `rpc_event_queue_w`
/// so the caller's dedicated RPC task drives it to completion and feeds
/// the YIELD/ERROR back through the control channel.
pub async fn invocation<'a, 'b>(
    core: &'b mut Core<'a>,
    request: WampId,
    registration: WampId,
    _details: WampDict,
    arguments: Option<WampList>,
    arguments_kw: Option<WampDict>,
) -> Status
where
    'a: 'b,
{
    let func_ptr = match core.rpc_endpoints.get(&registration) {
        Some(f) => f,
        None => {
            warn!("Server sent invocation for registration we dont own : {}", registration);
            return Status::Ok;
        }
    };

    let call_fut = func_ptr(arguments, arguments_kw);
    let ctl_sender = core.ctl_sender.clone();

    let task: GenericFuture<'a> = Box::pin(async move {
        let res = call_fut.await;
        let _ = ctl_sender.send(Request::InvocationResult { request, res });
        Ok(())
    });

    if core.rpc_event_queue_w.send(task).is_err() {
        warn!("RPC event queue was dropped, cannot service invocation {}", request);
    }

    Status::Ok
}

pub async fn call_result(
    core: &mut Core<'_>,
    request: WampId,
    _details: WampDict,
    arguments: Option<WampList>,
    arguments_kw: Option<WampDict>,
) -> Status {
    let res = match core.pending_call.remove(&request) {
        Some(v) => v,
        None => {
            warn!("Server sent call result for ID we never asked for : {}", request);
            return Status::Ok;
        }
    };
    let _ = res.send(Ok((arguments, arguments_kw)));

    Status::Ok
}

pub async fn goodbye(core: &mut Core<'_>, _details: WampDict, reason: WampUri) -> Status {
    debug!("Server sent GOODBYE : {}", reason);

    // Echo GOODBYE_AND_OUT back per the WAMP session-closing procedure,
    // regardless of whether we or the peer initiated the close.
    let was_valid = core.peer.state() == PeerState::Established;

    if was_valid {
        let _ = core
            .send(&Msg::Goodbye {
                details: WampDict::new(),
                reason: "wamp.close.goodbye_and_out".to_string(),
            })
            .await;
    }
    core.peer.closed(Some(reason), &mut core.peer_listener);

    Status::Shutdown
}

pub async fn abort(core: &mut Core<'_>, details: WampDict, reason: WampUri) -> Status {
    error!("Server sent ABORT({}) : {:?}", reason, details);
    core.peer.closed(Some(reason), &mut core.peer_listener);
    Status::Shutdown
}

/// Handles an ERROR sent by the peer in response to one of our requests.
pub async fn error(
    core: &mut Core<'_>,
    request_type: WampInteger,
    request: WampId,
    details: WampDict,
    error_uri: WampUri,
    _arguments: Option<WampList>,
    _arguments_kw: Option<WampDict>,
) -> Status {
    let err = WampError::from_error_uri(error_uri, details);

    match request_type as u64 {
        c if c == MsgCode::Subscribe as u64 => {
            if let Some(res) = core.pending_sub.remove(&request) {
                let _ = res.send(Err(err));
            } else {
                warn!("Received error for subscribe message we never sent");
            }
        }
        c if c == MsgCode::Unsubscribe as u64 => {
            if let Some(res) = core.pending_transactions.remove(&request) {
                let _ = res.send(Err(err));
            } else {
                warn!("Received error for unsubscribe message we never sent");
            }
        }
        c if c == MsgCode::Publish as u64 => {
            if let Some(res) = core.pending_transactions.remove(&request) {
                let _ = res.send(Err(err));
            } else {
                warn!("Received error for publish message we never sent");
            }
        }
        c if c == MsgCode::Register as u64 => {
            if let Some((_func_ptr, res)) = core.pending_register.remove(&request) {
                let _ = res.send(Err(err));
            } else {
                warn!("Received error for register message we never sent");
            }
        }
        c if c == MsgCode::Unregister as u64 => {
            if let Some(res) = core.pending_transactions.remove(&request) {
                let _ = res.send(Err(err));
            } else {
                warn!("Received error for unregister message we never sent");
            }
        }
        c if c == MsgCode::Call as u64 => {
            if let Some(res) = core.pending_call.remove(&request) {
                let _ = res.send(Err(err));
            } else {
                warn!("Received error for call message we never sent");
            }
        }
        _ => {
            warn!("Received error for unhandled request_type {}", request_type);
        }
    };

    Status::Ok
}
