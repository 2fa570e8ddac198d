//! The client-side session engine: a single-threaded event loop that owns
//! the transport and multiplexes outbound requests (from [`crate::client::Client`]
//! handles, arriving over `ctl_channel`) against inbound peer messages,
//! matching each response against the pending-request table it was filed
//! under.
//!
//! The `tokio::select!` loop races "peer recv" against "local control
//! channel" and dispatches each inbound message by variant to a sibling
//! `core::recv` handler, generalized to cover the full message surface
//! (cancellation, registration dispatch) a router-capable peer needs.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use log::*;
use tokio::select;
use tokio::sync::oneshot::Sender;
use tokio::sync::{mpsc, mpsc::UnboundedReceiver, mpsc::UnboundedSender};

use crate::common::*;
use crate::error::*;
use crate::message::*;
use crate::peer::{NullListener, Peer, PeerState};
use crate::serializer::*;
use crate::transport::*;

mod recv;
mod send;

use crate::client;
pub use send::Request;

pub enum Status {
    /// Returned when the event loop should shutdown
    Shutdown,
    Ok,
}

/// A boxed future resolving to a terminal result, used both for the main
/// event loop future returned to the caller and for authentication
/// challenge handlers.
pub type GenericFuture<'a> = Pin<Box<dyn Future<Output = Result<(), WampError>> + Send + 'a>>;

/// A registered RPC endpoint: given the arguments of an INVOCATION,
/// produces the arguments of the eventual YIELD/ERROR.
pub type RpcFunc<'a> = Box<
    dyn Fn(
            Option<WampArgs>,
            Option<WampKwArgs>,
        ) -> Pin<Box<dyn Future<Output = Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>> + Send + 'a>>
        + Send
        + Sync
        + 'a,
>;

/// Callback invoked when the router sends a CHALLENGE during HELLO
/// negotiation.
pub type AuthenticationChallengeHandler<'a> = Box<
    dyn Fn(
            AuthenticationMethod,
            WampDict,
        ) -> Pin<Box<dyn Future<Output = Result<AuthenticationChallengeResponse, WampError>> + Send + 'a>>
        + Send
        + Sync
        + 'a,
>;

pub type JoinResult = Sender<Result<(WampId, HashMap<WampString, Arg>), WampError>>;
pub type SubscriptionQueue = UnboundedReceiver<(WampId, Option<WampArgs>, Option<WampKwArgs>)>;
pub type PendingSubResult = Sender<Result<(WampId, SubscriptionQueue), WampError>>;
pub type PendingRegisterResult = Sender<Result<WampId, WampError>>;
pub type PendingCallResult = Sender<Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>>;

pub struct Core<'a> {
    /// Generic transport
    sock: Box<dyn Transport + Send>,
    /// Session lifecycle state, replacing a bare `bool` so a router-side
    /// peer and this client-side engine share the same transition rules.
    peer: Peer,
    peer_listener: NullListener,
    core_res: UnboundedSender<Result<(), WampError>>,
    /// Generic serializer
    serializer: Box<dyn SerializerImpl + Send>,
    /// Holds the request_id queues waiting for messages
    ctl_sender: UnboundedSender<Request<'a>>,
    /// Channel for receiving client requests
    ctl_channel: Option<UnboundedReceiver<Request<'a>>>,

    /// Holds set of pending requests
    pending_requests: HashSet<WampId>,
    /// Holds generic transactions that can succeed/fail
    pending_transactions: HashMap<WampId, Sender<Result<Option<WampId>, WampError>>>,

    /// Pending subscription requests sent to the server
    pending_sub: HashMap<WampId, PendingSubResult>,
    /// Current subscriptions
    subscriptions: HashMap<WampId, UnboundedSender<(WampId, Option<WampArgs>, Option<WampKwArgs>)>>,

    /// Pending RPC registration requests sent to the server
    pending_register: HashMap<WampId, (RpcFunc<'a>, PendingRegisterResult)>,
    /// Currently registered RPC endpoints
    rpc_endpoints: HashMap<WampId, RpcFunc<'a>>,
    /// Queue passed back to the client caller to handle rpc events
    pub rpc_event_queue_r: Option<UnboundedReceiver<GenericFuture<'a>>>,
    rpc_event_queue_w: UnboundedSender<GenericFuture<'a>>,

    pending_call: HashMap<WampId, PendingCallResult>,
}

impl<'a> Core<'a> {
    /// Establishes a connection with a WAMP server
    pub async fn connect(
        uri: &url::Url,
        cfg: &client::ClientConfig,
        ctl_channel: (UnboundedSender<Request<'a>>, UnboundedReceiver<Request<'a>>),
        core_res: UnboundedSender<Result<(), WampError>>,
    ) -> Result<Core<'a>, WampError> {
        // Connect to the router using the requested transport
        let (sock, serializer_type) = match uri.scheme() {
            "ws" | "wss" => ws::connect(uri, cfg).await?,
            "tcp" | "tcps" => {
                let host_port = match uri.port() {
                    Some(p) => p,
                    None => {
                        return Err(WampError::UnknownError("No port specified for tcp host".to_string()));
                    }
                };

                rawsocket::connect(
                    uri.host_str().ok_or(WampError::NoHostInUri)?,
                    host_port,
                    uri.scheme() != "tcp",
                    cfg,
                )
                .await?
            }
            s => return Err(WampError::UnknownError(format!("Unknown uri scheme : {}", s))),
        };

        debug!("Connected with serializer : {:?}", serializer_type);

        let serializer = serializer_type
            .new_impl()
            .ok_or_else(|| WampError::UnknownError("Server picked an unsupported serializer".to_string()))?;

        let (rpc_event_queue_w, rpc_event_queue_r) = mpsc::unbounded_channel();

        let mut peer = Peer::new();
        let mut peer_listener = NullListener;
        peer.start_connecting(&mut peer_listener).map_err(|_| WampError::TransportFault(TransportErrc::Failed))?;
        peer.transport_established(&mut peer_listener).map_err(|_| WampError::TransportFault(TransportErrc::Failed))?;

        Ok(Core {
            sock,
            core_res,
            peer,
            peer_listener,
            serializer,
            ctl_sender: ctl_channel.0,
            ctl_channel: Some(ctl_channel.1),
            pending_requests: HashSet::new(),
            pending_transactions: HashMap::new(),

            pending_sub: HashMap::new(),
            subscriptions: HashMap::new(),

            pending_register: HashMap::new(),
            rpc_endpoints: HashMap::new(),
            rpc_event_queue_r: Some(rpc_event_queue_r),
            rpc_event_queue_w,
            pending_call: HashMap::new(),
        })
    }

    /// Event loop that handles outbound/inbound events
    pub async fn event_loop(mut self) -> Result<(), WampError> {
        let mut ctl_channel = self.ctl_channel.take().unwrap();
        let mut heartbeat = tokio::time::interval(std::time::Duration::from_secs(10));
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // Notify the client that we are now running the event loop
        let _ = self.core_res.send(Ok(()));
        loop {
            match select! {
                // Peer sent us a message
                msg = self.recv() => {
                    match msg {
                        Err(e) => {
                            /* The WAMP spec leaves it up to the server implementation
                            to decide whether to close a connection or not after a
                            GOODBYE message (leaving the realm). If we have left the realm,
                            treat a recv() error as expected */
                            if self.peer.state() == PeerState::Established {
                                error!("Failed to recv : {:?}", e);
                                let _ = self.core_res.send(Err(e));
                            }

                            break;
                        },
                        Ok(m) => self.handle_peer_msg(m).await,
                    }
                },
                // client wants to send a message
                req = ctl_channel.recv() => {
                    let req = match req {
                        Some(r) => r,
                        None => {
                            let _ = self.core_res.send(Err(WampError::ClientDied));
                            break;
                        }
                    };
                    self.handle_local_request(req).await
                },
                // keep the raw-socket transport's ping scheduler moving;
                // a no-op on transports that don't schedule their own
                _ = heartbeat.tick() => {
                    if let Err(e) = self.sock.send_heartbeat().await {
                        error!("Heartbeat failed : {:?}", e);
                        let _ = self.core_res.send(Err(e.into()));
                        break;
                    }
                    Status::Ok
                }
            } {
                Status::Shutdown => {
                    let _ = self.core_res.send(Ok(()));
                    break;
                }
                Status::Ok => {}
            }
        }
        debug!("Event loop shutting down !");

        self.shutdown().await;

        Ok(())
    }

    /// Handles unsolicited messages from the peer (events, rpc calls, etc...)
    async fn handle_peer_msg<'b>(&'b mut self, msg: Msg) -> Status
    where
        'a: 'b,
    {
        match msg {
            Msg::Subscribed { request, subscription } => recv::subscribed(self, request, subscription).await,
            Msg::Unsubscribed { request } => recv::unsubscribed(self, request).await,
            Msg::Published { request, publication } => recv::published(self, request, publication).await,
            Msg::Event { subscription, publication, details, arguments, arguments_kw } => {
                recv::event(self, subscription, publication, details, arguments, arguments_kw).await
            }
            Msg::Registered { request, registration } => recv::registered(self, request, registration).await,
            Msg::Unregistered { request } => recv::unregistered(self, request).await,
            Msg::Invocation { request, registration, details, arguments, arguments_kw } => {
                recv::invocation(self, request, registration, details, arguments, arguments_kw).await
            }
            Msg::Result { request, details, arguments, arguments_kw } => {
                recv::call_result(self, request, details, arguments, arguments_kw).await
            }
            Msg::Goodbye { details, reason } => recv::goodbye(self, details, reason).await,
            Msg::Abort { details, reason } => recv::abort(self, details, reason).await,
            Msg::Error { request_type, request, details, error, arguments, arguments_kw } => {
                recv::error(self, request_type, request, details, error, arguments, arguments_kw).await
            }
            other => {
                warn!("Received unhandled message {:?}", other.name());
                Status::Ok
            }
        }
    }

    /// Handles the basic ways one can interact with the peer
    async fn handle_local_request(&mut self, req: Request<'a>) -> Status {
        match req {
            Request::Shutdown => Status::Shutdown,
            Request::Join {
                uri,
                roles,
                agent_str,
                authentication_methods,
                authentication_id,
                authextra,
                on_challenge_handler,
                res,
            } => {
                send::join_realm(
                    self,
                    uri,
                    roles,
                    agent_str,
                    authentication_methods,
                    authextra,
                    authentication_id,
                    on_challenge_handler,
                    res,
                )
                .await
            }
            Request::Leave { res } => send::leave_realm(self, res).await,
            Request::Subscribe { uri, res } => send::subscribe(self, uri, res).await,
            Request::Unsubscribe { sub_id, res } => send::unsubscribe(self, sub_id, res).await,
            Request::Publish { uri, options, arguments, arguments_kw, res } => {
                send::publish(self, uri, options, arguments, arguments_kw, res).await
            }
            Request::Register { uri, res, func_ptr } => send::register(self, uri, res, func_ptr).await,
            Request::Unregister { rpc_id, res } => send::unregister(self, rpc_id, res).await,
            Request::InvocationResult { request, res } => send::invoke_yield(self, request, res).await,
            Request::Call { uri, options, arguments, arguments_kw, res } => {
                send::call(self, uri, options, arguments, arguments_kw, res).await
            }
        }
    }

    /// Serializes a message and sends it on the transport
    pub async fn send(&mut self, msg: &Msg) -> Result<(), WampError> {
        let payload = self
            .serializer
            .pack(msg)
            .map_err(WampError::SerializationError)?;

        trace!("Send[{}] : {} bytes", msg.name(), payload.len());
        self.sock.send(&payload).await?;

        Ok(())
    }

    /// Receives a message and deserializes it
    pub async fn recv<'b>(&'b mut self) -> Result<Msg, WampError>
    where
        'a: 'b,
    {
        let payload = self.sock.recv().await?;
        let msg = self.serializer.unpack(&payload).map_err(WampError::SerializationError)?;
        trace!("Recv[{}] : {} bytes", msg.name(), payload.len());

        Ok(msg)
    }

    /// Closes the transport
    pub async fn shutdown(mut self) {
        self.sock.close().await;
    }

    /// Generates a new request_id and inserts it into the pending_requests
    fn create_request(&mut self) -> WampId {
        let mut request = generate_id();
        while !self.pending_requests.insert(request) {
            request = generate_id();
        }
        request
    }
}
