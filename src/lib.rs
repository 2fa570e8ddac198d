mod client;
mod common;
mod core;
mod crypto;
mod deadline;
mod direct;
mod error;
mod framing;
mod message;
pub mod options;
mod peer;
mod pinger;
mod pubsub;
mod realm;
mod router;
pub mod rpc;
mod serializer;
mod transport;

pub mod http;

/// Default `agent` string sent in a HELLO's `Details.agent`, identifying
/// this crate and its version to the peer.
pub const DEFAULT_AGENT_STR: &str = concat!("wamp_core-rs/", env!("CARGO_PKG_VERSION"));

pub use client::{Client, ClientConfig, ClientState};
pub use common::*;
pub use crypto::CryptoSign;
pub use direct::{DirectRouter, DirectSession, Event, Invocation, PendingCallHandle};
pub use error::*;
pub use message::Msg;
pub use peer::{NullListener, Peer, PeerEventListener, PeerState};
pub use realm::Realm;
pub use router::Router;
pub use serializer::SerializerType;
