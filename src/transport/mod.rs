//! Transport abstraction shared by the raw-socket and WebSocket
//! implementations: a small async trait plus the queueing/heartbeat glue
//! each concrete transport is built on top of.

use async_trait::async_trait;
use quick_error::*;

pub mod queue;
pub mod rawsocket;
pub use rawsocket as tcp;
pub mod websocket;
pub use crate::transport::websocket as ws;

/// Minimal send/recv/close surface every transport (raw-socket,
/// WebSocket) implements. Kept intentionally small — framing, heartbeat
/// and deadline concerns live one layer up in [`queue`]/`crate::pinger`/
/// `crate::deadline` so they're shared rather than duplicated per
/// transport.
#[async_trait]
pub trait Transport {
    /// Sends a whole wamp message over the transport
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;
    /// Receives a whole wamp message from the transport
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError>;
    /// Closes the transport connection with the host
    async fn close(&mut self);

    /// Sends one heartbeat ping if this transport schedules its own (the
    /// raw-socket transport does, through [`crate::pinger::Pinger`]);
    /// WebSocket relies on the protocol's native ping/pong frames and has
    /// nothing to do here.
    async fn send_heartbeat(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum TransportError {
        MaximumServerConn {
            display("Server hit the maximum connection count")
        }
        UnexpectedResponse {
            display("Server responded with unexpected data")
        }
        SerializerNotSupported(e: String) {
            display("The current serializer is not supported by the server (Requested : {})", e)
        }
        InvalidMaximumMsgSize(e: u32) {
            display("The server did not accept the maximum payload size (Requested : {})", e)
        }
        ConnectionFailed {
            display("Failed to negotiate connection with the server")
        }
        SendFailed {
            display("Failed to send message to peer")
        }
        ReceiveFailed {
            display("Failed to receive message from peer")
        }
        Fault(e: crate::error::TransportErrc) {
            from()
            display("Transport fault: {}", e)
        }
    }
}
