//! Raw-socket (`tcp://`/`tcps://`) transport: a length-prefixed framing
//! directly over TCP, optionally wrapped in TLS.
//!
//! Supports both the client-dial half and the server-side accept half
//! of the handshake (accept-then-validate). Frame/handshake encoding
//! goes through [`crate::framing`] instead of ad-hoc bit twiddling.

use log::*;

use async_trait::async_trait;
use native_tls::TlsConnector;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::client::ClientConfig;
use crate::error::TransportErrc;
use crate::framing::{FrameHeader, FrameKind, HandshakeWord};
use crate::pinger::Pinger;
use crate::serializer::SerializerType;
use crate::transport::{Transport, TransportError};

pub const MAX_MSG_SZ: u32 = 1 << 24;
pub const MIN_MSG_SZ: u32 = 1 << 9;

enum SockWrapper {
    Plain(TcpStream),
    Tls(tokio_native_tls::TlsStream<TcpStream>),
}

impl SockWrapper {
    pub fn close(&mut self) {
        let sock = match self {
            SockWrapper::Plain(ref mut s) => s,
            SockWrapper::Tls(s) => s.get_mut(),
        };

        let _ = sock.shutdown();
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let res = match self {
            SockWrapper::Plain(ref mut s) => s.write_all(bytes).await,
            SockWrapper::Tls(s) => s.write_all(bytes).await,
        };

        if let Err(e) = res {
            debug!("Failed to send on RawSocket : {:?}", e);
            return Err(TransportErrc::from_io_error(&e).into());
        }

        Ok(())
    }

    pub async fn read_exact(&mut self, out_bytes: &mut [u8]) -> Result<(), TransportError> {
        let res = match self {
            SockWrapper::Plain(ref mut s) => s.read_exact(out_bytes).await,
            SockWrapper::Tls(s) => s.read_exact(out_bytes).await,
        };

        if let Err(e) = res {
            debug!("Failed to recv on RawSocket : {:?}", e);
            return Err(TransportErrc::from_io_error(&e).into());
        }

        Ok(())
    }
}

pub struct RawSocketTransport {
    sock: SockWrapper,
    pinger: Pinger,
}

impl Drop for RawSocketTransport {
    fn drop(&mut self) {
        self.sock.close();
    }
}

impl RawSocketTransport {
    fn new(sock: SockWrapper) -> Self {
        RawSocketTransport {
            sock,
            pinger: Pinger::new(generate_ping_base_id(), std::time::Duration::from_secs(30)),
        }
    }

    /// Sends the next scheduled ping frame, surfacing
    /// [`crate::error::TransportErrc::HeartbeatTimeout`] if the previous
    /// one was never answered.
    pub async fn send_ping(&mut self) -> Result<(), TransportError> {
        let bytes = self.pinger.tick()?;
        let header = FrameHeader::new(FrameKind::Ping, bytes.len() as u32)?;
        self.sock.write_all(&header.to_bytes()).await?;
        self.sock.write_all(&bytes).await
    }
}

fn generate_ping_base_id() -> u64 {
    use rand::Rng;
    rand::thread_rng().gen()
}

#[async_trait]
impl Transport for RawSocketTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let header = FrameHeader::new(FrameKind::Regular, data.len() as u32)?;

        self.sock.write_all(&header.to_bytes()).await?;
        self.sock.write_all(data).await?;

        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            let mut header_bytes = [0u8; 4];
            self.sock.read_exact(&mut header_bytes).await?;
            let header = FrameHeader::from_bytes(header_bytes).map_err(|_| TransportError::ReceiveFailed)?;

            let mut payload = vec![0u8; header.length as usize];
            self.sock.read_exact(&mut payload).await?;

            match header.kind {
                FrameKind::Regular => return Ok(payload),
                // An inbound ping is answered immediately with a pong
                // carrying the same bytes; an inbound pong feeds the
                // heartbeat scheduler so the next `tick` knows it was
                // answered in time.
                FrameKind::Ping => {
                    let pong_header = FrameHeader::new(FrameKind::Pong, payload.len() as u32)?;
                    self.sock.write_all(&pong_header.to_bytes()).await?;
                    self.sock.write_all(&payload).await?;
                    continue;
                }
                FrameKind::Pong => {
                    self.pinger.pong(&payload);
                    continue;
                }
            }
        }
    }

    async fn close(&mut self) {
        self.sock.close();
    }

    async fn send_heartbeat(&mut self) -> Result<(), TransportError> {
        self.send_ping().await
    }
}

/// Dials out to a raw-socket server, trying each configured serializer
/// in priority order until one is accepted.
pub async fn connect(
    host_ip: &str,
    host_port: u16,
    is_tls: bool,
    config: &ClientConfig,
) -> Result<(Box<dyn Transport + Send>, SerializerType), TransportError> {
    let mut msg_size = MAX_MSG_SZ;
    if let Some(m) = config.get_max_msg_size() {
        msg_size = m.clamp(MIN_MSG_SZ, MAX_MSG_SZ);
    }

    for serializer in config.get_serializers() {
        let handshake = HandshakeWord::new(*serializer, msg_size as usize);

        let mut stream = if is_tls {
            SockWrapper::Tls(connect_tls(host_ip, host_port, config).await?)
        } else {
            SockWrapper::Plain(connect_raw(host_ip, host_port).await?)
        };

        trace!("Sending handshake : {:?}", handshake);
        stream.write_all(&handshake.to_bytes()).await?;

        let mut resp_bytes = [0u8; 4];
        stream.read_exact(&mut resp_bytes).await?;

        match HandshakeWord::from_bytes(resp_bytes) {
            Ok(resp) if resp.serializer == *serializer => {
                return Ok((Box::new(RawSocketTransport::new(stream)), *serializer));
            }
            Ok(_) => {
                warn!("Server rejected serializer {:?}, trying next", serializer);
                stream.close();
                continue;
            }
            Err(e) => {
                error!("Handshake rejected by server: {}", e);
                stream.close();
                return Err(TransportError::ConnectionFailed);
            }
        }
    }

    Err(TransportError::SerializerNotSupported(
        "none of the configured serializers were accepted".to_string(),
    ))
}

pub async fn connect_raw(host_ip: &str, host_port: u16) -> Result<TcpStream, TransportError> {
    let host_addr = format!("{}:{}", host_ip, host_port);

    TcpStream::connect(&host_addr).await.map_err(|e| {
        error!("Failed to connect to server using raw tcp: {:?}", e);
        TransportError::ConnectionFailed
    })
}

pub async fn connect_tls(
    host_url: &str,
    host_port: u16,
    cfg: &ClientConfig,
) -> Result<tokio_native_tls::TlsStream<TcpStream>, TransportError> {
    let stream = connect_raw(host_url, host_port).await?;
    let mut tls_cfg = TlsConnector::builder();

    if !cfg.get_ssl_verify() {
        tls_cfg.danger_accept_invalid_certs(true);
    }

    let cx = tls_cfg.build().map_err(|e| {
        error!("Failed to create TLS context : {:?}", e);
        TransportError::ConnectionFailed
    })?;
    let cx = tokio_native_tls::TlsConnector::from(cx);
    cx.connect(host_url, stream).await.map_err(|e| {
        error!("Failed to establish TLS handshake : {:?}", e);
        TransportError::ConnectionFailed
    })
}

/// Accepts a single raw-socket connection on the server side: reads the
/// client's handshake word, validates the requested serializer is one we
/// support, and answers with our own handshake word (or the raw-socket
/// error-code variant of it on rejection).
pub async fn accept(
    mut stream: TcpStream,
    max_msg_size: u32,
) -> Result<(Box<dyn Transport + Send>, SerializerType), TransportError> {
    let mut client_bytes = [0u8; 4];
    stream.read_exact(&mut client_bytes).await.map_err(|_| TransportError::ReceiveFailed)?;

    let client_hs = HandshakeWord::from_bytes(client_bytes).map_err(|_| TransportError::UnexpectedResponse)?;

    if client_hs.serializer == SerializerType::Invalid {
        stream.write_all(&client_bytes).await.ok();
        return Err(TransportError::SerializerNotSupported("invalid".to_string()));
    }

    let our_hs = HandshakeWord::new(client_hs.serializer, max_msg_size as usize);
    stream
        .write_all(&our_hs.to_bytes())
        .await
        .map_err(|_| TransportError::SendFailed)?;

    Ok((
        Box::new(RawSocketTransport::new(SockWrapper::Plain(stream))),
        client_hs.serializer,
    ))
}

/// Binds a raw-socket listener; the caller drives an accept loop handing
/// each connection off to [`accept`] and then to the session engine.
pub async fn listen(bind_addr: &str) -> std::io::Result<TcpListener> {
    TcpListener::bind(bind_addr).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_rejects_invalid_serializer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(&[0x7F, 0xF0, 0, 0]).await.unwrap();
            let mut resp = [0u8; 4];
            stream.read_exact(&mut resp).await.unwrap();
            resp
        });

        let (stream, _) = listener.accept().await.unwrap();
        let result = accept(stream, MAX_MSG_SZ).await;
        assert!(result.is_err());
        client_task.await.unwrap();
    }
}
