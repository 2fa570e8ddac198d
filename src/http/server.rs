//! Drives the admission front-end from an actual [`TcpListener`]: accepts
//! a connection, reads one request under a [`ServerTimeoutMonitor`],
//! resolves it against the configured [`super::ServerBlock`]s, and either
//! hands the socket off for a WebSocket upgrade or answers it directly
//! (rendering [`super::errorpage`] on any admission failure).

use std::time::Duration;

use log::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

use super::{action::HttpAction, admit, parse_request, ServerBlock};
use crate::deadline::ServerTimeoutMonitor;
use crate::error::{HttpStatus, TransportErrc};
use crate::serializer::SerializerType;
use crate::transport::{websocket, Transport, TransportError};

const MAX_REQUEST_HEAD: usize = 16 * 1024;

/// Deadlines this admission front-end enforces while reading a request
/// head off a freshly-accepted connection.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub idle_timeout: Duration,
    pub read_timeout: Duration,
    pub byte_rate: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        HttpServerConfig { idle_timeout: Duration::from_secs(30), read_timeout: Duration::from_secs(10), byte_rate: 0 }
    }
}

/// What handling one connection produced.
pub enum ConnectionOutcome {
    /// The request was answered directly; the connection may or may not
    /// stay open per the response's `Connection` header.
    Responded,
    /// The connection was handed off to the WebSocket transport for the
    /// WAMP session engine to take over.
    Upgraded(Box<dyn Transport + Send>, SerializerType),
}

/// Binds the admission front-end's listener.
pub async fn listen(bind_addr: &str) -> std::io::Result<TcpListener> {
    TcpListener::bind(bind_addr).await
}

/// Reads, admits and answers (or upgrades) a single accepted connection.
pub async fn handle_connection(
    mut stream: TcpStream,
    blocks: &[ServerBlock],
    supported_serializers: &[SerializerType],
    cfg: &HttpServerConfig,
) -> Result<ConnectionOutcome, TransportError> {
    let mut monitor = ServerTimeoutMonitor::new(Some(cfg.idle_timeout), Some(cfg.read_timeout), None, cfg.byte_rate);
    let now = Instant::now();
    monitor.bump_activity_deadline(now);
    monitor.start_read(now);

    let mut buf = Vec::with_capacity(1024);
    let (parsed_len, status) = loop {
        if monitor.check(Instant::now()).is_some() {
            return Err(TransportErrc::ReadTimeout.into());
        }
        if buf.len() >= MAX_REQUEST_HEAD {
            answer(&mut stream, HttpStatus::RequestHeaderFieldsTooLarge, &Default::default()).await?;
            return Ok(ConnectionOutcome::Responded);
        }

        let mut chunk = [0u8; 512];
        let n = stream.read(&mut chunk).await.map_err(|e| TransportErrc::from_io_error(&e))?;
        if n == 0 {
            return Err(TransportErrc::Disconnected.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        monitor.update_read(n as u64, Instant::now());

        match parse_request(&buf) {
            Ok((_, consumed)) => break (consumed, None),
            Err(TransportErrc::BadRequest) => continue,
            Err(e) => break (0, Some(e)),
        }
    };
    monitor.end_read();

    if let Some(e) = status {
        let http_status = if e == TransportErrc::MisdirectedRequest { HttpStatus::MethodNotAllowed } else { HttpStatus::BadRequest };
        answer(&mut stream, http_status, &Default::default()).await?;
        return Ok(ConnectionOutcome::Responded);
    }

    let (parsed, _) = parse_request(&buf[..parsed_len]).map_err(|_| TransportError::from(TransportErrc::BadRequest))?;

    if parsed.expects_continue {
        stream
            .write_all(b"HTTP/1.1 100 Continue\r\n\r\n")
            .await
            .map_err(|e| TransportErrc::from_io_error(&e))?;
    }

    let action = match admit(&parsed, blocks) {
        Ok(action) => action.clone(),
        Err(status) => {
            debug!("Request for {:?} on {:?} refused : {}", parsed.target, parsed.host, status);
            answer(&mut stream, status, &Default::default()).await?;
            return Ok(ConnectionOutcome::Responded);
        }
    };

    match action {
        HttpAction::WebsocketUpgrade => {
            let (transport, serializer) = websocket::accept(stream, supported_serializers).await?;
            Ok(ConnectionOutcome::Upgraded(transport, serializer))
        }
        HttpAction::CustomResponse { status, content_type, body } => {
            write_response(&mut stream, status, content_type, &body).await?;
            Ok(ConnectionOutcome::Responded)
        }
        HttpAction::Redirect { location, permanent } => {
            let status = if permanent { 308 } else { 307 };
            let head = format!(
                "HTTP/1.1 {} {}\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status,
                if permanent { "Permanent Redirect" } else { "Temporary Redirect" },
                location
            );
            stream.write_all(head.as_bytes()).await.map_err(|e| TransportErrc::from_io_error(&e))?;
            Ok(ConnectionOutcome::Responded)
        }
        HttpAction::StaticFile { .. } => {
            // Document-root serving is out of scope for the WAMP admission
            // path; a server block routing here without a file layer
            // configured is a misconfiguration, answered as such.
            answer(&mut stream, HttpStatus::NotImplemented, &Default::default()).await?;
            Ok(ConnectionOutcome::Responded)
        }
    }
}

async fn answer(stream: &mut TcpStream, status: HttpStatus, custom: &std::collections::HashMap<u16, String>) -> Result<(), TransportError> {
    let (head, body) = super::errorpage::render(status, custom);
    stream.write_all(head.as_bytes()).await.map_err(|e| TransportErrc::from_io_error(&e))?;
    stream.write_all(&body).await.map_err(|e| TransportErrc::from_io_error(&e))?;
    Ok(())
}

async fn write_response(stream: &mut TcpStream, status: u16, content_type: &str, body: &[u8]) -> Result<(), TransportError> {
    let head = format!(
        "HTTP/1.1 {} OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    stream.write_all(head.as_bytes()).await.map_err(|e| TransportErrc::from_io_error(&e))?;
    stream.write_all(body).await.map_err(|e| TransportErrc::from_io_error(&e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::action::HttpAction;

    #[tokio::test]
    async fn unadmitted_host_gets_a_rendered_error_page() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let blocks = vec![ServerBlock::new("configured.example", 1024).route("/ws", HttpAction::WebsocketUpgrade)];

        let client_task = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"GET /ws HTTP/1.1\r\nHost: other.example\r\n\r\n").await.unwrap();
            let mut resp = vec![0u8; 256];
            let n = stream.read(&mut resp).await.unwrap();
            resp.truncate(n);
            resp
        });

        let (stream, _) = listener.accept().await.unwrap();
        let outcome = handle_connection(stream, &blocks, &[SerializerType::Json], &HttpServerConfig::default()).await.unwrap();
        assert!(matches!(outcome, ConnectionOutcome::Responded));

        let resp = client_task.await.unwrap();
        assert!(String::from_utf8_lossy(&resp).starts_with("HTTP/1.1 404"));
    }
}
