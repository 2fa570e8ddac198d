//! A minimal HTTP/1.1 admission front-end: reads one request with
//! `httparse`, resolves it to a server block by `Host`, enforces a
//! `Content-Length` ceiling, answers `Expect: 100-continue`, and
//! dispatches to an [`action::HttpAction`] keyed by the normalized
//! request-target path.

pub mod action;
pub mod errorpage;
mod server;

use std::collections::HashMap;

pub use action::HttpAction;
use crate::error::{HttpStatus, TransportErrc};

/// Parsed request line + headers this admission layer needs; the body
/// (if any) is read separately once `Content-Length` has been checked.
pub struct ParsedRequest<'a> {
    pub method: &'a str,
    pub target: &'a str,
    pub host: Option<&'a str>,
    pub content_length: Option<usize>,
    pub expects_continue: bool,
}

/// The four legal request-target forms an HTTP/1.1 server must
/// distinguish per RFC 9112 §3.2: only `origin-form` is meaningful for
/// this admission layer (it never proxies), everything else is rejected.
#[derive(Debug, PartialEq, Eq)]
enum TargetForm {
    Origin,
    Absolute,
    Authority,
    Asterisk,
}

fn classify_target(method: &str, target: &str) -> TargetForm {
    if method.eq_ignore_ascii_case("CONNECT") {
        return TargetForm::Authority;
    }
    if target == "*" {
        return TargetForm::Asterisk;
    }
    if target.starts_with('/') {
        return TargetForm::Origin;
    }
    TargetForm::Absolute
}

/// Parses one HTTP/1.1 request out of `buf`, returning the parsed
/// request and the header byte length consumed (the body, if any,
/// starts there).
pub fn parse_request(buf: &[u8]) -> Result<(ParsedRequest<'_>, usize), TransportErrc> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);

    let status = req.parse(buf).map_err(|_| TransportErrc::BadRequest)?;
    let consumed = match status {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Err(TransportErrc::BadRequest),
    };

    let method = req.method.ok_or(TransportErrc::BadRequest)?;
    let target = req.path.ok_or(TransportErrc::BadRequest)?;

    if classify_target(method, target) != TargetForm::Origin && !method.eq_ignore_ascii_case("CONNECT") {
        return Err(TransportErrc::MisdirectedRequest);
    }

    let mut host = None;
    let mut content_length = None;
    let mut expects_continue = false;

    for h in req.headers.iter() {
        if h.name.eq_ignore_ascii_case("host") {
            host = std::str::from_utf8(h.value).ok();
        } else if h.name.eq_ignore_ascii_case("content-length") {
            content_length = std::str::from_utf8(h.value).ok().and_then(|v| v.parse().ok());
        } else if h.name.eq_ignore_ascii_case("expect") {
            if let Ok(v) = std::str::from_utf8(h.value) {
                expects_continue = v.eq_ignore_ascii_case("100-continue");
            }
        }
    }

    Ok((ParsedRequest { method, target, host, content_length, expects_continue }, consumed))
}

/// One configured virtual-host block: a `Host` header value mapped to
/// the actions it serves by normalized path.
#[derive(Default)]
pub struct ServerBlock {
    pub host: String,
    pub routes: HashMap<String, HttpAction>,
    pub max_body_size: usize,
}

impl ServerBlock {
    pub fn new(host: impl Into<String>, max_body_size: usize) -> Self {
        ServerBlock { host: host.into(), routes: HashMap::new(), max_body_size }
    }

    pub fn route(mut self, path: impl Into<String>, action: HttpAction) -> Self {
        self.routes.insert(path.into(), action);
        self
    }
}

/// Resolves a request to the action it should run, or the status/body
/// to answer with on admission failure.
pub fn admit<'a>(req: &ParsedRequest<'_>, blocks: &'a [ServerBlock]) -> Result<&'a HttpAction, HttpStatus> {
    let host = req.host.ok_or(HttpStatus::BadRequest)?;
    let host_name = host.split(':').next().unwrap_or(host);

    let block = blocks.iter().find(|b| b.host == host_name).ok_or(HttpStatus::NotFound)?;

    if let Some(len) = req.content_length {
        if len > block.max_body_size {
            return Err(HttpStatus::PayloadTooLarge);
        }
    }

    block.routes.get(req.target).ok_or(HttpStatus::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_request_line_and_headers() {
        let raw = b"GET /ws HTTP/1.1\r\nHost: example.com\r\nContent-Length: 10\r\n\r\n";
        let (parsed, consumed) = parse_request(raw).unwrap();
        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.target, "/ws");
        assert_eq!(parsed.host, Some("example.com"));
        assert_eq!(parsed.content_length, Some(10));
        assert_eq!(consumed, raw.len());
    }

    #[test]
    fn expect_100_continue_is_detected() {
        let raw = b"POST /upload HTTP/1.1\r\nHost: example.com\r\nExpect: 100-continue\r\n\r\n";
        let (parsed, _) = parse_request(raw).unwrap();
        assert!(parsed.expects_continue);
    }

    #[test]
    fn absolute_form_target_is_misdirected() {
        let raw = b"GET http://example.com/ws HTTP/1.1\r\nHost: example.com\r\n\r\n";
        assert_eq!(parse_request(raw).unwrap_err(), TransportErrc::MisdirectedRequest);
    }

    #[test]
    fn admit_enforces_body_size_limit() {
        let blocks = vec![ServerBlock::new("example.com", 5).route("/ws", HttpAction::WebsocketUpgrade)];
        let raw = b"POST /ws HTTP/1.1\r\nHost: example.com\r\nContent-Length: 100\r\n\r\n";
        let (parsed, _) = parse_request(raw).unwrap();
        assert_eq!(admit(&parsed, &blocks).unwrap_err(), HttpStatus::PayloadTooLarge);
    }

    #[test]
    fn admit_resolves_configured_route() {
        let blocks = vec![ServerBlock::new("example.com", 1024).route("/ws", HttpAction::WebsocketUpgrade)];
        let raw = b"GET /ws HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let (parsed, _) = parse_request(raw).unwrap();
        assert!(matches!(admit(&parsed, &blocks).unwrap(), HttpAction::WebsocketUpgrade));
    }
}
