//! The error taxonomy used throughout this crate.
//!
//! WAMP itself only standardizes a set of `wamp.error.*` URIs exchanged on
//! the wire (`WampErrc`); everything below it — transport framing faults,
//! decode faults, HTTP admission faults, websocket close codes — is local
//! to an implementation. This module keeps each concern in its own closed
//! enum and wraps them all in the single `WampError` the public API
//! surfaces.

use quick_error::*;
use url::ParseError;

use crate::common::*;
use crate::serializer::SerializerError;
use crate::transport::TransportError;

/// Standard and advanced-profile WAMP error URIs, represented as a closed
/// enum so callers can match on them instead of comparing strings.
///
/// Every variant's [`WampErrc::to_uri`] is a distinct, canonical URI, and
/// [`WampErrc::from_uri`] round-trips it back to that same variant for
/// every variant other than [`WampErrc::Unknown`] (the fallback for a URI
/// this enum doesn't recognize). Some variants are nonetheless
/// *equivalent* in the sense of describing the same underlying condition
/// from different angles — a session killed by the router, a session
/// closed because the realm was closed, and a router shutting down all
/// describe the session going away out from under the peer. That
/// relationship is a predicate, [`WampErrc::is_equivalent`], not a URI
/// alias: it never collapses two variants onto one wire string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum WampErrc {
    /// A URI that doesn't map to any variant below; the round-trip
    /// property deliberately excludes this one.
    Unknown,
    InvalidUri,
    NoSuchProcedure,
    ProcedureAlreadyExists,
    NoSuchRegistration,
    NoSuchSubscription,
    InvalidArgument,
    SystemShutdown,
    CloseRealm,
    GoodbyeAndOut,
    SessionKilled,
    ClosedNormally,
    NotAuthorized,
    AuthorizationFailed,
    AuthorizationRequired,
    AuthorizationDenied,
    NoSuchRealm,
    NoSuchRole,
    NoSuchSession,
    Cancelled,
    TimedOut,
    OptionNotAllowed,
    NoEligibleCallee,
    DiscloseMeDisallowed,
    NetworkFailure,
    UnavailableSession,
    FeatureNotSupported,
    NoSuchPrincipal,
    ProtocolViolation,
    PayloadSizeExceeded,
    NoAvailableCallee,
    AuthenticationFailed,
    NoSuchAuthenticationMethod,
    AuthenticationRequired,
    AuthenticationDenied,
}

impl WampErrc {
    pub fn to_uri(self) -> &'static str {
        match self {
            WampErrc::Unknown => "wamp.error.unknown",
            WampErrc::InvalidUri => "wamp.error.invalid_uri",
            WampErrc::NoSuchProcedure => "wamp.error.no_such_procedure",
            WampErrc::ProcedureAlreadyExists => "wamp.error.procedure_already_exists",
            WampErrc::NoSuchRegistration => "wamp.error.no_such_registration",
            WampErrc::NoSuchSubscription => "wamp.error.no_such_subscription",
            WampErrc::InvalidArgument => "wamp.error.invalid_argument",
            WampErrc::SystemShutdown => "wamp.error.system_shutdown",
            WampErrc::CloseRealm => "wamp.error.close_realm",
            WampErrc::GoodbyeAndOut => "wamp.error.goodbye_and_out",
            WampErrc::SessionKilled => "wamp.error.session_killed",
            WampErrc::ClosedNormally => "wamp.close.normal",
            WampErrc::NotAuthorized => "wamp.error.not_authorized",
            WampErrc::AuthorizationFailed => "wamp.error.authorization_failed",
            WampErrc::AuthorizationRequired => "wamp.error.authorization_required",
            WampErrc::AuthorizationDenied => "wamp.error.authorization_denied",
            WampErrc::NoSuchRealm => "wamp.error.no_such_realm",
            WampErrc::NoSuchRole => "wamp.error.no_such_role",
            WampErrc::NoSuchSession => "wamp.error.no_such_session",
            WampErrc::Cancelled => "wamp.error.canceled",
            WampErrc::TimedOut => "wamp.error.timeout",
            WampErrc::OptionNotAllowed => "wamp.error.option_not_allowed",
            WampErrc::NoEligibleCallee => "wamp.error.no_eligible_callee",
            WampErrc::DiscloseMeDisallowed => "wamp.error.option_disallowed.disclose_me",
            WampErrc::NetworkFailure => "wamp.error.network_failure",
            WampErrc::UnavailableSession => "wamp.error.unavailable",
            WampErrc::FeatureNotSupported => "wamp.error.not_supported",
            WampErrc::NoSuchPrincipal => "wamp.error.no_such_principal",
            WampErrc::ProtocolViolation => "wamp.error.protocol_violation",
            WampErrc::PayloadSizeExceeded => "wamp.error.payload_size_exceeded",
            WampErrc::NoAvailableCallee => "wamp.error.no_available_callee",
            WampErrc::AuthenticationFailed => "wamp.error.authentication_failed",
            WampErrc::NoSuchAuthenticationMethod => "wamp.error.no_such_authmethod",
            WampErrc::AuthenticationRequired => "wamp.error.authentication_required",
            WampErrc::AuthenticationDenied => "wamp.error.authentication_denied",
        }
    }

    /// Looks up the canonical variant for a wire-format error uri via a
    /// sorted binary search table rather than a linear match chain,
    /// falling back to [`WampErrc::Unknown`] for a uri with no variant.
    pub fn from_uri(uri: &str) -> WampErrc {
        const TABLE: &[(&str, WampErrc)] = &[
            ("wamp.close.normal", WampErrc::ClosedNormally),
            ("wamp.error.authentication_denied", WampErrc::AuthenticationDenied),
            ("wamp.error.authentication_failed", WampErrc::AuthenticationFailed),
            ("wamp.error.authentication_required", WampErrc::AuthenticationRequired),
            ("wamp.error.authorization_denied", WampErrc::AuthorizationDenied),
            ("wamp.error.authorization_failed", WampErrc::AuthorizationFailed),
            ("wamp.error.authorization_required", WampErrc::AuthorizationRequired),
            ("wamp.error.canceled", WampErrc::Cancelled),
            ("wamp.error.close_realm", WampErrc::CloseRealm),
            ("wamp.error.goodbye_and_out", WampErrc::GoodbyeAndOut),
            ("wamp.error.invalid_argument", WampErrc::InvalidArgument),
            ("wamp.error.invalid_uri", WampErrc::InvalidUri),
            ("wamp.error.network_failure", WampErrc::NetworkFailure),
            ("wamp.error.no_available_callee", WampErrc::NoAvailableCallee),
            ("wamp.error.no_eligible_callee", WampErrc::NoEligibleCallee),
            ("wamp.error.no_such_authmethod", WampErrc::NoSuchAuthenticationMethod),
            ("wamp.error.no_such_principal", WampErrc::NoSuchPrincipal),
            ("wamp.error.no_such_procedure", WampErrc::NoSuchProcedure),
            ("wamp.error.no_such_realm", WampErrc::NoSuchRealm),
            ("wamp.error.no_such_registration", WampErrc::NoSuchRegistration),
            ("wamp.error.no_such_role", WampErrc::NoSuchRole),
            ("wamp.error.no_such_session", WampErrc::NoSuchSession),
            ("wamp.error.no_such_subscription", WampErrc::NoSuchSubscription),
            ("wamp.error.not_authorized", WampErrc::NotAuthorized),
            ("wamp.error.not_supported", WampErrc::FeatureNotSupported),
            ("wamp.error.option_disallowed.disclose_me", WampErrc::DiscloseMeDisallowed),
            ("wamp.error.option_not_allowed", WampErrc::OptionNotAllowed),
            ("wamp.error.payload_size_exceeded", WampErrc::PayloadSizeExceeded),
            ("wamp.error.procedure_already_exists", WampErrc::ProcedureAlreadyExists),
            ("wamp.error.session_killed", WampErrc::SessionKilled),
            ("wamp.error.system_shutdown", WampErrc::SystemShutdown),
            ("wamp.error.timeout", WampErrc::TimedOut),
            ("wamp.error.unavailable", WampErrc::UnavailableSession),
        ];
        TABLE
            .binary_search_by(|(u, _)| u.cmp(&uri))
            .ok()
            .map(|i| TABLE[i].1)
            .unwrap_or(WampErrc::Unknown)
    }

    /// Whether `self` and `other` describe the same underlying condition
    /// even though they're distinct, non-aliased URIs on the wire: a
    /// router-initiated session kill, a realm closing, and a full system
    /// shutdown all mean the same thing to the peer losing its session; a
    /// locally cancelled call and one that timed out both mean "the
    /// result will never arrive"; a blanket "option not allowed" and the
    /// specific "disclose_me not allowed" both mean the same option was
    /// refused.
    pub fn is_equivalent(&self, other: &WampErrc) -> bool {
        if self == other {
            return true;
        }

        fn group(e: &WampErrc) -> Option<u8> {
            match e {
                WampErrc::SessionKilled | WampErrc::SystemShutdown | WampErrc::CloseRealm => Some(0),
                WampErrc::Cancelled | WampErrc::TimedOut => Some(1),
                WampErrc::OptionNotAllowed | WampErrc::DiscloseMeDisallowed => Some(2),
                _ => None,
            }
        }

        matches!((group(self), group(other)), (Some(a), Some(b)) if a == b)
    }
}

impl std::fmt::Display for WampErrc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl std::error::Error for WampErrc {}

quick_error! {
    /// Faults in the bytestream/framing layer shared by raw-socket and
    /// websocket transports and by the server-side deadline monitor.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum TransportErrc {
        Aborted {
            display("the transport operation was aborted")
        }
        Disconnected {
            display("the transport was disconnected by the peer")
        }
        Failed {
            display("the transport failed")
        }
        Exhausted {
            display("the outbound queue capacity was exhausted")
        }
        TooLong {
            display("an incoming message exceeded the negotiated size limit")
        }
        OutboundTooLong {
            display("an outgoing message exceeded the negotiated size limit")
        }
        BadHandshake {
            display("the raw-socket handshake was malformed or incompatible")
        }
        BadCommand {
            display("an invalid raw-socket control frame was received")
        }
        BadSerializer {
            display("the negotiated serializer id is not supported")
        }
        BadLengthLimit {
            display("the handshake advertised an invalid maximum length code")
        }
        BadFeature {
            display("an unsupported handshake feature bit was set")
        }
        Saturated {
            display("the peer is saturated and cannot accept more data right now")
        }
        HeartbeatTimeout {
            display("no pong was received before the next ping was due")
        }
        HeaderTimeout {
            display("the peer did not finish sending a message header in time")
        }
        BodyTimeout {
            display("the peer did not finish sending a message body in time")
        }
        ReadTimeout {
            display("no inbound activity was observed within the read deadline")
        }
        WriteTimeout {
            display("the outbound queue did not drain within the write deadline")
        }
        IdleTimeout {
            display("the connection was idle past the configured idle deadline")
        }
        LingerTimeout {
            display("the connection did not close within the linger deadline")
        }
        Ended {
            display("the peer closed the transport normally")
        }
        ExpectedText {
            display("a binary frame was received where only text frames are accepted")
        }
        ExpectedBinary {
            display("a text frame was received where only binary frames are accepted")
        }
        Shedded {
            display("the server shed the connection under load")
        }
        ContentTooLarge {
            display("the peer declared a message larger than the configured maximum")
        }
        ReservedBitsUsed {
            display("a reserved protocol bit was set")
        }
        UnsupportedFormat {
            display("the peer requested an unsupported wire format")
        }
        MisdirectedRequest {
            display("the request's Host header does not match any served realm")
        }
        BadRequest {
            display("the request was malformed")
        }
    }
}

impl TransportErrc {
    /// Whether this fault means the transport is no longer usable and
    /// must be torn down, versus one that is recoverable in place.
    pub fn is_fatal(self) -> bool {
        !matches!(self, TransportErrc::Saturated)
    }

    /// Equivalence predicate over this category: every variant is its own
    /// class, so this reduces to identity. Kept as a named method (rather
    /// than callers reaching for `==` directly) so it reads the same way
    /// as the other three categories' predicates.
    pub fn is_equivalent(self, other: Self) -> bool {
        self == other
    }

    /// Classifies a raw I/O fault into the transport condition it
    /// subsumes: a reset connection or unexpected EOF is a
    /// [`TransportErrc::Disconnected`], an interrupted operation is an
    /// [`TransportErrc::Aborted`], anything else unclassified collapses
    /// to [`TransportErrc::Failed`].
    pub fn from_io_error(err: &std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            ConnectionReset | ConnectionAborted | BrokenPipe | UnexpectedEof => TransportErrc::Disconnected,
            Interrupted => TransportErrc::Aborted,
            _ => TransportErrc::Failed,
        }
    }
}

impl From<std::io::Error> for TransportErrc {
    fn from(err: std::io::Error) -> Self {
        TransportErrc::from_io_error(&err)
    }
}

quick_error! {
    /// Faults produced while encoding or decoding a wire payload in
    /// the serializer modules.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum DecodingErrc {
        Success {
            display("no error")
        }
        Failure {
            display("a generic decoding failure occurred")
        }
        EmptyInput {
            display("the input to decode was empty")
        }
        ExpectedStringError {
            display("expected a string value")
        }
        BadBase64Length {
            display("a base64-encoded binary value had an invalid length")
        }
        BadBase64Padding {
            display("a base64-encoded binary value had invalid padding")
        }
        BadBase64Character {
            display("a base64-encoded binary value contained an invalid character")
        }
    }
}

impl DecodingErrc {
    /// `Failure` is the catch-all for this category: it's equivalent to
    /// any other non-`Success` variant, the same way a codec library's
    /// single generic error code subsumes whatever specific library code
    /// it was raised from.
    pub fn is_equivalent(&self, other: &DecodingErrc) -> bool {
        if self == other {
            return true;
        }
        let subsumes = |a: &DecodingErrc, b: &DecodingErrc| *a == DecodingErrc::Failure && *b != DecodingErrc::Success;
        subsumes(self, other) || subsumes(other, self)
    }
}

quick_error! {
    /// Catch-all local faults that don't belong to the transport or
    /// decoding taxonomies.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum MiscErrc {
        Success {
            display("no error")
        }
        AbandonedByPeer {
            display("the operation was abandoned because the peer session ended")
        }
        InvalidState {
            display("the operation was attempted from an invalid peer state")
        }
        ZombifiedSession {
            display("messages were received for a session which is no longer connected")
        }
        NotAuthorized {
            display("the local policy forbids this operation")
        }
        NoSuchRealm {
            display("the referenced realm does not exist locally")
        }
    }
}

impl MiscErrc {
    /// Identity-based equivalence: this category's variants are already
    /// disjoint local conditions with no aliasing to collapse.
    pub fn is_equivalent(&self, other: &MiscErrc) -> bool {
        self == other
    }
}

/// HTTP status codes used by the admission front-end when rejecting or
/// redirecting a request before a WebSocket upgrade happens.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HttpStatus {
    Continue = 100,
    SwitchingProtocols = 101,
    Ok = 200,
    NoContent = 204,
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    TemporaryRedirect = 307,
    PermanentRedirect = 308,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    LengthRequired = 411,
    PayloadTooLarge = 413,
    UriTooLong = 414,
    UnsupportedMediaType = 415,
    ExpectationFailed = 417,
    UpgradeRequired = 426,
    RequestHeaderFieldsTooLarge = 431,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
    HttpVersionNotSupported = 505,
    NetworkAuthenticationRequired = 511,
}

impl HttpStatus {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn reason(self) -> &'static str {
        match self {
            HttpStatus::Continue => "Continue",
            HttpStatus::SwitchingProtocols => "Switching Protocols",
            HttpStatus::Ok => "OK",
            HttpStatus::NoContent => "No Content",
            HttpStatus::MovedPermanently => "Moved Permanently",
            HttpStatus::Found => "Found",
            HttpStatus::SeeOther => "See Other",
            HttpStatus::NotModified => "Not Modified",
            HttpStatus::TemporaryRedirect => "Temporary Redirect",
            HttpStatus::PermanentRedirect => "Permanent Redirect",
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::Unauthorized => "Unauthorized",
            HttpStatus::Forbidden => "Forbidden",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::MethodNotAllowed => "Method Not Allowed",
            HttpStatus::RequestTimeout => "Request Timeout",
            HttpStatus::LengthRequired => "Length Required",
            HttpStatus::PayloadTooLarge => "Payload Too Large",
            HttpStatus::UriTooLong => "URI Too Long",
            HttpStatus::UnsupportedMediaType => "Unsupported Media Type",
            HttpStatus::ExpectationFailed => "Expectation Failed",
            HttpStatus::UpgradeRequired => "Upgrade Required",
            HttpStatus::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            HttpStatus::InternalServerError => "Internal Server Error",
            HttpStatus::NotImplemented => "Not Implemented",
            HttpStatus::BadGateway => "Bad Gateway",
            HttpStatus::ServiceUnavailable => "Service Unavailable",
            HttpStatus::HttpVersionNotSupported => "HTTP Version Not Supported",
            HttpStatus::NetworkAuthenticationRequired => "Network Authentication Required",
        }
    }
}

impl std::fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// RFC6455 WebSocket close codes this crate distinguishes; anything else
/// received on the wire is preserved via `Other`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WebsocketCloseErrc {
    Normal,
    GoingAway,
    BadPayload,
    TooBig,
    TryAgainLater,
    Other(u16),
}

impl WebsocketCloseErrc {
    pub fn from_code(code: u16) -> Self {
        match code {
            1000 => WebsocketCloseErrc::Normal,
            1001 => WebsocketCloseErrc::GoingAway,
            1007 => WebsocketCloseErrc::BadPayload,
            1009 => WebsocketCloseErrc::TooBig,
            1013 => WebsocketCloseErrc::TryAgainLater,
            other => WebsocketCloseErrc::Other(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            WebsocketCloseErrc::Normal => 1000,
            WebsocketCloseErrc::GoingAway => 1001,
            WebsocketCloseErrc::BadPayload => 1007,
            WebsocketCloseErrc::TooBig => 1009,
            WebsocketCloseErrc::TryAgainLater => 1013,
            WebsocketCloseErrc::Other(c) => c,
        }
    }

    /// Maps a received close code to the transport fault it represents.
    pub fn to_transport_errc(self) -> TransportErrc {
        match self {
            WebsocketCloseErrc::Normal => TransportErrc::Ended,
            WebsocketCloseErrc::GoingAway => TransportErrc::Ended,
            WebsocketCloseErrc::BadPayload => TransportErrc::ExpectedBinary,
            WebsocketCloseErrc::TooBig => TransportErrc::ContentTooLarge,
            WebsocketCloseErrc::TryAgainLater => TransportErrc::Shedded,
            WebsocketCloseErrc::Other(_) => TransportErrc::Failed,
        }
    }
}

quick_error! {
    /// Types of errors a WAMP client can encounter.
    #[derive(Debug)]
    pub enum WampError {
        UnknownError(e: String) {
            from()
            display("Unhandled error : {}", e)
        }
        /// Error with the connection
        ConnectionError(e: TransportError) {
            from()
            source(e)
            display("An error occured with the connection: ({})", e)
        }
        /// A transport-layer fault (framing, heartbeat, deadline)
        TransportFault(e: TransportErrc) {
            from()
            display("A transport fault occured: {}", e)
        }
        /// Error with serialization
        SerializationError(e: SerializerError) {
            from()
            source(e)
            display("An error occured while [de]serializing a message: ({})", e)
        }
        /// WAMP uri is invalid
        InvalidUri(e: ParseError) {
            from()
            source(e)
            display("The uri provided could not be parsed: {}", e)
        }
        /// Server uri is invalid
        NoHostInUri {
            display("The uri provided did not contain a host address")
        }
        /// The WAMP protocol was not respected by the peer
        ProtocolError(e: String) {
            display("An unexpected WAMP message was received: {}", e)
        }
        /// The client has been dropped while the event loop was running
        ClientDied {
            display("The client has exited without sending Shutdown")
        }
        /// A randomly generated ID was not unique
        RequestIdCollision {
            display("There was a collision with a unique request id")
        }
        /// The in-flight call/registration/subscription was cancelled locally
        Cancelled(mode: CancelMode) {
            display("The operation was cancelled ({})", mode.as_str())
        }
        /// The operation did not complete before its deadline
        TimedOut {
            display("The operation timed out")
        }
        /// The server sent us an Error message
        ServerError(errc: WampErrc, uri: String, details: WampDict) {
            display("The server returned an error: {} {:?}", uri, details)
        }
    }
}

impl WampError {
    /// Builds a [`WampError::ServerError`] from a wire-format error uri,
    /// resolving it to a canonical [`WampErrc`] when recognized.
    pub fn from_error_uri(uri: String, details: WampDict) -> Self {
        let errc = WampErrc::from_uri(&uri);
        WampError::ServerError(errc, uri, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wamp_errc_uri_round_trips_through_canonical_form() {
        for errc in [
            WampErrc::InvalidUri,
            WampErrc::NoSuchProcedure,
            WampErrc::Cancelled,
            WampErrc::TimedOut,
            WampErrc::NotAuthorized,
            WampErrc::SessionKilled,
            WampErrc::SystemShutdown,
            WampErrc::CloseRealm,
            WampErrc::ClosedNormally,
            WampErrc::OptionNotAllowed,
            WampErrc::DiscloseMeDisallowed,
        ] {
            let uri = errc.to_uri();
            let parsed = WampErrc::from_uri(uri);
            assert_eq!(parsed, errc);
            assert_eq!(parsed.to_uri(), uri);
        }
    }

    #[test]
    fn unrecognized_uri_falls_back_to_unknown() {
        assert_eq!(WampErrc::from_uri("wamp.error.something_made_up"), WampErrc::Unknown);
    }

    #[test]
    fn session_ending_variants_are_equivalent_but_not_aliased() {
        assert_ne!(WampErrc::SessionKilled.to_uri(), WampErrc::SystemShutdown.to_uri());
        assert_ne!(WampErrc::SessionKilled.to_uri(), WampErrc::CloseRealm.to_uri());
        assert!(WampErrc::SessionKilled.is_equivalent(&WampErrc::SystemShutdown));
        assert!(WampErrc::SessionKilled.is_equivalent(&WampErrc::CloseRealm));
        assert!(!WampErrc::SessionKilled.is_equivalent(&WampErrc::ClosedNormally));
    }

    #[test]
    fn cancelled_and_timed_out_are_equivalent_but_not_aliased() {
        assert_ne!(WampErrc::Cancelled.to_uri(), WampErrc::TimedOut.to_uri());
        assert!(WampErrc::Cancelled.is_equivalent(&WampErrc::TimedOut));
    }

    #[test]
    fn option_disallowed_variants_are_equivalent_but_not_aliased() {
        assert_ne!(WampErrc::OptionNotAllowed.to_uri(), WampErrc::DiscloseMeDisallowed.to_uri());
        assert!(WampErrc::OptionNotAllowed.is_equivalent(&WampErrc::DiscloseMeDisallowed));
        assert!(!WampErrc::OptionNotAllowed.is_equivalent(&WampErrc::NotAuthorized));
    }

    #[test]
    fn transport_errc_subsumes_io_errors() {
        let reset = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert_eq!(TransportErrc::from_io_error(&reset), TransportErrc::Disconnected);
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(TransportErrc::from_io_error(&eof), TransportErrc::Disconnected);
        let interrupted = std::io::Error::from(std::io::ErrorKind::Interrupted);
        assert_eq!(TransportErrc::from_io_error(&interrupted), TransportErrc::Aborted);
        let other = std::io::Error::from(std::io::ErrorKind::Other);
        assert_eq!(TransportErrc::from_io_error(&other), TransportErrc::Failed);
    }

    #[test]
    fn decoding_failure_subsumes_any_non_success_variant() {
        assert!(DecodingErrc::Failure.is_equivalent(&DecodingErrc::BadBase64Padding));
        assert!(DecodingErrc::ExpectedStringError.is_equivalent(&DecodingErrc::Failure));
        assert!(!DecodingErrc::Failure.is_equivalent(&DecodingErrc::Success));
    }

    #[test]
    fn websocket_close_code_maps_to_transport_fault() {
        assert_eq!(
            WebsocketCloseErrc::from_code(1009).to_transport_errc(),
            TransportErrc::ContentTooLarge
        );
        assert_eq!(WebsocketCloseErrc::from_code(4242), WebsocketCloseErrc::Other(4242));
    }

    #[test]
    fn http_status_renders_code_and_reason() {
        assert_eq!(HttpStatus::NotFound.code(), 404);
        assert_eq!(format!("{}", HttpStatus::NotFound), "404 Not Found");
    }
}
