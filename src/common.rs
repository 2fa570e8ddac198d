//! Shared value types used across the wire format, the engine, and the
//! public API: WAMP ids, URIs, the recursive argument value, and the small
//! set of enums (client roles, auth methods, match/invocation policies)
//! that show up in more than one module.

use std::collections::HashMap;
use std::fmt;

use log::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A WAMP URI, e.g. `com.example.procedure`.
pub type WampUri = String;
/// WAMP ids are random unsigned integers used to correlate requests with
/// their responses and to name sessions/subscriptions/registrations.
pub type WampId = u64;
pub type WampInteger = i64;
pub type WampString = String;
pub type WampBool = bool;
pub type WampDict = HashMap<String, Arg>;
pub type WampList = Vec<Arg>;
pub type WampArgs = WampList;
pub type WampKwArgs = WampDict;

/// Returns whether a uri is valid or not (using strict rules).
///
/// Enforces the zero-length-token and reserved `wamp.` prefix rules
/// from the WAMP strict URI grammar.
pub fn is_valid_strict_uri<T: AsRef<str>>(in_uri: T) -> bool {
    let uri: &str = in_uri.as_ref();
    if uri.is_empty() {
        return false;
    }
    if uri.starts_with("wamp.") {
        warn!("URI '{}' cannot start with 'wamp.'", uri);
        return false;
    }

    let mut num_chars_token: usize = 0;
    for (i, c) in uri.chars().enumerate() {
        if c == '.' {
            if num_chars_token == 0 {
                warn!("URI '{}' contains a zero length token ending @ index {}", uri, i);
                return false;
            }
            num_chars_token = 0;
            continue;
        }

        num_chars_token += 1;

        if c == '_' {
            continue;
        }

        if !c.is_ascii_lowercase() && !c.is_ascii_digit() {
            warn!("URI '{}' contains an invalid character @ index {}", uri, i);
            return false;
        }
    }

    num_chars_token > 0
}

/// Returns whether a uri is valid under the WAMP "loose" URI rules, which
/// additionally permit wildcard match components (an empty token between
/// two dots, used by `wildcard`-policy subscriptions/registrations).
pub fn is_valid_loose_uri<T: AsRef<str>>(in_uri: T) -> bool {
    let uri: &str = in_uri.as_ref();
    if uri.is_empty() {
        return false;
    }
    uri.split('.').all(|tok| {
        tok.is_empty()
            || tok
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    })
}

/// Generates a random non-zero WAMP id.
pub fn generate_id() -> WampId {
    loop {
        let id: WampId = rand::thread_rng().gen();
        if id != 0 {
            return id;
        }
    }
}

/// A single WAMP argument value: the `uri | id | integer | string | bool |
/// dict | list` enumeration from the WAMP data model, plus a `double`
/// variant so floats round-trip without losing their typed representation
/// when passing through a binary serializer.
///
/// Kept as a closed enum (rather than reaching for `serde_json::Value`)
/// so that MessagePack and CBOR payloads round-trip without detouring
/// through JSON's number model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Bool(WampBool),
    Integer(WampInteger),
    Double(f64),
    String(WampString),
    List(WampList),
    Dict(WampDict),
    Null,
}

impl Arg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Arg::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&WampDict> {
        match self {
            Arg::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&WampList> {
        match self {
            Arg::List(l) => Some(l),
            _ => None,
        }
    }
}

impl Default for Arg {
    fn default() -> Self {
        Arg::Null
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::String(s.to_owned())
    }
}
impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::String(s)
    }
}
impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Bool(b)
    }
}
impl From<i64> for Arg {
    fn from(i: i64) -> Self {
        Arg::Integer(i)
    }
}
impl From<u64> for Arg {
    fn from(i: u64) -> Self {
        Arg::Integer(i as i64)
    }
}
impl From<f64> for Arg {
    fn from(f: f64) -> Self {
        Arg::Double(f)
    }
}
impl From<WampDict> for Arg {
    fn from(d: WampDict) -> Self {
        Arg::Dict(d)
    }
}
impl From<WampList> for Arg {
    fn from(l: WampList) -> Self {
        Arg::List(l)
    }
}

/// Roles a client can advertise support for in `HELLO.Details.roles`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ClientRole {
    Caller,
    Callee,
    Publisher,
    Subscriber,
}

impl ClientRole {
    pub fn to_str(&self) -> &'static str {
        match self {
            ClientRole::Caller => "caller",
            ClientRole::Callee => "callee",
            ClientRole::Publisher => "publisher",
            ClientRole::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// Roles a router advertises in `WELCOME.Details.roles`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RouterRole {
    Dealer,
    Broker,
}

impl RouterRole {
    pub fn to_str(&self) -> &'static str {
        match self {
            RouterRole::Dealer => "dealer",
            RouterRole::Broker => "broker",
        }
    }
}

/// WAMP advanced-profile authentication methods.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AuthenticationMethod {
    Anonymous,
    Ticket,
    WampCra,
    CryptoSign,
}

impl AuthenticationMethod {
    pub fn as_ref(&self) -> &'static str {
        match self {
            AuthenticationMethod::Anonymous => "anonymous",
            AuthenticationMethod::Ticket => "ticket",
            AuthenticationMethod::WampCra => "wampcra",
            AuthenticationMethod::CryptoSign => "cryptosign",
        }
    }
}

/// Result returned from an authentication challenge handler.
#[derive(Debug, Clone)]
pub struct AuthenticationChallengeResponse {
    pub signature: WampString,
    pub extra: WampDict,
}

impl AuthenticationChallengeResponse {
    pub fn with_signature<T: Into<String>>(signature: T) -> Self {
        AuthenticationChallengeResponse {
            signature: signature.into(),
            extra: WampDict::new(),
        }
    }
}

/// How a registration/subscription URI is matched against incoming
/// CALL/PUBLISH target uris.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MatchPolicy {
    Exact,
    Prefix,
    Wildcard,
}

impl MatchPolicy {
    pub fn from_options(options: &WampDict) -> Self {
        match options.get("match").and_then(Arg::as_str) {
            Some("prefix") => MatchPolicy::Prefix,
            Some("wildcard") => MatchPolicy::Wildcard,
            _ => MatchPolicy::Exact,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::Exact => "exact",
            MatchPolicy::Prefix => "prefix",
            MatchPolicy::Wildcard => "wildcard",
        }
    }

    /// Whether `uri` is matched by a registration/subscription made against
    /// `pattern` under this policy.
    pub fn matches(&self, pattern: &str, uri: &str) -> bool {
        match self {
            MatchPolicy::Exact => pattern == uri,
            MatchPolicy::Prefix => uri.starts_with(pattern),
            MatchPolicy::Wildcard => {
                let pat_parts: Vec<&str> = pattern.split('.').collect();
                let uri_parts: Vec<&str> = uri.split('.').collect();
                if pat_parts.len() != uri_parts.len() {
                    return false;
                }
                pat_parts
                    .iter()
                    .zip(uri_parts.iter())
                    .all(|(p, u)| p.is_empty() || p == u)
            }
        }
    }
}

/// Selects which callee handles a CALL when multiple registrations share a
/// URI under a non-exact match policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InvocationPolicy {
    Single,
    First,
    Last,
    RoundRobin,
    Random,
}

impl InvocationPolicy {
    pub fn from_options(options: &WampDict) -> Self {
        match options.get("invoke").and_then(Arg::as_str) {
            Some("first") => InvocationPolicy::First,
            Some("last") => InvocationPolicy::Last,
            Some("roundrobin") => InvocationPolicy::RoundRobin,
            Some("random") => InvocationPolicy::Random,
            _ => InvocationPolicy::Single,
        }
    }
}

/// Cancel mode selected by a caller when cancelling an in-flight CALL.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CancelMode {
    Kill,
    KillNoWait,
    Skip,
}

impl CancelMode {
    pub fn from_options(options: &WampDict) -> Self {
        match options.get("mode").and_then(Arg::as_str) {
            Some("killnowait") => CancelMode::KillNoWait,
            Some("skip") => CancelMode::Skip,
            _ => CancelMode::Kill,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CancelMode::Kill => "kill",
            CancelMode::KillNoWait => "killnowait",
            CancelMode::Skip => "skip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_uri_rejects_wamp_reserved_prefix_allows_rest() {
        assert!(is_valid_strict_uri("com.example.foo"));
        assert!(!is_valid_strict_uri("com..foo"));
        assert!(!is_valid_strict_uri(""));
        assert!(!is_valid_strict_uri("Com.Example"));
        assert!(!is_valid_strict_uri("wamp.foo"));
    }

    #[test]
    fn loose_uri_allows_empty_wildcard_components() {
        assert!(is_valid_loose_uri("com..foo"));
        assert!(is_valid_loose_uri("com.example.foo"));
        assert!(!is_valid_loose_uri(""));
    }

    #[test]
    fn generated_ids_are_nonzero() {
        assert_ne!(generate_id(), 0);
    }

    #[test]
    fn wildcard_match_ignores_empty_components() {
        let policy = MatchPolicy::Wildcard;
        assert!(policy.matches("com..foo", "com.example.foo"));
        assert!(!policy.matches("com..foo", "com.example.bar"));
        assert!(!policy.matches("com..foo", "com.example.extra.foo"));
    }

    #[test]
    fn prefix_match_requires_leading_match() {
        let policy = MatchPolicy::Prefix;
        assert!(policy.matches("com.example", "com.example.foo"));
        assert!(!policy.matches("com.example", "com.other.foo"));
    }
}
