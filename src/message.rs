//! The wire-format WAMP message enum and its codec.
//!
//! Every WAMP message is encoded on the wire as a heterogeneous array
//! whose first element is an integer message code, e.g.
//! `[HELLO, "realm", {...}]`. `Msg` models each message type as a Rust
//! variant with named fields, and implements `Serialize`/`Deserialize` by
//! hand so that it round-trips through that tagged-array encoding
//! regardless of which serializer (JSON/MessagePack/CBOR) is in use.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde::Deserialize;
use std::fmt;

use crate::common::{Arg, WampDict, WampId, WampInteger, WampList, WampUri};

/// Integer message codes assigned by the WAMP spec.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u64)]
pub enum MsgCode {
    Hello = 1,
    Welcome = 2,
    Abort = 3,
    Challenge = 4,
    Authenticate = 5,
    Goodbye = 6,
    Error = 8,
    Publish = 16,
    Published = 17,
    Subscribe = 32,
    Subscribed = 33,
    Unsubscribe = 34,
    Unsubscribed = 35,
    Event = 36,
    Call = 48,
    Cancel = 49,
    Result = 50,
    Register = 64,
    Registered = 65,
    Unregister = 66,
    Unregistered = 67,
    Invocation = 68,
    Interrupt = 69,
    Yield = 70,
}

/// The full set of WAMP v2 basic- and advanced-profile messages this core
/// understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Hello {
        realm: WampUri,
        details: WampDict,
    },
    Welcome {
        session: WampId,
        details: WampDict,
    },
    Abort {
        details: WampDict,
        reason: WampUri,
    },
    Challenge {
        auth_method: String,
        extra: WampDict,
    },
    Authenticate {
        signature: String,
        extra: WampDict,
    },
    Goodbye {
        details: WampDict,
        reason: WampUri,
    },
    Error {
        request_type: WampInteger,
        request: WampId,
        details: WampDict,
        error: WampUri,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Publish {
        request: WampId,
        options: WampDict,
        topic: WampUri,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Published {
        request: WampId,
        publication: WampId,
    },
    Subscribe {
        request: WampId,
        options: WampDict,
        topic: WampUri,
    },
    Subscribed {
        request: WampId,
        subscription: WampId,
    },
    Unsubscribe {
        request: WampId,
        subscription: WampId,
    },
    Unsubscribed {
        request: WampId,
    },
    Event {
        subscription: WampId,
        publication: WampId,
        details: WampDict,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Call {
        request: WampId,
        options: WampDict,
        procedure: WampUri,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Cancel {
        request: WampId,
        options: WampDict,
    },
    Result {
        request: WampId,
        details: WampDict,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Register {
        request: WampId,
        options: WampDict,
        procedure: WampUri,
    },
    Registered {
        request: WampId,
        registration: WampId,
    },
    Unregister {
        request: WampId,
        registration: WampId,
    },
    Unregistered {
        request: WampId,
    },
    Invocation {
        request: WampId,
        registration: WampId,
        details: WampDict,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
    Interrupt {
        request: WampId,
        options: WampDict,
    },
    Yield {
        request: WampId,
        options: WampDict,
        arguments: Option<WampList>,
        arguments_kw: Option<WampDict>,
    },
}

impl Msg {
    pub fn code(&self) -> MsgCode {
        match self {
            Msg::Hello { .. } => MsgCode::Hello,
            Msg::Welcome { .. } => MsgCode::Welcome,
            Msg::Abort { .. } => MsgCode::Abort,
            Msg::Challenge { .. } => MsgCode::Challenge,
            Msg::Authenticate { .. } => MsgCode::Authenticate,
            Msg::Goodbye { .. } => MsgCode::Goodbye,
            Msg::Error { .. } => MsgCode::Error,
            Msg::Publish { .. } => MsgCode::Publish,
            Msg::Published { .. } => MsgCode::Published,
            Msg::Subscribe { .. } => MsgCode::Subscribe,
            Msg::Subscribed { .. } => MsgCode::Subscribed,
            Msg::Unsubscribe { .. } => MsgCode::Unsubscribe,
            Msg::Unsubscribed { .. } => MsgCode::Unsubscribed,
            Msg::Event { .. } => MsgCode::Event,
            Msg::Call { .. } => MsgCode::Call,
            Msg::Cancel { .. } => MsgCode::Cancel,
            Msg::Result { .. } => MsgCode::Result,
            Msg::Register { .. } => MsgCode::Register,
            Msg::Registered { .. } => MsgCode::Registered,
            Msg::Unregister { .. } => MsgCode::Unregister,
            Msg::Unregistered { .. } => MsgCode::Unregistered,
            Msg::Invocation { .. } => MsgCode::Invocation,
            Msg::Interrupt { .. } => MsgCode::Interrupt,
            Msg::Yield { .. } => MsgCode::Yield,
        }
    }

    /// Human readable name, used in protocol violation error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Msg::Hello { .. } => "HELLO",
            Msg::Welcome { .. } => "WELCOME",
            Msg::Abort { .. } => "ABORT",
            Msg::Challenge { .. } => "CHALLENGE",
            Msg::Authenticate { .. } => "AUTHENTICATE",
            Msg::Goodbye { .. } => "GOODBYE",
            Msg::Error { .. } => "ERROR",
            Msg::Publish { .. } => "PUBLISH",
            Msg::Published { .. } => "PUBLISHED",
            Msg::Subscribe { .. } => "SUBSCRIBE",
            Msg::Subscribed { .. } => "SUBSCRIBED",
            Msg::Unsubscribe { .. } => "UNSUBSCRIBE",
            Msg::Unsubscribed { .. } => "UNSUBSCRIBED",
            Msg::Event { .. } => "EVENT",
            Msg::Call { .. } => "CALL",
            Msg::Cancel { .. } => "CANCEL",
            Msg::Result { .. } => "RESULT",
            Msg::Register { .. } => "REGISTER",
            Msg::Registered { .. } => "REGISTERED",
            Msg::Unregister { .. } => "UNREGISTER",
            Msg::Unregistered { .. } => "UNREGISTERED",
            Msg::Invocation { .. } => "INVOCATION",
            Msg::Interrupt { .. } => "INTERRUPT",
            Msg::Yield { .. } => "YIELD",
        }
    }

    /// The request id correlating this message with a prior request, for
    /// the message types that carry one. `Hello`/`Welcome`/`Abort`/
    /// `Goodbye`/`Challenge`/`Authenticate`/`Event` have no request id
    /// since they aren't responses to a specific client request.
    pub fn request_id(&self) -> Option<WampId> {
        match self {
            Msg::Error { request, .. }
            | Msg::Published { request, .. }
            | Msg::Subscribed { request, .. }
            | Msg::Unsubscribed { request }
            | Msg::Call { request, .. }
            | Msg::Cancel { request, .. }
            | Msg::Result { request, .. }
            | Msg::Registered { request, .. }
            | Msg::Unregistered { request }
            | Msg::Invocation { request, .. }
            | Msg::Interrupt { request, .. }
            | Msg::Yield { request, .. } => Some(*request),
            Msg::Subscribe { request, .. }
            | Msg::Unsubscribe { request, .. }
            | Msg::Publish { request, .. }
            | Msg::Register { request, .. }
            | Msg::Unregister { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Serializes `(arguments, arguments_kw)` as zero, one, or two trailing
/// seq elements, since WAMP omits the kwargs element (and sometimes the
/// args element too) when both are empty.
fn serialize_payload<S: SerializeSeq>(
    seq: &mut S,
    arguments: &Option<WampList>,
    arguments_kw: &Option<WampDict>,
) -> Result<(), S::Error> {
    match (arguments, arguments_kw) {
        (None, None) => Ok(()),
        (Some(a), None) => seq.serialize_element(a),
        (None, Some(kw)) => {
            seq.serialize_element(&WampList::new())?;
            seq.serialize_element(kw)
        }
        (Some(a), Some(kw)) => {
            seq.serialize_element(a)?;
            seq.serialize_element(kw)
        }
    }
}

impl Serialize for Msg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let code = self.code() as u64;
        match self {
            Msg::Hello { realm, details } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(realm)?;
                seq.serialize_element(details)?;
                seq.end()
            }
            Msg::Welcome { session, details } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(session)?;
                seq.serialize_element(details)?;
                seq.end()
            }
            Msg::Abort { details, reason } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(details)?;
                seq.serialize_element(reason)?;
                seq.end()
            }
            Msg::Challenge { auth_method, extra } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(auth_method)?;
                seq.serialize_element(extra)?;
                seq.end()
            }
            Msg::Authenticate { signature, extra } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(signature)?;
                seq.serialize_element(extra)?;
                seq.end()
            }
            Msg::Goodbye { details, reason } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(details)?;
                seq.serialize_element(reason)?;
                seq.end()
            }
            Msg::Error {
                request_type,
                request,
                details,
                error,
                arguments,
                arguments_kw,
            } => {
                let mut seq = serializer.serialize_seq(None)?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request_type)?;
                seq.serialize_element(request)?;
                seq.serialize_element(details)?;
                seq.serialize_element(error)?;
                serialize_payload(&mut seq, arguments, arguments_kw)?;
                seq.end()
            }
            Msg::Publish {
                request,
                options,
                topic,
                arguments,
                arguments_kw,
            } => {
                let mut seq = serializer.serialize_seq(None)?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(options)?;
                seq.serialize_element(topic)?;
                serialize_payload(&mut seq, arguments, arguments_kw)?;
                seq.end()
            }
            Msg::Published { request, publication } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(publication)?;
                seq.end()
            }
            Msg::Subscribe { request, options, topic } => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(options)?;
                seq.serialize_element(topic)?;
                seq.end()
            }
            Msg::Subscribed { request, subscription } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(subscription)?;
                seq.end()
            }
            Msg::Unsubscribe { request, subscription } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(subscription)?;
                seq.end()
            }
            Msg::Unsubscribed { request } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.end()
            }
            Msg::Event {
                subscription,
                publication,
                details,
                arguments,
                arguments_kw,
            } => {
                let mut seq = serializer.serialize_seq(None)?;
                seq.serialize_element(&code)?;
                seq.serialize_element(subscription)?;
                seq.serialize_element(publication)?;
                seq.serialize_element(details)?;
                serialize_payload(&mut seq, arguments, arguments_kw)?;
                seq.end()
            }
            Msg::Call {
                request,
                options,
                procedure,
                arguments,
                arguments_kw,
            } => {
                let mut seq = serializer.serialize_seq(None)?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(options)?;
                seq.serialize_element(procedure)?;
                serialize_payload(&mut seq, arguments, arguments_kw)?;
                seq.end()
            }
            Msg::Cancel { request, options } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(options)?;
                seq.end()
            }
            Msg::Result {
                request,
                details,
                arguments,
                arguments_kw,
            } => {
                let mut seq = serializer.serialize_seq(None)?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(details)?;
                serialize_payload(&mut seq, arguments, arguments_kw)?;
                seq.end()
            }
            Msg::Register { request, options, procedure } => {
                let mut seq = serializer.serialize_seq(Some(4))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(options)?;
                seq.serialize_element(procedure)?;
                seq.end()
            }
            Msg::Registered { request, registration } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(registration)?;
                seq.end()
            }
            Msg::Unregister { request, registration } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(registration)?;
                seq.end()
            }
            Msg::Unregistered { request } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.end()
            }
            Msg::Invocation {
                request,
                registration,
                details,
                arguments,
                arguments_kw,
            } => {
                let mut seq = serializer.serialize_seq(None)?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(registration)?;
                seq.serialize_element(details)?;
                serialize_payload(&mut seq, arguments, arguments_kw)?;
                seq.end()
            }
            Msg::Interrupt { request, options } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(options)?;
                seq.end()
            }
            Msg::Yield {
                request,
                options,
                arguments,
                arguments_kw,
            } => {
                let mut seq = serializer.serialize_seq(None)?;
                seq.serialize_element(&code)?;
                seq.serialize_element(request)?;
                seq.serialize_element(options)?;
                serialize_payload(&mut seq, arguments, arguments_kw)?;
                seq.end()
            }
        }
    }
}

struct MsgVisitor;

/// Reads the next element of a seq, producing a missing-field error tagged
/// with the message name when the array is shorter than expected.
macro_rules! next {
    ($seq:expr, $name:expr) => {
        $seq.next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &$name))?
    };
}

impl<'de> Visitor<'de> for MsgVisitor {
    type Value = Msg;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a WAMP message array")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Msg, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let code: u64 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &"a message code"))?;

        let msg = match code {
            c if c == MsgCode::Hello as u64 => Msg::Hello {
                realm: next!(seq, "Hello.realm"),
                details: next!(seq, "Hello.details"),
            },
            c if c == MsgCode::Welcome as u64 => Msg::Welcome {
                session: next!(seq, "Welcome.session"),
                details: next!(seq, "Welcome.details"),
            },
            c if c == MsgCode::Abort as u64 => Msg::Abort {
                details: next!(seq, "Abort.details"),
                reason: next!(seq, "Abort.reason"),
            },
            c if c == MsgCode::Challenge as u64 => Msg::Challenge {
                auth_method: next!(seq, "Challenge.auth_method"),
                extra: next!(seq, "Challenge.extra"),
            },
            c if c == MsgCode::Authenticate as u64 => Msg::Authenticate {
                signature: next!(seq, "Authenticate.signature"),
                extra: next!(seq, "Authenticate.extra"),
            },
            c if c == MsgCode::Goodbye as u64 => Msg::Goodbye {
                details: next!(seq, "Goodbye.details"),
                reason: next!(seq, "Goodbye.reason"),
            },
            c if c == MsgCode::Error as u64 => Msg::Error {
                request_type: next!(seq, "Error.request_type"),
                request: next!(seq, "Error.request"),
                details: next!(seq, "Error.details"),
                error: next!(seq, "Error.error"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            c if c == MsgCode::Publish as u64 => Msg::Publish {
                request: next!(seq, "Publish.request"),
                options: next!(seq, "Publish.options"),
                topic: next!(seq, "Publish.topic"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            c if c == MsgCode::Published as u64 => Msg::Published {
                request: next!(seq, "Published.request"),
                publication: next!(seq, "Published.publication"),
            },
            c if c == MsgCode::Subscribe as u64 => Msg::Subscribe {
                request: next!(seq, "Subscribe.request"),
                options: next!(seq, "Subscribe.options"),
                topic: next!(seq, "Subscribe.topic"),
            },
            c if c == MsgCode::Subscribed as u64 => Msg::Subscribed {
                request: next!(seq, "Subscribed.request"),
                subscription: next!(seq, "Subscribed.subscription"),
            },
            c if c == MsgCode::Unsubscribe as u64 => Msg::Unsubscribe {
                request: next!(seq, "Unsubscribe.request"),
                subscription: next!(seq, "Unsubscribe.subscription"),
            },
            c if c == MsgCode::Unsubscribed as u64 => Msg::Unsubscribed {
                request: next!(seq, "Unsubscribed.request"),
            },
            c if c == MsgCode::Event as u64 => Msg::Event {
                subscription: next!(seq, "Event.subscription"),
                publication: next!(seq, "Event.publication"),
                details: next!(seq, "Event.details"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            c if c == MsgCode::Call as u64 => Msg::Call {
                request: next!(seq, "Call.request"),
                options: next!(seq, "Call.options"),
                procedure: next!(seq, "Call.procedure"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            c if c == MsgCode::Cancel as u64 => Msg::Cancel {
                request: next!(seq, "Cancel.request"),
                options: next!(seq, "Cancel.options"),
            },
            c if c == MsgCode::Result as u64 => Msg::Result {
                request: next!(seq, "Result.request"),
                details: next!(seq, "Result.details"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            c if c == MsgCode::Register as u64 => Msg::Register {
                request: next!(seq, "Register.request"),
                options: next!(seq, "Register.options"),
                procedure: next!(seq, "Register.procedure"),
            },
            c if c == MsgCode::Registered as u64 => Msg::Registered {
                request: next!(seq, "Registered.request"),
                registration: next!(seq, "Registered.registration"),
            },
            c if c == MsgCode::Unregister as u64 => Msg::Unregister {
                request: next!(seq, "Unregister.request"),
                registration: next!(seq, "Unregister.registration"),
            },
            c if c == MsgCode::Unregistered as u64 => Msg::Unregistered {
                request: next!(seq, "Unregistered.request"),
            },
            c if c == MsgCode::Invocation as u64 => Msg::Invocation {
                request: next!(seq, "Invocation.request"),
                registration: next!(seq, "Invocation.registration"),
                details: next!(seq, "Invocation.details"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            c if c == MsgCode::Interrupt as u64 => Msg::Interrupt {
                request: next!(seq, "Interrupt.request"),
                options: next!(seq, "Interrupt.options"),
            },
            c if c == MsgCode::Yield as u64 => Msg::Yield {
                request: next!(seq, "Yield.request"),
                options: next!(seq, "Yield.options"),
                arguments: seq.next_element()?,
                arguments_kw: seq.next_element()?,
            },
            other => {
                return Err(de::Error::custom(format!("unknown WAMP message code {}", other)))
            }
        };
        Ok(msg)
    }
}

impl<'de> Deserialize<'de> for Msg {
    fn deserialize<D>(deserializer: D) -> Result<Msg, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(MsgVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn hello_round_trips_through_json() {
        let msg = Msg::Hello {
            realm: "com.example".into(),
            details: HashMap::new(),
        };
        let encoded = serde_json::to_vec(&msg).unwrap();
        let decoded: Msg = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn call_with_no_payload_omits_trailing_elements() {
        let msg = Msg::Call {
            request: 1,
            options: HashMap::new(),
            procedure: "com.example.add".into(),
            arguments: None,
            arguments_kw: None,
        };
        let encoded = serde_json::to_vec(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 4);
    }

    #[test]
    fn call_with_kwargs_but_no_args_emits_empty_args_placeholder() {
        let mut kw = HashMap::new();
        kw.insert("x".to_string(), Arg::Integer(1));
        let msg = Msg::Call {
            request: 1,
            options: HashMap::new(),
            procedure: "com.example.add".into(),
            arguments: None,
            arguments_kw: Some(kw),
        };
        let encoded = serde_json::to_vec(&msg).unwrap();
        let decoded: Msg = serde_json::from_slice(&encoded).unwrap();
        match decoded {
            Msg::Call { arguments, arguments_kw, .. } => {
                assert_eq!(arguments, Some(WampList::new()));
                assert!(arguments_kw.is_some());
            }
            _ => panic!("expected Call"),
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        let encoded = serde_json::to_vec(&(9999u64, "x")).unwrap();
        let decoded: Result<Msg, _> = serde_json::from_slice(&encoded);
        assert!(decoded.is_err());
    }
}
