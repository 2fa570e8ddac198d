use quick_error::*;

use crate::message::Msg;

pub mod cbor;
pub mod json;
pub mod msgpack;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Message serialization algorithms negotiated over the raw-socket
/// handshake or the WebSocket subprotocol string.
pub enum SerializerType {
    Invalid = 0,
    Json = 1,
    MsgPack = 2,
    Cbor = 3,
    // 4 - 15 reserved
}

impl SerializerType {
    /// Returns the WAMP string representation of the serializer
    pub fn to_str(&self) -> &'static str {
        match self {
            &SerializerType::Json => "wamp.2.json",
            &SerializerType::MsgPack => "wamp.2.msgpack",
            &SerializerType::Cbor => "wamp.2.cbor",
            _ => "wamp.2.invalid",
        }
    }

    /// Converts the WAMP serializer string to its enum variant
    pub fn from_str<T: AsRef<str>>(in_str: T) -> Self {
        let s = in_str.as_ref();

        if s == SerializerType::Json.to_str() {
            SerializerType::Json
        } else if s == SerializerType::MsgPack.to_str() {
            SerializerType::MsgPack
        } else if s == SerializerType::Cbor.to_str() {
            SerializerType::Cbor
        } else {
            SerializerType::Invalid
        }
    }

    /// Converts the raw-socket handshake serializer id (low nibble of the
    /// handshake's second byte) to its enum variant.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(SerializerType::Json),
            2 => Some(SerializerType::MsgPack),
            3 => Some(SerializerType::Cbor),
            _ => None,
        }
    }

    /// Builds a fresh boxed implementation for this serializer type.
    pub fn new_impl(&self) -> Option<Box<dyn SerializerImpl + Send>> {
        match self {
            SerializerType::Json => Some(Box::new(json::JsonSerializer {})),
            SerializerType::MsgPack => Some(Box::new(msgpack::MsgPackSerializer {})),
            SerializerType::Cbor => Some(Box::new(cbor::CborSerializer {})),
            SerializerType::Invalid => None,
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum SerializerError {
        Serialization(e: String) {
            description("Failed to serialize message")
            display(_self) -> ("{} : {}", _self, e)
        }
        Deserialization(e: String) {
            description("Failed to deserialize message")
            display(_self) -> ("{} : {}", _self, e)
        }
    }
}


pub trait SerializerImpl {
    fn pack(&self, value: &Msg) -> Result<Vec<u8>, SerializerError>;
    fn unpack<'a>(&self, v: &'a [u8]) -> Result<Msg, SerializerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializer_strings_round_trip() {
        for t in [SerializerType::Json, SerializerType::MsgPack, SerializerType::Cbor] {
            assert_eq!(SerializerType::from_str(t.to_str()), t);
        }
    }

    #[test]
    fn unknown_serializer_string_is_invalid() {
        assert_eq!(SerializerType::from_str("wamp.2.bson"), SerializerType::Invalid);
    }
}
