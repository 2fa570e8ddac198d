//! Helper for the `cryptosign` authentication method: signs a hex-encoded
//! challenge with an Ed25519 secret key using the `nacl` crate.

/// Wraps the Ed25519 secret key used to answer a cryptosign CHALLENGE.
pub struct CryptoSign {
    pub(crate) sk: Vec<u8>,
}

impl CryptoSign {
    /// Builds a signer from a hex-encoded 32-byte secret key seed.
    pub fn new(secret_key_hex: String) -> Self {
        CryptoSign { sk: Self::hex2bytes(&secret_key_hex) }
    }

    /// Decodes a hex string into its raw bytes.
    pub fn hex2bytes(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap_or_default()
    }

    /// Copies a signed-message buffer into a fixed 96-byte array: 64
    /// bytes of Ed25519 signature followed by the 32-byte challenge it
    /// signs over.
    pub fn vec_array96(v: Vec<u8>) -> [u8; 96] {
        let mut arr = [0u8; 96];
        let n = v.len().min(96);
        arr[..n].copy_from_slice(&v[..n]);
        arr
    }

    /// Hex-encodes a 96-byte signed message, as expected on the wire for
    /// cryptosign AUTHENTICATE signatures.
    pub fn bytes2hex96(bytes: [u8; 96]) -> String {
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips_through_vec_array96() {
        let raw = vec![0xAB; 96];
        let arr = CryptoSign::vec_array96(raw.clone());
        let hex_str = CryptoSign::bytes2hex96(arr);
        assert_eq!(CryptoSign::hex2bytes(&hex_str), raw);
    }
}
