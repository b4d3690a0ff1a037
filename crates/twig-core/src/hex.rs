// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Binary payload codec for the wire protocol.
//!
//! Every binary buffer crossing the RPC boundary travels as a hex string.
//! The encoder always emits lowercase; the decoder accepts both cases so
//! foreign clients with uppercase encoders interoperate. The round trip is
//! exact for every length including zero.

use crate::error::RpcError;

/// Encodes a byte buffer as a lowercase hex string.
pub fn encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes a hex string (either case) into a byte buffer.
///
/// # Errors
///
/// Returns [`RpcError::InvalidPayload`] on odd length or non-hex characters.
pub fn decode(text: &str) -> Result<Vec<u8>, RpcError> {
    hex::decode(text).map_err(|e| RpcError::InvalidPayload {
        message: e.to_string(),
    })
}

/// Serde adapter serializing `Vec<u8>` fields as hex strings.
pub mod serde_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as a lowercase hex string.
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserializes a hex string of either case into bytes.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_lowercase() {
        assert_eq!(encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
        assert_eq!(encode(&[0x00, 0xff]), "00ff");
    }

    #[test]
    fn test_decode_accepts_both_cases() {
        assert_eq!(decode("deadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode("DEADBEEF").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode("DeAdBeEf").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_empty_round_trip() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_round_trip_various_lengths() {
        for len in [0usize, 1, 2, 7, 32, 255] {
            let buffer: Vec<u8> = (0..len).map(|i| (i * 31) as u8).collect();
            let text = encode(&buffer);
            assert_eq!(text.len(), 2 * buffer.len());
            assert_eq!(decode(&text).unwrap(), buffer);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("abc").is_err()); // odd length
        assert!(decode("zz").is_err()); // non-hex
        assert!(decode("0x48").is_err()); // prefix is not part of the format
    }
}
