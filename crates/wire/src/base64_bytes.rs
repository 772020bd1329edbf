// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde adapter encoding `Vec<u8>` fields as base64 strings.
//!
//! JSON has no byte-string type; base64 keeps binary payloads (operation
//! data, credentials, digests) compact and transcription-safe. Use with
//! `#[serde(with = "mutagen_wire::base64_bytes")]`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Envelope {
        #[serde(with = "crate::base64_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn round_trips_binary_data() {
        let envelope = Envelope { data: (0u8..=255).collect() };
        let encoded = serde_json::to_string(&envelope).unwrap();
        let decoded: Envelope = serde_json::from_str(&encoded).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn encodes_as_base64_string() {
        let envelope = Envelope { data: b"hi".to_vec() };
        assert_eq!(serde_json::to_string(&envelope).unwrap(), r#"{"data":"aGk="}"#);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(serde_json::from_str::<Envelope>(r#"{"data":"!!"}"#).is_err());
    }
}
