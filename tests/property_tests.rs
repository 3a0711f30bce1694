//! Property-based tests using proptest
//!
//! These tests check the wire and key-material invariants across randomly
//! generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::{Bytes, BytesMut};
use gamepack_protocol::core::handshake::{request_len, HandshakeCodec, HANDSHAKE_SIZE, HANDSHAKE_TYPE};
use gamepack_protocol::utils::base64;
use gamepack_protocol::utils::compression::{gunzip, gzip};
use gamepack_protocol::{CipherParameters, HandshakeRequest, HandshakeResponse, Language};
use proptest::prelude::*;
use tokio_util::codec::Decoder;

fn language() -> impl Strategy<Value = Language> {
    (0u8..=6).prop_map(|id| Language::from_id(id).unwrap())
}

// Property: decoded length of the service's material follows 3*floor((L-1)/4)+1
proptest! {
    #[test]
    fn prop_base64_length_formula(blocks in 0usize..64, tail in any::<u8>()) {
        // len % 3 == 1 encodes to L % 4 == 2 characters
        let mut data = vec![0xA5u8; blocks * 3];
        data.push(tail);

        let encoded = base64::encode(&data);
        let l = encoded.len();
        prop_assert_eq!(l % 4, 2);

        let decoded = base64::decode(&encoded).unwrap();
        prop_assert_eq!(decoded.len(), 3 * ((l - 1) / 4) + 1);
        prop_assert_eq!(base64::encode(&decoded), encoded);
        prop_assert_eq!(decoded, data);
    }
}

// Property: the variant alphabet never emits '+', '/' or padding
proptest! {
    #[test]
    fn prop_base64_variant_alphabet(data in prop::collection::vec(any::<u8>(), 1..256)) {
        let encoded = base64::encode(&data);
        prop_assert!(!encoded.contains('+'));
        prop_assert!(!encoded.contains('/'));
        prop_assert!(!encoded.contains('='));
        prop_assert_eq!(base64::decoded_len(encoded.len()), Some(data.len()));
    }
}

// Property: decoding arbitrary text never panics
proptest! {
    #[test]
    fn prop_base64_decode_total(text in "[A-Za-z0-9*=+/-]{0,64}") {
        let _ = base64::decode(&text);
    }
}

// Property: request length is 2 + 4 + 4 + K + 1 + 1
proptest! {
    #[test]
    fn prop_request_length(major in any::<u32>(), minor in any::<u32>(), lang in language()) {
        let key = Bytes::from(vec![b'k'; 32]);
        let request = HandshakeRequest::with_language(major, minor, key, lang).unwrap();
        let bytes = request.to_bytes();

        prop_assert_eq!(bytes.len(), 2 + 4 + 4 + 32 + 1 + 1);
        prop_assert_eq!(bytes.len(), request_len(32));
        prop_assert_eq!(bytes[0], HANDSHAKE_TYPE);
        prop_assert_eq!(bytes[1], HANDSHAKE_SIZE);
        prop_assert_eq!(bytes[42], 0);
        prop_assert_eq!(bytes[43], lang.id());

        let parsed = HandshakeRequest::decode(&bytes, 32).unwrap();
        prop_assert_eq!(parsed, request);
    }
}

// Property: only 32-byte connection keys are accepted
proptest! {
    #[test]
    fn prop_key_length_enforced(len in 0usize..80) {
        let result = HandshakeRequest::new(833, 1, Bytes::from(vec![b'k'; len]));
        prop_assert_eq!(result.is_ok(), len == 32);
    }
}

// Property: every response byte classifies to exactly one verdict
proptest! {
    #[test]
    fn prop_response_classification(byte in any::<u8>()) {
        let mut codec = HandshakeCodec;
        let mut buf = BytesMut::from(&[byte][..]);
        let response = codec.decode(&mut buf).unwrap().unwrap();

        let expected = match byte {
            0 => HandshakeResponse::Valid,
            6 => HandshakeResponse::Invalid,
            other => HandshakeResponse::Unknown(other),
        };
        prop_assert_eq!(response, expected);
        prop_assert_eq!(response.to_byte(), byte);
        prop_assert!(buf.is_empty());
    }
}

// Property: AES-CBC encrypt then decrypt preserves data
proptest! {
    #[test]
    fn prop_cipher_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..4096),
        key in prop::collection::vec(any::<u8>(), 16..=16),
        iv in prop::collection::vec(any::<u8>(), 16..=16),
    ) {
        let params = CipherParameters::new(key, iv);
        let encrypted = params.encrypt(&data).unwrap();
        prop_assert_eq!(encrypted.len() % 16, 0);
        prop_assert!(encrypted.len() > data.len());

        let decrypted = params.decrypt(&encrypted).unwrap();
        prop_assert_eq!(decrypted, data);
    }
}

// Property: gzip roundtrip preserves data under the size limit
proptest! {
    #[test]
    fn prop_gzip_roundtrip(data in prop::collection::vec(any::<u8>(), 0..50000)) {
        let compressed = gzip(&data).expect("Compression should not fail");
        let decompressed = gunzip(&compressed, 64 * 1024).expect("Decompression should not fail");

        prop_assert_eq!(decompressed, data);
    }
}
