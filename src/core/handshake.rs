//! Fixed-layout handshake request/response used by version identification.
//!
//! ```text
//! [Type(1)=15] [Size(1)=41] [Major(4, BE)] [Minor(4, BE)] [Key(32)] [0x00] [Language(1)]
//! ```
//!
//! The response is a single status byte. The connection key has no length prefix on the
//! wire, so every request must carry exactly [`CONNECTION_KEY_LEN`] key bytes.

use crate::error::{constants, GamepackError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Handshake type tag
pub const HANDSHAKE_TYPE: u8 = 15;

/// Declared payload size tag
pub const HANDSHAKE_SIZE: u8 = 41;

/// Length of the connection key carried in every request
pub const CONNECTION_KEY_LEN: usize = 32;

/// Total encoded length of a request carrying a standard connection key
pub const REQUEST_LEN: usize = request_len(CONNECTION_KEY_LEN);

/// Server accepted the requested version
pub const RESPONSE_VALID: u8 = 0;

/// Server rejected the requested major version
pub const RESPONSE_INVALID: u8 = 6;

/// Encoded length of a request for a key of `key_len` bytes.
pub const fn request_len(key_len: usize) -> usize {
    2 + 4 + 4 + key_len + 1 + 1
}

/// Client language sent as the last request byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Language {
    #[default]
    English = 0,
    German = 1,
    French = 2,
    Portuguese = 3,
    Dutch = 4,
    Spanish = 5,
    SpanishLatinAmerica = 6,
}

impl Language {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Language::English),
            1 => Some(Language::German),
            2 => Some(Language::French),
            3 => Some(Language::Portuguese),
            4 => Some(Language::Dutch),
            5 => Some(Language::Spanish),
            6 => Some(Language::SpanishLatinAmerica),
            _ => None,
        }
    }
}

/// One handshake attempt. Built once per connection and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    major: u32,
    minor: u32,
    connection_key: Bytes,
    language: Language,
}

impl HandshakeRequest {
    /// Build an English request.
    ///
    /// # Errors
    /// Returns `GamepackError::InvalidKeyLength` unless the key is exactly
    /// [`CONNECTION_KEY_LEN`] bytes long.
    pub fn new(major: u32, minor: u32, connection_key: Bytes) -> Result<Self> {
        Self::with_language(major, minor, connection_key, Language::English)
    }

    pub fn with_language(
        major: u32,
        minor: u32,
        connection_key: Bytes,
        language: Language,
    ) -> Result<Self> {
        if connection_key.len() != CONNECTION_KEY_LEN {
            return Err(GamepackError::InvalidKeyLength {
                expected: CONNECTION_KEY_LEN,
                actual: connection_key.len(),
            });
        }

        Ok(Self {
            major,
            minor,
            connection_key,
            language,
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn connection_key(&self) -> &[u8] {
        &self.connection_key
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Length of this request on the wire
    pub fn encoded_len(&self) -> usize {
        request_len(self.connection_key.len())
    }

    /// Append the wire form of this request to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u8(HANDSHAKE_TYPE);
        dst.put_u8(HANDSHAKE_SIZE);
        dst.put_u32(self.major);
        dst.put_u32(self.minor);
        dst.put_slice(&self.connection_key);
        dst.put_u8(0); // key terminator
        dst.put_u8(self.language.id());
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Parse a request whose key is `key_len` bytes long.
    ///
    /// # Errors
    /// Returns `GamepackError::Handshake` on truncated input, wrong tags, a missing
    /// terminator or an unknown language id.
    pub fn decode(src: &[u8], key_len: usize) -> Result<Self> {
        if src.len() < request_len(key_len) {
            return Err(GamepackError::Handshake(
                constants::ERR_TRUNCATED_REQUEST.into(),
            ));
        }

        let mut buf = src;
        if buf.get_u8() != HANDSHAKE_TYPE || buf.get_u8() != HANDSHAKE_SIZE {
            return Err(GamepackError::Handshake(constants::ERR_BAD_REQUEST_TAG.into()));
        }

        let major = buf.get_u32();
        let minor = buf.get_u32();
        let connection_key = Bytes::copy_from_slice(&buf[..key_len]);
        buf.advance(key_len);

        if buf.get_u8() != 0 {
            return Err(GamepackError::Handshake(constants::ERR_BAD_TERMINATOR.into()));
        }

        let id = buf.get_u8();
        let language = Language::from_id(id)
            .ok_or_else(|| GamepackError::Handshake(format!("Unknown language id {id}")))?;

        Ok(Self {
            major,
            minor,
            connection_key,
            language,
        })
    }
}

/// Classification of the single response byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeResponse {
    /// The requested major/minor pair was accepted
    Valid,
    /// The major version is outdated
    Invalid,
    /// Anything else; not recoverable
    Unknown(u8),
}

impl HandshakeResponse {
    pub fn from_byte(value: u8) -> Self {
        match value {
            RESPONSE_VALID => HandshakeResponse::Valid,
            RESPONSE_INVALID => HandshakeResponse::Invalid,
            other => HandshakeResponse::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            HandshakeResponse::Valid => RESPONSE_VALID,
            HandshakeResponse::Invalid => RESPONSE_INVALID,
            HandshakeResponse::Unknown(value) => value,
        }
    }
}

/// Client side codec: encodes requests, decodes one-byte responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandshakeCodec;

impl Encoder<HandshakeRequest> for HandshakeCodec {
    type Error = GamepackError;

    fn encode(&mut self, item: HandshakeRequest, dst: &mut BytesMut) -> Result<()> {
        item.write_to(dst);
        Ok(())
    }
}

impl Decoder for HandshakeCodec {
    type Item = HandshakeResponse;
    type Error = GamepackError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(Some(HandshakeResponse::from_byte(src.get_u8())))
    }
}
