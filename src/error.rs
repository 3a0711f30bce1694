//! # Error Types
//!
//! Error handling for the version handshake client and the gamepack decoding pipeline.
//!
//! Every failure in this crate is terminal at the point where it occurs. The one
//! recoverable condition, a server rejecting the requested major version, is handled
//! inside the version identifier and never surfaces as an error.
//!
//! ## Error Categories
//! - **Connection Errors**: the transport could not be opened, written or was closed
//! - **Protocol Errors**: unexpected handshake responses, exhausted attempt budgets
//! - **Format Errors**: malformed base64 key material
//! - **Crypto Errors**: invalid AES key/IV sizes or failed padding validation
//! - **Unpack Errors**: gzip or Pack200 failures, missing zip structure
//!
//! Pipeline failures can be classified with [`GamepackError::stage`] so that callers can
//! tell a wrong secret apart from a corrupt download.
//!
//! ## Example Usage
//! ```rust
//! use gamepack_protocol::error::{GamepackError, PipelineStage};
//!
//! let err = GamepackError::Crypto("padding validation failed".into());
//! assert_eq!(err.stage(), Some(PipelineStage::Crypto));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Connection errors
    pub const ERR_CONNECT_TIMEOUT: &str = "Timed out opening connection";
    pub const ERR_NOT_CONNECTED: &str = "Version identifier is not connected";

    /// Handshake errors
    pub const ERR_TRUNCATED_REQUEST: &str = "Handshake request is truncated";
    pub const ERR_BAD_REQUEST_TAG: &str = "Handshake request has an unexpected type tag";
    pub const ERR_BAD_TERMINATOR: &str = "Handshake request is missing its key terminator";

    /// Key material errors
    pub const ERR_BASE64_LENGTH: &str = "Encoded length cannot be produced by base64";
    pub const ERR_BASE64_MISMATCH: &str = "Decoded length does not match the encoded length";

    /// Cipher errors
    pub const ERR_KEY_SIZE: &str = "Key must be 16, 24 or 32 bytes";
    pub const ERR_IV_SIZE: &str = "Initialisation vector must be 16 bytes";
    pub const ERR_PADDING: &str = "Padding validation failed (wrong key or vector?)";

    /// Unpack errors
    pub const ERR_UNKNOWN_CONTAINER: &str = "Decompressed stream is neither Pack200 nor zip";
    pub const ERR_UNPACK_EMPTY: &str = "Unpacker produced no output";

    /// Parameter errors
    pub const ERR_NO_ARCHIVE: &str = "Parameters did not contain the archive location";
    pub const ERR_NO_SECRET: &str = "Parameters did not contain the AES secret";
    pub const ERR_NO_VECTOR: &str = "Parameters did not contain the AES vector";
    pub const ERR_NO_CONNECTION_KEY: &str = "Parameters did not contain the connection key";
}

/// The decoding stage a pipeline error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Crypto,
    Decompression,
    Unpack,
    Extraction,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Crypto => "crypto",
            PipelineStage::Decompression => "decompression",
            PipelineStage::Unpack => "unpack",
            PipelineStage::Extraction => "extraction",
        };
        f.write_str(name)
    }
}

// GamepackError is the primary error type for all operations in this crate
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum GamepackError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Zip(#[from] zip::result::ZipError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection closed by server")]
    ConnectionClosed,

    #[error("Unexpected server response: {0}")]
    UnexpectedResponse(u8),

    #[error("Could not identify the version after {0} attempts")]
    ExhaustedAttempts(u32),

    #[error("Version identification cancelled")]
    Cancelled,

    #[error("Invalid identifier state: {0}")]
    InvalidState(String),

    #[error("Connection key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Handshake error: {0}")]
    Handshake(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Unpack failed: {0}")]
    Unpack(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Archive too large: {size} bytes (limit {limit})")]
    OversizedArchive { size: usize, limit: usize },

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GamepackError {
    /// The pipeline stage this error belongs to, if it came from the decoding pipeline.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            GamepackError::Crypto(_) => Some(PipelineStage::Crypto),
            GamepackError::Decompression(_) | GamepackError::OversizedArchive { .. } => {
                Some(PipelineStage::Decompression)
            }
            GamepackError::Unpack(_) => Some(PipelineStage::Unpack),
            GamepackError::Extraction(_) | GamepackError::Zip(_) => Some(PipelineStage::Extraction),
            _ => None,
        }
    }
}

/// Type alias for Results using GamepackError
pub type Result<T> = std::result::Result<T, GamepackError>;
