//! # Core Wire Components
//!
//! Fixed-layout handshake encoding used by version identification.
//!
//! ## Components
//! - **HandshakeRequest / HandshakeResponse**: request builder/parser and response classification
//! - **HandshakeCodec**: Tokio codec for framing requests and responses over a TCP stream
//!
//! ## Wire Format
//! ```text
//! request:  [15] [41] [Major(4)] [Minor(4)] [Key(32)] [0x00] [Language(1)]
//! response: [Status(1)]   0 = accepted, 6 = outdated, other = protocol error
//! ```

pub mod handshake;
