//! # Gamepack Protocol
//!
//! Client-side plumbing for a game service's distribution endpoint:
//!
//! - **Version identification**: a TCP handshake that walks major versions upward
//!   until the server accepts one ([`protocol::VersionIdentifier`])
//! - **Archive decoding**: AES-CBC, gzip, Pack200 and zip layers peeled off the
//!   archive embedded in the gamepack, yielding its compiled classes
//!   ([`archive::ArchivePipeline`])
//!
//! Supporting pieces cover the service's base64 variant, applet parameter
//! scraping, output writers, configuration and logging setup.
//!
//! ## Example
//! ```no_run
//! use gamepack_protocol::{ArchivePipeline, VersionIdentifier};
//!
//! # async fn run(key: &str, encrypted: &[u8], secret: &str, vector: &str)
//! #     -> gamepack_protocol::Result<()> {
//! let mut identifier = VersionIdentifier::new("world2.runescape.com:43594", key.as_bytes().to_vec())?;
//! identifier.connect(833, 1).await?;
//! let major = identifier.identify_version().await?;
//!
//! let classes = ArchivePipeline::new().decode_encoded(encrypted, secret, vector)?;
//! println!("revision {major}: {} classes", classes.len());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod core;
pub mod error;
pub mod params;
pub mod protocol;
pub mod utils;
pub mod writer;

pub use archive::{ArchivePipeline, CipherParameters, ClassEntry, ClassMap, Unpacker};
pub use config::LynxConfig;
pub use crate::core::handshake::{HandshakeCodec, HandshakeRequest, HandshakeResponse, Language};
pub use error::{GamepackError, PipelineStage, Result};
pub use params::AppletParameters;
pub use protocol::{ConnectionState, VersionIdentifier};
