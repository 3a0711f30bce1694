//! # Utility Modules
//!
//! Supporting utilities for key material, compression and logging.
//!
//! ## Components
//! - **Base64**: the service's base64 variant (`*`/`-` substitutes, no padding)
//! - **Compression**: gzip with an output size limit
//! - **Logging**: tracing-subscriber setup and secret redaction
//!
//! ## Security
//! - Decompression bomb protection (configurable archive size limit)
//! - Secrets are logged by length only

pub mod base64;
pub mod compression;
pub mod logging;
