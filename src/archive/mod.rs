//! # Archive Decoding Pipeline
//!
//! Recovers compiled classes from the encrypted archive embedded in a gamepack jar.
//!
//! ## Stages
//! 1. **Decrypt**: AES-CBC with PKCS#5/7 padding ([`cipher`])
//! 2. **Decompress**: gzip ([`crate::utils::compression`])
//! 3. **Unpack**: Pack200 to zip via an external codec ([`unpack`])
//! 4. **Extract**: collect `.class` entries ([`extract`])
//!
//! [`pipeline::ArchivePipeline`] drives all four; [`gamepack`] pulls the encrypted entry
//! out of the downloaded jar.

pub mod cipher;
pub mod classes;
pub mod extract;
pub mod gamepack;
pub mod pipeline;
pub mod unpack;

pub use cipher::CipherParameters;
pub use classes::{ClassEntry, ClassMap};
pub use pipeline::ArchivePipeline;
pub use unpack::{DetectingUnpacker, Pack200Command, Unpacker, ZipPassthrough};
