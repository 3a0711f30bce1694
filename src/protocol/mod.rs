//! # Version Identification Protocol
//!
//! Stateful client for the handshake that discovers which major version the remote
//! server currently accepts.
//!
//! ## Flow
//! 1. `connect(major, minor)` opens a connection and sends the handshake
//! 2. `identify_version(..)` polls for the one-byte verdict
//! 3. An outdated verdict reconnects with `major + 1`; a valid one returns `major`
//!
//! The connection is released on every exit path, including errors and cancellation.

pub mod identifier;

pub use identifier::{ConnectionState, VersionIdentifier};
