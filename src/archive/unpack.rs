//! Container unpacking: turns the decompressed stream into a zip-structured archive.
//!
//! Pack200 is not reimplemented here. [`Pack200Command`] delegates to the `unpack200`
//! tool shipped with older JDKs; [`DetectingUnpacker`] picks the path by magic number
//! and passes streams that are already zip containers through untouched.

use crate::error::{constants, GamepackError, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, instrument};

/// Magic number opening every Pack200 archive
pub const PACK200_MAGIC: [u8; 4] = [0xCA, 0xFE, 0xD0, 0x0D];

/// Signature opening a zip container (local header or empty-archive trailer)
pub const ZIP_MAGIC: [u8; 2] = *b"PK";

/// Reverses the bundling layer of an archive into a zip container.
pub trait Unpacker: Send + Sync {
    /// Consume the decompressed stream and return zip bytes no larger than `limit`.
    fn unpack(&self, packed: Vec<u8>, limit: usize) -> Result<Vec<u8>>;
}

/// Treats the stream as an already-unpacked zip container.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipPassthrough;

impl Unpacker for ZipPassthrough {
    fn unpack(&self, packed: Vec<u8>, limit: usize) -> Result<Vec<u8>> {
        if !packed.starts_with(&ZIP_MAGIC) {
            return Err(GamepackError::Unpack(constants::ERR_UNKNOWN_CONTAINER.into()));
        }
        check_limit(packed.len(), limit)?;
        Ok(packed)
    }
}

/// Runs an external `unpack200` program inside a private temporary directory.
#[derive(Debug, Clone)]
pub struct Pack200Command {
    program: PathBuf,
}

impl Default for Pack200Command {
    fn default() -> Self {
        Self::new("unpack200")
    }
}

impl Pack200Command {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Unpacker for Pack200Command {
    #[instrument(skip_all, fields(program = %self.program.display(), packed = packed.len()))]
    fn unpack(&self, packed: Vec<u8>, limit: usize) -> Result<Vec<u8>> {
        // Created with a random name and owner-only permissions; removed on drop
        let workdir = tempfile::Builder::new()
            .prefix("lynx-unpack-")
            .tempdir()
            .map_err(|e| GamepackError::Unpack(format!("failed to create work directory: {e}")))?;
        let input = workdir.path().join("inner.pack");
        let output = workdir.path().join("inner.jar");

        write_new(&input, &packed)
            .map_err(|e| GamepackError::Unpack(format!("failed to stage input: {e}")))?;
        drop(packed);

        let result = Command::new(&self.program)
            .arg(&input)
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                GamepackError::Unpack(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(GamepackError::Unpack(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        let jar = read_limited(&output, limit)?;
        drop(workdir);
        if jar.is_empty() {
            return Err(GamepackError::Unpack(constants::ERR_UNPACK_EMPTY.into()));
        }

        debug!(unpacked = jar.len(), "Pack200 stream unpacked");
        Ok(jar)
    }
}

/// Dispatches on the stream's magic number.
#[derive(Debug, Clone, Default)]
pub struct DetectingUnpacker {
    pack200: Pack200Command,
}

impl DetectingUnpacker {
    pub fn new(pack200: Pack200Command) -> Self {
        Self { pack200 }
    }
}

impl Unpacker for DetectingUnpacker {
    fn unpack(&self, packed: Vec<u8>, limit: usize) -> Result<Vec<u8>> {
        if packed.starts_with(&PACK200_MAGIC) {
            self.pack200.unpack(packed, limit)
        } else if packed.starts_with(&ZIP_MAGIC) {
            debug!("Stream is already a zip container");
            check_limit(packed.len(), limit)?;
            Ok(packed)
        } else {
            Err(GamepackError::Unpack(constants::ERR_UNKNOWN_CONTAINER.into()))
        }
    }
}

fn check_limit(size: usize, limit: usize) -> Result<()> {
    if size > limit {
        return Err(GamepackError::OversizedArchive { size, limit });
    }
    Ok(())
}

/// Write a file that must not exist yet.
fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Read the unpacker's output, refusing anything larger than `limit`.
fn read_limited(path: &Path, limit: usize) -> Result<Vec<u8>> {
    let file = File::open(path)
        .map_err(|e| GamepackError::Unpack(format!("no output from unpacker: {e}")))?;
    let declared = file
        .metadata()
        .map(|meta| meta.len() as usize)
        .map_err(|e| GamepackError::Unpack(format!("unreadable unpacker output: {e}")))?;
    check_limit(declared, limit)?;

    let mut jar = Vec::with_capacity(declared);
    file.take(limit as u64 + 1)
        .read_to_end(&mut jar)
        .map_err(|e| GamepackError::Unpack(format!("failed to read unpacker output: {e}")))?;
    check_limit(jar.len(), limit)?;
    Ok(jar)
}
