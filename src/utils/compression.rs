use crate::error::{GamepackError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compresses data into a gzip stream
///
/// # Errors
/// Returns `GamepackError::Io` if the encoder fails
pub fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses a gzip stream fully into memory
///
/// Enforces a maximum output size so a corrupt or hostile archive cannot exhaust memory.
/// The output buffer starts sized from the input rather than from a fixed capacity.
///
/// # Errors
/// Returns `GamepackError::Decompression` if the stream is not valid gzip, or
/// `GamepackError::OversizedArchive` if the output exceeds `limit` bytes
pub fn gunzip(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut reader = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len().saturating_mul(2).min(limit));

    // Read in chunks to enforce size limit
    let mut buffer = [0u8; 8192];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break, // EOF
            Ok(n) => {
                out.extend_from_slice(&buffer[..n]);
                if out.len() > limit {
                    return Err(GamepackError::OversizedArchive {
                        size: out.len(),
                        limit,
                    });
                }
            }
            Err(e) => return Err(GamepackError::Decompression(e.to_string())),
        }
    }

    Ok(out)
}
