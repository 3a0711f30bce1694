use crate::error::{GamepackError, Result};
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Read the encrypted inner archive (normally `inner.pack.gz`) out of a gamepack jar.
///
/// The buffer is sized from the entry's real length; entries larger than `limit` are
/// rejected instead of truncated.
///
/// # Errors
/// - `GamepackError::Zip` if the jar is unreadable or has no such entry
/// - `GamepackError::OversizedArchive` if the entry is larger than `limit`
pub fn read_inner_archive(jar: &[u8], entry_name: &str, limit: usize) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(jar))?;
    let entry = archive.by_name(entry_name)?;

    let size = entry.size() as usize;
    if size > limit {
        return Err(GamepackError::OversizedArchive { size, limit });
    }

    let mut data = Vec::with_capacity(size);
    entry.take(limit as u64 + 1).read_to_end(&mut data)?;
    if data.len() > limit {
        return Err(GamepackError::OversizedArchive {
            size: data.len(),
            limit,
        });
    }

    Ok(data)
}
