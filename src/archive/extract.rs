use crate::archive::classes::{ClassEntry, ClassMap};
use crate::error::{GamepackError, Result};
use bytes::Bytes;
use std::io::{Cursor, Read};
use tracing::trace;
use zip::ZipArchive;

/// Collect every entry whose name ends in `suffix`, in stored order.
///
/// Other entries are skipped. A later entry with a duplicate name replaces the earlier one.
/// The extracted bytes, summed over all kept entries, may not exceed `limit`; entry sizes
/// declared in the zip headers are not trusted.
///
/// # Errors
/// - `GamepackError::Unpack` if `container` is not zip-structured
/// - `GamepackError::Extraction` if an entry cannot be read
/// - `GamepackError::OversizedArchive` once the extracted total passes `limit`
pub fn extract_classes(container: &[u8], suffix: &str, limit: usize) -> Result<ClassMap> {
    let mut archive = ZipArchive::new(Cursor::new(container))
        .map_err(|e| GamepackError::Unpack(format!("unpacked stream is not a zip container: {e}")))?;
    let mut classes = ClassMap::with_capacity(archive.len());
    let mut total = 0usize;

    for index in 0..archive.len() {
        let file = archive
            .by_index(index)
            .map_err(|e| GamepackError::Extraction(format!("entry {index}: {e}")))?;
        let name = file.name().to_string();

        if file.is_dir() || !name.ends_with(suffix) {
            trace!(name = %name, "Skipping non-class entry");
            continue;
        }

        let remaining = limit - total;
        let mut data = Vec::with_capacity((file.size() as usize).min(remaining));
        file.take(remaining as u64 + 1)
            .read_to_end(&mut data)
            .map_err(|e| GamepackError::Extraction(format!("{name}: {e}")))?;

        total += data.len();
        if total > limit {
            return Err(GamepackError::OversizedArchive { size: total, limit });
        }

        classes.insert(ClassEntry {
            name,
            data: Bytes::from(data),
        });
    }

    Ok(classes)
}
