//! Output of an extracted class map: a rebuilt `client.jar` and a tree of loose classes.

use crate::archive::classes::ClassMap;
use crate::error::{GamepackError, Result};
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Build a jar holding every class, entries sorted by name.
///
/// # Errors
/// `GamepackError::Zip` if an entry cannot be written.
pub fn build_jar(classes: &ClassMap) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, data) in classes.sorted() {
        writer.start_file(name, options)?;
        writer.write_all(data)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Write the classes as a jar at `path`, creating parent directories.
#[instrument(skip(classes), fields(path = %path.as_ref().display(), classes = classes.len()))]
pub async fn write_jar(path: impl AsRef<Path>, classes: &ClassMap) -> Result<()> {
    let path = path.as_ref();
    let jar = build_jar(classes)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &jar).await?;
    debug!(bytes = jar.len(), "Jar written");
    Ok(())
}

/// Write each class under `dir` using its entry name as a relative path.
///
/// # Errors
/// `GamepackError::Extraction` for entry names that would escape `dir`.
#[instrument(skip(classes), fields(dir = %dir.as_ref().display(), classes = classes.len()))]
pub async fn write_classes(dir: impl AsRef<Path>, classes: &ClassMap) -> Result<usize> {
    let dir = dir.as_ref();
    let mut written = 0;

    for (name, data) in classes.sorted() {
        let path = dir.join(entry_path(name)?);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        written += 1;
    }

    debug!(written, "Classes written");
    Ok(written)
}

fn entry_path(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    let safe = !name.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if safe {
        Ok(path.to_path_buf())
    } else {
        Err(GamepackError::Extraction(format!(
            "refusing to write entry outside output directory: {name}"
        )))
    }
}
