//! Decrypt → gunzip → unpack → extract.
//!
//! Every stage works on whole in-memory buffers sized from the actual input. Each
//! intermediate buffer is dropped as soon as the next stage has produced its output,
//! and any stage failure aborts the run without a partial class map.
//!
//! The archive size limit applies to the output of every stage, so a small input cannot
//! expand without bound at any layer. Unencrypted gamepacks skip straight to extraction.

use crate::archive::cipher::CipherParameters;
use crate::archive::classes::ClassMap;
use crate::archive::extract::extract_classes;
use crate::archive::gamepack::read_inner_archive;
use crate::archive::unpack::{DetectingUnpacker, Pack200Command, Unpacker};
use crate::config::{
    ArchiveConfig, ClientSource, CLASS_SUFFIX, ENCRYPTED_ARCHIVE_NAME, MAX_ARCHIVE_SIZE,
};
use crate::error::{GamepackError, Result};
use crate::params::AppletParameters;
use crate::utils::compression::gunzip;
use std::fmt;
use tracing::{debug, instrument};

/// Decodes encrypted gamepack archives into class maps.
///
/// Holds no mutable state, so one pipeline can decode independent archives from
/// several threads at once.
pub struct ArchivePipeline {
    unpacker: Box<dyn Unpacker>,
    inner_archive_name: String,
    class_suffix: String,
    max_archive_size: usize,
}

impl fmt::Debug for ArchivePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchivePipeline")
            .field("inner_archive_name", &self.inner_archive_name)
            .field("class_suffix", &self.class_suffix)
            .field("max_archive_size", &self.max_archive_size)
            .finish_non_exhaustive()
    }
}

impl Default for ArchivePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchivePipeline {
    pub fn new() -> Self {
        Self {
            unpacker: Box::new(DetectingUnpacker::default()),
            inner_archive_name: String::from(ENCRYPTED_ARCHIVE_NAME),
            class_suffix: String::from(CLASS_SUFFIX),
            max_archive_size: MAX_ARCHIVE_SIZE,
        }
    }

    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            unpacker: Box::new(DetectingUnpacker::new(Pack200Command::new(
                &config.unpack200_program,
            ))),
            inner_archive_name: config.inner_archive_name.clone(),
            class_suffix: config.class_suffix.clone(),
            max_archive_size: config.max_archive_size,
        }
    }

    /// Replace the unpack stage.
    pub fn with_unpacker(mut self, unpacker: impl Unpacker + 'static) -> Self {
        self.unpacker = Box::new(unpacker);
        self
    }

    pub fn with_max_archive_size(mut self, limit: usize) -> Self {
        self.max_archive_size = limit;
        self
    }

    /// Load the classes of a downloaded jar for `source`.
    ///
    /// Encrypted sources decode the inner archive with the page's secret and vector;
    /// other sources read class entries straight from the jar and need no parameters.
    ///
    /// # Errors
    /// `GamepackError::MissingParameter` if an encrypted source lacks its secret or
    /// vector, otherwise as [`Self::decode`] or [`Self::extract_plain`].
    #[instrument(skip_all, fields(source = %source, jar = jar.len()))]
    pub fn decode_gamepack(
        &self,
        source: ClientSource,
        jar: &[u8],
        parameters: &AppletParameters,
    ) -> Result<ClassMap> {
        if !source.is_encrypted() {
            return self.extract_plain(jar);
        }

        let (secret, vector) = (parameters.secret()?, parameters.vector()?);
        let encrypted = read_inner_archive(jar, &self.inner_archive_name, self.max_archive_size)?;
        self.decode_encoded(&encrypted, secret, vector)
    }

    /// Collect the class entries of an unencrypted client jar.
    ///
    /// # Errors
    /// `OversizedArchive` for jars or extracted totals over the limit, `Unpack` if the
    /// input is not a zip container.
    pub fn extract_plain(&self, jar: &[u8]) -> Result<ClassMap> {
        self.check_size(jar.len())?;
        let classes = extract_classes(jar, &self.class_suffix, self.max_archive_size)?;
        debug!(classes = classes.len(), bytes = classes.total_bytes(), "Classes extracted");
        Ok(classes)
    }

    /// Decode with secret and vector still in the service's base64 variant.
    ///
    /// # Errors
    /// `GamepackError::Format` for malformed key material, otherwise as [`Self::decode`].
    pub fn decode_encoded(&self, encrypted: &[u8], secret: &str, vector: &str) -> Result<ClassMap> {
        let params = CipherParameters::from_encoded(secret, vector)?;
        self.decode(encrypted, params)
    }

    /// Run the full pipeline over an encrypted archive.
    ///
    /// # Errors
    /// One terminal error classified by stage (see [`GamepackError::stage`]):
    /// `Crypto`, `Decompression`/`OversizedArchive`, `Unpack` or `Extraction`.
    #[instrument(skip_all, fields(encrypted = encrypted.len()))]
    pub fn decode(&self, encrypted: &[u8], params: CipherParameters) -> Result<ClassMap> {
        self.check_size(encrypted.len())?;

        let decrypted = params.decrypt(encrypted)?;
        debug!(decrypted = decrypted.len(), "Archive decrypted");

        let decompressed = gunzip(&decrypted, self.max_archive_size)?;
        drop(decrypted);
        debug!(decompressed = decompressed.len(), "Archive decompressed");

        let container = self.unpacker.unpack(decompressed, self.max_archive_size)?;
        self.check_size(container.len())?;
        debug!(container = container.len(), "Archive unpacked");

        let classes = extract_classes(&container, &self.class_suffix, self.max_archive_size)?;
        debug!(classes = classes.len(), bytes = classes.total_bytes(), "Classes extracted");
        Ok(classes)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_archive_size {
            return Err(GamepackError::OversizedArchive {
                size,
                limit: self.max_archive_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::archive::unpack::ZipPassthrough;
    use crate::error::PipelineStage;
    use crate::utils::compression::gzip;

    fn params() -> CipherParameters {
        CipherParameters::new(vec![7u8; 16], vec![9u8; 16])
    }

    #[test]
    fn test_oversized_input_rejected_before_decrypting() {
        let pipeline = ArchivePipeline::new().with_max_archive_size(32);
        let err = pipeline.decode(&[0u8; 48], params()).unwrap_err();
        assert!(matches!(
            err,
            GamepackError::OversizedArchive { size: 48, limit: 32 }
        ));
    }

    #[test]
    fn test_non_gzip_plaintext_is_decompression_error() {
        let encrypted = params().encrypt(b"definitely not gzip").unwrap();
        let err = ArchivePipeline::new().decode(&encrypted, params()).unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Decompression));
    }

    #[test]
    fn test_unknown_container_is_unpack_error() {
        let compressed = gzip(b"neither pack200 nor zip").unwrap();
        let encrypted = params().encrypt(&compressed).unwrap();
        let err = ArchivePipeline::new()
            .with_unpacker(ZipPassthrough)
            .decode(&encrypted, params())
            .unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Unpack));
    }

    #[test]
    fn test_bad_key_material_is_format_error() {
        let err = ArchivePipeline::new()
            .decode_encoded(&[0u8; 16], "AAECA", "")
            .unwrap_err();
        assert!(matches!(err, GamepackError::Format(_)));
    }
}
