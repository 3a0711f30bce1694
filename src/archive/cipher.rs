//! AES-CBC stage of the archive pipeline.
//!
//! Key length selects the AES variant (16/24/32 bytes). Empty key or vector material
//! means "no key material present" and is replaced by all-zero 16-byte blocks.
//! Padding is PKCS#5/7; a padding failure after decryption almost always means the
//! key or vector was wrong.

use crate::error::{constants, GamepackError, Result};
use crate::utils::base64;
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::borrow::Cow;
use std::fmt;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// Decoded AES key and initialisation vector.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherParameters {
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl fmt::Debug for CipherParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherParameters")
            .field("key", &format_args!("[{} bytes]", self.key.len()))
            .field("iv", &format_args!("[{} bytes]", self.iv.len()))
            .finish()
    }
}

impl CipherParameters {
    pub fn new(key: impl Into<Vec<u8>>, iv: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            iv: iv.into(),
        }
    }

    /// Decode the secret and vector parameters from the service's base64 variant.
    ///
    /// # Errors
    /// Returns `GamepackError::Format` if either string is malformed.
    pub fn from_encoded(secret: &str, vector: &str) -> Result<Self> {
        Ok(Self::new(base64::decode(secret)?, base64::decode(vector)?))
    }

    pub fn key_len(&self) -> usize {
        self.key.len()
    }

    pub fn iv_len(&self) -> usize {
        self.iv.len()
    }

    fn key_material(&self) -> &[u8] {
        if self.key.is_empty() {
            &ZERO_BLOCK
        } else {
            &self.key
        }
    }

    fn iv_material(&self) -> Result<Cow<'_, [u8]>> {
        match self.iv.len() {
            0 => Ok(Cow::Borrowed(&ZERO_BLOCK)),
            BLOCK_SIZE => Ok(Cow::Borrowed(&self.iv)),
            other => Err(GamepackError::Crypto(format!(
                "{}, got {other}",
                constants::ERR_IV_SIZE
            ))),
        }
    }

    /// Decrypt a whole AES-CBC/PKCS#7 buffer. The parameters are consumed.
    ///
    /// # Errors
    /// Returns `GamepackError::Crypto` for invalid key/IV sizes or a padding failure.
    pub fn decrypt(self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let iv = self.iv_material()?;
        let key = self.key_material();
        let invalid = |e: aes::cipher::InvalidLength| GamepackError::Crypto(e.to_string());

        let plaintext = match key.len() {
            16 => cbc::Decryptor::<Aes128>::new_from_slices(key, &iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            24 => cbc::Decryptor::<Aes192>::new_from_slices(key, &iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            32 => cbc::Decryptor::<Aes256>::new_from_slices(key, &iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            other => {
                return Err(GamepackError::Crypto(format!(
                    "{}, got {other}",
                    constants::ERR_KEY_SIZE
                )))
            }
        };

        plaintext.map_err(|_| GamepackError::Crypto(constants::ERR_PADDING.into()))
    }

    /// Encrypt with AES-CBC/PKCS#7; the inverse of [`CipherParameters::decrypt`].
    ///
    /// # Errors
    /// Returns `GamepackError::Crypto` for invalid key/IV sizes.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let iv = self.iv_material()?;
        let key = self.key_material();
        let invalid = |e: aes::cipher::InvalidLength| GamepackError::Crypto(e.to_string());

        match key.len() {
            16 => Ok(cbc::Encryptor::<Aes128>::new_from_slices(key, &iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            24 => Ok(cbc::Encryptor::<Aes192>::new_from_slices(key, &iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            32 => Ok(cbc::Encryptor::<Aes256>::new_from_slices(key, &iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            other => Err(GamepackError::Crypto(format!(
                "{}, got {other}",
                constants::ERR_KEY_SIZE
            ))),
        }
    }
}
