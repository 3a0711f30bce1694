//! Base64 variant used for the AES secret and vector parameters.
//!
//! The service substitutes `*` for `+` and `-` for `/` and strips padding. Decoding maps
//! the substitutes back and decodes without padding, then checks that the decoded
//! length is the one an unpadded string of that length must produce.

use crate::error::{constants, GamepackError, Result};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decoded length of an unpadded base64 string of `len` characters.
///
/// Returns `None` for lengths no base64 encoding can produce (`len % 4 == 1`).
/// For `len % 4 == 2`, the shape of the service's 22-character keys, this equals
/// `3 * ((len - 1) / 4) + 1`.
pub fn decoded_len(len: usize) -> Option<usize> {
    let whole = len / 4 * 3;
    match len % 4 {
        0 => Some(whole),
        2 => Some(whole + 1),
        3 => Some(whole + 2),
        _ => None,
    }
}

/// Decode key material in the variant alphabet.
///
/// An empty string yields an empty vector: the caller's marker for "no key material",
/// which the cipher stage treats as all-zero key/IV bytes.
///
/// # Errors
/// Returns `GamepackError::Format` for invalid symbols, impossible lengths, or a decoded
/// length that disagrees with [`decoded_len`].
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    let standard: String = encoded
        .chars()
        .map(|c| match c {
            '*' => '+',
            '-' => '/',
            other => other,
        })
        .collect();
    let unpadded = standard.trim_end_matches('=');

    let expected = decoded_len(unpadded.len())
        .ok_or_else(|| GamepackError::Format(constants::ERR_BASE64_LENGTH.into()))?;

    let bytes = ENGINE
        .decode(unpadded)
        .map_err(|e| GamepackError::Format(format!("invalid key material: {e}")))?;

    if bytes.len() != expected {
        return Err(GamepackError::Format(format!(
            "{}: expected {expected}, got {}",
            constants::ERR_BASE64_MISMATCH,
            bytes.len()
        )));
    }

    Ok(bytes)
}

/// Encode bytes in the variant alphabet, without padding.
pub fn encode(data: &[u8]) -> String {
    ENGINE
        .encode(data)
        .chars()
        .map(|c| match c {
            '+' => '*',
            '/' => '-',
            other => other,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_empty_key() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_sixteen_byte_key() {
        let expected: Vec<u8> = (0u8..16).collect();
        let decoded = decode("AAECAwQFBgcICQoLDA0ODw").unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_substituted_symbols() {
        assert_eq!(
            decode("****----").unwrap(),
            vec![0xFB, 0xEF, 0xBE, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(decode("-w").unwrap(), vec![0xFF]);
        assert_eq!(encode(&[0xFB, 0xEF, 0xBE, 0xFF, 0xFF, 0xFF]), "****----");
    }

    #[test]
    fn test_standard_symbols_still_decode() {
        // '+' and '/' are part of the underlying alphabet
        assert_eq!(decode("++++").unwrap(), vec![0xFB, 0xEF, 0xBE]);
    }

    #[test]
    fn test_padding_is_tolerated() {
        assert_eq!(
            decode("AAECAwQFBgcICQoLDA0ODw==").unwrap(),
            (0u8..16).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_impossible_length_rejected() {
        assert!(matches!(decode("AAECA"), Err(GamepackError::Format(_))));
    }

    #[test]
    fn test_invalid_symbol_rejected() {
        assert!(matches!(decode("AA_B"), Err(GamepackError::Format(_))));
    }

    #[test]
    fn test_decoded_len_matches_service_formula() {
        for len in (2..200).step_by(4) {
            assert_eq!(decoded_len(len), Some(3 * ((len - 1) / 4) + 1));
        }
        assert_eq!(decoded_len(22), Some(16));
        assert_eq!(decoded_len(43), Some(32));
        assert_eq!(decoded_len(5), None);
    }

    #[test]
    fn test_whole_and_three_char_groups_decode_exactly() {
        assert_eq!(decoded_len(4), Some(3));
        assert_eq!(decoded_len(3), Some(2));
        assert_eq!(decode("AAAA").unwrap().len(), 3);
        assert_eq!(decode("AAA").unwrap().len(), 2);
        assert_eq!(decode("AAAAAAAA").unwrap(), vec![0; 6]);
        assert!(matches!(decode("AAAAA"), Err(GamepackError::Format(_))));
    }
}
