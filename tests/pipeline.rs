//! End-to-end tests for the archive decoding pipeline
//!
//! Fixtures are built in reverse: a zip container of classes is gzipped and
//! AES-CBC encrypted, then wrapped in a gamepack jar.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use gamepack_protocol::archive::gamepack::read_inner_archive;
use gamepack_protocol::archive::ZipPassthrough;
use gamepack_protocol::config::ClientSource;
use gamepack_protocol::utils::base64;
use gamepack_protocol::utils::compression::gzip;
use gamepack_protocol::{
    AppletParameters, ArchivePipeline, CipherParameters, GamepackError, PipelineStage,
};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const KEY: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
];
const IV: [u8; 16] = [
    0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E,
];

fn zip_container(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn encrypted_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let compressed = gzip(&zip_container(entries)).unwrap();
    CipherParameters::new(KEY, IV).encrypt(&compressed).unwrap()
}

fn fixture() -> Vec<u8> {
    encrypted_archive(&[
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
        ("client.class", b"\xCA\xFE\xBA\xBEclient"),
        ("com/jagex/Loader.class", b"\xCA\xFE\xBA\xBEloader"),
        ("data/sprite.png", b"\x89PNG\r\n"),
    ])
}

#[test]
fn test_round_trip_recovers_classes() {
    let classes = ArchivePipeline::new()
        .decode(&fixture(), CipherParameters::new(KEY, IV))
        .expect("decode should succeed");

    assert_eq!(classes.len(), 2);
    assert_eq!(
        classes.get("client.class").unwrap().as_ref(),
        b"\xCA\xFE\xBA\xBEclient"
    );
    assert_eq!(
        classes.get("com/jagex/Loader.class").unwrap().as_ref(),
        b"\xCA\xFE\xBA\xBEloader"
    );
}

#[test]
fn test_non_class_entries_excluded() {
    let classes = ArchivePipeline::new()
        .decode(&fixture(), CipherParameters::new(KEY, IV))
        .unwrap();

    assert!(!classes.contains("META-INF/MANIFEST.MF"));
    assert!(!classes.contains("data/sprite.png"));
    assert!(classes.names().all(|name| name.ends_with(".class")));
}

#[test]
fn test_encoded_parameters_round_trip() {
    let secret = base64::encode(&KEY);
    let vector = base64::encode(&IV);
    assert_eq!(secret.len(), 22);
    assert_eq!(secret, "AAECAwQFBgcICQoLDA0ODw");

    let classes = ArchivePipeline::new()
        .decode_encoded(&fixture(), &secret, &vector)
        .unwrap();
    assert_eq!(classes.len(), 2);
}

#[test]
fn test_wrong_key_is_crypto_error() {
    let encrypted = fixture();
    let mut failures = 0;
    let mut crypto = 0;

    // A wrong key still yields valid padding roughly once in 256 tries, which then
    // fails at decompression instead.
    for seed in 1..=8u8 {
        let mut key = KEY;
        key[0] ^= seed;
        let result = ArchivePipeline::new().decode(&encrypted, CipherParameters::new(key, IV));
        if let Err(err) = result {
            failures += 1;
            if err.stage() == Some(PipelineStage::Crypto) {
                crypto += 1;
            }
        }
    }

    assert_eq!(failures, 8);
    assert!(crypto >= 7, "only {crypto} of 8 wrong keys failed in the crypto stage");
}

#[test]
fn test_wrong_iv_corrupts_first_block() {
    let mut iv = IV;
    iv[0] ^= 0xFF;

    let err = ArchivePipeline::new()
        .decode(&fixture(), CipherParameters::new(KEY, iv))
        .unwrap_err();
    assert_eq!(err.stage(), Some(PipelineStage::Decompression));
}

#[test]
fn test_truncated_ciphertext_is_crypto_error() {
    let mut encrypted = fixture();
    encrypted.truncate(encrypted.len() - 3);

    let err = ArchivePipeline::new()
        .decode(&encrypted, CipherParameters::new(KEY, IV))
        .unwrap_err();
    assert!(matches!(err, GamepackError::Crypto(_)));
}

#[test]
fn test_empty_key_material_uses_zero_block() {
    let compressed = gzip(&zip_container(&[("a.class", b"x")])).unwrap();
    let encrypted = CipherParameters::new([0u8; 16], [0u8; 16])
        .encrypt(&compressed)
        .unwrap();

    let classes = ArchivePipeline::new()
        .decode_encoded(&encrypted, "", "")
        .unwrap();
    assert!(classes.contains("a.class"));
}

#[test]
fn test_aes256_key() {
    let key = [0x5Au8; 32];
    let compressed = gzip(&zip_container(&[("a.class", b"x")])).unwrap();
    let encrypted = CipherParameters::new(key, IV).encrypt(&compressed).unwrap();

    let classes = ArchivePipeline::new()
        .decode(&encrypted, CipherParameters::new(key, IV))
        .unwrap();
    assert_eq!(classes.len(), 1);
}

#[test]
fn test_container_without_classes() {
    let encrypted = encrypted_archive(&[("readme.txt", b"hello")]);
    let classes = ArchivePipeline::new()
        .with_unpacker(ZipPassthrough)
        .decode(&encrypted, CipherParameters::new(KEY, IV))
        .unwrap();
    assert!(classes.is_empty());
}

#[test]
fn test_decompressed_size_limit() {
    // Stored entry so the container itself stays large after gunzip
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("big.class", stored).unwrap();
    writer.write_all(&vec![0u8; 256 * 1024]).unwrap();
    let container = writer.finish().unwrap().into_inner();

    let encrypted = CipherParameters::new(KEY, IV)
        .encrypt(&gzip(&container).unwrap())
        .unwrap();
    assert!(encrypted.len() < 64 * 1024);

    let err = ArchivePipeline::new()
        .with_max_archive_size(64 * 1024)
        .decode(&encrypted, CipherParameters::new(KEY, IV))
        .unwrap_err();
    assert!(matches!(err, GamepackError::OversizedArchive { .. }));
    assert_eq!(err.stage(), Some(PipelineStage::Decompression));
}

#[test]
fn test_gamepack_to_classes() {
    let encrypted = fixture();
    let gamepack = zip_container(&[
        ("loader.class", b"\xCA\xFE\xBA\xBE"),
        ("inner.pack.gz", &encrypted),
    ]);

    let inner = read_inner_archive(&gamepack, "inner.pack.gz", 1024 * 1024).unwrap();
    assert_eq!(inner, encrypted);

    let classes = ArchivePipeline::new()
        .decode(&inner, CipherParameters::new(KEY, IV))
        .unwrap();
    assert_eq!(classes.len(), 2);
}

#[test]
fn test_pipeline_shared_across_threads() {
    let pipeline = std::sync::Arc::new(ArchivePipeline::new());
    let encrypted = std::sync::Arc::new(fixture());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            let encrypted = encrypted.clone();
            std::thread::spawn(move || {
                pipeline
                    .decode(&encrypted, CipherParameters::new(KEY, IV))
                    .unwrap()
                    .len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
}

#[test]
fn test_deflated_class_cannot_expand_past_limit() {
    // A zero-filled class deflates to a few KB and then to a few hundred bytes encrypted
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file("bomb.class", deflated).unwrap();
    writer.write_all(&vec![0u8; 32 * 1024 * 1024]).unwrap();
    let container = writer.finish().unwrap().into_inner();
    assert!(container.len() < 64 * 1024);

    let encrypted = CipherParameters::new(KEY, IV)
        .encrypt(&gzip(&container).unwrap())
        .unwrap();

    let err = ArchivePipeline::new()
        .with_max_archive_size(64 * 1024)
        .decode(&encrypted, CipherParameters::new(KEY, IV))
        .unwrap_err();
    assert!(matches!(
        err,
        GamepackError::OversizedArchive { limit: 65536, .. }
    ));
}

#[test]
fn test_encrypted_source_decodes_inner_archive() {
    let inner = fixture();
    let gamepack = zip_container(&[
        ("loader.class", b"\xCA\xFE\xBA\xBE"),
        ("inner.pack.gz", &inner),
    ]);
    let mut parameters = AppletParameters::default();
    parameters.insert("0", base64::encode(&KEY));
    parameters.insert("-1", base64::encode(&IV));

    let classes = ArchivePipeline::new()
        .decode_gamepack(ClientSource::Runescape, &gamepack, &parameters)
        .unwrap();
    assert_eq!(classes.len(), 2);
    assert!(classes.contains("com/jagex/Loader.class"));
    // The loader lives outside the encrypted archive
    assert!(!classes.contains("loader.class"));
}

#[test]
fn test_encrypted_source_requires_secret_and_vector() {
    let inner = fixture();
    let gamepack = zip_container(&[("inner.pack.gz", &inner)]);
    let err = ArchivePipeline::new()
        .decode_gamepack(ClientSource::Runescape, &gamepack, &AppletParameters::default())
        .unwrap_err();
    assert!(matches!(err, GamepackError::MissingParameter(_)));
}

#[test]
fn test_unencrypted_source_reads_jar_directly() {
    let client = zip_container(&[
        ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
        ("client.class", b"\xCA\xFE\xBA\xBEclient"),
        ("ab.class", b"\xCA\xFE\xBA\xBEab"),
    ]);

    for source in [ClientSource::Oldschool, ClientSource::Classic] {
        // No secret or vector: the plain path never touches them
        let classes = ArchivePipeline::new()
            .decode_gamepack(source, &client, &AppletParameters::default())
            .unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(
            classes.get("ab.class").unwrap().as_ref(),
            b"\xCA\xFE\xBA\xBEab"
        );
        assert!(!classes.contains("META-INF/MANIFEST.MF"));
    }
}

#[test]
fn test_unencrypted_source_respects_limit() {
    let client = zip_container(&[("a.class", &[7u8; 4096])]);
    let err = ArchivePipeline::new()
        .with_max_archive_size(1024)
        .decode_gamepack(ClientSource::Oldschool, &client, &AppletParameters::default())
        .unwrap_err();
    assert!(matches!(err, GamepackError::OversizedArchive { .. }));
}
