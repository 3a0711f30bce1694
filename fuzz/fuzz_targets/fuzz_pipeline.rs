#![no_main]

use gamepack_protocol::archive::ZipPassthrough;
use gamepack_protocol::{ArchivePipeline, CipherParameters};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary ciphertext must fail cleanly, never panic
    let pipeline = ArchivePipeline::new()
        .with_unpacker(ZipPassthrough)
        .with_max_archive_size(1024 * 1024);
    let _ = pipeline.decode(data, CipherParameters::new([0x11u8; 16], [0x22u8; 16]));
});
