#![no_main]

use gamepack_protocol::utils::base64;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(decoded) = base64::decode(text) {
        // Anything accepted must re-encode to the same number of symbols
        let encoded = base64::encode(&decoded);
        assert_eq!(base64::decoded_len(encoded.len()), Some(decoded.len()));
    }
});
