#![no_main]

use bytes::BytesMut;
use gamepack_protocol::core::handshake::CONNECTION_KEY_LEN;
use gamepack_protocol::{HandshakeCodec, HandshakeRequest};
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = HandshakeRequest::decode(data, CONNECTION_KEY_LEN) {
        let encoded = request.to_bytes();
        assert_eq!(&encoded[..], &data[..encoded.len()]);
    }

    // The client codec consumes exactly one byte per response
    let mut codec = HandshakeCodec;
    let mut buf = BytesMut::from(data);
    let mut responses = 0;
    while let Ok(Some(_)) = codec.decode(&mut buf) {
        responses += 1;
    }
    assert_eq!(responses, data.len());
});
