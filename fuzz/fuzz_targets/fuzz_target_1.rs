#![no_main]

use libfuzzer_sys::fuzz_target;
use socket_flow::decoder::FrameDecoder;

// Feeds arbitrary bytes straight into the incremental frame decoder, one
// byte at a time, to flush out any panic reachable from a malformed or
// adversarial byte stream regardless of how it's chunked.
fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new(1 << 20, 4 << 20);
    for byte in data {
        let _ = decoder.decode(std::slice::from_ref(byte));
    }
});
