#![no_main]

use libfuzzer_sys::fuzz_target;

use vouch_messages::{decode_message, encode_message};

// Decoding arbitrary bytes as a link frame must never panic, and any frame
// that does decode must survive re-encoding unchanged.
fuzz_target!(|data: &[u8]| {
    let Ok(message) = decode_message(data) else {
        return;
    };
    let encoded = encode_message(&message).expect("decoded message re-encodes");
    let again = decode_message(&encoded).expect("re-encoded frame decodes");
    assert_eq!(again, message);
});
