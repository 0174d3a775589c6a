#![no_main]

use libfuzzer_sys::fuzz_target;

use vouch_messages::codec::{decode, decode_framed, encode};
use vouch_types::{IntroductionRequest, Pedigree};

// The framing layer on its own, against the payload types it carries.
fuzz_target!(|data: &[u8]| {
    let _ = decode::<IntroductionRequest>(data);
    let _ = decode::<Pedigree>(data);
    let _ = decode_framed::<Vec<u8>>(data);

    if data.len() >= 8 {
        let value = u64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]);
        let encoded = encode(&value).expect("u64 always encodes");
        let (decoded, consumed) = decode_framed::<u64>(&encoded).expect("roundtrip");
        assert_eq!(decoded, value);
        assert_eq!(consumed, encoded.len());
    }
});
