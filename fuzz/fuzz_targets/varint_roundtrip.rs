#![no_main]
use libfuzzer_sys::fuzz_target;

use pbwire::varint::{pack64, scan, size64, unpack64};

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic, and whatever decodes
    // must re-encode to a canonical prefix of the same value.
    if let Some((value, used)) = unpack64(data) {
        assert!(used <= 10);
        assert!(scan(data));

        let mut out = [0u8; 10];
        let re = pack64(&mut out, value);
        assert_eq!(re, size64(value));

        // Canonical re-encoding decodes to the same value.
        let (back, back_used) = unpack64(&out[..re]).expect("canonical varint decodes");
        assert_eq!(back, value);
        assert_eq!(back_used, re);
    }
});
