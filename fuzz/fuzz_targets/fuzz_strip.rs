#![no_main]

use lethe_core::jpeg::strip_metadata;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(once) = strip_metadata(data) {
        let twice = strip_metadata(&once).expect("strip output must walk cleanly");
        assert_eq!(once, twice);
    }
});
