#![no_main]

use lethe_core::jpeg::SegmentWalker;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(walker) = SegmentWalker::new(data) {
        for segment in walker {
            let Ok(segment) = segment else { break };
            assert!(segment.end <= data.len());
            assert!(segment.offset < segment.end);
        }
    }
});
