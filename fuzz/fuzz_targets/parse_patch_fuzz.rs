#![no_main]
use blocksync::patch::PatchDocument;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing must never panic; well-formed documents must re-serialize
    // to the exact input bytes.
    if let Ok(doc) = PatchDocument::from_bytes(data) {
        assert_eq!(doc.to_bytes(), data);
    }
});
