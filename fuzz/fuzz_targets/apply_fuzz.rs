#![no_main]
use blocksync::engine::apply_patch;
use blocksync::patch::PatchDocument;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte splits the input into a destination buffer and patch
    // bytes. Applying an arbitrary parsed patch to an arbitrary destination
    // must either succeed or fail cleanly, never panic or read out of
    // bounds.
    if data.is_empty() {
        return;
    }
    let payload = &data[1..];
    let split = (data[0] as usize).min(payload.len());
    let (dest, patch_bytes) = payload.split_at(split);

    if let Ok(patch) = PatchDocument::from_bytes(patch_bytes) {
        let _ = apply_patch(&patch, dest);
    }
});
