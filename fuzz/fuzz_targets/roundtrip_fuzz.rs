#![no_main]
use blocksync::engine::{apply_patch, build_fingerprint, build_patch};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // First byte picks the block size, second splits destination from
    // source; the full exchange must reconstruct the source bit-exactly.
    let block_size = u32::from(data[0]).max(1);
    let payload = &data[2..];
    let split = (data[1] as usize * payload.len()) / 256;
    let (dest, source) = payload.split_at(split);

    let doc = build_fingerprint(block_size, dest).unwrap();
    let patch = build_patch(&doc, source).unwrap();
    let rebuilt = apply_patch(&patch, dest).unwrap();
    assert_eq!(rebuilt, source);
});
