#![no_main]

use libfuzzer_sys::fuzz_target;
use stream_sketches::MembershipFilter;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let size = 1 + (wyhash(data, 0) % 4096) as usize;
    let hash_count = 1 + (wyhash(data, 1) % 8) as u32;
    let mut filter = MembershipFilter::new(size, hash_count).unwrap();

    let split_index = wyhash(data, 2) as usize % data.len();
    let (inserted, _) = data.split_at(split_index);
    for chunk in inserted.chunks(3) {
        filter.insert_bytes(chunk);
        assert!(filter.contains_bytes(chunk));
    }
    // no false negatives, whatever the load
    for chunk in inserted.chunks(3) {
        assert!(filter.contains_bytes(chunk));
    }
    assert!(filter.bits_set() <= filter.size());
});
