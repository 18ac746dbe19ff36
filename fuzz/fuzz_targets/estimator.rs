#![no_main]

use libfuzzer_sys::fuzz_target;
use stream_sketches::CardinalityEstimator;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let precision = 4 + (wyhash(data, 0) % 15) as u8;
    let mut estimator = CardinalityEstimator::new(precision).unwrap();
    assert_eq!(estimator.estimate(), 0.0);

    for chunk in data.chunks(4) {
        estimator.insert_bytes(chunk);
        let estimate = estimator.estimate();
        assert!(estimate.is_finite());
        assert!(estimate > 0.0);

        // repeating an item never moves the estimate
        estimator.insert_bytes(chunk);
        assert_eq!(estimator.estimate(), estimate);
    }
    assert!(estimator.zero_registers() < estimator.num_registers());
});
