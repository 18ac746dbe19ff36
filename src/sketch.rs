//! Feeding one item stream into several sketches at once.
//!
//! Each item is converted to its stable bytes once and handed to every active
//! sketch; sketches never see each other. Items that have no stable byte form
//! are counted and skipped, the stream itself keeps going.

use enum_dispatch::enum_dispatch;
use tracing::debug;

use crate::estimator::CardinalityEstimator;
use crate::filter::MembershipFilter;
use crate::hash::{HashFamily, StableBytes};

/// Sketch types that can consume an item stream
#[derive(Clone, Debug, PartialEq)]
#[enum_dispatch]
pub enum Sketch {
    MembershipFilter(MembershipFilter),
    CardinalityEstimator(CardinalityEstimator),
}

/// Operations shared by all sketch types.
#[enum_dispatch(Sketch)]
pub trait SketchTrait {
    fn insert_bytes(&mut self, bytes: &[u8]);
    fn size_of(&self) -> usize;
}

impl<F: HashFamily> SketchTrait for MembershipFilter<F> {
    #[inline]
    fn insert_bytes(&mut self, bytes: &[u8]) {
        MembershipFilter::insert_bytes(self, bytes);
    }

    fn size_of(&self) -> usize {
        MembershipFilter::size_of(self)
    }
}

impl<F: HashFamily> SketchTrait for CardinalityEstimator<F> {
    #[inline]
    fn insert_bytes(&mut self, bytes: &[u8]) {
        CardinalityEstimator::insert_bytes(self, bytes);
    }

    fn size_of(&self) -> usize {
        CardinalityEstimator::size_of(self)
    }
}

/// Outcome of [`feed`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Items inserted into every sketch
    pub accepted: usize,
    /// Items skipped because they have no stable byte form
    pub rejected: usize,
}

/// Feed every item of `items` into all `sketches`
pub fn feed<I>(sketches: &mut [Sketch], items: I) -> FeedSummary
where
    I: IntoIterator,
    I::Item: StableBytes,
{
    let mut summary = FeedSummary::default();
    for item in items {
        match item.stable_bytes() {
            Ok(bytes) => {
                for sketch in sketches.iter_mut() {
                    sketch.insert_bytes(&bytes);
                }
                summary.accepted += 1;
            }
            Err(err) => {
                debug!(%err, "skipping item");
                summary.rejected += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed() {
        let mut sketches = vec![
            Sketch::from(MembershipFilter::new(10_000, 3).unwrap()),
            Sketch::from(CardinalityEstimator::new(12).unwrap()),
        ];

        let ips = [
            Some("10.0.0.1"),
            Some("10.0.0.2"),
            None,
            Some("10.0.0.1"),
            Some("10.0.0.3"),
        ];
        let summary = feed(&mut sketches, ips);
        assert_eq!(
            summary,
            FeedSummary {
                accepted: 4,
                rejected: 1
            }
        );

        match &sketches[0] {
            Sketch::MembershipFilter(filter) => {
                for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
                    assert!(filter.contains(ip).unwrap());
                }
            }
            other => panic!("unexpected sketch {:?}", other),
        }
        match &sketches[1] {
            Sketch::CardinalityEstimator(estimator) => {
                let estimate = estimator.estimate();
                assert!(estimate > 1.5 && estimate < 3.5, "{}", estimate);
            }
            other => panic!("unexpected sketch {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_matches_direct_use() {
        let mut direct = CardinalityEstimator::new(10).unwrap();
        let mut sketch = Sketch::from(direct.clone());
        for i in 0u32..500 {
            direct.insert(&i).unwrap();
            sketch.insert_bytes(&i.to_le_bytes());
        }
        assert_eq!(sketch, Sketch::from(direct.clone()));
        assert_eq!(sketch.size_of(), direct.size_of());
    }
}
