//! Membership filter allows to test whether an item was seen before
//! without storing the items themselves.
//!
//! The filter is a fixed array of `size` bits probed at `K` positions per item,
//! position `i` being `hash(item, i) mod size`. Bits are only ever set, never
//! cleared, which gives the filter its one-sided error:
//! - `contains` is always `true` for an item that was inserted (no false negatives);
//! - `contains` may be `true` for an item that was never inserted, with a
//!   probability growing with the number of distinct items relative to `size` and `K`.
//!
//! # Concurrent use
//! `insert` takes `&mut self`, so a filter shared between threads must sit behind
//! a lock. A caller composing "check, then insert if new" must hold that lock
//! across both calls, otherwise two callers may both observe an item as new.
//! See [`crate::uniqueness`] for the composed workflow.

use std::fmt::{Debug, Formatter};
use std::mem::{size_of, size_of_val};

use tracing::debug;

use crate::config::FilterConfig;
use crate::error::Result;
use crate::hash::{HashFamily, StableBytes, WyHashFamily};

/// Number of filter bits stored per word
const WORD_BITS: usize = u64::BITS as usize;

/// Fixed-size bit array with `K` hash probes per item.
#[derive(Clone, PartialEq, Eq)]
pub struct MembershipFilter<F = WyHashFamily> {
    /// Filter bits packed into 64-bit words; bits past `size` stay zero
    bits: Vec<u64>,
    /// Number of usable bits
    size: usize,
    /// Number of probes per item (`K`)
    hash_count: u32,
    family: F,
}

impl MembershipFilter {
    /// Creates new filter of `size` bits using `hash_count` wyhash probes
    pub fn new(size: usize, hash_count: u32) -> Result<Self> {
        Self::with_hash_family(size, hash_count, WyHashFamily::default())
    }

    /// Creates new filter from `config`
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::with_hash_family(
            config.size,
            config.hash_count,
            WyHashFamily::new(config.seed),
        )
    }
}

impl<F: HashFamily> MembershipFilter<F> {
    /// Creates new filter probing positions with the given hash `family`
    pub fn with_hash_family(size: usize, hash_count: u32, family: F) -> Result<Self> {
        let config = FilterConfig {
            size,
            hash_count,
            ..Default::default()
        };
        if let Err(err) = config.validate() {
            debug!(%err, "rejected membership filter configuration");
            return Err(err);
        }

        debug!(size, hash_count, "created membership filter");
        Ok(Self {
            bits: vec![0u64; size.div_ceil(WORD_BITS)],
            size,
            hash_count,
            family,
        })
    }

    /// Insert an item into the filter.
    ///
    /// Fails with `InvalidInput` if the item has no stable byte form, in which
    /// case no bit is changed.
    #[inline]
    pub fn insert<T: StableBytes + ?Sized>(&mut self, item: &T) -> Result<()> {
        let bytes = item.stable_bytes()?;
        self.insert_bytes(&bytes);
        Ok(())
    }

    /// Insert an item given by its raw bytes
    #[inline]
    pub fn insert_bytes(&mut self, bytes: &[u8]) {
        for i in 0..self.hash_count {
            let idx = self.bit_index(bytes, i);
            self.bits[idx / WORD_BITS] |= 1u64 << (idx % WORD_BITS);
        }
    }

    /// Check whether an item might have been inserted.
    ///
    /// `Ok(false)` means the item was definitely never inserted, `Ok(true)` means
    /// it possibly was.
    #[inline]
    pub fn contains<T: StableBytes + ?Sized>(&self, item: &T) -> Result<bool> {
        let bytes = item.stable_bytes()?;
        Ok(self.contains_bytes(&bytes))
    }

    /// Check whether an item given by its raw bytes might have been inserted
    #[inline]
    pub fn contains_bytes(&self, bytes: &[u8]) -> bool {
        // stops at the first unset bit
        (0..self.hash_count).all(|i| {
            let idx = self.bit_index(bytes, i);
            self.bits[idx / WORD_BITS] & (1u64 << (idx % WORD_BITS)) != 0
        })
    }

    /// Return bit position probed by the `i`-th hash function
    #[inline]
    fn bit_index(&self, bytes: &[u8], i: u32) -> usize {
        (self.family.hash(bytes, i) % self.size as u64) as usize
    }

    /// Return number of bits in the filter
    pub fn size(&self) -> usize {
        self.size
    }

    /// Return number of hash functions
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn hash_family(&self) -> &F {
        &self.family
    }

    /// Return number of bits set to 1
    pub fn bits_set(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Return whether no item was inserted yet
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// False positive rate implied by the current fill ratio, `(bits_set / size)^K`
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let fill_ratio = self.bits_set() as f64 / self.size as f64;
        fill_ratio.powf(f64::from(self.hash_count))
    }

    /// Number of distinct inserted items implied by the fill ratio.
    ///
    /// Returns infinity once every bit is set.
    pub fn estimated_count(&self) -> f64 {
        let bits_set = self.bits_set() as f64;
        let m = self.size as f64;
        let k = f64::from(self.hash_count);

        if bits_set >= m {
            return f64::INFINITY;
        }

        -(m / k) * (1.0 - bits_set / m).ln()
    }

    /// Return memory size of the filter in bytes
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.bits.as_slice())
    }
}

impl<F: HashFamily> Debug for MembershipFilter<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ size: {}, hash_count: {}, bits_set: {} }}",
            self.size,
            self.hash_count,
            self.bits_set()
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::error::SketchError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    /// Family probing position `i * stride + offset` for every item
    #[derive(Clone, PartialEq, Eq)]
    struct StrideFamily {
        stride: u64,
        offset: u64,
    }

    impl HashFamily for StrideFamily {
        fn hash(&self, _bytes: &[u8], index: u32) -> u64 {
            u64::from(index) * self.stride + self.offset
        }
    }

    #[test_case(1000, 3 => "{ size: 1000, hash_count: 3, bits_set: 0 }")]
    #[test_case(1, 1 => "{ size: 1, hash_count: 1, bits_set: 0 }")]
    #[test_case(0, 3 => "invalid configuration: size must be positive")]
    #[test_case(1000, 0 => "invalid configuration: hash_count must be positive")]
    fn test_new(size: usize, hash_count: u32) -> String {
        match MembershipFilter::new(size, hash_count) {
            Ok(filter) => format!("{:?}", filter),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn test_insert() {
        let mut filter = MembershipFilter::new(1000, 3).unwrap();
        assert!(filter.is_empty());

        for password in ["password123", "admin123", "qwerty123"] {
            filter.insert(password).unwrap();
        }

        assert!(!filter.is_empty());
        assert!(filter.contains("password123").unwrap());
        assert!(filter.contains("admin123").unwrap());
        assert!(filter.contains("qwerty123").unwrap());
        assert!(!filter.contains("guest").unwrap());
        assert!(filter.bits_set() >= 1 && filter.bits_set() <= 9);
    }

    #[test]
    fn test_probe_positions() {
        let family = StrideFamily {
            stride: 100,
            offset: 1005,
        };
        let mut filter = MembershipFilter::with_hash_family(1000, 3, family).unwrap();
        filter.insert_bytes(b"anything");

        // positions 1005, 1105 and 1205 wrap to 5, 105 and 205
        assert_eq!(filter.bits_set(), 3);
        assert_eq!(filter.bits[0], 1 << 5);
        assert_eq!(filter.bits[105 / 64], 1 << (105 % 64));
        assert_eq!(filter.bits[205 / 64], 1 << (205 % 64));
        assert!(filter.contains_bytes(b"something else"));
    }

    #[test]
    fn test_single_bit_filter() {
        let mut filter = MembershipFilter::new(1, 4).unwrap();
        assert!(!filter.contains("a").unwrap());
        filter.insert("a").unwrap();
        assert_eq!(filter.bits_set(), 1);
        // the only bit is set, so everything looks present
        assert!(filter.contains("b").unwrap());
        assert_eq!(filter.estimated_count(), f64::INFINITY);
    }

    #[test]
    fn test_no_false_negatives() {
        let mut rng = StdRng::seed_from_u64(12345);
        let items: Vec<u64> = (0..10_000).map(|_| rng.gen()).collect();

        let mut filter = MembershipFilter::new(20_000, 4).unwrap();
        for (n, item) in items.iter().enumerate() {
            filter.insert(item).unwrap();
            // earlier items must survive every later insert
            if n % 1000 == 0 {
                for earlier in &items[..=n] {
                    assert!(filter.contains(earlier).unwrap(), "missing {}", earlier);
                }
            }
        }
        for item in &items {
            assert!(filter.contains(item).unwrap(), "missing {}", item);
        }
    }

    #[test]
    fn test_false_positive_rate() {
        let config = FilterConfig::for_capacity(1000, 0.01).unwrap();
        let mut filter = MembershipFilter::from_config(&config).unwrap();

        for i in 0..1000 {
            filter.insert(&format!("item_{}", i)).unwrap();
        }

        let false_positives = (0..10_000)
            .filter(|i| filter.contains(&format!("other_{}", i)).unwrap())
            .count();

        let fp_rate = false_positives as f64 / 10_000.0;
        assert!(fp_rate < 0.03, "FP rate too high: {}", fp_rate);
        assert!(filter.estimated_false_positive_rate() < 0.03);
    }

    #[test]
    fn test_false_positive_rate_grows_with_load() {
        let mut filter = MembershipFilter::new(10_000, 3).unwrap();
        let held_out: Vec<String> = (0..10_000).map(|i| format!("held_out_{}", i)).collect();

        let mut previous = 0;
        let mut inserted = 0;
        for target in [100, 1000, 5000, 20_000] {
            while inserted < target {
                filter.insert(&format!("item_{}", inserted)).unwrap();
                inserted += 1;
            }
            let false_positives = held_out
                .iter()
                .filter(|item| filter.contains(item.as_str()).unwrap())
                .count();
            assert!(
                false_positives >= previous,
                "{} items: {} < {}",
                target,
                false_positives,
                previous
            );
            previous = false_positives;
        }
        // 20k items in 10k bits leaves the filter close to saturated
        assert!(previous > 5000, "only {} false positives", previous);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut once = MembershipFilter::new(1000, 3).unwrap();
        once.insert("password123").unwrap();

        let mut twice = once.clone();
        twice.insert("password123").unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_invalid_input_leaves_filter_untouched() {
        let mut filter = MembershipFilter::new(1000, 3).unwrap();
        filter.insert("admin123").unwrap();
        let before = filter.clone();

        let missing: Option<&str> = None;
        assert!(matches!(
            filter.insert(&missing),
            Err(SketchError::InvalidInput(_))
        ));
        assert!(matches!(
            filter.contains(&f64::NAN),
            Err(SketchError::InvalidInput(_))
        ));
        assert_eq!(filter, before);
    }

    #[test]
    fn test_typed_and_raw_items_agree() {
        let mut filter = MembershipFilter::new(1000, 3).unwrap();
        filter.insert("qwerty123").unwrap();
        filter.insert_bytes(b"raw");

        assert!(filter.contains_bytes(b"qwerty123"));
        assert!(filter.contains("raw").unwrap());
        assert!(filter.contains(&Some("raw")).unwrap());
    }

    #[test]
    fn test_seed_changes_layout() {
        let mut a = MembershipFilter::from_config(&FilterConfig::default()).unwrap();
        let mut b =
            MembershipFilter::from_config(&FilterConfig::default().with_seed(7)).unwrap();
        for i in 0..50 {
            a.insert(&i).unwrap();
            b.insert(&i).unwrap();
        }
        assert_eq!(b.hash_family().seed(), 7);
        assert_ne!(a.bits, b.bits);
    }

    #[test]
    fn test_estimated_count() {
        let mut filter = MembershipFilter::new(10_000, 3).unwrap();
        for i in 0..500 {
            filter.insert(&format!("item_{}", i)).unwrap();
        }

        let estimated = filter.estimated_count();
        assert!(
            estimated > 400.0 && estimated < 600.0,
            "Estimate: {}",
            estimated
        );
    }

    #[test]
    fn test_size_of() {
        let filter = MembershipFilter::new(1000, 3).unwrap();
        // 1000 bits round up to 16 words
        assert_eq!(
            filter.size_of(),
            size_of::<MembershipFilter>() + 16 * size_of::<u64>()
        );
    }
}
