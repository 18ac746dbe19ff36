//! Construction-time configuration for both sketches.
//!
//! Configuration is fixed once a sketch is built; there is no runtime
//! reconfiguration. With the `with_serde` feature both structs can be loaded
//! from any serde format, with missing fields falling back to their defaults.

use std::f64::consts::LN_2;

use tracing::debug;

use crate::error::{Result, SketchError};
use crate::hash::DEFAULT_SEED;

/// Smallest supported estimator precision (16 registers).
pub const MIN_PRECISION: u8 = 4;
/// Largest supported estimator precision (262144 registers).
pub const MAX_PRECISION: u8 = 18;

/// Upper clamp for the derived number of filter hash functions.
const MAX_DERIVED_HASH_COUNT: u32 = 32;

/// Largest filter size in bits that `for_capacity` will derive.
const MAX_DERIVED_SIZE: f64 = isize::MAX as f64;

/// Parameters of a [`MembershipFilter`](crate::filter::MembershipFilter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(default))]
pub struct FilterConfig {
    /// Number of bits in the filter.
    pub size: usize,
    /// Number of hash functions (`K`).
    pub hash_count: u32,
    /// Seed of the hash family.
    pub seed: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            hash_count: 3,
            seed: DEFAULT_SEED,
        }
    }
}

impl FilterConfig {
    /// Size a filter for `expected_items` insertions at the target false positive rate.
    ///
    /// Uses the standard optimum `m = -n ln p / ln²2` and `k = (m / n) ln 2`,
    /// with `k` clamped to `[1, 32]`.
    pub fn for_capacity(expected_items: usize, false_positive_rate: f64) -> Result<Self> {
        if expected_items == 0 {
            return Err(SketchError::InvalidConfiguration(
                "expected_items must be positive".to_string(),
            ));
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(SketchError::InvalidConfiguration(format!(
                "false_positive_rate must be in (0, 1), got {}",
                false_positive_rate
            )));
        }

        let n = expected_items as f64;
        let bits = (-n * false_positive_rate.ln() / (LN_2 * LN_2)).ceil();
        if !bits.is_finite() || bits > MAX_DERIVED_SIZE {
            return Err(SketchError::InvalidConfiguration(format!(
                "{} items at false_positive_rate {} need more than {} bits",
                expected_items, false_positive_rate, MAX_DERIVED_SIZE
            )));
        }
        let size = bits as usize;
        let hash_count = ((size as f64 / n) * LN_2).round() as u32;

        let config = Self {
            size: size.max(1),
            hash_count: hash_count.clamp(1, MAX_DERIVED_HASH_COUNT),
            seed: DEFAULT_SEED,
        };
        debug!(
            expected_items,
            false_positive_rate,
            size = config.size,
            hash_count = config.hash_count,
            "sized membership filter"
        );
        Ok(config)
    }

    /// Replace the hash family seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that the filter has at least one bit and one hash function
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(SketchError::InvalidConfiguration(
                "size must be positive".to_string(),
            ));
        }
        if self.hash_count == 0 {
            return Err(SketchError::InvalidConfiguration(
                "hash_count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of a [`CardinalityEstimator`](crate::estimator::CardinalityEstimator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with_serde", serde(default))]
pub struct EstimatorConfig {
    /// Number of bucket-index bits `p`; the estimator keeps `2^p` registers.
    pub precision: u8,
    /// Seed of the hash family.
    pub seed: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            precision: 14,
            seed: DEFAULT_SEED,
        }
    }
}

impl EstimatorConfig {
    /// Pick the smallest precision whose standard error `1.04 / sqrt(2^p)` does not
    /// exceed `relative_error`, clamped to the supported range.
    pub fn for_relative_error(relative_error: f64) -> Result<Self> {
        if !(relative_error > 0.0 && relative_error < 1.0) {
            return Err(SketchError::InvalidConfiguration(format!(
                "relative_error must be in (0, 1), got {}",
                relative_error
            )));
        }

        let m = (1.04 / relative_error).powi(2);
        let precision = m
            .log2()
            .ceil()
            .clamp(f64::from(MIN_PRECISION), f64::from(MAX_PRECISION));

        Ok(Self {
            precision: precision as u8,
            seed: DEFAULT_SEED,
        })
    }

    /// Replace the hash family seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that the precision is within [4..18]
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&self.precision) {
            return Err(SketchError::InvalidConfiguration(format!(
                "precision must be in [{}..{}], got {}",
                MIN_PRECISION, MAX_PRECISION, self.precision
            )));
        }
        Ok(())
    }
}
