//! Cardinality estimator allows to estimate number of distinct elements
//! in the stream and is defined by its precision `p` in [4..18] range, which
//! defines number of hash bits used for HyperLogLog register indices.
//!
//! # Algorithm
//!
//! Every item is hashed once to a 32-bit value `x`:
//! - the low `p` bits `j = x & (m - 1)` select one of `m = 2^p` registers;
//! - the remaining bits `w = x >> p` are ranked by the length of their leading
//!   zero run plus one (an all-zero `w` ranks as the full `32 - p` window);
//! - register `j` keeps the maximum rank ever observed.
//!
//! The estimate is the raw HyperLogLog estimate `alpha * m^2 / Z` with
//! `Z = Σ 2^-register`, replaced by linear counting `m * ln(m / V)` while the raw
//! estimate is at most `5m / 2` and `V` registers are still zero.
//!
//! Expected error: `1.04 / sqrt(2^p)`, e.g. 3.25% for p = 10, 0.81% for p = 14.
//!
//! # Data storage format
//!
//! Registers never exceed `32 - 4 = 28`, so each one is stored in 5 bits packed
//! into a `u32` slice, with one extra element for branchless register updates
//! (see `set_register` for more details). For p = 14 that is 10244 bytes instead
//! of 16 KiB with one byte per register.
//!
//! Number of zero registers and registers' harmonic sum are updated as registers
//! grow, which makes `estimate` a constant time operation. Every term of the sum
//! is a power of two no smaller than `2^-28` and there are at most `2^18` terms,
//! so the running `f64` sum is exact.
//!
//! # Limitations
//! - No large-range correction: estimates approaching `2^32` are not corrected
//!   for hash collisions.
//! - The bias-correction constant uses irregular thresholds, see `alpha`.

use std::fmt::{Debug, Formatter};
use std::mem::{size_of, size_of_val};

use tracing::debug;

use crate::config::EstimatorConfig;
use crate::error::Result;
use crate::hash::{HashFamily, StableBytes, WyHashFamily};

/// Width of the hash value consumed by the estimator
const HASH_BITS: u32 = 32;
/// Number of bits used per register
const REGISTER_WIDTH: usize = 5;
/// Hash family index used for all items
const HASH_INDEX: u32 = 0;
/// Linear counting is used while raw estimate is at most `SMALL_RANGE_FACTOR * m`
const SMALL_RANGE_FACTOR: f64 = 2.5;

/// HyperLogLog estimator with `2^precision` registers.
#[derive(Clone, PartialEq)]
pub struct CardinalityEstimator<F = WyHashFamily> {
    /// Number of bucket-index bits
    precision: u8,
    /// Register ranks packed `REGISTER_WIDTH` bits each, plus one spare element
    registers: Vec<u32>,
    /// Number of registers still set to 0
    zeros: u32,
    /// Harmonic sum of registers, `Σ 2^-register`
    harmonic_sum: f64,
    /// Bias correction constant derived from the register count
    alpha: f64,
    family: F,
}

impl CardinalityEstimator {
    /// Creates new estimator with `2^precision` registers using wyhash
    pub fn new(precision: u8) -> Result<Self> {
        Self::with_hash_family(precision, WyHashFamily::default())
    }

    /// Creates new estimator from `config`
    pub fn from_config(config: &EstimatorConfig) -> Result<Self> {
        Self::with_hash_family(config.precision, WyHashFamily::new(config.seed))
    }
}

impl<F: HashFamily> CardinalityEstimator<F> {
    /// Creates new estimator hashing items with the given `family`
    pub fn with_hash_family(precision: u8, family: F) -> Result<Self> {
        let config = EstimatorConfig {
            precision,
            ..Default::default()
        };
        if let Err(err) = config.validate() {
            debug!(%err, "rejected cardinality estimator configuration");
            return Err(err);
        }

        let m = 1usize << precision;
        let alpha = alpha(precision, m);
        debug!(precision, registers = m, alpha, "created cardinality estimator");

        Ok(Self {
            precision,
            registers: vec![0u32; (m * REGISTER_WIDTH).div_ceil(32) + 1],
            zeros: m as u32,
            harmonic_sum: m as f64,
            alpha,
            family,
        })
    }

    /// Insert an item into the estimator.
    ///
    /// Fails with `InvalidInput` if the item has no stable byte form, in which
    /// case no register is changed.
    #[inline]
    pub fn insert<T: StableBytes + ?Sized>(&mut self, item: &T) -> Result<()> {
        let bytes = item.stable_bytes()?;
        self.insert_bytes(&bytes);
        Ok(())
    }

    /// Insert an item given by its raw bytes
    #[inline]
    pub fn insert_bytes(&mut self, bytes: &[u8]) {
        // only the low 32 bits take part in the estimate
        let hash = self.family.hash(bytes, HASH_INDEX) as u32;
        self.insert_hash(hash);
    }

    /// Insert 32-bit hash into the estimator
    #[inline]
    pub fn insert_hash(&mut self, hash: u32) {
        let idx = hash & (self.num_registers() as u32 - 1);
        let new_rank = rank(hash >> self.precision, self.precision);
        let old_rank = get_register::<REGISTER_WIDTH>(&self.registers, idx);
        if new_rank > old_rank {
            set_register::<REGISTER_WIDTH>(&mut self.registers, idx, new_rank);

            // Update number of zero registers and harmonic sum
            self.zeros -= u32::from(old_rank == 0);
            self.harmonic_sum += harmonic_term(new_rank) - harmonic_term(old_rank);
        }
    }

    /// Return cardinality estimate.
    ///
    /// Pure read of the current registers, so repeated calls without inserts
    /// return the same value.
    #[inline]
    pub fn estimate(&self) -> f64 {
        let m = self.num_registers() as f64;
        let raw = self.alpha * m * m / self.harmonic_sum;
        if raw <= SMALL_RANGE_FACTOR * m && self.zeros > 0 {
            // linear counting over empty registers
            return m * (m / f64::from(self.zeros)).ln();
        }
        raw
    }

    /// Return precision parameter
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Return number of registers (`2^precision`)
    pub fn num_registers(&self) -> usize {
        1 << self.precision
    }

    /// Return number of registers still set to 0
    pub fn zero_registers(&self) -> usize {
        self.zeros as usize
    }

    /// Iterate over register values in bucket order
    pub fn registers(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.num_registers() as u32)
            .map(move |idx| get_register::<REGISTER_WIDTH>(&self.registers, idx))
    }

    /// Relative standard error of the estimate, `1.04 / sqrt(m)`
    pub fn relative_error(&self) -> f64 {
        1.04 / (self.num_registers() as f64).sqrt()
    }

    pub fn hash_family(&self) -> &F {
        &self.family
    }

    /// Return memory size of the estimator in bytes
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.registers.as_slice())
    }
}

impl<F: HashFamily> Debug for CardinalityEstimator<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, zeros: {}, estimate: {:.2} }}",
            self.precision,
            self.zeros,
            self.estimate()
        )
    }
}

/// Parameter for bias correction.
///
/// `0.673` is the textbook constant for 16 registers only, yet here it covers
/// every precision up to 16, and the `precision == 32` arm is unreachable in the
/// supported [4..18] range. Estimates at p <= 16 depend on these thresholds.
#[inline]
fn alpha(precision: u8, m: usize) -> f64 {
    if precision <= 16 {
        0.673
    } else if precision == 32 {
        0.697
    } else {
        0.7213 / (1.0 + 1.079 / (m as f64))
    }
}

/// Rank of the remaining hash bits `w`: leading zeros within the `32 - precision`
/// bit window plus one. All-zero `w` ranks as the full window width.
#[inline]
fn rank(w: u32, precision: u8) -> u32 {
    let precision = u32::from(precision);
    if w == 0 {
        HASH_BITS - precision
    } else {
        w.leading_zeros() - precision + 1
    }
}

/// Register contribution to the harmonic sum, `2^-rank`
#[inline]
fn harmonic_term(rank: u32) -> f64 {
    1.0 / f64::from(1u32 << rank)
}

/// Get HyperLogLog `idx` register
#[inline]
fn get_register<const W: usize>(data: &[u32], idx: u32) -> u32 {
    let bit_idx = (idx as usize) * W;
    let u32_idx = bit_idx / 32;
    let bit_pos = bit_idx % 32;
    let bits = &data[u32_idx..u32_idx + 2];
    let bits_1 = W.min(32 - bit_pos);
    let bits_2 = W - bits_1;
    let mask_1 = (1 << bits_1) - 1;
    let mask_2 = (1 << bits_2) - 1;

    ((bits[0] >> bit_pos) & mask_1) | ((bits[1] & mask_2) << bits_1)
}

/// Set HyperLogLog `idx` register to new value `rank`
#[inline]
fn set_register<const W: usize>(data: &mut [u32], idx: u32, new_rank: u32) {
    let bit_idx = (idx as usize) * W;
    let u32_idx = bit_idx / 32;
    let bit_pos = bit_idx % 32;
    // The spare last element lets a register that ends in the final word
    // still touch `u32_idx + 1`.
    let bits = &mut data[u32_idx..u32_idx + 2];
    let bits_1 = W.min(32 - bit_pos);
    let bits_2 = W - bits_1;
    let mask_1 = (1 << bits_1) - 1;
    let mask_2 = (1 << bits_2) - 1;

    // Unconditionally update two `u32` elements based on `new_rank` bits and masks
    bits[0] &= !(mask_1 << bit_pos);
    bits[0] |= (new_rank & mask_1) << bit_pos;
    bits[1] &= !mask_2;
    bits[1] |= (new_rank >> bits_1) & mask_2;
}
