//! Hash family shared by the membership filter and the cardinality estimator.
//!
//! A [`HashFamily`] maps an item's byte representation plus a family index to a
//! 64-bit value. Different indices for the same bytes behave as independent hash
//! functions, which is what the filter needs for its `K` probe positions.
//!
//! Items reach the family through [`StableBytes`], the contract that turns a value
//! into bytes whose identity does not change between calls. Values that have no
//! such form (a missing `Option`, a `NaN`) are rejected with
//! [`SketchError::InvalidInput`] before any sketch state is touched.

use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{Result, SketchError};

/// Seed used by [`WyHashFamily::default`].
pub const DEFAULT_SEED: u64 = 0;

/// Golden-ratio increment spreading family indices over the seed space.
const INDEX_SEED_STEP: u64 = 0x9e37_79b9_7f4a_7c15;

/// Family of hash functions indexed by `index`.
///
/// Implementations must be pure: the same `(bytes, index)` pair always yields the
/// same value for a given family instance. Values produced by differently seeded
/// families are not comparable and must not be persisted.
pub trait HashFamily {
    fn hash(&self, bytes: &[u8], index: u32) -> u64;
}

/// [`HashFamily`] backed by wyhash, with one derived seed per family index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WyHashFamily {
    seed: u64,
}

impl WyHashFamily {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    fn index_seed(&self, index: u32) -> u64 {
        self.seed
            .wrapping_add(u64::from(index).wrapping_mul(INDEX_SEED_STEP))
    }
}

impl Default for WyHashFamily {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl HashFamily for WyHashFamily {
    #[inline]
    fn hash(&self, bytes: &[u8], index: u32) -> u64 {
        wyhash::wyhash(bytes, self.index_seed(index))
    }
}

/// Conversion of an item into the bytes that define its identity in a sketch.
///
/// Two values are the same item exactly when their stable bytes are equal, so
/// `'a'` and `"a"`, or an [`IpAddr`] and its textual form, are counted once.
pub trait StableBytes {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>>;
}

impl StableBytes for [u8] {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self))
    }
}

impl<const N: usize> StableBytes for [u8; N] {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self.as_slice()))
    }
}

impl StableBytes for Vec<u8> {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self.as_slice()))
    }
}

impl StableBytes for str {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self.as_bytes()))
    }
}

impl StableBytes for String {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self.as_bytes()))
    }
}

impl StableBytes for char {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        let mut buf = [0u8; 4];
        Ok(Cow::Owned(self.encode_utf8(&mut buf).as_bytes().to_vec()))
    }
}

impl StableBytes for bool {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Owned(vec![u8::from(*self)]))
    }
}

macro_rules! impl_stable_bytes_for_int {
    ($($t:ty),*) => {
        $(
            impl StableBytes for $t {
                fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
                    Ok(Cow::Owned(self.to_le_bytes().to_vec()))
                }
            }
        )*
    };
}

impl_stable_bytes_for_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

// Pointer-sized integers are widened so identities match across platforms.
impl StableBytes for usize {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Owned((*self as u64).to_le_bytes().to_vec()))
    }
}

impl StableBytes for isize {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Owned((*self as i64).to_le_bytes().to_vec()))
    }
}

impl StableBytes for f64 {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        if self.is_nan() {
            return Err(SketchError::InvalidInput(
                "NaN has no stable identity".to_string(),
            ));
        }
        // -0.0 == 0.0, so both must map to the same bytes
        let value = if *self == 0.0 { 0.0f64 } else { *self };
        Ok(Cow::Owned(value.to_le_bytes().to_vec()))
    }
}

impl StableBytes for f32 {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        let widened = f64::from(*self);
        widened.stable_bytes().map(|bytes| Cow::Owned(bytes.into_owned()))
    }
}

impl StableBytes for Ipv4Addr {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Owned(self.to_string().into_bytes()))
    }
}

impl StableBytes for Ipv6Addr {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Owned(self.to_string().into_bytes()))
    }
}

impl StableBytes for IpAddr {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Owned(self.to_string().into_bytes()))
    }
}

impl<T: StableBytes> StableBytes for Option<T> {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Some(value) => value.stable_bytes(),
            None => Err(SketchError::InvalidInput("missing value".to_string())),
        }
    }
}

impl<T: StableBytes + ?Sized> StableBytes for &T {
    fn stable_bytes(&self) -> Result<Cow<'_, [u8]>> {
        (**self).stable_bytes()
    }
}
