//! Check-then-insert workflow over a [`MembershipFilter`].
//!
//! A candidate that the filter reports as present is only *possibly* used (the
//! filter has false positives), while one it reports as absent is definitely
//! new and gets inserted right away so later candidates see it.
//!
//! The two steps are separate filter operations. Taking the filter by `&mut`
//! makes one call exclusive for its caller; when a filter is shared, the lock
//! guarding it must be held across the whole check and insert, otherwise two
//! callers can both classify the same candidate as [`Uniqueness::Unique`].

use std::fmt::{Display, Formatter};

use tracing::trace;

use crate::error::Result;
use crate::filter::MembershipFilter;
use crate::hash::{HashFamily, StableBytes};

/// Classification of a checked candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniqueness {
    /// The filter reports the candidate as present; it may be a false positive.
    AlreadyUsed,
    /// The candidate was definitely not present and has now been inserted.
    Unique,
}

impl Display for Uniqueness {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Uniqueness::AlreadyUsed => f.write_str("already used"),
            Uniqueness::Unique => f.write_str("unique"),
        }
    }
}

/// Classify one candidate, inserting it when it is new
pub fn check_and_insert<F, T>(
    filter: &mut MembershipFilter<F>,
    candidate: &T,
) -> Result<Uniqueness>
where
    F: HashFamily,
    T: StableBytes + ?Sized,
{
    let bytes = candidate.stable_bytes()?;
    let status = if filter.contains_bytes(&bytes) {
        Uniqueness::AlreadyUsed
    } else {
        filter.insert_bytes(&bytes);
        Uniqueness::Unique
    };
    trace!(%status, "checked candidate");
    Ok(status)
}

/// Classify every candidate in order, inserting the new ones as they are found.
///
/// A candidate repeated in the input is `Unique` the first time and
/// `AlreadyUsed` afterwards. The first candidate without a stable byte form
/// aborts the run with `InvalidInput`; candidates before it stay inserted.
pub fn check_uniqueness<F, I>(
    filter: &mut MembershipFilter<F>,
    candidates: I,
) -> Result<Vec<(I::Item, Uniqueness)>>
where
    F: HashFamily,
    I: IntoIterator,
    I::Item: StableBytes,
{
    candidates
        .into_iter()
        .map(|candidate| {
            let status = check_and_insert(&mut *filter, &candidate)?;
            Ok((candidate, status))
        })
        .collect()
}
