//! `stream-sketches` answers two approximate questions over an unbounded stream
//! of items without storing the items themselves:
//! - [`MembershipFilter`]: has this exact value been seen before? No false
//!   negatives, tunable false positive rate.
//! - [`CardinalityEstimator`]: how many distinct values have been seen?
//!   HyperLogLog with linear counting for small cardinalities.
//!
//! Both hash items through a seeded [`HashFamily`] and accept any value
//! implementing [`StableBytes`].
//!
//! ```
//! use stream_sketches::{check_uniqueness, CardinalityEstimator, MembershipFilter};
//!
//! let mut filter = MembershipFilter::new(1000, 3)?;
//! for password in ["password123", "admin123", "qwerty123"] {
//!     filter.insert(password)?;
//! }
//! assert!(filter.contains("password123")?);
//!
//! let results = check_uniqueness(&mut filter, ["admin123", "newpassword"])?;
//! assert_eq!(results[0].1.to_string(), "already used");
//! assert_eq!(results[1].1.to_string(), "unique");
//!
//! let mut estimator = CardinalityEstimator::new(14)?;
//! for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.1"] {
//!     estimator.insert(ip)?;
//! }
//! assert!((estimator.estimate() - 2.0).abs() < 0.5);
//! # Ok::<(), stream_sketches::SketchError>(())
//! ```
pub mod config;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod hash;
pub mod sketch;
pub mod uniqueness;

pub use config::{EstimatorConfig, FilterConfig};
pub use error::{Result, SketchError};
pub use estimator::CardinalityEstimator;
pub use filter::MembershipFilter;
pub use hash::{HashFamily, StableBytes, WyHashFamily};
pub use sketch::{feed, FeedSummary, Sketch, SketchTrait};
pub use uniqueness::{check_and_insert, check_uniqueness, Uniqueness};
