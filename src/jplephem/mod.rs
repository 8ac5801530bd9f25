//! Binary planetary ephemerides
//!
//! A file holds Chebyshev coefficients for up to 32 body table entries over
//! a span of uniform records, in the layout of the JPL DE series. The file is
//! memory-mapped and validated once; afterwards lookups are read-only and
//! may run from any number of threads.
//!
//! # Main Components
//!
//! - `header`: on-disk layout and validation
//! - `store`: [`EphemerisFile`] and coefficient block selection
//! - `chebyshev`: polynomial evaluation and fitting
//! - `names`: body table names and indices
//! - `synthetic`: small generated files for tests and benchmarks
//! - `calendar`: Julian date and calendar conversions

pub mod calendar;
pub mod chebyshev;
pub mod header;
pub mod names;
pub mod store;
pub mod synthetic;


pub use self::header::{BodyLayout, Header};
pub use self::store::{CoefficientBlock, EphemerisFile};
