//! ephemeris-compute: batch planetary ephemerides
//!
//! Computes positions, apparent coordinates, brightness and viewing geometry
//! of solar system bodies over a range of times, either by interpolating a
//! binary JPL-style ephemeris file or by propagating Keplerian orbital
//! elements.
//!
//! ```no_run
//! use ephemeris_compute::{CollectingSink, EphemerisDriver, EphemerisRequest, Settings};
//!
//! let settings = Settings {
//!     objects: "mars,jupiter".to_string(),
//!     use_orbital_elements: 1,
//!     output_format: 1,
//!     ..Default::default()
//! };
//! let request = EphemerisRequest::from_settings(settings)?;
//! let mut driver = EphemerisDriver::new(request)?;
//! let mut sink = CollectingSink::default();
//! driver.run(&mut sink)?;
//! # Ok::<(), ephemeris_compute::EphemError>(())
//! ```

pub mod bodies;
pub mod constants;
pub mod coordinates;
pub mod driver;
pub mod engine;
pub mod errors;
pub mod jplephem;
pub mod magnitude;
pub mod orbits;
pub mod output;
pub mod settings;

// Re-export commonly used types
pub use bodies::{Body, BodySource};
pub use driver::{CollectingSink, DriverState, EphemerisDriver, EphemerisSink, RunSummary, StepResult};
pub use errors::{EphemError, Result};
pub use jplephem::EphemerisFile;
pub use orbits::OrbitalElements;
pub use output::{OutputRecord, RecordWriter};
pub use settings::{EphemerisMode, EphemerisRequest, OutputFormat, Settings};
