//! Error types for ephemeris computation
//!
//! Every fallible routine in the crate returns [`EphemError`]. The driver uses
//! [`EphemError::is_fatal`] to decide whether a failure aborts the run or only
//! degrades the record of a single body at a single time step.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ephemeris computation
#[derive(Error, Debug)]
pub enum EphemError {
    /// Error when a file I/O operation fails
    #[error("File I/O error on {path:?}: {source}")]
    FileError {
        /// The path of the file that caused the error
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The ephemeris file header or layout is inconsistent
    #[error("Corrupt ephemeris file: {0}")]
    CorruptFile(String),

    /// Error when a date is outside the range covered by the ephemeris
    #[error("Date {jd} is outside ephemeris range ({start_jd}..{end_jd})")]
    OutOfRange {
        /// The Julian date that was requested
        jd: f64,
        /// The start of the ephemeris range
        start_jd: f64,
        /// The end of the ephemeris range (exclusive)
        end_jd: f64,
    },

    /// The requested body is not available in the selected mode
    #[error("Unknown body: {0}")]
    UnknownBody(String),

    /// Newton-Raphson iteration on Kepler's equation did not settle
    #[error("Kepler's equation did not converge after {iterations} iterations (M={mean_anomaly}, e={eccentricity}, last step {last_step:e})")]
    KeplerNonConvergent {
        /// Mean anomaly being solved for, radians
        mean_anomaly: f64,
        /// Orbital eccentricity
        eccentricity: f64,
        /// Iterations performed
        iterations: usize,
        /// Size of the final correction, radians
        last_step: f64,
    },

    /// Orbital elements outside the elliptical domain
    #[error("Invalid orbital elements: {0}")]
    InvalidElements(String),

    /// Run settings that cannot describe a valid ephemeris
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Error while writing output records
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// Error while parsing JSON configuration
    #[error("Configuration error in {path:?}: {source}")]
    ConfigError {
        /// The configuration file
        path: PathBuf,
        /// The underlying parse error
        source: serde_json::Error,
    },
}

impl EphemError {
    /// Whether this error must abort the whole run
    ///
    /// Out-of-range samples and Kepler non-convergence only affect one body at
    /// one time step; everything else means the run cannot produce output.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            EphemError::OutOfRange { .. } | EphemError::KeplerNonConvergent { .. }
        )
    }
}

/// Extension of the Result type for ephemeris operations
pub type Result<T> = std::result::Result<T, EphemError>;

/// Helper function to convert a std::io::Error to EphemError
pub fn io_err(path: impl Into<PathBuf>, err: std::io::Error) -> EphemError {
    EphemError::FileError {
        path: path.into(),
        source: err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let out_of_range = EphemError::OutOfRange {
            jd: 1.0,
            start_jd: 2.0,
            end_jd: 3.0,
        };
        assert!(!out_of_range.is_fatal());

        let kepler = EphemError::KeplerNonConvergent {
            mean_anomaly: 0.1,
            eccentricity: 0.99,
            iterations: 50,
            last_step: 1e-3,
        };
        assert!(!kepler.is_fatal());

        assert!(EphemError::CorruptFile("bad magic".into()).is_fatal());
        assert!(EphemError::UnknownBody("vulcan".into()).is_fatal());
        assert!(io_err("/nonexistent", std::io::Error::from(std::io::ErrorKind::NotFound)).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = EphemError::OutOfRange {
            jd: 2500000.0,
            start_jd: 2287184.5,
            end_jd: 2688976.5,
        };
        assert_eq!(
            err.to_string(),
            "Date 2500000 is outside ephemeris range (2287184.5..2688976.5)"
        );
    }
}
