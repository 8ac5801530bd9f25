//! Run configuration
//!
//! [`Settings`] is the user-facing description of a run, loadable from JSON
//! and overridable from the command line. [`EphemerisRequest`] is the
//! validated form the driver consumes: mode and output format decoded, the
//! object list resolved to bodies and the observer site prepared.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::bodies::{self, Body};
use crate::coordinates::topocentric::Observer;
use crate::errors::{io_err, EphemError, Result};

/// Where positions come from for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EphemerisMode {
    /// Chebyshev coefficients from the ephemeris file
    Tabulated,
    /// Kepler orbits from mean elements
    OrbitalElements,
}

impl EphemerisMode {
    /// Decode the `use_orbital_elements` flag
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(EphemerisMode::Tabulated),
            1 => Ok(EphemerisMode::OrbitalElements),
            other => Err(EphemError::InvalidSettings(format!(
                "use_orbital_elements must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

/// Which fields are written for each record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// x y z on ecliptic axes
    EclipticXyz,
    /// x y z on equatorial axes
    Xyz,
    /// RA and Dec only
    RaDec,
    /// x y z, RA, Dec, magnitude, phase, angular size
    Photometry,
    /// Everything
    Full,
}

impl OutputFormat {
    /// Decode a numeric format code in −1..=3
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            -1 => Ok(OutputFormat::EclipticXyz),
            0 => Ok(OutputFormat::Xyz),
            1 => Ok(OutputFormat::RaDec),
            2 => Ok(OutputFormat::Photometry),
            3 => Ok(OutputFormat::Full),
            other => Err(EphemError::InvalidSettings(format!(
                "output_format must be in -1..=3, got {}",
                other
            ))),
        }
    }

    /// Numeric format code
    pub fn code(self) -> i32 {
        match self {
            OutputFormat::EclipticXyz => -1,
            OutputFormat::Xyz => 0,
            OutputFormat::RaDec => 1,
            OutputFormat::Photometry => 2,
            OutputFormat::Full => 3,
        }
    }

    /// x, y, z are rotated onto ecliptic axes
    pub fn ecliptic_axes(self) -> bool {
        self.code() < 0
    }

    /// Emits the x y z group
    pub fn has_xyz(self) -> bool {
        self != OutputFormat::RaDec
    }

    /// Emits the RA Dec group
    pub fn has_ra_dec(self) -> bool {
        self.code() >= 1
    }

    /// Emits magnitude, phase and angular size
    pub fn has_photometry(self) -> bool {
        self.code() >= 2
    }

    /// Emits the remaining nine geometry fields
    pub fn has_geometry(self) -> bool {
        self.code() >= 3
    }
}

/// User-facing run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// First sample, Julian date (TT)
    pub jd_min: f64,
    /// End of the sampled range (exclusive)
    pub jd_max: f64,
    /// Days between samples
    pub jd_step: f64,
    /// Epoch RA and Dec are referred to
    pub ra_dec_epoch: f64,
    /// Correct RA/Dec for the observer's position on the Earth
    pub enable_topocentric_correction: bool,
    /// Observer latitude, degrees north
    pub latitude: f64,
    /// Observer longitude, degrees east
    pub longitude: f64,
    /// 0 for the tabulated ephemeris, 1 for orbital elements
    pub use_orbital_elements: u8,
    /// Output format code, −1..=3
    pub output_format: i32,
    /// Write raw doubles instead of text
    pub output_binary: bool,
    /// Comma or whitespace separated body names
    pub objects: String,
    /// Binary ephemeris file
    pub ephemeris_path: PathBuf,
    /// JSON file with additional orbital-element bodies
    pub custom_bodies: Option<PathBuf>,
    /// Worker threads; the global pool when unset
    pub threads: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jd_min: 2_451_544.5,
            jd_max: 2_451_575.5,
            jd_step: 1.0,
            ra_dec_epoch: 2_451_545.0,
            enable_topocentric_correction: false,
            latitude: 52.2,
            longitude: 0.0,
            use_orbital_elements: 0,
            output_format: 0,
            output_binary: false,
            objects: "jupiter".to_string(),
            ephemeris_path: PathBuf::from("data/DE430.bin"),
            custom_bodies: None,
            threads: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; absent keys take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_json::from_str(&text).map_err(|source| EphemError::ConfigError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check the settings can describe a run
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EphemError::InvalidSettings(msg));

        if !(self.jd_min.is_finite() && self.jd_max.is_finite()) {
            return invalid(format!(
                "time range {}..{} is not finite",
                self.jd_min, self.jd_max
            ));
        }
        if self.jd_max <= self.jd_min {
            return invalid(format!(
                "empty time range {}..{}",
                self.jd_min, self.jd_max
            ));
        }
        if !(self.jd_step.is_finite() && self.jd_step > 0.0) {
            return invalid(format!("time step {} must be positive", self.jd_step));
        }
        if !self.ra_dec_epoch.is_finite() {
            return invalid(format!("RA/Dec epoch {} is not finite", self.ra_dec_epoch));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return invalid(format!("latitude {} outside [-90, 90]", self.latitude));
        }
        if !self.longitude.is_finite() {
            return invalid(format!("longitude {} is not finite", self.longitude));
        }
        if self.threads == Some(0) {
            return invalid("thread count must be at least 1".to_string());
        }
        OutputFormat::from_code(self.output_format)?;
        EphemerisMode::from_code(self.use_orbital_elements)?;
        Ok(())
    }

    /// Number of samples: ceil((jd_max − jd_min) / jd_step)
    pub fn step_count(&self) -> usize {
        ((self.jd_max - self.jd_min) / self.jd_step).ceil() as usize
    }

    /// Julian date of sample `i`
    pub fn sample_jd(&self, i: usize) -> f64 {
        self.jd_min + i as f64 * self.jd_step
    }
}

/// A validated run, ready for the driver
#[derive(Debug, Clone)]
pub struct EphemerisRequest {
    /// The settings the request was built from
    pub settings: Settings,
    /// Position source for every body
    pub mode: EphemerisMode,
    /// Fields to compute and write
    pub format: OutputFormat,
    /// Bodies in output order
    pub bodies: Vec<Body>,
    /// Observer site when the topocentric correction is on
    pub observer: Option<Observer>,
}

impl EphemerisRequest {
    /// Validate settings, load custom bodies and resolve the object list
    pub fn from_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let mode = EphemerisMode::from_code(settings.use_orbital_elements)?;
        let format = OutputFormat::from_code(settings.output_format)?;

        let custom = match &settings.custom_bodies {
            Some(path) => bodies::load_custom_bodies(path)?,
            None => Vec::new(),
        };
        let bodies = bodies::resolve_object_list(&settings.objects, mode, &custom)?;

        let observer = settings
            .enable_topocentric_correction
            .then(|| Observer::new(settings.latitude, settings.longitude));

        debug!(
            "Request: {} bodies, {} steps, mode {:?}, format {:?}",
            bodies.len(),
            settings.step_count(),
            mode,
            format
        );

        Ok(Self {
            settings,
            mode,
            format,
            bodies,
            observer,
        })
    }

    /// Build a request for already resolved bodies
    pub fn with_bodies(settings: Settings, bodies: Vec<Body>) -> Result<Self> {
        settings.validate()?;
        if bodies.is_empty() {
            return Err(EphemError::InvalidSettings("no objects requested".to_string()));
        }
        let observer = settings
            .enable_topocentric_correction
            .then(|| Observer::new(settings.latitude, settings.longitude));
        Ok(Self {
            mode: EphemerisMode::from_code(settings.use_orbital_elements)?,
            format: OutputFormat::from_code(settings.output_format)?,
            settings,
            bodies,
            observer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.step_count(), 31);
        assert_eq!(settings.objects, "jupiter");
        assert_eq!(settings.latitude, 52.2);
    }

    #[test]
    fn test_step_count() {
        let settings = Settings {
            jd_min: 2_451_545.0,
            jd_max: 2_451_555.0,
            jd_step: 1.0,
            ..Default::default()
        };
        assert_eq!(settings.step_count(), 10);
        assert_eq!(settings.sample_jd(0), 2_451_545.0);
        assert_eq!(settings.sample_jd(9), 2_451_554.0);

        let partial = Settings {
            jd_step: 3.0,
            ..settings
        };
        assert_eq!(partial.step_count(), 4);
    }

    #[rstest]
    #[case(Settings { jd_max: 2_451_544.5, ..Default::default() })]
    #[case(Settings { jd_min: f64::NAN, ..Default::default() })]
    #[case(Settings { jd_step: 0.0, ..Default::default() })]
    #[case(Settings { jd_step: -1.0, ..Default::default() })]
    #[case(Settings { output_format: 4, ..Default::default() })]
    #[case(Settings { output_format: -2, ..Default::default() })]
    #[case(Settings { use_orbital_elements: 2, ..Default::default() })]
    #[case(Settings { latitude: 91.0, ..Default::default() })]
    #[case(Settings { threads: Some(0), ..Default::default() })]
    fn test_invalid_settings(#[case] settings: Settings) {
        assert!(matches!(
            settings.validate(),
            Err(EphemError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_format_groups() {
        let f = OutputFormat::from_code(-1).unwrap();
        assert!(f.ecliptic_axes() && f.has_xyz() && !f.has_ra_dec());

        let f = OutputFormat::RaDec;
        assert!(!f.has_xyz() && f.has_ra_dec() && !f.has_photometry());

        let f = OutputFormat::Photometry;
        assert!(f.has_xyz() && f.has_ra_dec() && f.has_photometry() && !f.has_geometry());

        assert!(OutputFormat::Full.has_geometry());
        assert!(!OutputFormat::Full.ecliptic_axes());
    }

    #[test]
    fn test_json_with_partial_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "objects": "mars, venus", "output_format": 3, "enable_topocentric_correction": true }}"#
        )
        .unwrap();

        let settings = Settings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.objects, "mars, venus");
        assert_eq!(settings.output_format, 3);
        assert_eq!(settings.jd_step, 1.0);

        let request = EphemerisRequest::from_settings(settings).unwrap();
        assert_eq!(request.bodies.len(), 2);
        assert_eq!(request.format, OutputFormat::Full);
        assert!(request.observer.is_some());
    }

    #[test]
    fn test_json_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "jd_min": "yesterday" }}"#).unwrap();
        assert!(matches!(
            Settings::from_json_file(file.path()),
            Err(EphemError::ConfigError { .. })
        ));
        assert!(matches!(
            Settings::from_json_file("/nonexistent/settings.json"),
            Err(EphemError::FileError { .. })
        ));
    }
}
