//! Output records and writers
//!
//! Every (time step, body) pair produces one [`OutputRecord`] of 17 fields.
//! [`RecordWriter`] emits the field groups selected by the output format,
//! either as fixed-width text with a leading Julian date column or as raw
//! little-endian doubles with no date column.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::driver::{EphemerisSink, StepResult};
use crate::errors::Result;
use crate::settings::OutputFormat;

/// Number of fields in a record
pub const N_FIELDS: usize = 17;

/// Field positions within a record
pub mod field {
    pub const X: usize = 0;
    pub const Y: usize = 1;
    pub const Z: usize = 2;
    pub const RA: usize = 3;
    pub const DEC: usize = 4;
    pub const MAGNITUDE: usize = 5;
    pub const PHASE: usize = 6;
    pub const ANGULAR_SIZE: usize = 7;
    pub const PHYSICAL_SIZE: usize = 8;
    pub const ALBEDO: usize = 9;
    pub const SUN_DISTANCE: usize = 10;
    pub const EARTH_DISTANCE: usize = 11;
    pub const ELONGATION: usize = 12;
    pub const EARTH_SUN_ANGLE: usize = 13;
    pub const ECLIPTIC_LONGITUDE: usize = 14;
    pub const ECLIPTIC_DISTANCE: usize = 15;
    pub const ECLIPTIC_LATITUDE: usize = 16;
}

/// The computed quantities for one body at one time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputRecord(pub [f64; N_FIELDS]);

impl Default for OutputRecord {
    fn default() -> Self {
        OutputRecord([0.0; N_FIELDS])
    }
}

impl OutputRecord {
    /// A record marking a failed sample
    pub fn nan() -> Self {
        OutputRecord([f64::NAN; N_FIELDS])
    }

    /// Copy a record out of a buffer slot
    pub fn from_slice(slot: &[f64]) -> Self {
        let mut fields = [0.0; N_FIELDS];
        fields.copy_from_slice(slot);
        OutputRecord(fields)
    }

    /// Whether this record marks a failed sample
    pub fn is_nan(&self) -> bool {
        self.0.iter().all(|v| v.is_nan())
    }

    /// Raw fields
    pub fn fields(&self) -> &[f64; N_FIELDS] {
        &self.0
    }

    /// Position in AU
    pub fn xyz(&self) -> [f64; 3] {
        [self.0[field::X], self.0[field::Y], self.0[field::Z]]
    }

    /// Right ascension, radians
    pub fn ra(&self) -> f64 {
        self.0[field::RA]
    }

    /// Declination, radians
    pub fn dec(&self) -> f64 {
        self.0[field::DEC]
    }

    pub fn magnitude(&self) -> f64 {
        self.0[field::MAGNITUDE]
    }

    /// Illuminated fraction
    pub fn phase(&self) -> f64 {
        self.0[field::PHASE]
    }

    /// Apparent diameter, arcseconds
    pub fn angular_size(&self) -> f64 {
        self.0[field::ANGULAR_SIZE]
    }

    /// Physical diameter, metres
    pub fn physical_size(&self) -> f64 {
        self.0[field::PHYSICAL_SIZE]
    }

    pub fn albedo(&self) -> f64 {
        self.0[field::ALBEDO]
    }

    /// Distance from the Sun, AU
    pub fn sun_distance(&self) -> f64 {
        self.0[field::SUN_DISTANCE]
    }

    /// Distance from the Earth, AU
    pub fn earth_distance(&self) -> f64 {
        self.0[field::EARTH_DISTANCE]
    }

    /// Sun-Earth-body angle, radians
    pub fn elongation(&self) -> f64 {
        self.0[field::ELONGATION]
    }

    /// Earth-Sun-body angle, radians
    pub fn earth_sun_angle(&self) -> f64 {
        self.0[field::EARTH_SUN_ANGLE]
    }

    /// Geocentric ecliptic longitude of date, radians
    pub fn ecliptic_longitude(&self) -> f64 {
        self.0[field::ECLIPTIC_LONGITUDE]
    }

    /// Geocentric distance used for the ecliptic position, AU
    pub fn ecliptic_distance(&self) -> f64 {
        self.0[field::ECLIPTIC_DISTANCE]
    }

    /// Geocentric ecliptic latitude of date, radians
    pub fn ecliptic_latitude(&self) -> f64 {
        self.0[field::ECLIPTIC_LATITUDE]
    }
}

/// Format like C's `%W.Pe`: the exponent carries a sign and at least two digits
fn format_exp(value: f64, width: usize, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, value);
    let text = match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        // NaN and infinities have no exponent
        None => formatted,
    };
    format!("{:>width$}", text, width = width)
}

/// Append one record's text columns for the given format
pub fn format_text(line: &mut String, record: &OutputRecord, format: OutputFormat) {
    let f = &record.0;
    if format.has_xyz() {
        line.push_str(&format!("{:12.9} {:12.9} {:12.9}   ", f[0], f[1], f[2]));
    }
    if format.has_ra_dec() {
        line.push_str(&format!("{:12.9} {:12.9}   ", f[3], f[4]));
    }
    if format.has_photometry() {
        line.push_str(&format!("{:6.3} {:7.4} {:12.9}   ", f[5], f[6], f[7]));
    }
    if format.has_geometry() {
        line.push_str(&format!("{} {:8.5}", format_exp(f[8], 12, 6), f[9]));
        for value in &f[10..N_FIELDS] {
            line.push_str(&format!(" {:12.9}", value));
        }
        line.push_str("  ");
    }
}

/// Write one record's binary groups for the given format
pub fn write_binary<W: Write>(out: &mut W, record: &OutputRecord, format: OutputFormat) -> std::io::Result<()> {
    let groups = [
        (format.has_xyz(), 0..3),
        (format.has_ra_dec(), 3..5),
        (format.has_photometry(), 5..8),
        (format.has_geometry(), 8..N_FIELDS),
    ];
    for (enabled, range) in groups {
        if enabled {
            for value in &record.0[range] {
                out.write_f64::<LittleEndian>(*value)?;
            }
        }
    }
    Ok(())
}

/// Sink writing records as text or binary
pub struct RecordWriter<W: Write> {
    out: W,
    format: OutputFormat,
    binary: bool,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W, format: OutputFormat, binary: bool) -> Self {
        Self { out, format, binary }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EphemerisSink for RecordWriter<W> {
    fn write_step(&mut self, step: StepResult) -> Result<()> {
        if self.binary {
            for record in &step.records {
                write_binary(&mut self.out, record, self.format)?;
            }
        } else {
            let mut line = format!("{:.12}   ", step.jd);
            for record in &step.records {
                format_text(&mut line, record, self.format);
            }
            line.push('\n');
            self.out.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
