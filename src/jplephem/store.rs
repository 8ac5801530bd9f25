//! Ephemeris data store
//!
//! [`EphemerisFile`] memory-maps a binary ephemeris, validates its header once,
//! and then answers coefficient lookups without further I/O. Lookups take
//! `&self` only, so one loaded file can be shared by any number of threads.

use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use memmap2::{Mmap, MmapOptions};
use nalgebra::Vector3;

use crate::errors::{io_err, EphemError, Result};
use crate::jplephem::chebyshev;
use crate::jplephem::header::{Header, DOUBLE_SIZE};
use crate::jplephem::names;

/// Backing bytes of a loaded file
enum Storage {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Storage::Mapped(map) => map,
            Storage::Owned(bytes) => bytes,
        }
    }
}

/// An immutable, validated binary ephemeris
pub struct EphemerisFile {
    /// Path the file was loaded from, if any
    path: Option<PathBuf>,
    /// Parsed header
    header: Header,
    /// File contents
    data: Storage,
}

/// One body's Chebyshev coefficients over one sub-interval
///
/// Coefficients are stored axis-major: all x coefficients, then y, then z.
#[derive(Debug, Clone, Copy)]
pub struct CoefficientBlock<'a> {
    body_index: usize,
    start_jd: f64,
    span: f64,
    n_coeffs: usize,
    raw: &'a [u8],
}

impl<'a> CoefficientBlock<'a> {
    /// Build a block over raw little-endian coefficient bytes
    ///
    /// `raw` must hold `3 * n_coeffs` doubles.
    pub fn new(body_index: usize, start_jd: f64, span: f64, n_coeffs: usize, raw: &'a [u8]) -> Self {
        debug_assert_eq!(raw.len(), 3 * n_coeffs * DOUBLE_SIZE);
        Self {
            body_index,
            start_jd,
            span,
            n_coeffs,
            raw,
        }
    }

    /// Body table index this block belongs to
    pub fn body_index(&self) -> usize {
        self.body_index
    }

    /// First Julian date of the sub-interval
    pub fn start_jd(&self) -> f64 {
        self.start_jd
    }

    /// Length of the sub-interval in days
    pub fn span(&self) -> f64 {
        self.span
    }

    /// End of the sub-interval (exclusive)
    pub fn end_jd(&self) -> f64 {
        self.start_jd + self.span
    }

    /// Chebyshev coefficients per axis
    pub fn n_coeffs(&self) -> usize {
        self.n_coeffs
    }

    /// Coefficient `k` of `axis` (0 = x, 1 = y, 2 = z)
    pub fn coefficient(&self, axis: usize, k: usize) -> f64 {
        let pos = (axis * self.n_coeffs + k) * DOUBLE_SIZE;
        LittleEndian::read_f64(&self.raw[pos..pos + DOUBLE_SIZE])
    }
}

impl EphemerisFile {
    /// Open and validate the ephemeris file at the given path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf).map_err(|e| io_err(&path_buf, e))?;

        // The map is never written through and the file is opened read-only
        let map = unsafe { MmapOptions::new().map(&file) }.map_err(|e| io_err(&path_buf, e))?;

        let ephemeris = Self::from_storage(Storage::Mapped(map), Some(path_buf))?;
        debug!(
            "Loaded ephemeris {:?}: JD {}..{}, {} records of {} days, {} bodies",
            ephemeris.path,
            ephemeris.header.jd_start,
            ephemeris.header.jd_end,
            ephemeris.header.record_count,
            ephemeris.header.record_span,
            ephemeris.available_bodies().len()
        );
        Ok(ephemeris)
    }

    /// Validate an in-memory copy of an ephemeris file
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_storage(Storage::Owned(bytes), None)
    }

    fn from_storage(data: Storage, path: Option<PathBuf>) -> Result<Self> {
        let header = Header::parse(&data)?;
        header.validate(data.len())?;

        let ephemeris = EphemerisFile { path, header, data };
        let first = ephemeris.record_bounds(0);
        let last = ephemeris.record_bounds(ephemeris.header.record_count - 1);
        ephemeris.header.validate_record_bounds(first, last)?;

        Ok(ephemeris)
    }

    /// Path the file was loaded from
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Parsed file header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// First covered Julian date
    pub fn jd_start(&self) -> f64 {
        self.header.jd_start
    }

    /// End of coverage (exclusive)
    pub fn jd_end(&self) -> f64 {
        self.header.jd_end
    }

    /// Whether `jd` lies in [jd_start, jd_end)
    pub fn covers(&self, jd: f64) -> bool {
        jd >= self.header.jd_start && jd < self.header.jd_end
    }

    /// Whether the file carries coefficients for the body table index
    pub fn has_body(&self, body_index: usize) -> bool {
        self.header
            .bodies
            .get(body_index)
            .map_or(false, |layout| !layout.is_empty())
    }

    /// Body table indices with coefficients
    pub fn available_bodies(&self) -> Vec<usize> {
        (0..self.header.bodies.len())
            .filter(|&i| self.has_body(i))
            .collect()
    }

    /// Read the JD bounds stored at the start of a record
    fn record_bounds(&self, record: usize) -> (f64, f64) {
        let base = self.header.size() + record * self.header.record_bytes();
        (
            LittleEndian::read_f64(&self.data[base..base + DOUBLE_SIZE]),
            LittleEndian::read_f64(&self.data[base + DOUBLE_SIZE..base + 2 * DOUBLE_SIZE]),
        )
    }

    /// Find the coefficient block covering `jd` for a body table index
    ///
    /// Records and sub-intervals are uniform, so selection is plain arithmetic.
    pub fn lookup(&self, body_index: usize, jd: f64) -> Result<CoefficientBlock<'_>> {
        let layout = self
            .header
            .bodies
            .get(body_index)
            .filter(|layout| !layout.is_empty())
            .ok_or_else(|| {
                EphemError::UnknownBody(format!(
                    "{} (table index {}) is not in the ephemeris file",
                    names::table_name(body_index).unwrap_or("unnamed body"),
                    body_index
                ))
            })?;

        // Written so that NaN also fails
        if !self.covers(jd) {
            return Err(EphemError::OutOfRange {
                jd,
                start_jd: self.header.jd_start,
                end_jd: self.header.jd_end,
            });
        }

        let span = self.header.record_span;
        let last_record = self.header.record_count - 1;
        let record = (((jd - self.header.jd_start) / span).floor() as usize).min(last_record);
        let record_start = self.header.jd_start + record as f64 * span;

        let sub_span = span / layout.n_subintervals as f64;
        // Negative round-off saturates to 0 in the cast
        let sub = (((jd - record_start) / sub_span).floor() as usize).min(layout.n_subintervals - 1);

        let word = layout.offset + sub * layout.block_words();
        let base = self.header.size() + record * self.header.record_bytes() + word * DOUBLE_SIZE;
        let raw = &self.data[base..base + layout.block_words() * DOUBLE_SIZE];

        Ok(CoefficientBlock::new(
            body_index,
            record_start + sub as f64 * sub_span,
            sub_span,
            layout.n_coeffs,
            raw,
        ))
    }

    /// Position of a body table entry in km, as stored in the file
    pub fn position(&self, body_index: usize, jd: f64) -> Result<Vector3<f64>> {
        let block = self.lookup(body_index, jd)?;
        Ok(chebyshev::evaluate(&block, jd))
    }

    /// Position (km) and velocity (km/day) of a body table entry
    pub fn state(&self, body_index: usize, jd: f64) -> Result<(Vector3<f64>, Vector3<f64>)> {
        let block = self.lookup(body_index, jd)?;
        Ok(chebyshev::evaluate_with_velocity(&block, jd))
    }
}

impl std::fmt::Debug for EphemerisFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemerisFile")
            .field("path", &self.path)
            .field("header", &self.header)
            .finish()
    }
}
