//! Binary ephemeris file header
//!
//! The file starts with a fixed 64-byte preamble followed by one 16-byte
//! layout entry per body. Fixed-length coefficient records follow the header.
//!
//! ```text
//! offset  field
//!      0  magic "EPHEMBIN"
//!      8  format version (u32)
//!     12  body count (u32)
//!     16  record length in f64 words (u32)
//!     20  record count (u32)
//!     24  first covered Julian date (f64)
//!     32  end of coverage, exclusive (f64)
//!     40  record span in days (f64)
//!     48  astronomical unit in km (f64)
//!     56  Earth/Moon mass ratio (f64)
//!     64  body layouts: word offset, coefficients per axis,
//!         sub-intervals per record, components (4 x u32 each)
//! ```
//!
//! All values are little-endian.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

use crate::errors::{EphemError, Result};

/// File identification word
pub const MAGIC: &[u8; 8] = b"EPHEMBIN";
/// The only format version this reader understands
pub const FORMAT_VERSION: u32 = 1;
/// Size of the fixed part of the header (bytes)
pub const PREAMBLE_SIZE: usize = 64;
/// Size of one body layout entry (bytes)
pub const BODY_ENTRY_SIZE: usize = 16;
/// Upper bound on the number of body entries
pub const MAX_BODIES: usize = 32;
/// Size of a double-precision value (bytes)
pub const DOUBLE_SIZE: usize = 8;
/// Spatial components per body
pub const COMPONENTS: usize = 3;

/// Tolerance, in days, when comparing coverage bounds
const JD_TOLERANCE: f64 = 1e-6;

/// Where one body's coefficients live inside every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodyLayout {
    /// Offset of the body's first coefficient, in f64 words from the record start
    pub offset: usize,
    /// Chebyshev coefficients per axis
    pub n_coeffs: usize,
    /// Number of equal sub-intervals each record is split into
    pub n_subintervals: usize,
    /// Number of spatial components
    pub n_components: usize,
}

impl BodyLayout {
    /// A body entry with no coefficients is a placeholder
    pub fn is_empty(&self) -> bool {
        self.n_coeffs == 0
    }

    /// f64 words occupied by one sub-interval
    ///
    /// Saturates for layouts that [`Header::validate`] would reject.
    pub fn block_words(&self) -> usize {
        self.checked_block_words().unwrap_or(usize::MAX)
    }

    /// f64 words occupied inside each record
    pub fn words(&self) -> usize {
        self.checked_words().unwrap_or(usize::MAX)
    }

    pub fn checked_block_words(&self) -> Option<usize> {
        self.n_coeffs.checked_mul(self.n_components)
    }

    /// Words per record, or `None` when the layout overflows
    pub fn checked_words(&self) -> Option<usize> {
        self.checked_block_words()?.checked_mul(self.n_subintervals)
    }
}

/// Parsed and validated header of a binary ephemeris file
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Format version
    pub version: u32,
    /// Record length in f64 words
    pub record_len: usize,
    /// Number of records
    pub record_count: usize,
    /// First covered Julian date (TT)
    pub jd_start: f64,
    /// End of coverage (exclusive)
    pub jd_end: f64,
    /// Days covered by each record
    pub record_span: f64,
    /// Astronomical unit in km, as used by the file
    pub au_km: f64,
    /// Earth/Moon mass ratio
    pub emrat: f64,
    /// Coefficient layout, indexed by body table index
    pub bodies: Vec<BodyLayout>,
}

impl Header {
    /// Parse the header from the start of a file
    ///
    /// Only structural decoding happens here; call [`Header::validate`] to
    /// check consistency against the file length.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PREAMBLE_SIZE {
            return Err(EphemError::CorruptFile(format!(
                "file is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                PREAMBLE_SIZE
            )));
        }

        if &bytes[0..8] != MAGIC {
            return Err(EphemError::CorruptFile(format!(
                "bad magic {:?}",
                String::from_utf8_lossy(&bytes[0..8])
            )));
        }

        let version = LittleEndian::read_u32(&bytes[8..12]);
        if version != FORMAT_VERSION {
            return Err(EphemError::CorruptFile(format!(
                "unsupported format version {}",
                version
            )));
        }

        let body_count = LittleEndian::read_u32(&bytes[12..16]) as usize;
        if body_count == 0 || body_count > MAX_BODIES {
            return Err(EphemError::CorruptFile(format!(
                "body count {} outside 1..={}",
                body_count, MAX_BODIES
            )));
        }

        let table_end = PREAMBLE_SIZE + body_count * BODY_ENTRY_SIZE;
        if bytes.len() < table_end {
            return Err(EphemError::CorruptFile(
                "file truncated inside the body table".to_string(),
            ));
        }

        let bodies = (0..body_count)
            .map(|i| {
                let entry = &bytes[PREAMBLE_SIZE + i * BODY_ENTRY_SIZE..];
                BodyLayout {
                    offset: LittleEndian::read_u32(&entry[0..4]) as usize,
                    n_coeffs: LittleEndian::read_u32(&entry[4..8]) as usize,
                    n_subintervals: LittleEndian::read_u32(&entry[8..12]) as usize,
                    n_components: LittleEndian::read_u32(&entry[12..16]) as usize,
                }
            })
            .collect();

        Ok(Header {
            version,
            record_len: LittleEndian::read_u32(&bytes[16..20]) as usize,
            record_count: LittleEndian::read_u32(&bytes[20..24]) as usize,
            jd_start: LittleEndian::read_f64(&bytes[24..32]),
            jd_end: LittleEndian::read_f64(&bytes[32..40]),
            record_span: LittleEndian::read_f64(&bytes[40..48]),
            au_km: LittleEndian::read_f64(&bytes[48..56]),
            emrat: LittleEndian::read_f64(&bytes[56..64]),
            bodies,
        })
    }

    /// Size of the header in bytes, which is also the offset of the first record
    pub fn size(&self) -> usize {
        PREAMBLE_SIZE + self.bodies.len() * BODY_ENTRY_SIZE
    }

    /// Size of one record in bytes
    pub fn record_bytes(&self) -> usize {
        self.record_len.saturating_mul(DOUBLE_SIZE)
    }

    /// Total file length the header describes, or `None` on overflow
    pub fn expected_file_len(&self) -> Option<usize> {
        self.record_len
            .checked_mul(DOUBLE_SIZE)?
            .checked_mul(self.record_count)?
            .checked_add(self.size())
    }

    /// Check the header against itself and the total file length
    pub fn validate(&self, file_len: usize) -> Result<()> {
        let corrupt = |msg: String| Err(EphemError::CorruptFile(msg));

        if !(self.jd_start.is_finite() && self.jd_end.is_finite() && self.jd_end > self.jd_start) {
            return corrupt(format!(
                "invalid coverage {}..{}",
                self.jd_start, self.jd_end
            ));
        }
        if !(self.record_span.is_finite() && self.record_span > 0.0) {
            return corrupt(format!("invalid record span {}", self.record_span));
        }
        if self.record_count == 0 {
            return corrupt("no records".to_string());
        }
        let covered = self.record_count as f64 * self.record_span;
        if (covered - (self.jd_end - self.jd_start)).abs() > JD_TOLERANCE {
            return corrupt(format!(
                "{} records of {} days do not cover {}..{}",
                self.record_count, self.record_span, self.jd_start, self.jd_end
            ));
        }
        if !(self.au_km > 0.0 && self.emrat > 0.0) {
            return corrupt(format!(
                "non-positive constants au={} emrat={}",
                self.au_km, self.emrat
            ));
        }
        if self.record_len < 2 {
            return corrupt(format!("record length {} too short", self.record_len));
        }

        for (index, body) in self.bodies.iter().enumerate() {
            if body.is_empty() {
                continue;
            }
            if body.n_components != COMPONENTS {
                return corrupt(format!(
                    "body {} has {} components, expected {}",
                    index, body.n_components, COMPONENTS
                ));
            }
            if body.n_subintervals == 0 {
                return corrupt(format!("body {} has no sub-intervals", index));
            }
            let end = match body.checked_words().and_then(|w| w.checked_add(body.offset)) {
                Some(end) => end,
                None => return corrupt(format!("body {} coefficient layout overflows", index)),
            };
            // The first two words of each record hold its JD bounds
            if body.offset < 2 || end > self.record_len {
                return corrupt(format!(
                    "body {} coefficients [{}, {}) fall outside the {}-word record",
                    index, body.offset, end, self.record_len
                ));
            }
        }

        let expected = match self.expected_file_len() {
            Some(expected) => expected,
            None => return corrupt("record table size overflows".to_string()),
        };
        if file_len != expected {
            return corrupt(format!(
                "file is {} bytes, header describes {}",
                file_len, expected
            ));
        }

        Ok(())
    }

    /// Check the JD bounds embedded in the first and last records
    pub fn validate_record_bounds(&self, first: (f64, f64), last: (f64, f64)) -> Result<()> {
        let last_start = self.jd_start + (self.record_count - 1) as f64 * self.record_span;
        let checks = [
            (first.0, self.jd_start),
            (first.1, self.jd_start + self.record_span),
            (last.0, last_start),
            (last.1, self.jd_end),
        ];
        for (found, expected) in checks {
            if (found - expected).abs() > JD_TOLERANCE {
                return Err(EphemError::CorruptFile(format!(
                    "record bound {} does not match header coverage (expected {})",
                    found, expected
                )));
            }
        }
        Ok(())
    }

    /// Serialize the header
    pub fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(MAGIC)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u32::<LittleEndian>(self.bodies.len() as u32)?;
        w.write_u32::<LittleEndian>(self.record_len as u32)?;
        w.write_u32::<LittleEndian>(self.record_count as u32)?;
        w.write_f64::<LittleEndian>(self.jd_start)?;
        w.write_f64::<LittleEndian>(self.jd_end)?;
        w.write_f64::<LittleEndian>(self.record_span)?;
        w.write_f64::<LittleEndian>(self.au_km)?;
        w.write_f64::<LittleEndian>(self.emrat)?;
        for body in &self.bodies {
            w.write_u32::<LittleEndian>(body.offset as u32)?;
            w.write_u32::<LittleEndian>(body.n_coeffs as u32)?;
            w.write_u32::<LittleEndian>(body.n_subintervals as u32)?;
            w.write_u32::<LittleEndian>(body.n_components as u32)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            version: FORMAT_VERSION,
            record_len: 2 + 3 * 4 * 2,
            record_count: 3,
            jd_start: 2451536.5,
            jd_end: 2451536.5 + 96.0,
            record_span: 32.0,
            au_km: 149_597_870.7,
            emrat: 81.3,
            bodies: vec![
                BodyLayout {
                    offset: 2,
                    n_coeffs: 4,
                    n_subintervals: 2,
                    n_components: 3,
                },
                BodyLayout::default(),
            ],
        }
    }

    fn file_len(header: &Header) -> usize {
        header.expected_file_len().unwrap()
    }

    #[test]
    fn test_header_round_trip() {
        let header = sample_header();
        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), header.size());

        let parsed = Header::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.validate(file_len(&parsed)).is_ok());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = Vec::new();
        sample_header().write(&mut bytes).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            Header::parse(&bytes),
            Err(EphemError::CorruptFile(_))
        ));
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            Header::parse(&[0u8; 10]),
            Err(EphemError::CorruptFile(_))
        ));
    }

    #[test]
    fn test_inconsistent_coverage() {
        let mut header = sample_header();
        header.jd_end += 1.0;
        assert!(header.validate(file_len(&header)).is_err());
    }

    #[test]
    fn test_wrong_file_length() {
        let header = sample_header();
        assert!(header.validate(file_len(&header) - 8).is_err());
        assert!(header.validate(file_len(&header) + 1).is_err());
    }

    #[test]
    fn test_body_outside_record() {
        let mut header = sample_header();
        header.bodies[0].n_coeffs = 5;
        assert!(header.validate(file_len(&header)).is_err());

        let mut header = sample_header();
        header.bodies[0].offset = 0;
        assert!(header.validate(file_len(&header)).is_err());
    }

    #[test]
    fn test_oversized_layout_is_corrupt() {
        let mut header = sample_header();
        header.bodies[0].n_coeffs = u32::MAX as usize;
        header.bodies[0].n_subintervals = u32::MAX as usize;
        assert_eq!(header.bodies[0].words(), usize::MAX);
        match header.validate(1024) {
            Err(EphemError::CorruptFile(msg)) => assert!(msg.contains("body 0")),
            other => panic!("expected CorruptFile, got {:?}", other),
        }
    }

    #[test]
    fn test_record_bounds() {
        let header = sample_header();
        let first = (2451536.5, 2451568.5);
        let last = (2451600.5, 2451632.5);
        assert!(header.validate_record_bounds(first, last).is_ok());
        assert!(header
            .validate_record_bounds((2451537.5, 2451568.5), last)
            .is_err());
    }
}
