//! Synthetic ephemeris files
//!
//! Builds small, self-consistent binary ephemerides for tests and benchmarks.
//! Planet and Earth-Moon barycentre tracks come from the built-in mean
//! elements with the Sun fixed at the origin, so barycentric and heliocentric
//! positions coincide. The Moon follows a circular geocentric orbit in the
//! ecliptic. Each sub-interval is fitted at the Chebyshev nodes.

use byteorder::{LittleEndian, WriteBytesExt};
use nalgebra::Vector3;
use std::f64::consts::TAU;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::bodies::mean_elements;
use crate::constants::{AU_KM, J2000};
use crate::errors::{io_err, EphemError, Result};
use crate::jplephem::chebyshev::{chebyshev_nodes, fit_values};
use crate::jplephem::header::{BodyLayout, Header, COMPONENTS, FORMAT_VERSION};
use crate::jplephem::names::indices;
use crate::orbits;

/// Radius of the synthetic lunar orbit, km
pub const MOON_DISTANCE_KM: f64 = 384_400.0;
/// Sidereal month, days
pub const MOON_PERIOD_DAYS: f64 = 27.321_661;
/// Earth/Moon mass ratio written to synthetic files
pub const EMRAT: f64 = 81.300_569_074_190_62;

/// Shape of a synthetic file
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    /// First covered Julian date
    pub jd_start: f64,
    /// Number of records
    pub record_count: usize,
    /// Days per record
    pub record_span: f64,
    /// Chebyshev coefficients per axis
    pub n_coeffs: usize,
    /// Table indices to include; the rest get empty entries
    pub bodies: Vec<usize>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            jd_start: 2_459_968.5,
            record_count: 8,
            record_span: 32.0,
            n_coeffs: 14,
            bodies: (0..indices::COUNT).collect(),
        }
    }
}

impl SyntheticConfig {
    /// End of coverage (exclusive)
    pub fn jd_end(&self) -> f64 {
        self.jd_start + self.record_count as f64 * self.record_span
    }
}

/// Sub-intervals per record for a table index
pub fn subintervals(index: usize) -> usize {
    match index {
        indices::MOON => 8,
        indices::MERCURY => 4,
        indices::SUN => 1,
        _ => 2,
    }
}

/// The position a synthetic file tabulates, km on J2000 equatorial axes
///
/// The Moon is geocentric; everything else is relative to the Sun at the origin.
pub fn reference_position(index: usize, jd: f64) -> Result<Vector3<f64>> {
    match index {
        indices::SUN => Ok(Vector3::zeros()),
        indices::MOON => {
            let angle = TAU * (jd - J2000) / MOON_PERIOD_DAYS;
            let ecliptic = Vector3::new(angle.cos(), angle.sin(), 0.0) * MOON_DISTANCE_KM;
            Ok(orbits::to_equatorial(&ecliptic))
        }
        _ => {
            let elements = mean_elements(index).ok_or_else(|| {
                EphemError::UnknownBody(format!("no synthetic track for table index {}", index))
            })?;
            Ok(orbits::to_equatorial(&orbits::propagate(&elements, jd)?) * AU_KM)
        }
    }
}

/// Header describing the file a config produces
pub fn header(config: &SyntheticConfig) -> Header {
    let mut bodies = vec![BodyLayout::default(); indices::COUNT];
    let mut offset = 2;
    for &index in &config.bodies {
        let layout = BodyLayout {
            offset,
            n_coeffs: config.n_coeffs,
            n_subintervals: subintervals(index),
            n_components: COMPONENTS,
        };
        offset += layout.words();
        bodies[index] = layout;
    }

    Header {
        version: FORMAT_VERSION,
        record_len: offset,
        record_count: config.record_count,
        jd_start: config.jd_start,
        jd_end: config.jd_end(),
        record_span: config.record_span,
        au_km: AU_KM,
        emrat: EMRAT,
        bodies,
    }
}

/// Fit one body over one sub-interval: x coefficients, then y, then z
fn fit_block(index: usize, start: f64, span: f64, n_coeffs: usize) -> Result<Vec<f64>> {
    let positions = chebyshev_nodes(n_coeffs)
        .into_iter()
        .map(|tau| reference_position(index, start + (tau + 1.0) * span / 2.0))
        .collect::<Result<Vec<_>>>()?;

    let mut block = Vec::with_capacity(COMPONENTS * n_coeffs);
    for axis in 0..COMPONENTS {
        let values: Vec<f64> = positions.iter().map(|p| p[axis]).collect();
        block.extend(fit_values(&values));
    }
    Ok(block)
}

/// Serialize a complete synthetic file
pub fn write<W: Write>(config: &SyntheticConfig, w: &mut W) -> Result<()> {
    let header = header(config);
    header.write(w)?;

    for record in 0..config.record_count {
        let record_start = config.jd_start + record as f64 * config.record_span;
        let mut words = vec![0.0; header.record_len];
        words[0] = record_start;
        words[1] = record_start + config.record_span;

        for &index in &config.bodies {
            let layout = header.bodies[index];
            let sub_span = config.record_span / layout.n_subintervals as f64;
            for sub in 0..layout.n_subintervals {
                let block = fit_block(
                    index,
                    record_start + sub as f64 * sub_span,
                    sub_span,
                    layout.n_coeffs,
                )?;
                let at = layout.offset + sub * layout.block_words();
                words[at..at + block.len()].copy_from_slice(&block);
            }
        }

        for word in words {
            w.write_f64::<LittleEndian>(word)?;
        }
    }
    Ok(())
}

/// Build a synthetic file in memory
pub fn to_bytes(config: &SyntheticConfig) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write(config, &mut bytes)?;
    Ok(bytes)
}

/// Write a synthetic file to disk
pub fn write_to<P: AsRef<Path>>(config: &SyntheticConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(file);
    write(config, &mut w)?;
    w.flush().map_err(|e| io_err(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_packed() {
        let config = SyntheticConfig {
            bodies: vec![indices::MARS, indices::MOON],
            ..Default::default()
        };
        let header = header(&config);
        let mars = header.bodies[indices::MARS];
        let moon = header.bodies[indices::MOON];
        assert_eq!(mars.offset, 2);
        assert_eq!(moon.offset, 2 + mars.words());
        assert_eq!(header.record_len, 2 + mars.words() + moon.words());
        assert!(header.bodies[indices::JUPITER].is_empty());
        assert!(header.validate(header.size() + header.record_count * header.record_bytes()).is_ok());
    }

    #[test]
    fn test_bytes_match_header() {
        let config = SyntheticConfig {
            record_count: 2,
            bodies: vec![indices::SUN, indices::MARS],
            ..Default::default()
        };
        let bytes = to_bytes(&config).unwrap();
        let header = Header::parse(&bytes).unwrap();
        assert_eq!(
            bytes.len(),
            header.size() + header.record_count * header.record_bytes()
        );
        assert!(header.validate(bytes.len()).is_ok());
    }

    #[test]
    fn test_moon_orbit_radius() {
        let moon = reference_position(indices::MOON, 2_459_970.0).unwrap();
        assert!((moon.norm() - MOON_DISTANCE_KM).abs() < 1e-6);
    }
}
