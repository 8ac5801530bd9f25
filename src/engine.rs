//! Per-body ephemeris computation
//!
//! A [`PositionSource`] supplies positions of the Earth, the Sun and target
//! bodies on J2000 equatorial axes in AU. [`compute_record`] turns those into
//! the 17 output quantities for one body at one time: light-time corrected
//! geocentric direction, RA/Dec at the requested epoch with optional
//! topocentric parallax, ecliptic coordinates of date, brightness and the
//! Sun-Earth-body geometry.

use nalgebra::Vector3;

use crate::bodies::{Body, BodySource, EARTH_ELEMENTS};
use crate::constants::{C_AUDAY, J2000};
use crate::coordinates::{
    angle_between, equatorial_to_ecliptic, normalize_longitude, normalize_ra, precess,
    precess_equatorial, to_spherical, topocentric,
};
use crate::errors::{EphemError, Result};
use crate::jplephem::names::indices;
use crate::jplephem::EphemerisFile;
use crate::magnitude;
use crate::orbits;
use crate::output::{field, OutputRecord, N_FIELDS};
use crate::settings::{EphemerisRequest, OutputFormat};

/// Light-time iterations for the geocentric vector
pub const LIGHT_TIME_ITERATIONS: usize = 2;

/// Positions on J2000 equatorial axes, AU
///
/// Implementations are shared by all workers of a step.
pub trait PositionSource: Sync {
    /// Position of a target body
    fn body_position(&self, body: &Body, jd: f64) -> Result<Vector3<f64>>;

    /// Position of the Earth
    fn earth_position(&self, jd: f64) -> Result<Vector3<f64>>;

    /// Position of the Sun
    fn sun_position(&self, jd: f64) -> Result<Vector3<f64>>;

    /// Epoch at which to evaluate a light-time retarded position
    ///
    /// Sources with a limited time span hold retarded epochs at their start.
    fn retarded_epoch(&self, jd: f64) -> f64 {
        jd
    }
}

/// Barycentric positions from a binary ephemeris
pub struct TabulatedSource<'a> {
    file: &'a EphemerisFile,
    au_km: f64,
    emrat: f64,
}

impl<'a> TabulatedSource<'a> {
    pub fn new(file: &'a EphemerisFile) -> Self {
        Self {
            au_km: file.header().au_km,
            emrat: file.header().emrat,
            file,
        }
    }

    fn table_position(&self, index: usize, jd: f64) -> Result<Vector3<f64>> {
        Ok(self.file.position(index, jd)? / self.au_km)
    }

    /// Geocentric Moon
    fn moon_geocentric(&self, jd: f64) -> Result<Vector3<f64>> {
        self.table_position(indices::MOON, jd)
    }
}

impl PositionSource for TabulatedSource<'_> {
    fn body_position(&self, body: &Body, jd: f64) -> Result<Vector3<f64>> {
        match body.source {
            BodySource::Tabulated(indices::MOON) => {
                Ok(self.earth_position(jd)? + self.moon_geocentric(jd)?)
            }
            BodySource::Tabulated(index) => self.table_position(index, jd),
            _ => Err(EphemError::UnknownBody(format!(
                "{} is not a tabulated body",
                body.name
            ))),
        }
    }

    fn earth_position(&self, jd: f64) -> Result<Vector3<f64>> {
        let emb = self.table_position(indices::EARTH_MOON_BARYCENTER, jd)?;
        let moon = self.moon_geocentric(jd)?;
        Ok(emb - moon / (1.0 + self.emrat))
    }

    fn sun_position(&self, jd: f64) -> Result<Vector3<f64>> {
        self.table_position(indices::SUN, jd)
    }

    fn retarded_epoch(&self, jd: f64) -> f64 {
        jd.max(self.file.jd_start())
    }
}

/// Heliocentric positions from Kepler orbits
#[derive(Debug, Default, Clone, Copy)]
pub struct OrbitalSource;

impl PositionSource for OrbitalSource {
    fn body_position(&self, body: &Body, jd: f64) -> Result<Vector3<f64>> {
        match &body.source {
            BodySource::OrbitalElements(elements) => {
                Ok(orbits::to_equatorial(&orbits::propagate(elements, jd)?))
            }
            BodySource::Heliocentre => Ok(Vector3::zeros()),
            BodySource::Tabulated(_) => Err(EphemError::UnknownBody(format!(
                "{} has no orbital elements",
                body.name
            ))),
        }
    }

    fn earth_position(&self, jd: f64) -> Result<Vector3<f64>> {
        Ok(orbits::to_equatorial(&orbits::propagate(&EARTH_ELEMENTS, jd)?))
    }

    fn sun_position(&self, _jd: f64) -> Result<Vector3<f64>> {
        Ok(Vector3::zeros())
    }
}

/// Body position at the time light left it, for an observer at `earth`
///
/// Returns the retarded position and the epoch it was evaluated at.
pub fn light_time_corrected(
    source: &dyn PositionSource,
    body: &Body,
    jd: f64,
    earth: &Vector3<f64>,
) -> Result<(Vector3<f64>, f64)> {
    let mut epoch = jd;
    let mut position = source.body_position(body, jd)?;
    for _ in 0..LIGHT_TIME_ITERATIONS {
        let tau = (position - earth).norm() / C_AUDAY;
        epoch = source.retarded_epoch(jd - tau);
        position = source.body_position(body, epoch)?;
    }
    Ok((position, epoch))
}

/// Compute the output record of one body at one time
pub fn compute_record(
    source: &dyn PositionSource,
    body: &Body,
    jd: f64,
    request: &EphemerisRequest,
) -> Result<OutputRecord> {
    let earth = source.earth_position(jd)?;
    let sun = source.sun_position(jd)?;
    let position = source.body_position(body, jd)?;

    let (retarded, emitted) = light_time_corrected(source, body, jd, &earth)?;
    let geocentric = retarded - earth;
    let heliocentric = retarded - source.sun_position(emitted)?;
    let sun_from_earth = sun - earth;

    let earth_dist = geocentric.norm();
    let sun_dist = heliocentric.norm();

    // RA/Dec: J2000 geocentric, then the observer's place, then the requested epoch
    let (ra, dec, _) = to_spherical(&geocentric);
    let (ra, dec) = topocentric::correct(request.observer.as_ref(), jd, ra, dec, earth_dist);
    let (ra, dec) = precess_equatorial(J2000, request.settings.ra_dec_epoch, ra, dec);

    // Ecliptic coordinates of date, always geocentric
    let (lon, lat, ecl_dist) = to_spherical(&equatorial_to_ecliptic(&geocentric));
    let (lon, lat) = precess(J2000, jd, lon, lat);

    let elongation = angle_between(&sun_from_earth, &geocentric);
    let earth_sun_angle = angle_between(&(earth - sun), &heliocentric);
    let phase_angle = angle_between(&-heliocentric, &-geocentric);

    let brightness = if body.is_sun {
        magnitude::estimate_sun(earth_dist)
    } else {
        body.physical.brightness(sun_dist, earth_dist, phase_angle)
    };

    let xyz = if request.format == OutputFormat::EclipticXyz {
        equatorial_to_ecliptic(&position)
    } else {
        position
    };

    let mut fields = [0.0; N_FIELDS];
    fields[field::X] = xyz.x;
    fields[field::Y] = xyz.y;
    fields[field::Z] = xyz.z;
    fields[field::RA] = normalize_ra(ra);
    fields[field::DEC] = dec;
    fields[field::MAGNITUDE] = brightness.magnitude;
    fields[field::PHASE] = brightness.phase;
    fields[field::ANGULAR_SIZE] = brightness.angular_size;
    fields[field::PHYSICAL_SIZE] = brightness.physical_size;
    fields[field::ALBEDO] = brightness.albedo;
    fields[field::SUN_DISTANCE] = sun_dist;
    fields[field::EARTH_DISTANCE] = earth_dist;
    fields[field::ELONGATION] = elongation;
    fields[field::EARTH_SUN_ANGLE] = earth_sun_angle;
    fields[field::ECLIPTIC_LONGITUDE] = normalize_longitude(lon);
    fields[field::ECLIPTIC_DISTANCE] = ecl_dist;
    fields[field::ECLIPTIC_LATITUDE] = lat;

    Ok(OutputRecord(fields))
}
