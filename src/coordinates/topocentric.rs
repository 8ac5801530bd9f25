//! Topocentric parallax correction
//!
//! Moves geocentric right ascension and declination to the place of an
//! observer on the surface of the Earth (Meeus chapters 11, 12 and 40).

use nalgebra::Vector3;

use super::to_spherical;
use crate::constants::{AU_M, DEG2RAD, EARTH_FLATTENING, EARTH_RADIUS, J2000, JULIAN_CENTURY, TAU};

/// Greenwich mean sidereal time in radians (Meeus 12.4)
///
/// `jd` is treated as UT.
pub fn gmst(jd: f64) -> f64 {
    let d = jd - J2000;
    let t = d / JULIAN_CENTURY;
    let degrees = 280.46061837 + 360.98564736629 * d + 0.000387933 * t * t - t * t * t / 38_710_000.0;
    (degrees * DEG2RAD).rem_euclid(TAU)
}

/// Observer terms ρ sin φ′ and ρ cos φ′ in Earth radii (Meeus 11)
///
/// `latitude` is geodetic, degrees; `height` is metres above the ellipsoid.
pub fn observer_geocentric(latitude: f64, height: f64) -> (f64, f64) {
    let phi = latitude * DEG2RAD;
    let b_over_a = 1.0 - EARTH_FLATTENING;
    let u = (b_over_a * phi.tan()).atan();
    let h = height / EARTH_RADIUS;

    let rho_sin = b_over_a * u.sin() + h * phi.sin();
    let rho_cos = u.cos() + h * phi.cos();
    (rho_sin, rho_cos)
}

/// Apply parallax for a known hour angle (Meeus 40.2, 40.3)
///
/// The observer is subtracted from the body in a frame turned so the body
/// lies at zero longitude, distances in units of the body's geocentric
/// distance. Returns the topocentric (ra, dec); ra is not wrapped.
pub fn parallax(
    ra: f64,
    dec: f64,
    distance_au: f64,
    hour_angle: f64,
    rho_sin: f64,
    rho_cos: f64,
) -> (f64, f64) {
    let sin_pi = (EARTH_RADIUS / AU_M) / distance_au;
    let (sin_h, cos_h) = hour_angle.sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();

    let topocentric = Vector3::new(
        cos_dec - rho_cos * sin_pi * cos_h,
        -rho_cos * sin_pi * sin_h,
        sin_dec - rho_sin * sin_pi,
    );
    let (delta_ra, new_dec, _) = to_spherical(&topocentric);

    (ra + delta_ra, new_dec)
}

/// Observer site for the topocentric correction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    /// Geodetic latitude, degrees north
    pub latitude: f64,
    /// Longitude, degrees east
    pub longitude: f64,
    rho_sin: f64,
    rho_cos: f64,
}

impl Observer {
    /// An observer at sea level
    pub fn new(latitude: f64, longitude: f64) -> Self {
        let (rho_sin, rho_cos) = observer_geocentric(latitude, 0.0);
        Self {
            latitude,
            longitude,
            rho_sin,
            rho_cos,
        }
    }

    /// Local mean sidereal time at `jd`, radians
    pub fn local_sidereal_time(&self, jd: f64) -> f64 {
        (gmst(jd) + self.longitude * DEG2RAD).rem_euclid(TAU)
    }

    /// Topocentric (ra, dec) of a body at geocentric (ra, dec, distance)
    pub fn correct(&self, jd: f64, ra: f64, dec: f64, distance_au: f64) -> (f64, f64) {
        if !(distance_au > 0.0) {
            return (ra, dec);
        }
        let hour_angle = self.local_sidereal_time(jd) - ra;
        parallax(ra, dec, distance_au, hour_angle, self.rho_sin, self.rho_cos)
    }
}

/// Correct (ra, dec) when an observer is configured, pass through otherwise
pub fn correct(
    observer: Option<&Observer>,
    jd: f64,
    ra: f64,
    dec: f64,
    distance_au: f64,
) -> (f64, f64) {
    match observer {
        Some(site) => site.correct(jd, ra, dec, distance_au),
        None => (ra, dec),
    }
}
