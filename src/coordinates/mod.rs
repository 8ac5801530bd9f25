//! Coordinate transformations
//!
//! Rectangular ↔ spherical conversion, the fixed equatorial ↔ ecliptic
//! rotation at the J2000 obliquity, and angle wrapping. Precession and
//! topocentric parallax live in their own submodules.

pub mod precession;
pub mod topocentric;

use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

use crate::constants::{OBLIQUITY_J2000, TAU};

pub use self::precession::{precess, precess_equatorial};

/// Rectangular vector to (longitude, latitude, distance)
///
/// Longitude comes from atan2 and so lies in (−π, π].
pub fn to_spherical(v: &Vector3<f64>) -> (f64, f64, f64) {
    let distance = v.norm();
    if distance == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let lon = v.y.atan2(v.x);
    let lat = (v.z / distance).clamp(-1.0, 1.0).asin();
    (lon, lat, distance)
}

/// (longitude, latitude, distance) to a rectangular vector
pub fn from_spherical(lon: f64, lat: f64, distance: f64) -> Vector3<f64> {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    Vector3::new(
        distance * cos_lat * cos_lon,
        distance * cos_lat * sin_lon,
        distance * sin_lat,
    )
}

/// Rotation about the x axis taking equatorial J2000 vectors to ecliptic J2000
pub fn equatorial_to_ecliptic_matrix() -> Matrix3<f64> {
    let (s, c) = OBLIQUITY_J2000.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

/// Rotate an equatorial J2000 vector onto ecliptic J2000 axes
pub fn equatorial_to_ecliptic(v: &Vector3<f64>) -> Vector3<f64> {
    equatorial_to_ecliptic_matrix() * v
}

/// Rotate an ecliptic J2000 vector onto equatorial J2000 axes
pub fn ecliptic_to_equatorial(v: &Vector3<f64>) -> Vector3<f64> {
    equatorial_to_ecliptic_matrix().transpose() * v
}

/// Angle between two vectors in [0, π]; zero if either vector is zero
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Wrap a longitude into (−π, π]
pub fn normalize_longitude(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// Wrap a right ascension into [0, 2π)
pub fn normalize_ra(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if a >= TAU {
        0.0
    } else {
        a
    }
}
