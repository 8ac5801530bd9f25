//! Physical and astronomical constants
//!
//! Distances in the ephemeris file are km; everything downstream works in AU,
//! days and radians.

use std::f64::consts::PI;

/// Astronomical unit, metres (IAU 2012 B2)
pub const AU_M: f64 = 149_597_870_700.0;
/// Astronomical unit, km
pub const AU_KM: f64 = 149_597_870.700;

pub const DAY_S: f64 = 86_400.0;
/// J2000.0 (2000-01-01 12:00 TT)
pub const J2000: f64 = 2_451_545.0;
pub const JULIAN_CENTURY: f64 = 36_525.0;

pub const ASEC2RAD: f64 = 4.848_136_811_095_36e-6;
pub const RAD2ASEC: f64 = 1.0 / ASEC2RAD;
pub const DEG2RAD: f64 = PI / 180.0;
pub const RAD2DEG: f64 = 180.0 / PI;
pub const TAU: f64 = 2.0 * PI;

/// Mean obliquity of the ecliptic at J2000.0, 23°26′21.448″ (Meeus 22.2)
pub const OBLIQUITY_J2000: f64 = (23.0 + 26.0 / 60.0 + 21.448 / 3600.0) * DEG2RAD;

/// Speed of light, m/s
pub const C: f64 = 299_792_458.0;
/// Speed of light, AU/day
pub const C_AUDAY: f64 = C * DAY_S / AU_M;
/// Gaussian gravitational constant, radians per day
pub const GAUSS_K: f64 = 0.017_202_098_95;

/// Earth equatorial radius, metres
pub const EARTH_RADIUS: f64 = 6_378_136.6;
/// Earth flattening (IAU 1976)
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257;

/// Visual magnitude of the Sun at 1 AU
pub const SUN_MAGNITUDE_1AU: f64 = -26.74;
/// Solar radius, metres
pub const SUN_RADIUS: f64 = 695_700_000.0;
