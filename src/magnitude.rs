//! Apparent brightness and disc size
//!
//! Planets and moons are modelled as Lambertian spheres lit by the Sun.
//! Bodies that publish an absolute magnitude use the IAU H,G system instead.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::constants::{AU_M, RAD2ASEC, SUN_MAGNITUDE_1AU, SUN_RADIUS};

/// Slope parameter assumed when a body gives H without G
pub const DEFAULT_SLOPE: f64 = 0.15;

/// Photometric and size results for one body at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brightness {
    /// Apparent visual magnitude, NaN when it cannot be estimated
    pub magnitude: f64,
    /// Illuminated fraction of the disc
    pub phase: f64,
    /// Apparent diameter, arcseconds
    pub angular_size: f64,
    /// Physical diameter, metres
    pub physical_size: f64,
    /// Geometric albedo used, 0 when unknown
    pub albedo: f64,
}

/// Physical parameters a body may supply for photometry
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalProperties {
    /// Mean radius, metres; 0 when unknown
    pub radius: f64,
    /// Geometric albedo; 0 when unknown
    pub albedo: f64,
    /// Absolute magnitude H
    pub absolute_magnitude: Option<f64>,
    /// Slope parameter G
    pub slope: Option<f64>,
}

/// Lambertian sphere phase function Φ(α)
pub fn lambert_phase_function(phase_angle: f64) -> f64 {
    (phase_angle.sin() + (PI - phase_angle) * phase_angle.cos()) / PI
}

/// Illuminated fraction for a Sun-body-observer angle α
pub fn illuminated_fraction(phase_angle: f64) -> f64 {
    (1.0 + phase_angle.cos()) / 2.0
}

/// Magnitude and size of a Lambertian sphere
///
/// Distances are AU, `phase_angle` radians, `radius` metres. A non-positive
/// radius or albedo yields NaN magnitude and zero sizes rather than an error.
pub fn estimate(
    sun_dist: f64,
    earth_dist: f64,
    phase_angle: f64,
    albedo: f64,
    radius: f64,
) -> Brightness {
    let phase = illuminated_fraction(phase_angle);

    if !(radius > 0.0 && albedo > 0.0) {
        return Brightness {
            magnitude: f64::NAN,
            phase,
            angular_size: 0.0,
            physical_size: 0.0,
            albedo: 0.0,
        };
    }

    let earth_dist_m = earth_dist * AU_M;
    let ratio = albedo
        * (radius / earth_dist_m).powi(2)
        * (1.0 / sun_dist).powi(2)
        * lambert_phase_function(phase_angle);

    Brightness {
        magnitude: SUN_MAGNITUDE_1AU - 2.5 * ratio.log10(),
        phase,
        angular_size: 2.0 * radius / earth_dist_m * RAD2ASEC,
        physical_size: 2.0 * radius,
        albedo,
    }
}

/// Apparent magnitude in the IAU H,G system
pub fn estimate_hg(h: f64, g: f64, sun_dist: f64, earth_dist: f64, phase_angle: f64) -> f64 {
    let tan_half = (phase_angle / 2.0).tan();
    let phi1 = (-3.33 * tan_half.powf(0.63)).exp();
    let phi2 = (-1.87 * tan_half.powf(1.22)).exp();
    h + 5.0 * (sun_dist * earth_dist).log10() - 2.5 * ((1.0 - g) * phi1 + g * phi2).log10()
}

/// The Sun as seen from `earth_dist` AU
pub fn estimate_sun(earth_dist: f64) -> Brightness {
    let earth_dist_m = earth_dist * AU_M;
    Brightness {
        magnitude: SUN_MAGNITUDE_1AU + 5.0 * earth_dist.log10(),
        phase: 1.0,
        angular_size: 2.0 * SUN_RADIUS / earth_dist_m * RAD2ASEC,
        physical_size: 2.0 * SUN_RADIUS,
        albedo: 0.0,
    }
}

impl PhysicalProperties {
    /// Brightness using H,G when available, the Lambertian model otherwise
    pub fn brightness(&self, sun_dist: f64, earth_dist: f64, phase_angle: f64) -> Brightness {
        let mut result = estimate(sun_dist, earth_dist, phase_angle, self.albedo, self.radius);
        if let Some(h) = self.absolute_magnitude {
            let g = self.slope.unwrap_or(DEFAULT_SLOPE);
            result.magnitude = estimate_hg(h, g, sun_dist, earth_dist, phase_angle);
            // Sizes stay meaningful when a radius is known even without an albedo
            if self.radius > 0.0 {
                let earth_dist_m = earth_dist * AU_M;
                result.angular_size = 2.0 * self.radius / earth_dist_m * RAD2ASEC;
                result.physical_size = 2.0 * self.radius;
            }
        }
        result
    }
}
