//! Keplerian orbit propagation
//!
//! Heliocentric positions from classical orbital elements, for bodies that
//! have no tabulated coefficients or when a run asks for the analytic path.
//! Angles in [`OrbitalElements`] are degrees so element sets can be written
//! by hand in configuration files; all computation is in radians.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::constants::{DEG2RAD, GAUSS_K, JULIAN_CENTURY, OBLIQUITY_J2000, TAU};
use crate::errors::{EphemError, Result};

/// Convergence threshold on the Newton-Raphson correction, radians
pub const KEPLER_TOLERANCE: f64 = 1e-9;
/// Iteration cap for the Kepler solver
pub const KEPLER_MAX_ITERATIONS: usize = 50;

/// Linear drift of the elements, per Julian century
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementRates {
    /// AU per century
    pub semi_major_axis: f64,
    /// Per century
    pub eccentricity: f64,
    /// Degrees per century
    pub inclination: f64,
    /// Degrees per century
    pub ascending_node: f64,
    /// Degrees per century
    pub arg_perihelion: f64,
}

/// Osculating elements of a heliocentric ellipse, ecliptic and equinox J2000
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Semi-major axis, AU
    pub semi_major_axis: f64,
    /// Eccentricity, in [0, 1)
    pub eccentricity: f64,
    /// Inclination to the ecliptic, degrees
    pub inclination: f64,
    /// Longitude of the ascending node, degrees
    pub ascending_node: f64,
    /// Argument of perihelion, degrees
    pub arg_perihelion: f64,
    /// Mean anomaly at the epoch, degrees
    pub mean_anomaly: f64,
    /// Epoch of the elements, Julian date (TT)
    pub epoch: f64,
    /// Mean motion in degrees per day; derived from the semi-major axis if absent
    #[serde(default)]
    pub mean_motion: Option<f64>,
    /// Secular rates, zero unless given
    #[serde(default)]
    pub rates: ElementRates,
}

impl OrbitalElements {
    /// Build elements from mean longitude and longitude of perihelion
    ///
    /// This is the form used by published planetary element tables:
    /// ω = ϖ − Ω and M = L − ϖ. `mean_longitude_rate` is in degrees per
    /// century and becomes the mean motion.
    #[allow(clippy::too_many_arguments)]
    pub fn from_mean_longitude(
        semi_major_axis: f64,
        eccentricity: f64,
        inclination: f64,
        mean_longitude: f64,
        perihelion_longitude: f64,
        ascending_node: f64,
        epoch: f64,
        mean_longitude_rate: f64,
        rates: ElementRates,
    ) -> Self {
        Self {
            semi_major_axis,
            eccentricity,
            inclination,
            ascending_node,
            arg_perihelion: perihelion_longitude - ascending_node,
            mean_anomaly: mean_longitude - perihelion_longitude,
            epoch,
            // ϖ drifts too, so M advances at L̇ − ϖ̇
            mean_motion: Some(
                (mean_longitude_rate - (rates.arg_perihelion + rates.ascending_node)) / JULIAN_CENTURY,
            ),
            rates,
        }
    }

    /// Check the elements describe a bound ellipse
    pub fn validate(&self) -> Result<()> {
        let fields = [
            self.semi_major_axis,
            self.eccentricity,
            self.inclination,
            self.ascending_node,
            self.arg_perihelion,
            self.mean_anomaly,
            self.epoch,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(EphemError::InvalidElements(format!(
                "non-finite element in {:?}",
                self
            )));
        }
        if self.semi_major_axis <= 0.0 {
            return Err(EphemError::InvalidElements(format!(
                "semi-major axis {} AU is not positive",
                self.semi_major_axis
            )));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(EphemError::InvalidElements(format!(
                "eccentricity {} outside [0, 1)",
                self.eccentricity
            )));
        }
        if let Some(n) = self.mean_motion {
            if !n.is_finite() {
                return Err(EphemError::InvalidElements(format!(
                    "mean motion {} is not finite",
                    n
                )));
            }
        }
        Ok(())
    }

    /// Mean motion in radians per day
    pub fn mean_motion_rad(&self) -> f64 {
        match self.mean_motion {
            Some(n) => n * DEG2RAD,
            None => GAUSS_K / self.semi_major_axis.powf(1.5),
        }
    }

    /// Elements advanced by their secular rates to `jd`, with the mean anomaly at `jd`
    fn at(&self, jd: f64) -> Result<Kepler> {
        let dt = jd - self.epoch;
        let centuries = dt / JULIAN_CENTURY;
        let r = &self.rates;

        let kepler = Kepler {
            a: self.semi_major_axis + r.semi_major_axis * centuries,
            e: self.eccentricity + r.eccentricity * centuries,
            i: (self.inclination + r.inclination * centuries) * DEG2RAD,
            node: (self.ascending_node + r.ascending_node * centuries) * DEG2RAD,
            peri: (self.arg_perihelion + r.arg_perihelion * centuries) * DEG2RAD,
            m: wrap_pi(self.mean_anomaly * DEG2RAD + self.mean_motion_rad() * dt),
        };

        if kepler.a <= 0.0 || !(0.0..1.0).contains(&kepler.e) {
            return Err(EphemError::InvalidElements(format!(
                "secular rates drive the orbit out of the elliptical domain at JD {} (a={}, e={})",
                jd, kepler.a, kepler.e
            )));
        }
        Ok(kepler)
    }
}

/// Elements evaluated at one instant, radians
struct Kepler {
    a: f64,
    e: f64,
    i: f64,
    node: f64,
    peri: f64,
    m: f64,
}

/// Wrap an angle into (−π, π]
fn wrap_pi(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// Solve Kepler's equation E − e sin E = M by Newton-Raphson
///
/// Starts from E₀ = M and stops once the correction drops below
/// [`KEPLER_TOLERANCE`]. A circular orbit returns M unchanged.
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> Result<f64> {
    let mut ea = mean_anomaly;
    let mut delta = f64::INFINITY;

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f = ea - eccentricity * ea.sin() - mean_anomaly;
        let fp = 1.0 - eccentricity * ea.cos();
        delta = f / fp;
        ea -= delta;
        if delta.abs() < KEPLER_TOLERANCE {
            return Ok(ea);
        }
    }

    Err(EphemError::KeplerNonConvergent {
        mean_anomaly,
        eccentricity,
        iterations: KEPLER_MAX_ITERATIONS,
        last_step: delta.abs(),
    })
}

/// True anomaly from eccentric anomaly
pub fn true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    if eccentricity == 0.0 {
        return eccentric_anomaly;
    }
    let half = eccentric_anomaly / 2.0;
    2.0 * ((1.0 + eccentricity).sqrt() * half.sin()).atan2((1.0 - eccentricity).sqrt() * half.cos())
}

/// Rotation from the perifocal frame to ecliptic J2000: Rz(Ω)·Rx(i)·Rz(ω)
pub fn perifocal_to_ecliptic(node: f64, inclination: f64, arg_perihelion: f64) -> Matrix3<f64> {
    let (sin_o, cos_o) = node.sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();
    let (sin_w, cos_w) = arg_perihelion.sin_cos();

    Matrix3::new(
        cos_o * cos_w - sin_o * sin_w * cos_i,
        -cos_o * sin_w - sin_o * cos_w * cos_i,
        sin_o * sin_i,
        sin_o * cos_w + cos_o * sin_w * cos_i,
        -sin_o * sin_w + cos_o * cos_w * cos_i,
        -cos_o * sin_i,
        sin_w * sin_i,
        cos_w * sin_i,
        cos_i,
    )
}

/// Heliocentric position at `jd`, ecliptic and equinox J2000, in AU
pub fn propagate(elements: &OrbitalElements, jd: f64) -> Result<Vector3<f64>> {
    elements.validate()?;
    let k = elements.at(jd)?;

    let ea = solve_kepler(k.m, k.e)?;
    let nu = true_anomaly(ea, k.e);
    let r = k.a * (1.0 - k.e * ea.cos());

    let perifocal = Vector3::new(r * nu.cos(), r * nu.sin(), 0.0);
    Ok(perifocal_to_ecliptic(k.node, k.i, k.peri) * perifocal)
}

/// Rotate an ecliptic J2000 vector onto the J2000 equatorial axes
pub fn to_equatorial(ecliptic: &Vector3<f64>) -> Vector3<f64> {
    let (sin_e, cos_e) = OBLIQUITY_J2000.sin_cos();
    Vector3::new(
        ecliptic.x,
        cos_e * ecliptic.y - sin_e * ecliptic.z,
        sin_e * ecliptic.y + cos_e * ecliptic.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    fn circular(a: f64) -> OrbitalElements {
        OrbitalElements {
            semi_major_axis: a,
            eccentricity: 0.0,
            inclination: 0.0,
            ascending_node: 0.0,
            arg_perihelion: 0.0,
            mean_anomaly: 0.0,
            epoch: crate::constants::J2000,
            mean_motion: None,
            rates: ElementRates::default(),
        }
    }

    #[test]
    fn test_circular_orbit_true_anomaly_equals_mean() {
        for &m in &[-3.0, -1.0, 0.0, 0.25, PI / 4.0, 2.5, PI] {
            let ea = solve_kepler(m, 0.0).unwrap();
            assert_eq!(ea, m);
            assert_eq!(true_anomaly(ea, 0.0), m);
        }
    }

    #[rstest]
    #[case(0.0167, 0.5)]
    #[case(0.2056, 2.0)]
    #[case(0.6, -1.2)]
    #[case(0.9, 0.1)]
    #[case(0.97, 3.0)]
    fn test_kepler_residual(#[case] e: f64, #[case] m: f64) {
        let ea = solve_kepler(m, e).unwrap();
        assert!((ea - e * ea.sin() - m).abs() < 1e-9);
    }

    #[test]
    fn test_kepler_random_sweep() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let e = rng.gen_range(0.0..0.95);
            let m = rng.gen_range(-PI..PI);
            let ea = solve_kepler(m, e).unwrap();
            assert!((ea - e * ea.sin() - m).abs() < 1e-9, "e={} m={}", e, m);
        }
    }

    #[test]
    fn test_kepler_non_convergent_is_reported() {
        let err = solve_kepler(f64::NAN, 0.5).unwrap_err();
        assert!(matches!(err, EphemError::KeplerNonConvergent { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_perihelion_and_aphelion() {
        let e = 0.3;
        let ea = solve_kepler(PI, e).unwrap();
        assert_relative_eq!(ea, PI, epsilon = 1e-12);
        assert_relative_eq!(true_anomaly(ea, e), PI, epsilon = 1e-12);
        assert_eq!(true_anomaly(0.0, e), 0.0);
    }

    #[test]
    fn test_circular_orbit_quarter_period() {
        let mut elements = circular(1.0);
        elements.mean_motion = Some(1.0);
        let pos = propagate(&elements, elements.epoch + 90.0).unwrap();
        assert_relative_eq!(pos.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(pos.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(pos.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_mean_motion() {
        // One AU orbit closes after one sidereal year
        let elements = circular(1.0);
        let period = TAU / elements.mean_motion_rad();
        assert_relative_eq!(period, 365.256_898_3, epsilon = 1e-4);
    }

    #[test]
    fn test_radius_bounds() {
        let elements = OrbitalElements {
            eccentricity: 0.2,
            inclination: 12.0,
            ascending_node: 80.0,
            arg_perihelion: 30.0,
            ..circular(2.0)
        };
        for day in (0..2000).step_by(37) {
            let r = propagate(&elements, elements.epoch + day as f64).unwrap().norm();
            assert!(r >= 2.0 * 0.8 - 1e-12 && r <= 2.0 * 1.2 + 1e-12);
        }
    }

    #[test]
    fn test_inclination_bounds_latitude() {
        let elements = OrbitalElements {
            inclination: 10.0,
            ascending_node: 45.0,
            ..circular(1.5)
        };
        for day in (0..1000).step_by(13) {
            let pos = propagate(&elements, elements.epoch + day as f64).unwrap();
            let lat = (pos.z / pos.norm()).asin();
            assert!(lat.abs() <= 10.0 * DEG2RAD + 1e-12);
        }
    }

    #[test]
    fn test_invalid_elements() {
        let mut elements = circular(1.0);
        elements.eccentricity = 1.0;
        assert!(matches!(
            propagate(&elements, 2451545.0),
            Err(EphemError::InvalidElements(_))
        ));

        let mut elements = circular(1.0);
        elements.semi_major_axis = -1.0;
        assert!(elements.validate().is_err());
    }

    #[test]
    fn test_equatorial_rotation() {
        let north_ecliptic_pole = Vector3::new(0.0, 0.0, 1.0);
        let eq = to_equatorial(&north_ecliptic_pole);
        assert_relative_eq!(eq.x, 0.0);
        assert_relative_eq!(eq.y, -OBLIQUITY_J2000.sin(), epsilon = 1e-15);
        assert_relative_eq!(eq.z, OBLIQUITY_J2000.cos(), epsilon = 1e-15);

        let v = Vector3::new(0.3, -0.7, 0.2);
        assert_relative_eq!(to_equatorial(&v).norm(), v.norm(), epsilon = 1e-15);
    }

    #[test]
    fn test_mean_longitude_form() {
        let elements = OrbitalElements::from_mean_longitude(
            1.0,
            0.01,
            0.0,
            100.0,
            102.0,
            0.0,
            crate::constants::J2000,
            35999.0,
            ElementRates::default(),
        );
        assert_relative_eq!(elements.arg_perihelion, 102.0);
        assert_relative_eq!(elements.mean_anomaly, -2.0);
        assert_relative_eq!(elements.mean_motion.unwrap(), 35999.0 / JULIAN_CENTURY);
    }
}
