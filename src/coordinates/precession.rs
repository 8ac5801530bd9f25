//! Precession of the equinoxes
//!
//! Rigorous precession between two arbitrary epochs after Meeus,
//! _Astronomical Algorithms_ (2nd ed.), chapter 21: equations 21.2–21.4 for
//! equatorial coordinates and 21.5–21.7 for ecliptic coordinates. Both
//! epochs are Julian dates (TT); all angles are radians.

use crate::constants::{ASEC2RAD, DEG2RAD, J2000, JULIAN_CENTURY};

/// Precess ecliptic longitude and latitude from `jd_from` to `jd_to`
///
/// Returns the input unchanged when the epochs are equal. The returned
/// longitude is not wrapped.
pub fn precess(jd_from: f64, jd_to: f64, lon: f64, lat: f64) -> (f64, f64) {
    if jd_from == jd_to {
        return (lon, lat);
    }

    let big_t = (jd_from - J2000) / JULIAN_CENTURY;
    let t = (jd_to - jd_from) / JULIAN_CENTURY;
    let (t2, t3) = (t * t, t * t * t);
    let big_t2 = big_t * big_t;

    let eta = ((47.0029 - 0.06603 * big_t + 0.000598 * big_t2) * t
        + (-0.03302 + 0.000598 * big_t) * t2
        + 0.000060 * t3)
        * ASEC2RAD;
    let pi_node = 174.876384 * DEG2RAD
        + (3289.4789 * big_t + 0.60622 * big_t2 - (869.8089 + 0.50491 * big_t) * t + 0.03536 * t2)
            * ASEC2RAD;
    let p = ((5029.0966 + 2.22226 * big_t - 0.000042 * big_t2) * t
        + (1.11113 - 0.000042 * big_t) * t2
        - 0.000006 * t3)
        * ASEC2RAD;

    let (sin_eta, cos_eta) = eta.sin_cos();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_d, cos_d) = (pi_node - lon).sin_cos();

    let a = cos_eta * cos_lat * sin_d - sin_eta * sin_lat;
    let b = cos_lat * cos_d;
    let c = cos_eta * sin_lat + sin_eta * cos_lat * sin_d;

    let new_lon = p + pi_node - a.atan2(b);
    let new_lat = c.clamp(-1.0, 1.0).asin();
    (new_lon, new_lat)
}

/// Precess right ascension and declination from `jd_from` to `jd_to`
///
/// Returns the input unchanged when the epochs are equal. The returned right
/// ascension is not wrapped.
pub fn precess_equatorial(jd_from: f64, jd_to: f64, ra: f64, dec: f64) -> (f64, f64) {
    if jd_from == jd_to {
        return (ra, dec);
    }

    let big_t = (jd_from - J2000) / JULIAN_CENTURY;
    let t = (jd_to - jd_from) / JULIAN_CENTURY;
    let (t2, t3) = (t * t, t * t * t);
    let big_t2 = big_t * big_t;

    let base = 2306.2181 + 1.39656 * big_t - 0.000139 * big_t2;
    let zeta = (base * t + (0.30188 - 0.000344 * big_t) * t2 + 0.017998 * t3) * ASEC2RAD;
    let z = (base * t + (1.09468 + 0.000066 * big_t) * t2 + 0.018203 * t3) * ASEC2RAD;
    let theta = ((2004.3109 - 0.85330 * big_t - 0.000217 * big_t2) * t
        - (0.42665 + 0.000217 * big_t) * t2
        - 0.041833 * t3)
        * ASEC2RAD;

    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_dec, cos_dec) = dec.sin_cos();
    let (sin_h, cos_h) = (ra + zeta).sin_cos();

    let a = cos_dec * sin_h;
    let b = cos_theta * cos_dec * cos_h - sin_theta * sin_dec;
    let c = sin_theta * cos_dec * cos_h + cos_theta * sin_dec;

    // Near the poles asin loses precision; use the cosine branch instead
    let new_dec = if c.abs() > 0.99 {
        c.signum() * a.hypot(b).min(1.0).acos()
    } else {
        c.asin()
    };

    (a.atan2(b) + z, new_dec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::{normalize_longitude, normalize_ra};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    #[test]
    fn test_identity_at_equal_epochs() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..200 {
            let jd = rng.gen_range(2_400_000.0..2_500_000.0);
            let lon = rng.gen_range(-PI..PI);
            let lat = rng.gen_range(-PI / 2.0..PI / 2.0);
            assert_eq!(precess(jd, jd, lon, lat), (lon, lat));
            assert_eq!(precess_equatorial(jd, jd, lon, lat), (lon, lat));
        }
    }

    #[test]
    fn test_equatorial_theta_persei() {
        // Meeus example 21.b
        let (ra, dec) = precess_equatorial(
            J2000,
            2_462_088.69,
            41.054063 * DEG2RAD,
            49.227750 * DEG2RAD,
        );
        assert_relative_eq!(normalize_ra(ra) / DEG2RAD, 41.547214, epsilon = 2e-6);
        assert_relative_eq!(dec / DEG2RAD, 49.348483, epsilon = 2e-6);
    }

    #[test]
    fn test_ecliptic_venus() {
        // Meeus example 21.c
        let (lon, lat) = precess(
            2_433_282.4235,
            1_643_074.5,
            149.48194 * DEG2RAD,
            1.76549 * DEG2RAD,
        );
        let lon_deg = normalize_longitude(lon) / DEG2RAD;
        assert!((lon_deg - 118.704).abs() < 1e-3, "lon = {}", lon_deg);
        assert!((lat / DEG2RAD - 1.615).abs() < 1e-3, "lat = {}", lat / DEG2RAD);
    }

    #[test]
    fn test_general_precession_rate() {
        // A point on the ecliptic drifts about 50.3″ per year in longitude
        let (lon, lat) = precess(J2000, J2000 + 365.25, 0.3, 0.0);
        let drift = (lon - 0.3) / ASEC2RAD;
        assert!((drift - 50.29).abs() < 0.1, "drift = {}", drift);
        assert!(lat.abs() < 1e-6);
    }

    #[test]
    fn test_round_trip() {
        let jd = 2_460_000.5;
        let (ra, dec) = precess_equatorial(J2000, jd, 1.2, -0.4);
        let (ra0, dec0) = precess_equatorial(jd, J2000, ra, dec);
        assert_relative_eq!(normalize_ra(ra0), 1.2, epsilon = 1e-9);
        assert_relative_eq!(dec0, -0.4, epsilon = 1e-9);

        let (lon, lat) = precess(J2000, jd, 2.0, 0.1);
        let (lon0, lat0) = precess(jd, J2000, lon, lat);
        assert_relative_eq!(normalize_longitude(lon0), 2.0, epsilon = 1e-9);
        assert_relative_eq!(lat0, 0.1, epsilon = 1e-9);
    }
}
