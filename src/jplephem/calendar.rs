//! Julian date and calendar conversions
//!
//! Used to label file coverage and to accept calendar dates wherever a
//! Julian date is expected on the command line. Dates are treated as plain
//! UTC; no time-scale offsets are applied.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::constants::DAY_S;
use crate::errors::{EphemError, Result};

/// Julian date of 1970-01-01T00:00:00
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Convert a UTC instant to a Julian date
pub fn datetime_to_jd(dt: &DateTime<Utc>) -> f64 {
    let millis = dt.timestamp_millis() as f64;
    UNIX_EPOCH_JD + millis / 1000.0 / DAY_S
}

/// Convert a Julian date to a UTC instant, to the nearest millisecond
pub fn jd_to_datetime(jd: f64) -> Result<DateTime<Utc>> {
    let millis = ((jd - UNIX_EPOCH_JD) * DAY_S * 1000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return Err(EphemError::InvalidSettings(format!(
            "JD {} has no calendar date",
            jd
        )));
    }
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .ok_or_else(|| EphemError::InvalidSettings(format!("JD {} has no calendar date", jd)))
}

/// Format a Julian date as `YYYY-MM-DD HH:MM:SS`
pub fn format_date(jd: f64) -> String {
    match jd_to_datetime(jd) {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => format!("JD {}", jd),
    }
}

/// Parse a Julian date or a UTC calendar date
///
/// Accepts a bare number, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` or RFC 3339.
pub fn parse_jd(text: &str) -> Result<f64> {
    let text = text.trim();
    if let Ok(jd) = text.parse::<f64>() {
        return Ok(jd);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(datetime_to_jd(&dt.with_timezone(&Utc)));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(datetime_to_jd(&naive.and_utc()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(datetime_to_jd(&midnight.and_utc()));
        }
    }
    Err(EphemError::InvalidSettings(format!(
        "cannot read {:?} as a Julian date or calendar date",
        text
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::J2000;

    #[test]
    fn test_calendar_dates() {
        assert_eq!(parse_jd("1969-07-20").unwrap(), 2_440_422.5);
        assert_eq!(parse_jd("1900-01-01").unwrap(), 2_415_020.5);
        assert_eq!(parse_jd("2020-01-01").unwrap(), 2_458_849.5);
        assert_eq!(format_date(2_415_020.5), "1900-01-01 00:00:00");
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = jd_to_datetime(J2000).unwrap();
        assert_eq!(dt.format("%Y-%m-%dT%H:%M:%S").to_string(), "2000-01-01T12:00:00");
        assert_eq!(datetime_to_jd(&dt), J2000);
        assert_eq!(format_date(2_460_000.5), "2023-02-25 00:00:00");
        assert!(jd_to_datetime(f64::NAN).is_err());
    }

    #[test]
    fn test_parse_jd() {
        assert_eq!(parse_jd("2451545.0").unwrap(), J2000);
        assert_eq!(parse_jd("2000-01-01T12:00:00").unwrap(), J2000);
        assert_eq!(parse_jd("2000-01-01T12:00:00Z").unwrap(), J2000);
        assert_eq!(parse_jd(" 2000-01-01 ").unwrap(), J2000 - 0.5);
        assert!(parse_jd("yesterday").is_err());
    }
}
