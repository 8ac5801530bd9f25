//! Body catalogue and object-list resolution
//!
//! The built-in catalogue covers the Sun, the Moon and the nine classical
//! planets. Each entry knows its ephemeris table index, its physical
//! parameters and, for the planets, J2000 mean elements (Standish,
//! "Keplerian Elements for Approximate Positions of the Major Planets",
//! table 1, valid 1800–2050). Further bodies can be loaded from JSON.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::constants::J2000;
use crate::errors::{io_err, EphemError, Result};
use crate::jplephem::names::{self, indices, titlecase};
use crate::magnitude::PhysicalProperties;
use crate::orbits::{ElementRates, OrbitalElements};
use crate::settings::EphemerisMode;

/// Where a body's position comes from for the current run
#[derive(Debug, Clone, PartialEq)]
pub enum BodySource {
    /// Chebyshev coefficients at this table index
    Tabulated(usize),
    /// Heliocentric Kepler orbit
    OrbitalElements(OrbitalElements),
    /// The Sun when positions are heliocentric
    Heliocentre,
}

/// A body resolved for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Display name
    pub name: String,
    /// Position source in the run's mode
    pub source: BodySource,
    /// Photometric parameters
    pub physical: PhysicalProperties,
    /// The Sun gets its own photometry
    pub is_sun: bool,
}

/// One entry of the built-in catalogue
#[derive(Debug, Clone)]
pub struct CatalogueEntry {
    /// Canonical name
    pub name: &'static str,
    /// Ephemeris table index
    pub table_index: usize,
    /// Mean elements, if the body orbits the Sun
    pub elements: Option<OrbitalElements>,
    /// Photometric parameters
    pub physical: PhysicalProperties,
}

/// A body defined by orbital elements in a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomBody {
    /// Name used in object lists
    pub name: String,
    /// Heliocentric elements
    pub elements: OrbitalElements,
    /// Photometric parameters
    #[serde(flatten)]
    pub physical: PhysicalProperties,
}

/// Standish J2000 elements and rates: a, e, I, L, ϖ, Ω then their rates per century
type StandishRow = (usize, [f64; 6], [f64; 6]);

const STANDISH_ELEMENTS: &[StandishRow] = &[
    (
        indices::MERCURY,
        [0.38709927, 0.20563593, 7.00497902, 252.25032350, 77.45779628, 48.33076593],
        [0.00000037, 0.00001906, -0.00594749, 149472.67411175, 0.16047689, -0.12534081],
    ),
    (
        indices::VENUS,
        [0.72333566, 0.00677672, 3.39467605, 181.97909950, 131.60246718, 76.67984255],
        [0.00000390, -0.00004107, -0.00078890, 58517.81538729, 0.00268329, -0.27769418],
    ),
    (
        indices::EARTH_MOON_BARYCENTER,
        [1.00000261, 0.01671123, -0.00001531, 100.46457166, 102.93768193, 0.0],
        [0.00000562, -0.00004392, -0.01294668, 35999.37244981, 0.32327364, 0.0],
    ),
    (
        indices::MARS,
        [1.52371034, 0.09339410, 1.84969142, -4.55343205, -23.94362959, 49.55953891],
        [0.00001847, 0.00007882, -0.00813131, 19140.30268499, 0.44441088, -0.29257343],
    ),
    (
        indices::JUPITER,
        [5.20288700, 0.04838624, 1.30439695, 34.39644051, 14.72847983, 100.47390909],
        [-0.00011607, -0.00013253, -0.00183714, 3034.74612775, 0.21252668, 0.20469106],
    ),
    (
        indices::SATURN,
        [9.53667594, 0.05386179, 2.48599187, 49.95424423, 92.59887831, 113.66242448],
        [-0.00125060, -0.00050991, 0.00193609, 1222.49362201, -0.41897216, -0.28867794],
    ),
    (
        indices::URANUS,
        [19.18916464, 0.04725744, 0.77263783, 313.23810451, 170.95427630, 74.01692503],
        [-0.00196176, -0.00004397, -0.00242939, 428.48202785, 0.40805281, 0.04240589],
    ),
    (
        indices::NEPTUNE,
        [30.06992276, 0.00859048, 1.77004347, -55.12002969, 44.96476227, 131.78422574],
        [0.00026291, 0.00005105, 0.00035372, 218.45945325, -0.32241464, -0.00508664],
    ),
    (
        indices::PLUTO,
        [39.48211675, 0.24882730, 17.14001206, 238.92903833, 224.06891629, 110.30393684],
        [-0.00031596, 0.00005170, 0.00004818, 145.20780515, -0.04062942, -0.01183482],
    ),
];

/// Name, mean radius (m), geometric albedo; names double as table names
const PHYSICAL: &[(&str, f64, f64)] = &[
    ("sun", 695_700_000.0, 0.0),
    ("mercury", 2_439_700.0, 0.142),
    ("venus", 6_051_800.0, 0.689),
    ("mars", 3_389_500.0, 0.170),
    ("jupiter", 69_911_000.0, 0.538),
    ("saturn", 58_232_000.0, 0.499),
    ("uranus", 25_362_000.0, 0.488),
    ("neptune", 24_622_000.0, 0.442),
    ("pluto", 1_188_300.0, 0.52),
    ("moon", 1_737_400.0, 0.12),
];

fn from_row(row: &StandishRow) -> OrbitalElements {
    let (_, el, rate) = row;
    let rates = ElementRates {
        semi_major_axis: rate[0],
        eccentricity: rate[1],
        inclination: rate[2],
        ascending_node: rate[5],
        arg_perihelion: rate[4] - rate[5],
    };
    OrbitalElements::from_mean_longitude(
        el[0], el[1], el[2], el[3], el[4], el[5], J2000, rate[3], rates,
    )
}

/// J2000 mean elements of a planet or the Earth-Moon barycentre, by table index
pub fn mean_elements(index: usize) -> Option<OrbitalElements> {
    STANDISH_ELEMENTS
        .iter()
        .find(|(i, _, _)| *i == index)
        .map(from_row)
}

lazy_static! {
    /// Built-in bodies keyed by lowercase name
    static ref CATALOGUE: HashMap<&'static str, CatalogueEntry> = {
        let mut m = HashMap::new();
        for &(name, radius, albedo) in PHYSICAL.iter() {
            let table_index = match names::table_index(name) {
                Some(index) => index,
                None => continue,
            };
            m.insert(
                name,
                CatalogueEntry {
                    name,
                    table_index,
                    elements: mean_elements(table_index),
                    physical: PhysicalProperties {
                        radius,
                        albedo,
                        ..Default::default()
                    },
                },
            );
        }
        m
    };

    /// Mean elements of the Earth-Moon barycentre
    pub static ref EARTH_ELEMENTS: OrbitalElements = from_row(&STANDISH_ELEMENTS[2]);

    static ref LIST_SEPARATOR: Regex = Regex::new(r"[,\s]+").expect("valid separator regex");
}

/// Look up a built-in body, ignoring case
pub fn catalogue_entry(name: &str) -> Option<&'static CatalogueEntry> {
    CATALOGUE.get(name.trim().to_lowercase().as_str())
}

/// Names of all built-in bodies
pub fn catalogue_names() -> Vec<&'static str> {
    PHYSICAL.iter().map(|(name, ..)| *name).collect()
}

impl CatalogueEntry {
    /// Resolve this entry for a run in the given mode
    pub fn resolve(&self, mode: EphemerisMode) -> Result<Body> {
        let is_sun = self.table_index == indices::SUN;
        let source = match mode {
            EphemerisMode::Tabulated => BodySource::Tabulated(self.table_index),
            EphemerisMode::OrbitalElements if is_sun => BodySource::Heliocentre,
            EphemerisMode::OrbitalElements => match &self.elements {
                Some(elements) => BodySource::OrbitalElements(elements.clone()),
                None => {
                    return Err(EphemError::UnknownBody(format!(
                        "{} has no orbital elements; use the tabulated ephemeris",
                        titlecase(self.name)
                    )))
                }
            },
        };
        Ok(Body {
            name: titlecase(self.name),
            source,
            physical: self.physical,
            is_sun,
        })
    }
}

impl CustomBody {
    /// Resolve this body for a run in the given mode
    pub fn resolve(&self, mode: EphemerisMode) -> Result<Body> {
        match mode {
            EphemerisMode::OrbitalElements => {
                self.elements.validate()?;
                Ok(Body {
                    name: self.name.clone(),
                    source: BodySource::OrbitalElements(self.elements.clone()),
                    physical: self.physical,
                    is_sun: false,
                })
            }
            EphemerisMode::Tabulated => Err(EphemError::UnknownBody(format!(
                "{} is only defined by orbital elements; enable orbital-elements mode",
                self.name
            ))),
        }
    }
}

/// Split an object list on commas and whitespace
pub fn split_object_list(list: &str) -> Vec<&str> {
    LIST_SEPARATOR
        .split(list.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolve a comma or whitespace separated list of body names
///
/// Custom bodies take precedence over built-in ones of the same name. Any
/// unknown name fails the whole list.
pub fn resolve_object_list(
    list: &str,
    mode: EphemerisMode,
    custom: &[CustomBody],
) -> Result<Vec<Body>> {
    let names = split_object_list(list);
    if names.is_empty() {
        return Err(EphemError::InvalidSettings(
            "no objects requested".to_string(),
        ));
    }

    names
        .into_iter()
        .map(|name| {
            if let Some(body) = custom.iter().find(|b| b.name.eq_ignore_ascii_case(name)) {
                return body.resolve(mode);
            }
            match catalogue_entry(name) {
                Some(entry) => entry.resolve(mode),
                None => Err(EphemError::UnknownBody(name.to_string())),
            }
        })
        .collect()
}

/// Load custom bodies from a JSON array
pub fn load_custom_bodies<P: AsRef<Path>>(path: P) -> Result<Vec<CustomBody>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let bodies: Vec<CustomBody> =
        serde_json::from_str(&text).map_err(|source| EphemError::ConfigError {
            path: path.to_path_buf(),
            source,
        })?;

    for body in &bodies {
        body.elements.validate()?;
    }
    debug!("Loaded {} custom bodies from {:?}", bodies.len(), path);
    Ok(bodies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbits::propagate;
    use std::io::Write;

    #[test]
    fn test_catalogue_lookup_is_case_insensitive() {
        let mars = catalogue_entry("MaRs").unwrap();
        assert_eq!(mars.table_index, indices::MARS);
        assert!(mars.elements.is_some());
        assert!(catalogue_entry("vulcan").is_none());
        assert_eq!(catalogue_names().len(), 10);
    }

    #[test]
    fn test_catalogue_table_indices() {
        assert_eq!(CATALOGUE.len(), PHYSICAL.len());
        assert_eq!(catalogue_entry("sun").unwrap().table_index, indices::SUN);
        assert_eq!(catalogue_entry("moon").unwrap().table_index, indices::MOON);
        assert_eq!(catalogue_entry("pluto").unwrap().table_index, indices::PLUTO);
        for name in catalogue_names() {
            let entry = catalogue_entry(name).unwrap();
            assert_eq!(names::table_name(entry.table_index), Some(name.to_uppercase().as_str()));
        }
    }

    #[test]
    fn test_split_object_list() {
        assert_eq!(
            split_object_list(" mars, jupiter  saturn,,venus "),
            vec!["mars", "jupiter", "saturn", "venus"]
        );
        assert!(split_object_list(" , ").is_empty());
    }

    #[test]
    fn test_resolve_tabulated() {
        let bodies = resolve_object_list("sun,mars moon", EphemerisMode::Tabulated, &[]).unwrap();
        assert_eq!(bodies.len(), 3);
        assert!(bodies[0].is_sun);
        assert_eq!(bodies[1].name, "Mars");
        assert_eq!(bodies[1].source, BodySource::Tabulated(indices::MARS));
        assert_eq!(bodies[2].source, BodySource::Tabulated(indices::MOON));
    }

    #[test]
    fn test_resolve_orbital() {
        let bodies = resolve_object_list("sun jupiter", EphemerisMode::OrbitalElements, &[]).unwrap();
        assert_eq!(bodies[0].source, BodySource::Heliocentre);
        assert!(matches!(bodies[1].source, BodySource::OrbitalElements(_)));

        // The Moon has no heliocentric elements
        let err = resolve_object_list("moon", EphemerisMode::OrbitalElements, &[]).unwrap_err();
        assert!(matches!(err, EphemError::UnknownBody(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_and_empty_lists() {
        assert!(matches!(
            resolve_object_list("mars,vulcan", EphemerisMode::Tabulated, &[]),
            Err(EphemError::UnknownBody(name)) if name == "vulcan"
        ));
        assert!(matches!(
            resolve_object_list("  ", EphemerisMode::Tabulated, &[]),
            Err(EphemError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_standish_elements_give_sensible_orbits() {
        let earth = propagate(&EARTH_ELEMENTS, J2000).unwrap();
        assert!((earth.norm() - 0.983).abs() < 0.01);

        let jupiter = catalogue_entry("jupiter").unwrap().elements.clone().unwrap();
        let r = propagate(&jupiter, 2_460_000.5).unwrap().norm();
        assert!(r > 4.9 && r < 5.5, "r = {}", r);
    }

    #[test]
    fn test_load_custom_bodies() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{
                "name": "Ceres",
                "elements": {{
                    "semi_major_axis": 2.7675,
                    "eccentricity": 0.0758,
                    "inclination": 10.59,
                    "ascending_node": 80.31,
                    "arg_perihelion": 73.6,
                    "mean_anomaly": 95.99,
                    "epoch": 2459600.5
                }},
                "radius": 469700.0,
                "albedo": 0.09,
                "absolute_magnitude": 3.34,
                "slope": 0.12
            }}]"#
        )
        .unwrap();

        let custom = load_custom_bodies(file.path()).unwrap();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].physical.absolute_magnitude, Some(3.34));

        let bodies = resolve_object_list("ceres", EphemerisMode::OrbitalElements, &custom).unwrap();
        assert_eq!(bodies[0].name, "Ceres");
        assert!(resolve_object_list("ceres", EphemerisMode::Tabulated, &custom).is_err());
    }

    #[test]
    fn test_bad_custom_bodies_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            load_custom_bodies(file.path()),
            Err(EphemError::ConfigError { .. })
        ));
        assert!(matches!(
            load_custom_bodies("/nonexistent/bodies.json"),
            Err(EphemError::FileError { .. })
        ));
    }
}
