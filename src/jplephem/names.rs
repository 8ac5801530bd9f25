//! Body table names and indices
//!
//! Mappings between body names and the table indices used in DE-style
//! binary ephemerides.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Map from table index to canonical name
    static ref TABLE_NAMES: HashMap<usize, &'static str> = {
        let mut m = HashMap::new();
        // First entry per index wins, which is the canonical spelling
        for &(index, name) in TABLE_NAME_PAIRS.iter() {
            m.entry(index).or_insert(name);
        }
        m
    };

    /// Map from lowercase name to table index
    static ref TABLE_INDICES: HashMap<String, usize> = {
        let mut m = HashMap::new();
        for &(index, name) in TABLE_NAME_PAIRS.iter() {
            m.insert(name.to_lowercase(), index);
        }
        m
    };
}

/// Get the canonical name of a table index
pub fn table_name(index: usize) -> Option<&'static str> {
    TABLE_NAMES.get(&index).copied()
}

/// Get the table index of a body name, ignoring case
pub fn table_index(name: &str) -> Option<usize> {
    TABLE_INDICES.get(&name.trim().to_lowercase()).copied()
}

/// Title-case a body name for display
pub fn titlecase(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Pairs of (table index, name)
const TABLE_NAME_PAIRS: &[(usize, &str)] = &[
    (0, "MERCURY"),
    (1, "VENUS"),
    (2, "EARTH-MOON BARYCENTER"),
    (2, "EARTH MOON BARYCENTER"),
    (2, "EMB"),
    (3, "MARS"),
    (4, "JUPITER"),
    (5, "SATURN"),
    (6, "URANUS"),
    (7, "NEPTUNE"),
    (8, "PLUTO"),
    (9, "MOON"),
    (10, "SUN"),
];

/// Table indices of the DE body layout
pub mod indices {
    /// Mercury
    pub const MERCURY: usize = 0;
    /// Venus
    pub const VENUS: usize = 1;
    /// Earth-Moon barycentre
    pub const EARTH_MOON_BARYCENTER: usize = 2;
    /// Mars
    pub const MARS: usize = 3;
    /// Jupiter
    pub const JUPITER: usize = 4;
    /// Saturn
    pub const SATURN: usize = 5;
    /// Uranus
    pub const URANUS: usize = 6;
    /// Neptune
    pub const NEPTUNE: usize = 7;
    /// Pluto
    pub const PLUTO: usize = 8;
    /// Moon, relative to the Earth
    pub const MOON: usize = 9;
    /// Sun
    pub const SUN: usize = 10;
    /// Number of standard table entries
    pub const COUNT: usize = 11;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_ways() {
        assert_eq!(table_index("mars"), Some(indices::MARS));
        assert_eq!(table_index(" Jupiter "), Some(indices::JUPITER));
        assert_eq!(table_index("emb"), Some(indices::EARTH_MOON_BARYCENTER));
        assert_eq!(table_index("vulcan"), None);

        assert_eq!(table_name(indices::SUN), Some("SUN"));
        assert_eq!(table_name(2), Some("EARTH-MOON BARYCENTER"));
        assert_eq!(table_name(42), None);
    }

    #[test]
    fn test_titlecase() {
        assert_eq!(titlecase("EARTH-MOON BARYCENTER"), "Earth-moon Barycenter");
        assert_eq!(titlecase("mars"), "Mars");
    }
}
