//! Canonical plate grammar: `SS DD CCC NNNN` (state, district, series, number).

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::tables::PlateTables;

lazy_static! {
    static ref CANONICAL: Regex =
        Regex::new(r"^([A-Z]{2})([0-9]{1,2})([A-Z]{1,3})([0-9]{1,4})$").unwrap();
}

/// Returns whether `text` matches the canonical grammar exactly.
pub fn is_valid(text: &str) -> bool {
    CANONICAL.is_match(text)
}

/// Canonical decomposition of a plate string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PlateComponents {
    pub state_code: String,
    pub district: String,
    pub series: String,
    pub number: String,
}

impl PlateComponents {
    /// Split a canonical plate. Returns `None` when the text is not canonical
    /// or its state code is not in the jurisdiction's StateCodeSet.
    pub fn parse(text: &str, tables: &PlateTables) -> Option<Self> {
        let caps = CANONICAL.captures(text)?;
        let state_code = &caps[1];
        if !tables.is_known_state(state_code) {
            return None;
        }
        Some(Self {
            state_code: state_code.to_string(),
            district: caps[2].to_string(),
            series: caps[3].to_string(),
            number: caps[4].to_string(),
        })
    }

    /// Compact form without separators, e.g. `RJ14CV0002`.
    pub fn compact(&self) -> String {
        format!(
            "{}{}{}{}",
            self.state_code, self.district, self.series, self.number
        )
    }
}

impl fmt::Display for PlateComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.state_code, self.district, self.series, self.number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar() {
        assert!(is_valid("RJ14CV0002"));
        assert!(is_valid("MH2A1"));
        assert!(is_valid("DL01ABC1234"));
        assert!(!is_valid("DL01ABCD1234"));
        assert!(!is_valid("DL012AB1234"));
        assert!(!is_valid("DL01AB12345"));
        assert!(!is_valid("dl01ab1234"));
        assert!(!is_valid("MHO2DN8748"));
        assert!(!is_valid(""));
        assert!(!is_valid("RJ14CV0002 "));
    }

    #[test]
    fn parse_and_display() {
        let tables = PlateTables::builtin();
        let plate = PlateComponents::parse("RJ14CV0002", &tables).unwrap();
        assert_eq!(plate.district, "14");
        assert_eq!(plate.series, "CV");
        assert_eq!(plate.to_string(), "RJ-14-CV-0002");
        assert_eq!(plate.compact(), "RJ14CV0002");
    }

    #[test]
    fn parse_requires_known_state() {
        let tables = PlateTables::builtin();
        assert!(PlateComponents::parse("ZZ14CV0002", &tables).is_none());
        assert!(PlateComponents::parse("RJ14CV00021", &tables).is_none());
    }
}
