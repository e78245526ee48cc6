//! Jurisdiction tables: state codes and OCR error-correction maps.
//! Loaded from versioned JSON so a jurisdiction can change without a rebuild;
//! `PlateTables::builtin()` carries the Indian defaults.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// On-disk table file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFile {
    pub version: u32,
    #[serde(default)]
    pub jurisdiction: String,
    pub state_codes: Vec<String>,
    pub prefix_confusions: Vec<Substitution>,
    pub cross_state_fixups: Vec<Fixup>,
    #[serde(default)]
    pub known_patterns: Vec<KnownPatternFile>,
}

/// Plain `from → to` string substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

/// Cross-state fixup applied before the normalization cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixup {
    pub from: String,
    pub to: String,
    /// Only rewrite when the text starts with `from`.
    #[serde(default)]
    pub prefix_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownPatternFile {
    pub state: String,
    pub rules: Vec<KnownRuleFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownRuleFile {
    pub pattern: String,
    /// Regex replacement template, `${1}` style.
    pub replacement: String,
}

/// Compiled known-plate rule.
#[derive(Debug, Clone)]
pub struct KnownRule {
    pub regex: Regex,
    pub replacement: String,
}

/// Ordered rule list for one state.
#[derive(Debug, Clone)]
pub struct KnownPatternSet {
    pub state: String,
    pub rules: Vec<KnownRule>,
}

/// Validated, compiled tables. Read-only once built; share through `Arc`.
#[derive(Debug, Clone)]
pub struct PlateTables {
    version: u32,
    jurisdiction: String,
    state_codes: Vec<String>,
    prefix_confusions: Vec<Substitution>,
    cross_state_fixups: Vec<Fixup>,
    known_patterns: Vec<KnownPatternSet>,
    source: TableFile,
}

#[derive(Debug)]
pub enum TableError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Pattern { pattern: String, source: regex::Error },
    Invalid(String),
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::Io(e) => write!(f, "table IO error: {e}"),
            TableError::Parse(e) => write!(f, "table parse error: {e}"),
            TableError::Pattern { pattern, source } => {
                write!(f, "bad known-plate pattern {pattern:?}: {source}")
            }
            TableError::Invalid(msg) => write!(f, "invalid table: {msg}"),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Io(e) => Some(e),
            TableError::Parse(e) => Some(e),
            TableError::Pattern { source, .. } => Some(source),
            TableError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for TableError {
    fn from(e: std::io::Error) -> Self {
        TableError::Io(e)
    }
}

impl From<serde_json::Error> for TableError {
    fn from(e: serde_json::Error) -> Self {
        TableError::Parse(e)
    }
}

const STATE_CODES: [&str; 16] = [
    "MH", "DL", "TN", "KA", "AP", "TS", "GJ", "MP", "UP", "HR", "PB", "RJ", "KL", "WB", "BR", "OD",
];

/// Priority order matters: first prefix hit wins.
const PREFIX_CONFUSIONS: [(&str, &str); 7] = [
    ("MF", "MH"),
    ("NF", "MH"),
    ("D1", "DL"),
    ("TH", "TN"),
    ("TC", "TS"),
    ("BJ", "RJ"),
    ("KR", "KL"),
];

/// `(from, to, prefix_only)`
const CROSS_STATE_FIXUPS: [(&str, &str, bool); 18] = [
    ("FMH", "MH", false),
    ("FUP", "UP", false),
    ("FDL", "DL", false),
    ("NMH", "MH", false),
    ("NPB", "PB", false),
    ("NRJ", "RJ", false),
    ("HRB", "HR", false),
    ("TNN", "TN", false),
    ("DLL", "DL", false),
    ("KRA", "KA", false),
    ("TTS", "TS", false),
    ("NIP", "MP", false),
    ("PJB", "PB", false),
    ("RAJ", "RJ", false),
    ("KER", "KL", false),
    ("6J", "GJ", false),
    ("8R", "BR", false),
    ("O0", "OD", true),
];

const RJ_RULES: [(&str, &str); 3] = [
    (r"RJ([O0-9]+)([A-Z]{1,3})([O0-9]+)", "RJ${1}${2}${3}"),
    (r"RJI([O0-9]+)([A-Z]{1,2})([O0-9]+)", "RJ1${1}${2}${3}"),
    (r"RJ([O0-9]{1,2})([A-Z]{1,3})([O0-9]{1,4})", "RJ${1}${2}${3}"),
];

impl TableFile {
    /// The Indian jurisdiction defaults, identical to `tables/india.json`.
    pub fn builtin() -> Self {
        Self {
            version: 1,
            jurisdiction: "IN".to_string(),
            state_codes: STATE_CODES.iter().map(|s| s.to_string()).collect(),
            prefix_confusions: PREFIX_CONFUSIONS
                .iter()
                .map(|(from, to)| Substitution {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
            cross_state_fixups: CROSS_STATE_FIXUPS
                .iter()
                .map(|(from, to, prefix_only)| Fixup {
                    from: from.to_string(),
                    to: to.to_string(),
                    prefix_only: *prefix_only,
                })
                .collect(),
            known_patterns: vec![KnownPatternFile {
                state: "RJ".to_string(),
                rules: RJ_RULES
                    .iter()
                    .map(|(pattern, replacement)| KnownRuleFile {
                        pattern: pattern.to_string(),
                        replacement: replacement.to_string(),
                    })
                    .collect(),
            }],
        }
    }
}

fn is_state_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}

impl PlateTables {
    /// Validate and compile a table file.
    pub fn from_file_data(file: TableFile) -> Result<Self, TableError> {
        if file.state_codes.is_empty() {
            return Err(TableError::Invalid("no state codes".to_string()));
        }
        if let Some(bad) = file.state_codes.iter().find(|c| !is_state_code(c)) {
            return Err(TableError::Invalid(format!(
                "state code {bad:?} is not two uppercase letters"
            )));
        }
        if let Some(bad) = file
            .prefix_confusions
            .iter()
            .find(|s| s.from.len() != 2 || s.to.len() != 2)
        {
            return Err(TableError::Invalid(format!(
                "prefix confusion {}→{} must map two characters to two",
                bad.from, bad.to
            )));
        }
        if let Some(bad) = file.cross_state_fixups.iter().find(|f| f.from.is_empty()) {
            return Err(TableError::Invalid(format!(
                "fixup to {:?} has an empty source",
                bad.to
            )));
        }

        let mut known_patterns = Vec::with_capacity(file.known_patterns.len());
        for set in &file.known_patterns {
            if !is_state_code(&set.state) {
                return Err(TableError::Invalid(format!(
                    "known-pattern state {:?} is not two uppercase letters",
                    set.state
                )));
            }
            let mut rules = Vec::with_capacity(set.rules.len());
            for rule in &set.rules {
                let regex = Regex::new(&rule.pattern).map_err(|source| TableError::Pattern {
                    pattern: rule.pattern.clone(),
                    source,
                })?;
                rules.push(KnownRule {
                    regex,
                    replacement: rule.replacement.clone(),
                });
            }
            known_patterns.push(KnownPatternSet {
                state: set.state.clone(),
                rules,
            });
        }

        Ok(Self {
            version: file.version,
            jurisdiction: file.jurisdiction.clone(),
            state_codes: file.state_codes.clone(),
            prefix_confusions: file.prefix_confusions.clone(),
            cross_state_fixups: file.cross_state_fixups.clone(),
            known_patterns,
            source: file,
        })
    }

    /// Built-in Indian tables. The builtin data is checked by tests, so
    /// compilation cannot fail.
    pub fn builtin() -> Self {
        Self::from_file_data(TableFile::builtin()).expect("builtin plate tables are valid")
    }

    pub fn from_json(text: &str) -> Result<Self, TableError> {
        let file: TableFile = serde_json::from_str(text)?;
        Self::from_file_data(file)
    }

    /// Load tables from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, TableError> {
        let content = std::fs::read_to_string(path)?;
        let tables = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            version = tables.version,
            jurisdiction = %tables.jurisdiction,
            "plate_tables_loaded"
        );
        Ok(tables)
    }

    /// Load tables from `path`, falling back to the builtin set on any error.
    pub fn load_or_builtin(path: &Path) -> Self {
        Self::load_from_file(path).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "plate table load failed, using builtin");
            Self::builtin()
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    /// StateCodeSet, in scan order.
    pub fn state_codes(&self) -> &[String] {
        &self.state_codes
    }

    pub fn is_known_state(&self, code: &str) -> bool {
        self.state_codes.iter().any(|s| s == code)
    }

    pub fn prefix_confusions(&self) -> &[Substitution] {
        &self.prefix_confusions
    }

    pub fn cross_state_fixups(&self) -> &[Fixup] {
        &self.cross_state_fixups
    }

    pub fn known_patterns(&self) -> &[KnownPatternSet] {
        &self.known_patterns
    }

    /// The uncompiled data these tables were built from.
    pub fn to_file_data(&self) -> &TableFile {
        &self.source
    }
}

impl Default for PlateTables {
    fn default() -> Self {
        Self::builtin()
    }
}
