//! Pattern normalizer: rebuilds a canonical plate from the best OCR text and
//! the whole candidate pool through an ordered cascade of fallback tiers.
//!
//! Tiers, in trust order:
//! 1. Rajasthan repair (95)      6. candidate consensus (85)
//! 2. Maharashtra repair (95)    7. embedded pattern (80)
//! 3. already canonical (100)    8. last resort (70)
//! 4. known state pattern (90)   9. best candidate (65)
//! 5. state split (90 / 92)     10. passthrough (60)
//!
//! Order is observable on ambiguous input and must not change.

mod tiers;

use serde::Serialize;
use tracing::debug;

use crate::candidate::Candidate;
use crate::plate::{self, PlateComponents};
use crate::tables::PlateTables;

/// Which cascade tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    RajasthanRepair,
    MaharashtraRepair,
    Canonical,
    KnownPattern,
    StateSplit,
    CandidateConsensus,
    EmbeddedPattern,
    LastResort,
    BestCandidate,
    Passthrough,
}

impl Tier {
    /// 1-based position in the cascade.
    pub fn rank(self) -> u8 {
        match self {
            Tier::RajasthanRepair => 1,
            Tier::MaharashtraRepair => 2,
            Tier::Canonical => 3,
            Tier::KnownPattern => 4,
            Tier::StateSplit => 5,
            Tier::CandidateConsensus => 6,
            Tier::EmbeddedPattern => 7,
            Tier::LastResort => 8,
            Tier::BestCandidate => 9,
            Tier::Passthrough => 10,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::RajasthanRepair => "rajasthan_repair",
            Tier::MaharashtraRepair => "maharashtra_repair",
            Tier::Canonical => "canonical",
            Tier::KnownPattern => "known_pattern",
            Tier::StateSplit => "state_split",
            Tier::CandidateConsensus => "candidate_consensus",
            Tier::EmbeddedPattern => "embedded_pattern",
            Tier::LastResort => "last_resort",
            Tier::BestCandidate => "best_candidate",
            Tier::Passthrough => "passthrough",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Final text and confidence of one recognition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationResult {
    /// `None` only when there was no candidate at all.
    pub plate_text: Option<String>,
    pub confidence: f64,
    /// Diagnostic only.
    pub tier: Option<Tier>,
}

impl NormalizationResult {
    pub fn empty() -> Self {
        Self {
            plate_text: None,
            confidence: 0.0,
            tier: None,
        }
    }

    /// Canonical decomposition, when the text is a valid plate of a known state.
    pub fn components(&self, tables: &PlateTables) -> Option<PlateComponents> {
        self.plate_text
            .as_deref()
            .and_then(|t| PlateComponents::parse(t, tables))
    }
}

/// Everything a tier may look at. Tiers are pure functions of this.
pub(crate) struct TierInput<'a> {
    /// Text as handed to `normalize`.
    pub original: &'a str,
    /// Text after the pre-cascade fixups.
    pub text: &'a str,
    pub pool: &'a [Candidate],
    pub tables: &'a PlateTables,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TierMatch {
    pub text: String,
    pub confidence: f64,
}

impl TierMatch {
    fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

type TierFn = fn(&TierInput<'_>) -> Option<TierMatch>;

const CASCADE: [(Tier, TierFn); 9] = [
    (Tier::RajasthanRepair, tiers::rajasthan_repair),
    (Tier::MaharashtraRepair, tiers::maharashtra_repair),
    (Tier::Canonical, tiers::canonical),
    (Tier::KnownPattern, tiers::known_pattern),
    (Tier::StateSplit, tiers::state_split),
    (Tier::CandidateConsensus, tiers::candidate_consensus),
    (Tier::EmbeddedPattern, tiers::embedded_pattern),
    (Tier::LastResort, tiers::last_resort),
    (Tier::BestCandidate, tiers::best_candidate),
];

/// Rewrite common cross-state OCR confusions, plus the `IGC…VO` → `16C…V0`
/// fix for Rajasthan CV-series plates.
pub fn apply_fixups(text: &str, tables: &PlateTables) -> String {
    let mut out = text.to_string();

    if out.contains("IGC") && (out.contains("VO") || out.contains("V0")) {
        out = out.replace("IGC", "16C").replace("VO", "V0");
        debug!(text = %out, "igc_series_fixed");
    }

    for fixup in tables.cross_state_fixups() {
        let from = fixup.from.as_str();
        if fixup.prefix_only {
            if out.starts_with(from) {
                out = format!("{}{}", fixup.to, &out[from.len()..]);
                debug!(from, to = %fixup.to, "prefix_fixup_applied");
            }
        } else if out.contains(from) {
            out = out.replace(from, &fixup.to);
            debug!(from, to = %fixup.to, "fixup_applied");
        }
    }

    out
}

/// Run the cascade over `best_text` and its candidate pool.
///
/// Canonical input skips the fixups so it always comes back unchanged.
pub fn normalize(best_text: &str, pool: &[Candidate], tables: &PlateTables) -> NormalizationResult {
    if best_text.is_empty() {
        return NormalizationResult::empty();
    }

    let working = if plate::is_valid(best_text) {
        best_text.to_string()
    } else {
        apply_fixups(best_text, tables)
    };
    let input = TierInput {
        original: best_text,
        text: &working,
        pool,
        tables,
    };

    let (tier, found) = CASCADE
        .iter()
        .find_map(|(tier, rule)| rule(&input).map(|m| (*tier, m)))
        .unwrap_or_else(|| (Tier::Passthrough, tiers::passthrough(&input)));

    debug!(
        input = best_text,
        tier = tier.name(),
        text = %found.text,
        confidence = found.confidence,
        "tier_matched"
    );
    NormalizationResult {
        plate_text: Some(found.text),
        confidence: found.confidence,
        tier: Some(tier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(entries: &[(&str, f64)]) -> Vec<Candidate> {
        let tables = PlateTables::builtin();
        entries
            .iter()
            .map(|(t, c)| Candidate::new(t, *c, &tables))
            .collect()
    }

    fn run(text: &str, entries: &[(&str, f64)]) -> NormalizationResult {
        normalize(text, &pool(entries), &PlateTables::builtin())
    }

    #[test]
    fn empty_text_has_no_plate() {
        assert_eq!(run("", &[]), NormalizationResult::empty());
    }

    #[test]
    fn fixups() {
        let tables = PlateTables::builtin();
        assert_eq!(apply_fixups("FMH12AB1234", &tables), "MH12AB1234");
        assert_eq!(apply_fixups("XRAJ14CV2", &tables), "XRJ14CV2");
        assert_eq!(apply_fixups("RJIGCVO002", &tables), "RJ16CV0002");
        assert_eq!(apply_fixups("6J01AB1234", &tables), "GJ01AB1234");
        assert_eq!(apply_fixups("O012AB1234", &tables), "OD12AB1234");
        // O0 only at the state position
        assert_eq!(apply_fixups("RJI4CVO0O2", &tables), "RJI4CVO0O2");
        assert_eq!(apply_fixups("MH12A8R1", &tables), "MH12ABR1");
        assert_eq!(apply_fixups("KA016J12", &tables), "KA01GJ12");
    }

    #[test]
    fn igc_needs_a_vo_marker() {
        let tables = PlateTables::builtin();
        assert_eq!(apply_fixups("RJIGCX002", &tables), "RJIGCX002");
    }

    #[test]
    fn canonical_input_is_idempotent() {
        for text in [
            "RJ14CV0002",
            "MH02DN8748",
            "RJ12AO12",
            "DL01DLL1",
            "KA1A1",
            "OD02ABC1234",
            "ZZ99ZZZ9999",
            "MH02RAJ8748",
        ] {
            let result = run(text, &[(text, 100.0)]);
            assert_eq!(result.plate_text.as_deref(), Some(text));
            assert_eq!(result.confidence, 100.0);
            assert_eq!(result.tier, Some(Tier::Canonical));
        }
    }

    #[test]
    fn fixup_then_canonical() {
        let result = run("FMH12AB1234", &[]);
        assert_eq!(result.plate_text.as_deref(), Some("MH12AB1234"));
        assert_eq!(result.tier, Some(Tier::Canonical));
    }

    #[test]
    fn series_digit_confusion_fixed_anywhere() {
        let result = run("KA018R1234", &[]);
        assert_eq!(result.plate_text.as_deref(), Some("KA01BR1234"));
        assert_eq!(result.tier, Some(Tier::Canonical));
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn components_of_result() {
        let tables = PlateTables::builtin();
        let result = run("MHO2DN8748", &[]);
        let plate = result.components(&tables).unwrap();
        assert_eq!(plate.to_string(), "MH-02-DN-8748");
        assert!(NormalizationResult::empty().components(&tables).is_none());
    }

    #[test]
    fn tier_ranks_follow_cascade_order() {
        let ranks: Vec<u8> = CASCADE.iter().map(|(t, _)| t.rank()).collect();
        assert_eq!(ranks, (1..=9).collect::<Vec<u8>>());
        assert_eq!(Tier::Passthrough.rank(), 10);
        assert_eq!(Tier::StateSplit.to_string(), "state_split");
    }
}
