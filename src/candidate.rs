//! OCR readings, plate candidates, and the plate-likelihood scorer.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tables::PlateTables;

lazy_static! {
    // Series may be 1-4 letters here: this runs before normalization.
    static ref LOOSE_PLATE: Regex =
        Regex::new(r"^[A-Z]{2}[0-9]{1,2}[A-Z]{1,4}[0-9]{1,4}$").unwrap();
}

/// One OCR engine invocation's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub text: String,
    /// 0 – 100
    pub confidence: f64,
    /// Page segmentation mode of the variant; `None` for engines without one.
    #[serde(default)]
    pub psm_mode: Option<u32>,
}

/// Word-level OCR output (text plus per-word confidence, 0 – 100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub text: String,
    pub confidence: f64,
}

impl RawReading {
    pub fn new(text: impl Into<String>, confidence: f64, psm_mode: Option<u32>) -> Self {
        Self {
            text: text.into(),
            confidence,
            psm_mode,
        }
    }

    /// Assemble a reading from an engine that reports both a direct string
    /// and word boxes. Words with non-positive confidence or blank text are
    /// ignored; their mean confidence becomes the reading's confidence.
    /// The direct string wins when it is at least as long as the joined words
    /// and looks like a plate.
    pub fn from_word_boxes(direct_text: &str, words: &[WordBox], psm_mode: u32) -> Option<Self> {
        let usable: Vec<&WordBox> = words
            .iter()
            .filter(|w| w.confidence > 0.0 && !w.text.trim().is_empty())
            .collect();
        if usable.is_empty() {
            return None;
        }

        let confidence = usable.iter().map(|w| w.confidence).sum::<f64>() / usable.len() as f64;
        let joined: String = usable
            .iter()
            .flat_map(|w| w.text.chars())
            .filter(|c| !c.is_whitespace())
            .collect();
        let direct: String = direct_text.chars().filter(|c| !c.is_whitespace()).collect();

        let text = if direct.len() >= joined.len() && looks_like_plate(&direct) {
            direct
        } else {
            joined
        };
        Some(Self::new(text, confidence, Some(psm_mode)))
    }

    /// Assemble a reading from an engine that reports text segments with
    /// 0 – 1 probabilities.
    pub fn from_segments(segments: &[(String, f64)]) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        let text: String = segments
            .iter()
            .flat_map(|(t, _)| t.chars())
            .filter(|c| !c.is_whitespace())
            .collect();
        let mean = segments.iter().map(|(_, p)| *p).sum::<f64>() / segments.len() as f64;
        Some(Self::new(text, mean * 100.0, None))
    }
}

/// A cleaned reading with its plate-likelihood score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub text: String,
    pub confidence: f64,
    pub likelihood: f64,
}

impl Candidate {
    /// Build a candidate: text is upper-cased and reduced to `A-Z0-9`,
    /// confidence is clamped to 0 – 100.
    pub fn new(text: &str, confidence: f64, tables: &PlateTables) -> Self {
        let text = clean_text(text);
        let likelihood = likelihood(&text, tables);
        Self {
            text,
            confidence: clamp_confidence(confidence),
            likelihood,
        }
    }

    pub fn from_reading(reading: &RawReading, tables: &PlateTables) -> Self {
        Self::new(&reading.text, reading.confidence, tables)
    }

    /// `confidence × likelihood`, used by the best-candidate fallback.
    pub fn weighted_score(&self) -> f64 {
        self.confidence * self.likelihood
    }
}

/// Build the candidate pool, dropping readings with no usable characters.
pub fn build_pool(readings: &[RawReading], tables: &PlateTables) -> Vec<Candidate> {
    readings
        .iter()
        .map(|r| Candidate::from_reading(r, tables))
        .filter(|c| !c.text.is_empty())
        .collect()
}

/// Upper-case and keep only ASCII letters and digits.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .flat_map(char::to_uppercase)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        // `+ 0.0` turns -0.0 into 0.0
        confidence.clamp(0.0, 100.0) + 0.0
    }
}

/// How plate-like a normalized string is, in [0, 1].
pub fn likelihood(text: &str, tables: &PlateTables) -> f64 {
    let len = text.chars().count();
    if len < 6 {
        return 0.1;
    }

    let mut score = 0.0;
    if tables
        .state_codes()
        .iter()
        .any(|code| text.starts_with(code.as_str()))
    {
        score += 0.5;
    }
    if LOOSE_PLATE.is_match(text) {
        score += 0.5;
    }
    if (8..=12).contains(&len) {
        score += 0.2;
    }
    if has_letter_and_digit(text) {
        score += 0.2;
    }
    f64::min(score, 1.0)
}

/// Quick check: long enough and mixes letters with digits.
pub fn looks_like_plate(text: &str) -> bool {
    let text = clean_text(text);
    text.len() >= 6 && has_letter_and_digit(&text)
}

fn has_letter_and_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit()) && text.chars().any(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn short_text_scores_exactly_point_one() {
        let tables = PlateTables::builtin();
        for text in ["", "M", "MH02", "MH02D"] {
            assert_eq!(likelihood(text, &tables), 0.1);
        }
    }

    #[test]
    fn likelihood_components() {
        let tables = PlateTables::builtin();
        // state + pattern + length + mix, capped
        assert_close(likelihood("MH02DN8748", &tables), 1.0);
        // pattern + length + mix, no known state
        assert_close(likelihood("ZZ02DN8748", &tables), 0.9);
        // state + length + mix, series too long for the loose pattern
        assert_close(likelihood("MH02DNABC8748", &tables), 0.7);
        // nothing but length
        assert_close(likelihood("ZZZZZZZZ", &tables), 0.2);
        // nothing at all
        assert_close(likelihood("ZZZZZZ", &tables), 0.0);
    }

    #[test]
    fn likelihood_stays_in_unit_interval() {
        let tables = PlateTables::builtin();
        for text in ["RJ14CV0002", "RJRJRJRJRJ", "123456789", "KA1A1", "OD1AB1234"] {
            let l = likelihood(text, &tables);
            assert!((0.0..=1.0).contains(&l), "{text}: {l}");
        }
    }

    #[test]
    fn candidate_cleans_text_and_clamps_confidence() {
        let tables = PlateTables::builtin();
        let c = Candidate::new(" rj 14-cv 0002\n", 140.0, &tables);
        assert_eq!(c.text, "RJ14CV0002");
        assert_eq!(c.confidence, 100.0);
        assert_close(c.likelihood, 1.0);

        let c = Candidate::new("MH", f64::NAN, &tables);
        assert_eq!(c.confidence, 0.0);

        let c = Candidate::new("MH", -0.0, &tables);
        assert!(c.confidence.is_sign_positive());
        let c = Candidate::new("MH", -3.0, &tables);
        assert!(c.confidence.is_sign_positive());
    }

    #[test]
    fn pool_drops_empty_readings() {
        let tables = PlateTables::builtin();
        let readings = vec![
            RawReading::new("--", 90.0, Some(7)),
            RawReading::new("MH02DN8748", 50.0, Some(8)),
            RawReading::new("", 10.0, Some(6)),
        ];
        let pool = build_pool(&readings, &tables);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].text, "MH02DN8748");
    }

    #[test]
    fn word_boxes_average_usable_words() {
        let words = vec![
            WordBox { text: "MH02".into(), confidence: 80.0 },
            WordBox { text: " ".into(), confidence: 95.0 },
            WordBox { text: "DN8748".into(), confidence: 60.0 },
            WordBox { text: "X".into(), confidence: -1.0 },
        ];
        let reading = RawReading::from_word_boxes("", &words, 7).unwrap();
        assert_eq!(reading.text, "MH02DN8748");
        assert_close(reading.confidence, 70.0);
        assert_eq!(reading.psm_mode, Some(7));
    }

    #[test]
    fn word_boxes_prefer_plate_like_direct_text() {
        let words = vec![WordBox { text: "MH02DN".into(), confidence: 50.0 }];
        let reading = RawReading::from_word_boxes("MH 02 DN 8748", &words, 11).unwrap();
        assert_eq!(reading.text, "MH02DN8748");

        let reading = RawReading::from_word_boxes("ZZZZZZZZ", &words, 11).unwrap();
        assert_eq!(reading.text, "MH02DN");
    }

    #[test]
    fn word_boxes_without_usable_words_yield_nothing() {
        let words = vec![WordBox { text: "MH".into(), confidence: 0.0 }];
        assert!(RawReading::from_word_boxes("MH02DN8748", &words, 7).is_none());
    }

    #[test]
    fn segments_scale_probability() {
        let segments = vec![("RJ14".to_string(), 0.9), ("CV 0002".to_string(), 0.7)];
        let reading = RawReading::from_segments(&segments).unwrap();
        assert_eq!(reading.text, "RJ14CV0002");
        assert_close(reading.confidence, 80.0);
        assert_eq!(reading.psm_mode, None);
        assert!(RawReading::from_segments(&[]).is_none());
    }

    #[test]
    fn plate_look() {
        assert!(looks_like_plate("mh 02 dn 8748"));
        assert!(!looks_like_plate("MH02"));
        assert!(!looks_like_plate("ABCDEFG"));
    }
}
