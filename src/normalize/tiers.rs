//! The individual cascade tiers. Each returns `None` to defer to the next.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use super::{TierInput, TierMatch};
use crate::candidate::Candidate;
use crate::plate::is_valid;
use crate::tables::PlateTables;

lazy_static! {
    static ref RJ_REPAIR: Regex =
        Regex::new(r"^RJ([OIG0-9]{1,2})([A-Z]+?)([O0-9][OIS0-9]*)$").unwrap();
    static ref MH_REPAIR: Regex = Regex::new(r"^MH[O0][0-9][A-Z]{2}[0-9]{4}$").unwrap();
    static ref LEADING_PARTS: Regex =
        Regex::new(r"^([A-Z]{2})([O0-9]{1,2})([A-Z]{1,3})([O0-9]{1,4})").unwrap();
    static ref STATE_ANCHORED: Regex =
        Regex::new(r"^([A-Z]{2})([O0-9]{1,2})([A-Z]{1,3})([0-9]{1,4})$").unwrap();
    static ref EMBEDDED: Regex = Regex::new(r"[A-Z]{2}[0-9]{1,2}[A-Z]{1,3}[0-9]{1,4}").unwrap();
    static ref DIGIT_RUN: Regex = Regex::new(r"[0-9]+").unwrap();
    static ref LETTER_RUN: Regex = Regex::new(r"[A-Z]+").unwrap();
    static ref LEAD_DISTRICT: Regex = Regex::new(r"^[0-9]{1,2}").unwrap();
    static ref SERIES_AFTER_DISTRICT: Regex = Regex::new(r"^[0-9]{1,2}([A-Z]{1,3})").unwrap();
    static ref LEAD_SERIES: Regex = Regex::new(r"^[A-Z]{1,3}").unwrap();
    static ref TRAIL_NUMBER: Regex = Regex::new(r"[0-9]{1,4}$").unwrap();
}

fn digit_runs(text: &str) -> Vec<&str> {
    DIGIT_RUN.find_iter(text).map(|m| m.as_str()).collect()
}

fn letter_runs(text: &str) -> Vec<&str> {
    LETTER_RUN.find_iter(text).map(|m| m.as_str()).collect()
}

/// First `n` bytes of an ASCII run.
fn head(run: &str, n: usize) -> &str {
    &run[..run.len().min(n)]
}

fn map_confusables(text: &str, map: &[(char, char)]) -> String {
    text.chars()
        .map(|c| {
            map.iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

fn zero_for_o(text: &str) -> String {
    text.replace('O', "0")
}

/// Tier 1: `RJ` plates with letter/digit confusions in district or number.
pub(super) fn rajasthan_repair(input: &TierInput<'_>) -> Option<TierMatch> {
    let text = input.text;
    if !text.starts_with("RJ") || text.len() < 8 || is_valid(text) {
        return None;
    }
    let caps = RJ_REPAIR.captures(text)?;
    let district = map_confusables(&caps[1], &[('O', '0'), ('I', '1'), ('G', '6')]);
    let number = map_confusables(&caps[3], &[('O', '0'), ('I', '1'), ('S', '5')]);
    let repaired = format!("RJ{district}{}{number}", &caps[2]);
    is_valid(&repaired).then(|| TierMatch::new(repaired, 95.0))
}

/// Tier 2: `MHO2DN8748`-shaped plates with an `O` in the district.
pub(super) fn maharashtra_repair(input: &TierInput<'_>) -> Option<TierMatch> {
    let text = input.text;
    if !MH_REPAIR.is_match(text) || is_valid(text) {
        return None;
    }
    let repaired = format!(
        "MH{}{}{}",
        zero_for_o(&text[2..4]),
        &text[4..6],
        &text[6..]
    );
    Some(TierMatch::new(repaired, 95.0))
}

/// Tier 3.
pub(super) fn canonical(input: &TierInput<'_>) -> Option<TierMatch> {
    is_valid(input.text).then(|| TierMatch::new(input.text, 100.0))
}

/// Tier 4: per-state regex rules from the jurisdiction tables.
pub(super) fn known_pattern(input: &TierInput<'_>) -> Option<TierMatch> {
    let text = input.text;
    for set in input.tables.known_patterns() {
        if !text.contains(set.state.as_str()) {
            continue;
        }
        for rule in &set.rules {
            let Some(caps) = rule.regex.captures(text) else {
                continue;
            };
            let mut expanded = String::new();
            caps.expand(&rule.replacement, &mut expanded);
            let Some(parts) = LEADING_PARTS.captures(&expanded) else {
                continue;
            };
            let assembled = format!(
                "{}{}{}{}",
                &parts[1],
                zero_for_o(&parts[2]),
                &parts[3],
                zero_for_o(&parts[4])
            );
            if is_valid(&assembled) {
                trace!(state = %set.state, pattern = rule.regex.as_str(), "known_pattern_hit");
                return Some(TierMatch::new(assembled, 90.0));
            }
        }
    }
    None
}

/// Tier 5: split at the first StateCodeSet code found in the text.
pub(super) fn state_split(input: &TierInput<'_>) -> Option<TierMatch> {
    let text = input.text;
    let state = input
        .tables
        .state_codes()
        .iter()
        .find(|code| text.contains(code.as_str()))?;

    if state == "RJ" {
        if let Some(found) = rajasthan_split(text) {
            return Some(found);
        }
    }

    let idx = text.find(state.as_str())?;
    let anchored = &text[idx..];
    let rest = &anchored[2..];
    let nums = digit_runs(rest);
    let chars = letter_runs(rest);

    if let (Some(first_num), Some(first_chars)) = (nums.first(), chars.first()) {
        let district = head(first_num, 2);
        let series = head(first_chars, 3);
        let number = if nums.len() > 1 {
            head(nums[nums.len() - 1], 4)
        } else if first_num.len() > 2 {
            &first_num[2..first_num.len().min(6)]
        } else {
            ""
        };
        let assembled = format!("{state}{district}{series}{number}");
        if is_valid(&assembled) {
            return Some(TierMatch::new(assembled, 90.0));
        }
    }

    let caps = STATE_ANCHORED.captures(anchored)?;
    let assembled = format!(
        "{}{}{}{}",
        &caps[1],
        zero_for_o(&caps[2]),
        &caps[3],
        &caps[4]
    );
    Some(TierMatch::new(assembled, 92.0))
}

/// Rajasthan split over the whole text: first digit run is the district,
/// first non-`RJ` letter run the series, last digit run the number.
fn rajasthan_split(text: &str) -> Option<TierMatch> {
    let digits = digit_runs(text);
    let letters = letter_runs(text);
    if digits.len() < 2 || letters.is_empty() {
        return None;
    }
    let district = head(digits[0], 2);
    let series = letters
        .iter()
        .find(|run| **run != "RJ")
        .map_or("CV", |run| head(run, 3));
    let number = head(digits[digits.len() - 1], 4);
    let assembled = format!("RJ{district}{series}{number}");
    is_valid(&assembled).then(|| TierMatch::new(assembled, 90.0))
}

struct Occurrence<'a> {
    prefix: &'a str,
    suffix: &'a str,
    confidence: f64,
}

/// Tier 6: vote on the state across the whole pool by summed confidence,
/// then rebuild from that state's most confident occurrence.
pub(super) fn candidate_consensus(input: &TierInput<'_>) -> Option<TierMatch> {
    let mut histogram: Vec<(&str, Vec<Occurrence<'_>>)> = Vec::new();
    for candidate in input.pool {
        record_states(candidate, input.tables, &mut histogram);
    }

    let mut winner: Option<(&str, &[Occurrence<'_>], f64)> = None;
    for (state, occurrences) in &histogram {
        let total: f64 = occurrences.iter().map(|o| o.confidence).sum();
        if winner.map_or(true, |(_, _, best)| total > best) {
            winner = Some((*state, occurrences.as_slice(), total));
        }
    }
    let (state, occurrences, total) = winner?;

    let top = occurrences.iter().fold(None::<&Occurrence<'_>>, |best, o| match best {
        Some(b) if o.confidence <= b.confidence => Some(b),
        _ => Some(o),
    })?;
    trace!(
        state,
        total,
        prefix = top.prefix,
        suffix = top.suffix,
        "consensus_state"
    );

    let suffix = top.suffix;
    let district = LEAD_DISTRICT.find(suffix).map_or("", |m| m.as_str());
    let series = if district.is_empty() {
        LEAD_SERIES.find(suffix).map_or("", |m| m.as_str())
    } else {
        SERIES_AFTER_DISTRICT
            .captures(suffix)
            .and_then(|c| c.get(1))
            .map_or("", |m| m.as_str())
    };
    let number = TRAIL_NUMBER.find(suffix).map_or("", |m| m.as_str());
    if district.is_empty() && series.is_empty() && number.is_empty() {
        return None;
    }

    let assembled = format!("{state}{district}{series}{number}");
    (assembled.len() >= 7 && is_valid(&assembled)).then(|| TierMatch::new(assembled, 85.0))
}

fn record_states<'a>(
    candidate: &'a Candidate,
    tables: &'a PlateTables,
    histogram: &mut Vec<(&'a str, Vec<Occurrence<'a>>)>,
) {
    let text = candidate.text.as_str();
    for state in tables.state_codes() {
        let Some(idx) = text.find(state.as_str()) else {
            continue;
        };
        let occurrence = Occurrence {
            prefix: &text[..idx],
            suffix: &text[idx + 2..],
            confidence: candidate.confidence,
        };
        match histogram.iter_mut().find(|(s, _)| *s == state.as_str()) {
            Some((_, list)) => list.push(occurrence),
            None => histogram.push((state.as_str(), vec![occurrence])),
        }
    }
}

/// Tier 7: first canonical-shaped substring anywhere in the text.
pub(super) fn embedded_pattern(input: &TierInput<'_>) -> Option<TierMatch> {
    EMBEDDED
        .find(input.text)
        .map(|m| TierMatch::new(m.as_str(), 80.0))
}

/// Tier 8: massage whatever follows a known state code into plate shape.
pub(super) fn last_resort(input: &TierInput<'_>) -> Option<TierMatch> {
    let text = input.text;
    if text.len() < 7 {
        return None;
    }
    for state in input.tables.state_codes() {
        let Some(idx) = text.find(state.as_str()) else {
            continue;
        };
        let remaining = &text[idx + 2..];
        if remaining.len() < 5 {
            continue;
        }
        let digits = digit_runs(remaining);
        let Some(first) = digits.first() else {
            continue;
        };
        let letters = letter_runs(remaining);
        let district = head(first, 2);
        let series = letters.first().map_or("X", |run| head(run, 3));
        let number = if digits.len() > 1 {
            digits[digits.len() - 1]
        } else if first.len() > 2 {
            &first[2..]
        } else {
            "0000"
        };
        return Some(TierMatch::new(
            format!("{state}{district}{series}{number}"),
            70.0,
        ));
    }
    None
}

/// Tier 9: the pool's best `confidence × likelihood`, if it is not the input.
pub(super) fn best_candidate(input: &TierInput<'_>) -> Option<TierMatch> {
    let mut best: Option<&Candidate> = None;
    let mut best_score = 0.0;
    for candidate in input.pool {
        let score = candidate.weighted_score();
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }
    best.filter(|c| c.text != input.original)
        .map(|c| TierMatch::new(c.text.as_str(), 65.0))
}

/// Tier 10: the input, untouched.
pub(super) fn passthrough(input: &TierInput<'_>) -> TierMatch {
    TierMatch::new(input.original, 60.0)
}
