//! Candidate ranking: likelihood first, OCR confidence second, pool order
//! breaks ties.

use std::cmp::Ordering;

use crate::candidate::Candidate;

/// Total order that puts the preferred candidate first. `0.0` and `-0.0` tie.
fn preference(a: &Candidate, b: &Candidate) -> Ordering {
    let by = |x: f64, y: f64| (y + 0.0).total_cmp(&(x + 0.0));
    by(a.likelihood, b.likelihood).then_with(|| by(a.confidence, b.confidence))
}

/// Whether `new` should replace `current` as best so far.
#[inline]
pub fn is_better(new: &Candidate, current: &Candidate) -> bool {
    preference(new, current) == Ordering::Less
}

/// Stable sort of the pool by preference, best first.
pub fn rank(pool: &[Candidate]) -> Vec<&Candidate> {
    let mut ranked: Vec<&Candidate> = pool.iter().collect();
    ranked.sort_by(|a, b| preference(a, b));
    ranked
}

/// Best candidate by batch sort.
pub fn best_candidate(pool: &[Candidate]) -> Option<&Candidate> {
    rank(pool).into_iter().next()
}

/// Best candidate by a single pass in pool order.
pub fn best_candidate_incremental(pool: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in pool {
        match best {
            Some(current) if !is_better(candidate, current) => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(text: &str, confidence: f64, likelihood: f64) -> Candidate {
        Candidate {
            text: text.to_string(),
            confidence,
            likelihood,
        }
    }

    #[test]
    fn likelihood_beats_confidence() {
        let pool = vec![
            cand("A", 95.0, 0.4),
            cand("B", 30.0, 0.9),
            cand("C", 80.0, 0.9),
        ];
        assert_eq!(best_candidate(&pool).unwrap().text, "C");
        let order: Vec<&str> = rank(&pool).iter().map(|c| c.text.as_str()).collect();
        assert_eq!(order, ["C", "B", "A"]);
    }

    #[test]
    fn exact_ties_keep_pool_order() {
        let pool = vec![cand("first", 50.0, 0.5), cand("second", 50.0, 0.5)];
        assert_eq!(best_candidate(&pool).unwrap().text, "first");
        assert_eq!(best_candidate_incremental(&pool).unwrap().text, "first");
    }

    #[test]
    fn empty_pool() {
        assert!(best_candidate(&[]).is_none());
        assert!(best_candidate_incremental(&[]).is_none());
    }

    #[test]
    fn batch_and_incremental_agree() {
        let likelihoods = [0.1, 0.2, 0.4, 0.9, 1.0];
        let confidences = [0.0, -0.0, 12.5, 50.0, 99.0];
        // Deterministic pseudo-random pools over a small value grid so ties
        // on both keys occur often.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for round in 0..500 {
            let len = 1 + round % 9;
            let pool: Vec<Candidate> = (0..len)
                .map(|i| {
                    seed ^= seed << 13;
                    seed ^= seed >> 7;
                    seed ^= seed << 17;
                    let l = likelihoods[(seed % 5) as usize];
                    let c = confidences[((seed >> 8) % 5) as usize];
                    cand(&format!("c{i}"), c, l)
                })
                .collect();
            let batch = best_candidate(&pool).unwrap();
            let incremental = best_candidate_incremental(&pool).unwrap();
            assert!(std::ptr::eq(batch, incremental), "round {round}: {pool:?}");
        }
    }

    #[test]
    fn signed_zero_confidences_tie() {
        let pool = vec![cand("A", -0.0, 0.5), cand("B", 0.0, 0.5)];
        assert_eq!(best_candidate(&pool).unwrap().text, "A");
        assert_eq!(best_candidate_incremental(&pool).unwrap().text, "A");

        let pool = vec![cand("A", 0.0, 0.5), cand("B", -0.0, 0.5)];
        assert_eq!(best_candidate(&pool).unwrap().text, "A");
        assert_eq!(best_candidate_incremental(&pool).unwrap().text, "A");
    }
}
