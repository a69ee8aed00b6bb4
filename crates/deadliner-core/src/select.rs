//! Picking one deadline out of the candidate pool.

use chrono::{Datelike, NaiveDate};

use crate::Candidate;

const BASE_CONFIDENCE: f64 = 0.45;
const KEYWORD_BONUS: f64 = 0.25;
const MULTIPLE_BONUS: f64 = 0.10;
const FIRM_BONUS: f64 = 0.15;
pub const MAX_CONFIDENCE: f64 = 0.95;

/// The chosen deadline for one conference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub deadline: NaiveDate,
    pub is_firm: bool,
    pub confidence: f64,
}

impl Selection {
    /// Let manually curated seed dates override the algorithmic choice.
    ///
    /// The latest seed becomes the deadline and is treated as firm.
    pub fn with_seeds(self, seeds: &[NaiveDate]) -> Selection {
        match seeds.iter().max() {
            Some(&latest) => Selection {
                deadline: latest,
                is_firm: true,
                confidence: self.confidence.max(MAX_CONFIDENCE),
            },
            None => self,
        }
    }
}

/// Narrow `pool` to the candidates satisfying `keep`, unless none do.
fn prefer<'a>(pool: Vec<&'a Candidate>, keep: impl Fn(&Candidate) -> bool) -> Vec<&'a Candidate> {
    let narrowed: Vec<&Candidate> = pool.iter().copied().filter(|c| keep(c)).collect();
    if narrowed.is_empty() { pool } else { narrowed }
}

/// Choose a deadline from deduplicated candidates.
///
/// The pool is narrowed, each step only when it leaves something behind:
/// keyword-adjacent candidates, then dates in the target year or the year
/// before, then firm-adjacent candidates. The latest remaining date wins.
/// With no candidates at all the fallback is returned with zero confidence.
pub fn select_deadline(
    candidates: &[Candidate],
    fallback: NaiveDate,
    target_year: Option<i32>,
) -> Selection {
    let mut pool = prefer(candidates.iter().collect(), |c| c.has_keyword);
    if let Some(year) = target_year {
        pool = prefer(pool, |c| {
            let y = c.date.year();
            y == year || y == year - 1
        });
    }
    pool = prefer(pool, |c| c.is_firm);

    // `prefer` never empties a pool, so this is only `None` without candidates.
    let Some(chosen) = pool.into_iter().max_by_key(|c| c.date) else {
        return Selection {
            deadline: fallback,
            is_firm: false,
            confidence: 0.0,
        };
    };

    let mut confidence = BASE_CONFIDENCE;
    if candidates.iter().any(|c| c.has_keyword) {
        confidence += KEYWORD_BONUS;
    }
    if candidates.len() > 1 {
        confidence += MULTIPLE_BONUS;
    }
    if chosen.is_firm {
        confidence += FIRM_BONUS;
    }
    let confidence = (confidence.min(MAX_CONFIDENCE) * 100.0).round() / 100.0;

    Selection {
        deadline: chosen.date,
        is_firm: chosen.is_firm,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cand(date: NaiveDate, has_keyword: bool, is_firm: bool) -> Candidate {
        Candidate {
            date,
            raw: date.to_string(),
            context: String::new(),
            has_keyword,
            is_firm,
            is_extension: false,
        }
    }

    #[test]
    fn no_candidates_returns_fallback() {
        let fallback = ymd(2025, 5, 1);
        let sel = select_deadline(&[], fallback, Some(2025));
        assert_eq!(
            sel,
            Selection {
                deadline: fallback,
                is_firm: false,
                confidence: 0.0
            }
        );
    }

    #[test]
    fn firm_subset_wins_over_later_date() {
        let cands = [
            cand(ymd(2025, 1, 10), false, false),
            cand(ymd(2025, 1, 20), false, true),
        ];
        let sel = select_deadline(&cands, ymd(2024, 1, 1), None);
        assert_eq!(sel.deadline, ymd(2025, 1, 20));
        assert!(sel.is_firm);
        assert_eq!(sel.confidence, 0.70);
    }

    #[test]
    fn firm_preference_applies_within_keyword_pool() {
        let cands = [
            cand(ymd(2025, 1, 10), true, true),
            cand(ymd(2025, 2, 10), true, false),
            cand(ymd(2025, 3, 10), false, true),
        ];
        let sel = select_deadline(&cands, ymd(2024, 1, 1), None);
        assert_eq!(sel.deadline, ymd(2025, 1, 10));
        assert_eq!(sel.confidence, 0.95);
    }

    #[test]
    fn keyword_pool_preferred() {
        let cands = [
            cand(ymd(2025, 1, 10), true, false),
            cand(ymd(2025, 6, 1), false, false),
        ];
        let sel = select_deadline(&cands, ymd(2024, 1, 1), None);
        assert_eq!(sel.deadline, ymd(2025, 1, 10));
        assert!(!sel.is_firm);
        assert_eq!(sel.confidence, 0.80);
    }

    #[test]
    fn target_year_filter_keeps_previous_year() {
        let cands = [
            cand(ymd(2024, 11, 15), true, false),
            cand(ymd(2030, 1, 1), true, false),
        ];
        let sel = select_deadline(&cands, ymd(2024, 1, 1), Some(2025));
        assert_eq!(sel.deadline, ymd(2024, 11, 15));
    }

    #[test]
    fn target_year_filter_skipped_when_it_would_empty_pool() {
        let cands = [
            cand(ymd(2019, 3, 1), true, false),
            cand(ymd(2019, 4, 1), true, false),
        ];
        let sel = select_deadline(&cands, ymd(2025, 1, 1), Some(2025));
        assert_eq!(sel.deadline, ymd(2019, 4, 1));
    }

    #[test]
    fn single_candidate_confidence() {
        let sel = select_deadline(&[cand(ymd(2025, 3, 3), false, false)], ymd(2025, 1, 1), None);
        assert_eq!(sel.confidence, 0.45);
    }

    #[test]
    fn confidence_bounded() {
        let cands = [
            cand(ymd(2025, 1, 10), true, true),
            cand(ymd(2025, 1, 11), true, true),
        ];
        let sel = select_deadline(&cands, ymd(2025, 1, 1), None);
        assert!(sel.confidence >= 0.0 && sel.confidence <= MAX_CONFIDENCE);
    }

    #[test]
    fn seeds_override_selection() {
        let sel = select_deadline(&[], ymd(2025, 1, 1), None)
            .with_seeds(&[ymd(2025, 2, 1), ymd(2025, 2, 14)]);
        assert_eq!(sel.deadline, ymd(2025, 2, 14));
        assert!(sel.is_firm);
        assert!(sel.confidence >= 0.95);
    }

    #[test]
    fn no_seeds_leaves_selection_untouched() {
        let sel = select_deadline(&[cand(ymd(2025, 3, 3), false, false)], ymd(2025, 1, 1), None);
        assert_eq!(sel.with_seeds(&[]), sel);
    }
}
