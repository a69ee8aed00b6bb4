use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::Candidate;

/// Collapse candidates to one per calendar date, sorted by date.
///
/// The first observation of a date keeps its raw token and context; the
/// keyword, firm and extension flags are OR-ed over every observation.
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut by_date: BTreeMap<NaiveDate, Candidate> = BTreeMap::new();
    for c in candidates {
        match by_date.get_mut(&c.date) {
            Some(current) => {
                current.has_keyword |= c.has_keyword;
                current.is_firm |= c.is_firm;
                current.is_extension |= c.is_extension;
            }
            None => {
                by_date.insert(c.date, c);
            }
        }
    }
    by_date.into_values().collect()
}
