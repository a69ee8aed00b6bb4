use std::collections::BTreeSet;

use crate::rules::ExtractionRule;

/// Indices of the lines that are in context for deadline extraction.
///
/// A non-excluded line mentioning an include keyword marks itself and every
/// line within `context_radius` of it, skipping neighbours that are excluded.
/// When nothing gets marked the whole document is considered relevant, so a
/// page that words its deadlines unusually still yields candidates.
pub fn relevant_lines<S: AsRef<str>>(lines: &[S], rule: &ExtractionRule) -> BTreeSet<usize> {
    let excluded: Vec<bool> = lines
        .iter()
        .map(|l| rule.exclude.matches(l.as_ref()))
        .collect();

    let mut matched = BTreeSet::new();
    for (idx, line) in lines.iter().enumerate() {
        if excluded[idx] || !rule.include.matches(line.as_ref()) {
            continue;
        }
        let lo = idx.saturating_sub(rule.context_radius);
        let hi = idx.saturating_add(rule.context_radius).min(lines.len() - 1);
        matched.extend((lo..=hi).filter(|&j| !excluded[j]));
    }

    if matched.is_empty() {
        return (0..lines.len()).collect();
    }
    matched
}
