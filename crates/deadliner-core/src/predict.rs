//! Family-level prediction of how far a non-firm deadline will slip.

use chrono::NaiveDate;

/// Fallback and outlier cap used when predicting extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionParams {
    /// Prediction when no usable family history exists.
    pub default_days: u32,
    /// Observations above this are ignored as outliers.
    pub training_cap_days: u32,
}

/// The slice of a resolved conference the predictor needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation<'a> {
    pub id: &'a str,
    pub family: Option<&'a str>,
    pub year: Option<i32>,
    pub is_firm: bool,
    pub observed_extension_days: u32,
}

/// Observed extensions from `peers` that may be used to predict `target`.
///
/// Only peers of the same family count, never the target itself, and never
/// a peer from the same or a later year than the target when both years are
/// known. Non-positive observations and observations over the cap are
/// dropped. A conference without a family has no peers.
pub fn training_samples(target: &Observation<'_>, peers: &[Observation<'_>], cap_days: u32) -> Vec<u32> {
    let Some(family) = target.family else {
        return vec![];
    };
    peers
        .iter()
        .filter(|p| p.id != target.id && p.family == Some(family))
        .filter(|p| p.observed_extension_days > 0 && p.observed_extension_days <= cap_days)
        .filter(|p| match (target.year, p.year) {
            (Some(own), Some(theirs)) => theirs < own,
            _ => true,
        })
        .map(|p| p.observed_extension_days)
        .collect()
}

/// Median rounded half-to-even; `None` for no samples.
pub fn median_days(samples: &[u32]) -> Option<u32> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        return Some(sorted[mid]);
    }
    let mean = (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0;
    Some(mean.round_ties_even() as u32)
}

/// Predicted extension in days for `target`. Always 0 for a firm deadline.
pub fn predict_extension_days(
    target: &Observation<'_>,
    peers: &[Observation<'_>],
    params: PredictionParams,
) -> u32 {
    if target.is_firm {
        return 0;
    }
    let samples = training_samples(target, peers, params.training_cap_days);
    median_days(&samples).unwrap_or(params.default_days)
}

/// Last day the deadline is expected to hold, given the predicted slip.
pub fn stretch_until(deadline: NaiveDate, predicted_days: u32) -> NaiveDate {
    deadline
        .checked_add_days(chrono::Days::new(u64::from(predicted_days)))
        .unwrap_or(deadline)
}
