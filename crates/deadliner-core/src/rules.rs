//! Layered extraction rules.
//!
//! A rule document has three tiers: `default`, `families.<family>` and
//! `conferences.<id>`. Each tier sets any subset of the rule fields; a field
//! set in a more specific tier replaces the whole value from the tier below.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::ConferenceConfig;
use crate::keywords::KeywordSet;
use crate::predict::PredictionParams;

pub const DEFAULT_CONTEXT_RADIUS: usize = 1;
pub const DEFAULT_EXTENSION_DAYS: u32 = 14;
pub const DEFAULT_MAX_TRAINING_EXTENSION_DAYS: u32 = 90;

/// One tier of rule configuration. Absent fields inherit from the tier below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOverride {
    pub include_keywords: Option<Vec<String>>,
    pub exclude_keywords: Option<Vec<String>>,
    pub firm_keywords: Option<Vec<String>>,
    pub extension_keywords: Option<Vec<String>>,
    pub context_radius: Option<usize>,
    pub default_extension_days: Option<u32>,
    pub max_training_extension_days: Option<u32>,
}

impl RuleOverride {
    /// Lay `overlay` on top of `self`: overlay values win field by field.
    pub fn overlay(&self, overlay: &RuleOverride) -> RuleOverride {
        RuleOverride {
            include_keywords: overlay
                .include_keywords
                .clone()
                .or_else(|| self.include_keywords.clone()),
            exclude_keywords: overlay
                .exclude_keywords
                .clone()
                .or_else(|| self.exclude_keywords.clone()),
            firm_keywords: overlay
                .firm_keywords
                .clone()
                .or_else(|| self.firm_keywords.clone()),
            extension_keywords: overlay
                .extension_keywords
                .clone()
                .or_else(|| self.extension_keywords.clone()),
            context_radius: overlay.context_radius.or(self.context_radius),
            default_extension_days: overlay
                .default_extension_days
                .or(self.default_extension_days),
            max_training_extension_days: overlay
                .max_training_extension_days
                .or(self.max_training_extension_days),
        }
    }
}

/// The on-disk rule document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default)]
    pub default: RuleOverride,
    #[serde(default)]
    pub families: HashMap<String, RuleOverride>,
    #[serde(default)]
    pub conferences: HashMap<String, RuleOverride>,
}

impl RuleDocument {
    /// Flatten the three tiers into the effective rule for one conference.
    pub fn resolve(&self, conference: &ConferenceConfig) -> ExtractionRule {
        self.resolve_for(&conference.id, conference.family.as_deref())
    }

    pub fn resolve_for(&self, id: &str, family: Option<&str>) -> ExtractionRule {
        let mut merged = self.default.clone();
        if let Some(family_rule) = family.and_then(|f| self.families.get(f)) {
            merged = merged.overlay(family_rule);
        }
        if let Some(conf_rule) = self.conferences.get(id) {
            merged = merged.overlay(conf_rule);
        }
        ExtractionRule::from(&merged)
    }
}

/// Effective rule for one conference. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRule {
    pub include: KeywordSet,
    pub exclude: KeywordSet,
    pub firm: KeywordSet,
    pub extension: KeywordSet,
    pub context_radius: usize,
    pub default_extension_days: u32,
    pub max_training_extension_days: u32,
}

impl Default for ExtractionRule {
    fn default() -> Self {
        ExtractionRule::from(&RuleOverride::default())
    }
}

impl From<&RuleOverride> for ExtractionRule {
    fn from(o: &RuleOverride) -> Self {
        let keywords = |v: &Option<Vec<String>>| KeywordSet::new(v.iter().flatten());
        Self {
            include: keywords(&o.include_keywords),
            exclude: keywords(&o.exclude_keywords),
            firm: keywords(&o.firm_keywords),
            extension: keywords(&o.extension_keywords),
            context_radius: o.context_radius.unwrap_or(DEFAULT_CONTEXT_RADIUS),
            default_extension_days: o.default_extension_days.unwrap_or(DEFAULT_EXTENSION_DAYS),
            max_training_extension_days: o
                .max_training_extension_days
                .unwrap_or(DEFAULT_MAX_TRAINING_EXTENSION_DAYS),
        }
    }
}

impl ExtractionRule {
    pub fn prediction_params(&self) -> PredictionParams {
        PredictionParams {
            default_days: self.default_extension_days,
            training_cap_days: self.max_training_extension_days,
        }
    }
}
