//! Conference catalog and rule document loading.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::extract::parse_loose_date;
use crate::rules::RuleDocument;

/// A conference as written in the catalog file.
///
/// Every field is optional here so one malformed entry can be reported on its
/// own instead of failing the whole file; see [`ConferenceEntry::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceEntry {
    pub id: Option<String>,
    pub family: Option<String>,
    pub year: Option<i32>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub url: Option<String>,
    pub crawl_urls: Option<Vec<String>>,
    pub fallback_deadline: Option<DateValue>,
    pub seed_submission_dates: Option<Vec<DateValue>>,
}

/// A date as written in the catalog: a TOML date literal
/// (`2025-01-22`, `2025-01-22T23:59:00Z`) or free text (`"Jan 22, 2025"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Literal(toml::value::Datetime),
    Text(String),
}

impl DateValue {
    /// The calendar day this value names. Any time of day is ignored.
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Literal(dt) => {
                let d = dt.date?;
                NaiveDate::from_ymd_opt(d.year.into(), d.month.into(), d.day.into())
            }
            DateValue::Text(raw) => parse_loose_date(raw),
        }
    }
}

impl std::fmt::Display for DateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateValue::Literal(dt) => write!(f, "{dt}"),
            DateValue::Text(raw) => f.write_str(raw),
        }
    }
}

impl From<&str> for DateValue {
    fn from(raw: &str) -> Self {
        DateValue::Text(raw.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    conferences: Vec<ConferenceEntry>,
}

/// A validated conference configuration. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceConfig {
    pub id: String,
    pub family: Option<String>,
    pub year: Option<i32>,
    pub name: String,
    pub short_name: Option<String>,
    pub url: String,
    pub crawl_urls: Vec<String>,
    pub fallback_deadline: NaiveDate,
    /// Manually curated submission dates. Trusted over anything extracted.
    pub seed_dates: Vec<NaiveDate>,
}

impl ConferenceConfig {
    /// URLs to fetch: the explicit crawl list, or the canonical URL.
    pub fn sources(&self) -> Vec<&str> {
        if self.crawl_urls.is_empty() {
            vec![self.url.as_str()]
        } else {
            self.crawl_urls.iter().map(String::as_str).collect()
        }
    }
}

impl ConferenceEntry {
    /// Check required fields and parse dates.
    ///
    /// `position` (0-based) names the entry in errors when it has no id.
    pub fn validate(self, position: usize) -> Result<ConferenceConfig, CoreError> {
        let Some(id) = self.id.filter(|s| !s.trim().is_empty()) else {
            return Err(CoreError::MissingField {
                conference: format!("#{}", position + 1),
                field: "id",
            });
        };
        let missing = |field: &'static str| CoreError::MissingField {
            conference: id.clone(),
            field,
        };
        let name = self.name.ok_or_else(|| missing("name"))?;
        let url = self.url.ok_or_else(|| missing("url"))?;
        let fallback_raw = self
            .fallback_deadline
            .ok_or_else(|| missing("fallback_deadline"))?;

        let parse = |field: &'static str, raw: &DateValue| {
            raw.to_date().ok_or_else(|| CoreError::InvalidDate {
                conference: id.clone(),
                field,
                value: raw.to_string(),
            })
        };
        let fallback_deadline = parse("fallback_deadline", &fallback_raw)?;
        let seed_dates = self
            .seed_submission_dates
            .unwrap_or_default()
            .iter()
            .map(|raw| parse("seed_submission_dates", raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ConferenceConfig {
            id,
            family: self.family,
            year: self.year,
            name,
            short_name: self.short_name,
            url,
            crawl_urls: self.crawl_urls.unwrap_or_default(),
            fallback_deadline,
            seed_dates,
        })
    }
}

/// Parse a conference catalog (`[[conferences]]` tables).
pub fn parse_conferences(content: &str) -> Result<Vec<ConferenceEntry>, toml::de::Error> {
    let file: CatalogFile = toml::from_str(content)?;
    Ok(file.conferences)
}

pub fn load_conferences(path: &Path) -> Result<Vec<ConferenceEntry>, CoreError> {
    let content = std::fs::read_to_string(path)?;
    parse_conferences(&content).map_err(|source| CoreError::Config {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_rules(path: &Path) -> Result<RuleDocument, CoreError> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|source| CoreError::Config {
        path: path.to_path_buf(),
        source,
    })
}
