//! Date token extraction from call-for-papers text.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::Candidate;
use crate::relevance::relevant_lines;
use crate::rules::ExtractionRule;

/// Number of characters of the source line kept on a candidate.
pub const DEFAULT_CONTEXT_CHARS: usize = 240;

const MONTH: &str = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|Jun(?:e)?|Jul(?:y)?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Date shapes, tried in order on every line.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // 3 March 2025, 3 Mar, 2025
        format!(r"(?i)\b\d{{1,2}}\s+{MONTH},?\s+20\d{{2}}\b"),
        // March 3, 2025
        format!(r"(?i)\b{MONTH}\s+\d{{1,2}},?\s+20\d{{2}}\b"),
        // 2025 March 3, 2025 Mar. 3
        format!(r"(?i)\b20\d{{2}}\s+{MONTH}\.?\s*\d{{1,2}}\b"),
        // March 3 (year supplied by the conference)
        format!(r"(?i)\b{MONTH}\.?\s*\d{{1,2}}\b"),
        // 2025-03-03
        r"\b20\d{2}-\d{2}-\d{2}\b".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// A token that carries a month and day but no year.
static BARE_MONTH_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)^{MONTH}\.?\s*\d{{1,2}}$")).unwrap());

/// Pull date-shaped tokens out of one line.
///
/// Month/day tokens without a year get `target_year` appended, or are dropped
/// when the year is unknown. Duplicates are removed, first occurrence wins.
pub fn date_tokens(line: &str, target_year: Option<i32>) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for pattern in DATE_PATTERNS.iter() {
        for m in pattern.find_iter(line) {
            let mut token = m.as_str().trim().to_string();
            if BARE_MONTH_DAY.is_match(&token) {
                match target_year {
                    Some(year) if year != 0 => token = format!("{token} {year}"),
                    _ => continue,
                }
            }
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
    }
    tokens
}

/// Parse a date token, reading numeric fields month-first.
///
/// Words that are neither a month name nor a number are ignored. Returns
/// `None` for anything that doesn't name a real calendar day.
pub fn parse_date_token(token: &str) -> Option<NaiveDate> {
    let mut year: Option<i32> = None;
    let mut month: Option<u32> = None;
    let mut numbers: Vec<u32> = Vec::new();

    for word in token
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if let Some(m) = month_from_name(word) {
            if month.replace(m).is_some() {
                return None;
            }
        } else if word.chars().all(|c| c.is_ascii_digit()) {
            match word.len() {
                4 => {
                    if year.replace(word.parse().ok()?).is_some() {
                        return None;
                    }
                }
                1 | 2 => numbers.push(word.parse().ok()?),
                _ => return None,
            }
        }
    }

    let (month, day) = match (month, numbers.as_slice()) {
        (Some(m), [d]) => (m, *d),
        (None, [m, d]) => (*m, *d),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year?, month, day)
}

/// ISO 8601 time suffix glued to a date: `T23:59`, `T23:59:00Z`, `T23:59:00.5+02:00`.
static ISO_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d)T\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?\b").unwrap()
});

/// Clock times with optional meridiem and UTC offset: `23:59`, `11:59 PM`,
/// `5pm`, `23:59 (UTC-12)`.
static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}(?::\d{2}(?::\d{2})?(?:\s*[ap]\.?m\b\.?)?|\s*[ap]\.?m\b\.?)(?:\s*\(?\s*(?:UTC|GMT)\s*[+-]\d{1,2}(?::?\d{2})?\s*\)?)?",
    )
    .unwrap()
});

/// Parse a hand-written date value such as a catalog fallback or seed date.
///
/// Like [`parse_date_token`], but a time of day is dropped first, so
/// `"November 14, 2025 23:59 AoE"` and `"2025-11-14T23:59:00Z"` both read as
/// 2025-11-14.
pub fn parse_loose_date(value: &str) -> Option<NaiveDate> {
    let without_iso = ISO_TIME.replace_all(value, "$1");
    let date_only = CLOCK_TIME.replace_all(&without_iso, " ");
    parse_date_token(&date_only)
}

fn month_from_name(word: &str) -> Option<u32> {
    if word.len() < 3 || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let lower = word.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(&lower))
        .map(|i| i as u32 + 1)
}

/// Extract every date candidate from the relevant lines of a document.
///
/// One candidate per parsed token per line, in line order; callers merge
/// repeated dates with [`crate::dedup::dedup_candidates`].
pub fn extract_candidates<S: AsRef<str>>(
    lines: &[S],
    rule: &ExtractionRule,
    target_year: Option<i32>,
    context_chars: usize,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for idx in relevant_lines(lines, rule) {
        let line = lines[idx].as_ref();
        if rule.exclude.matches(line) {
            continue;
        }
        let tokens = date_tokens(line, target_year);
        if tokens.is_empty() {
            continue;
        }

        let has_keyword = rule.include.matches(line);
        let is_firm = rule.firm.matches(line);
        let is_extension = rule.extension.matches(line);
        let context: String = line.chars().take(context_chars).collect();

        candidates.extend(tokens.into_iter().filter_map(|raw| {
            let date = parse_date_token(&raw)?;
            Some(Candidate {
                date,
                raw,
                context: context.clone(),
                has_keyword,
                is_firm,
                is_extension,
            })
        }));
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordSet;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn tokens_for_each_shape() {
        assert_eq!(date_tokens("due 3 March 2025", None), vec!["3 March 2025"]);
        assert_eq!(date_tokens("due 3 Mar, 2025", None), vec!["3 Mar, 2025"]);
        assert_eq!(date_tokens("due 2025 Sept. 14", None), vec!["2025 Sept. 14"]);
        assert_eq!(date_tokens("due 2025-03-03.", None), vec!["2025-03-03"]);
    }

    #[test]
    fn month_day_year_also_yields_bare_token_with_target_year() {
        let tokens = date_tokens("Submission deadline: March 3, 2025 (firm)", Some(2025));
        assert_eq!(tokens, vec!["March 3, 2025", "March 3 2025"]);
    }

    #[test]
    fn bare_month_day_dropped_without_year() {
        assert!(date_tokens("Abstracts: Jan 15", None).is_empty());
        assert_eq!(date_tokens("Abstracts: Jan 15", Some(2026)), vec!["Jan 15 2026"]);
    }

    #[test]
    fn duplicate_tokens_removed_in_order() {
        let tokens = date_tokens("2025-01-10 or 2025-01-10 or 2025-01-11", None);
        assert_eq!(tokens, vec!["2025-01-10", "2025-01-11"]);
    }

    #[test]
    fn case_insensitive_months() {
        assert_eq!(date_tokens("DEADLINE: MAY 5, 2025", None), vec!["MAY 5, 2025"]);
    }

    #[test]
    fn parses_month_first() {
        assert_eq!(parse_date_token("March 3, 2025"), Some(ymd(2025, 3, 3)));
        assert_eq!(parse_date_token("3 Mar, 2025"), Some(ymd(2025, 3, 3)));
        assert_eq!(parse_date_token("2025 Sept. 14"), Some(ymd(2025, 9, 14)));
        assert_eq!(parse_date_token("2025-04-03"), Some(ymd(2025, 4, 3)));
        assert_eq!(parse_date_token("4/3/2025"), Some(ymd(2025, 4, 3)));
        assert_eq!(parse_date_token("Jan 15 2026"), Some(ymd(2026, 1, 15)));
    }

    #[test]
    fn unparsable_tokens_are_none() {
        assert_eq!(parse_date_token("February 30, 2025"), None);
        assert_eq!(parse_date_token("2025-13-01"), None);
        assert_eq!(parse_date_token("March 2025"), None);
        assert_eq!(parse_date_token("nothing here"), None);
    }

    #[test]
    fn loose_dates_drop_time_of_day() {
        let nov14 = Some(ymd(2025, 11, 14));
        assert_eq!(parse_loose_date("November 14, 2025 23:59 AoE"), nov14);
        assert_eq!(parse_loose_date("2025-11-14T23:59:00Z"), nov14);
        assert_eq!(parse_loose_date("2025-11-14T23:59:00.000+02:00"), nov14);
        assert_eq!(parse_loose_date("Nov 14 2025, 11:59 PM"), nov14);
        assert_eq!(parse_loose_date("14 Nov 2025 5pm"), nov14);
        assert_eq!(parse_loose_date("2025-11-14 23:59 (UTC-12)"), nov14);
        assert_eq!(parse_loose_date("Friday, November 14, 2025 at 11:59 p.m."), nov14);
    }

    #[test]
    fn loose_dates_still_need_a_whole_date() {
        assert_eq!(parse_loose_date("2025-11-14"), Some(ymd(2025, 11, 14)));
        assert_eq!(parse_loose_date("23:59 AoE"), None);
        assert_eq!(parse_loose_date("November 2025 11:59 PM"), None);
        assert_eq!(parse_loose_date("sometime soon"), None);
    }

    #[test]
    fn invalid_calendar_match_is_discarded_silently() {
        let lines = ["Deadline: February 30, 2025 or March 1, 2025"];
        let got = extract_candidates(&lines, &ExtractionRule::default(), None, 240);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].date, ymd(2025, 3, 1));
    }

    #[test]
    fn flags_follow_line_keywords() {
        let rule = ExtractionRule {
            include: KeywordSet::new(["submission"]),
            firm: KeywordSet::new(["firm"]),
            extension: KeywordSet::new(["extended"]),
            ..Default::default()
        };
        let lines = [
            "Submission deadline: March 3, 2025 (firm)",
            "Extended to March 10, 2025",
        ];
        let got = extract_candidates(&lines, &rule, Some(2025), 240);
        let first = got.iter().find(|c| c.date == ymd(2025, 3, 3)).unwrap();
        assert!(first.has_keyword && first.is_firm && !first.is_extension);
        let second = got.iter().find(|c| c.date == ymd(2025, 3, 10)).unwrap();
        assert!(!second.has_keyword && !second.is_firm && second.is_extension);
    }

    #[test]
    fn excluded_lines_never_yield_candidates() {
        let rule = ExtractionRule {
            exclude: KeywordSet::new(["notification"]),
            ..Default::default()
        };
        let lines = ["Notification: May 1, 2025", "Papers due April 1, 2025"];
        let got = extract_candidates(&lines, &rule, None, 240);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].date, ymd(2025, 4, 1));
    }

    #[test]
    fn context_is_truncated() {
        let long = format!("Deadline March 3, 2025 {}", "x".repeat(500));
        let got = extract_candidates(&[long], &ExtractionRule::default(), None, 240);
        assert_eq!(got[0].context.chars().count(), 240);
    }
}
