use std::io::Write;

use deadliner_core::{Candidate, CrawlEvent, DeadlineResult, FetchStatus, Selection};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print a real-time progress event.
pub fn print_progress(w: &mut dyn Write, event: &CrawlEvent, color: ColorMode) -> std::io::Result<()> {
    match event {
        CrawlEvent::Fetching {
            index,
            total,
            id,
            urls,
        } => {
            let noun = if *urls == 1 { "page" } else { "pages" };
            writeln!(w, "[{}/{}] Fetching {} ({} {})", index + 1, total, id, urls, noun)?;
        }
        CrawlEvent::SourceFailed { id, url, error } => {
            if color.enabled() {
                writeln!(w, "  {} {}: {} ({})", "WARN".yellow(), id, url, error.dimmed())?;
            } else {
                writeln!(w, "  WARN {}: {} ({})", id, url, error)?;
            }
        }
        CrawlEvent::Resolved {
            index,
            total,
            id,
            deadline,
            is_firm,
            status,
            confidence,
        } => {
            let idx = index + 1;
            let firmness = if *is_firm { "firm" } else { "soft" };
            match status {
                FetchStatus::Ok => {
                    if color.enabled() {
                        writeln!(
                            w,
                            "[{}/{}] -> {} {} ({}, confidence {:.2})",
                            idx,
                            total,
                            id,
                            deadline.green(),
                            firmness,
                            confidence
                        )?;
                    } else {
                        writeln!(
                            w,
                            "[{}/{}] -> {} {} ({}, confidence {:.2})",
                            idx, total, id, deadline, firmness, confidence
                        )?;
                    }
                }
                FetchStatus::Fallback => {
                    if color.enabled() {
                        writeln!(
                            w,
                            "[{}/{}] -> {} {} ({})",
                            idx,
                            total,
                            id,
                            deadline.yellow(),
                            "FALLBACK".yellow()
                        )?;
                    } else {
                        writeln!(w, "[{}/{}] -> {} {} (FALLBACK)", idx, total, id, deadline)?;
                    }
                }
            }
        }
        CrawlEvent::Rejected {
            index,
            total,
            error,
        } => {
            if color.enabled() {
                writeln!(w, "[{}/{}] {} {}", index + 1, total, "REJECTED".red(), error)?;
            } else {
                writeln!(w, "[{}/{}] REJECTED {}", index + 1, total, error)?;
            }
        }
    }
    Ok(())
}

/// Print the final table of deadlines, in result order.
pub fn print_results(w: &mut dyn Write, results: &[DeadlineResult], color: ColorMode) -> std::io::Result<()> {
    if results.is_empty() {
        writeln!(w, "No conferences resolved.")?;
        return Ok(());
    }

    let id_width = results.iter().map(|r| r.id.len()).max().unwrap_or(2).max(2);
    let header = format!(
        "{:<id_width$}  {:<10}  {:<4}  {:>5}  {:<10}  {:>4}  {}",
        "ID", "DEADLINE", "FIRM", "+DAYS", "STRETCH", "CONF", "STATUS"
    );
    if color.enabled() {
        writeln!(w, "{}", header.bold())?;
    } else {
        writeln!(w, "{}", header)?;
    }

    for r in results {
        let firm = if r.is_firm_deadline { "yes" } else { "no" };
        let line = format!(
            "{:<id_width$}  {:<10}  {:<4}  {:>5}  {:<10}  {:>4.2}  {}",
            r.id,
            r.deadline_iso.to_string(),
            firm,
            r.predicted_extension_days,
            r.stretch_until_iso.to_string(),
            r.confidence,
            r.status.as_str()
        );
        match r.status {
            FetchStatus::Fallback if color.enabled() => writeln!(w, "{}", line.yellow())?,
            _ => writeln!(w, "{}", line)?,
        }
    }
    Ok(())
}

/// Print the closing summary line, plus any rejected entries.
pub fn print_summary(
    w: &mut dyn Write,
    results: &[DeadlineResult],
    appended_history: usize,
    rejected: &[String],
    color: ColorMode,
) -> std::io::Result<()> {
    let fallback = results
        .iter()
        .filter(|r| r.status == FetchStatus::Fallback)
        .count();
    let firm = results.iter().filter(|r| r.is_firm_deadline).count();

    writeln!(w)?;
    writeln!(
        w,
        "{} conferences: {} firm, {} on fallback, {} deadline change(s) recorded",
        results.len(),
        firm,
        fallback,
        appended_history
    )?;

    if !rejected.is_empty() {
        if color.enabled() {
            writeln!(w, "{}", format!("{} entries rejected:", rejected.len()).red().bold())?;
        } else {
            writeln!(w, "{} entries rejected:", rejected.len())?;
        }
        for msg in rejected {
            writeln!(w, "  - {}", msg)?;
        }
    }
    Ok(())
}

/// Print every candidate found for one conference and the resulting choice.
pub fn print_inspection(
    w: &mut dyn Write,
    id: &str,
    line_count: usize,
    relevant: usize,
    candidates: &[Candidate],
    selection: &Selection,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(
        w,
        "{}: {} lines ({} relevant), {} candidate date(s)",
        id,
        line_count,
        relevant,
        candidates.len()
    )?;
    writeln!(w)?;

    for c in candidates {
        let mut flags = Vec::new();
        if c.has_keyword {
            flags.push("keyword");
        }
        if c.is_firm {
            flags.push("firm");
        }
        if c.is_extension {
            flags.push("extension");
        }
        let marker = if c.date == selection.deadline { "*" } else { " " };
        let flags = flags.join(",");
        if color.enabled() && c.date == selection.deadline {
            writeln!(w, "{} {} [{}] {}", marker, c.date.green().bold(), flags, c.raw)?;
        } else {
            writeln!(w, "{} {} [{}] {}", marker, c.date, flags, c.raw)?;
        }
        if color.enabled() {
            writeln!(w, "      {}", c.context.dimmed())?;
        } else {
            writeln!(w, "      {}", c.context)?;
        }
    }

    writeln!(w)?;
    writeln!(
        w,
        "Selected {} ({}, confidence {:.2})",
        selection.deadline,
        if selection.is_firm { "firm" } else { "not firm" },
        selection.confidence
    )?;
    Ok(())
}
