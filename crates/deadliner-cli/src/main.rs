use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand};
use deadliner_core::extract::DEFAULT_CONTEXT_CHARS;
use deadliner_core::relevance::relevant_lines;
use deadliner_core::{
    ConferenceEntry, CrawlEvent, CrawlOptions, DeadlineEngine, EngineSettings, LineSource, RuleDocument,
    crawl_conferences, load_conferences, load_rules,
};
use deadliner_fetch::HttpLineSource;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod output;
mod persistence;
mod settings;

use output::ColorMode;
use settings::{Settings, SettingsArgs};

/// Conference deadline crawler - infer submission deadlines from call-for-papers pages
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl every conference in the catalog and update the data directory
    Crawl {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Show the candidate dates found for one conference, without writing anything
    Inspect {
        /// Conference id from the catalog
        id: String,

        /// Read page text from a local file instead of fetching the conference URLs
        #[arg(long)]
        page: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs, cli.verbose);

    match cli.command {
        Command::Crawl { settings, no_color } => crawl(resolve_settings(&settings), no_color).await,
        Command::Inspect {
            id,
            page,
            settings,
            no_color,
        } => inspect(resolve_settings(&settings), &id, page, no_color).await,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `-v`; logs go to
/// stderr so stdout stays clean for the report.
fn init_tracing(json: bool, verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}

fn resolve_settings(args: &SettingsArgs) -> Settings {
    let config = deadliner_core::config_file::load_config();
    Settings::resolve(args, |key| std::env::var(key).ok(), &config)
}

/// Missing rules file means built-in defaults; a broken one is an error.
fn load_rules_or_default(path: &Path) -> anyhow::Result<RuleDocument> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "rules file not found, using defaults");
        return Ok(RuleDocument::default());
    }
    Ok(load_rules(path)?)
}

fn load_catalog(path: &Path) -> anyhow::Result<Vec<ConferenceEntry>> {
    if !path.exists() {
        anyhow::bail!("Conference catalog not found: {}", path.display());
    }
    Ok(load_conferences(path)?)
}

fn build_engine(settings: &Settings) -> anyhow::Result<DeadlineEngine> {
    let rules = load_rules_or_default(&settings.rules)?;
    Ok(DeadlineEngine::new(
        rules,
        EngineSettings {
            lookback_days: settings.lookback_days,
            context_chars: DEFAULT_CONTEXT_CHARS,
        },
    ))
}

async fn crawl(settings: Settings, no_color: bool) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);
    let engine = Arc::new(build_engine(&settings)?);
    let entries = load_catalog(&settings.conferences)?;
    let source: Arc<dyn LineSource> = Arc::new(
        HttpLineSource::new(settings.fetch_settings()).context("Failed to build HTTP client")?,
    );

    let results_path = persistence::results_path(&settings.data_dir);
    let history_path = persistence::history_path(&settings.data_dir);
    let prior = Arc::new(persistence::load_prior(&results_path)?);
    let mut ledger = persistence::load_history(&history_path)?;

    tracing::info!(
        conferences = entries.len(),
        prior = prior.len(),
        history = ledger.len(),
        concurrency = settings.concurrency,
        "starting crawl"
    );

    // Progress goes to stderr, the final table to stdout
    let progress_writer: Arc<Mutex<Box<dyn Write + Send>>> = Arc::new(Mutex::new(Box::new(std::io::stderr())));
    let progress_cb = {
        let pw = Arc::clone(&progress_writer);
        move |event: CrawlEvent| {
            if let Ok(mut w) = pw.lock() {
                let _ = output::print_progress(&mut *w, &event, color);
                let _ = w.flush();
            }
        }
    };

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let options = CrawlOptions {
        concurrency: settings.concurrency,
        now: chrono::Utc::now(),
    };
    let phase = crawl_conferences(entries, engine, source, prior, options, progress_cb, cancel).await;

    let rejected: Vec<String> = phase.rejected.iter().map(|e| e.to_string()).collect();
    let batch = phase
        .freeze()
        .context("Crawl interrupted; previous data left untouched")?;
    let outcome = batch.predict();
    let appended = ledger.append(outcome.history);

    persistence::save_run(&settings.data_dir, &outcome.results, &ledger)?;
    tracing::info!(
        results = outcome.results.len(),
        history_appended = appended,
        data_dir = %settings.data_dir.display(),
        "wrote crawl results"
    );

    let mut stdout = std::io::stdout();
    output::print_results(&mut stdout, &outcome.results, color)?;
    output::print_summary(&mut stdout, &outcome.results, appended, &rejected, color)?;

    if !rejected.is_empty() {
        anyhow::bail!(
            "{} conference entr{} rejected for invalid configuration",
            rejected.len(),
            if rejected.len() == 1 { "y" } else { "ies" }
        );
    }
    Ok(())
}

async fn inspect(settings: Settings, id: &str, page: Option<PathBuf>, no_color: bool) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);
    let engine = build_engine(&settings)?;
    let entries = load_catalog(&settings.conferences)?;

    let (position, entry) = entries
        .into_iter()
        .enumerate()
        .find(|(_, e)| e.id.as_deref() == Some(id))
        .ok_or_else(|| anyhow::anyhow!("No conference with id {id} in {}", settings.conferences.display()))?;
    let conference = entry.validate(position)?;

    let source = HttpLineSource::new(settings.fetch_settings()).context("Failed to build HTTP client")?;
    let urls: Vec<String> = match page {
        Some(path) => {
            let path = std::path::absolute(&path)
                .with_context(|| format!("Invalid page path {}", path.display()))?;
            vec![format!("file://{}", path.display())]
        }
        None => conference.sources().into_iter().map(str::to_string).collect(),
    };

    let mut lines = Vec::new();
    for url in &urls {
        let fetched = source.fetch_lines(url).await;
        if let Some(err) = &fetched.error {
            eprintln!("{url}: {err}");
        }
        lines.extend(fetched.lines);
    }

    let rule = engine.rule_for(&conference);
    let relevant = relevant_lines(&lines, &rule).len();
    let (candidates, selection) = engine.select(&conference, &lines);

    let mut stdout = std::io::stdout();
    output::print_inspection(
        &mut stdout,
        &conference.id,
        lines.len(),
        relevant,
        &candidates,
        &selection,
        color,
    )?;
    Ok(())
}
