use std::path::PathBuf;
use std::time::Duration;

use deadliner_core::config_file::ConfigFile;
use deadliner_core::extension::DEFAULT_LOOKBACK_DAYS;
use deadliner_fetch::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, FetchSettings};

pub const DEFAULT_CONFERENCES: &str = "conferences.toml";
pub const DEFAULT_RULES: &str = "crawler_rules.toml";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SettingsArgs {
    /// Conference catalog (TOML)
    #[arg(long)]
    pub conferences: Option<PathBuf>,

    /// Extraction rules (TOML)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Directory for conferences.json and deadline_history.json
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Conferences crawled in parallel
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Retries for timeouts, connection errors and 5xx responses
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Fail pages with unverifiable certificates instead of refetching them
    #[arg(long)]
    pub no_insecure_fallback: bool,

    /// Days before the deadline in which earlier dates count as extensions
    #[arg(long)]
    pub lookback_days: Option<u32>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub conferences: PathBuf,
    pub rules: PathBuf,
    pub data_dir: PathBuf,
    pub concurrency: usize,
    pub timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
    pub allow_insecure_fallback: bool,
    pub lookback_days: u32,
}

impl Settings {
    /// Resolve: CLI flags > `DEADLINER_*` env vars > config file > defaults.
    ///
    /// `env` looks up an environment variable; unparsable values are ignored.
    pub fn resolve(
        args: &SettingsArgs,
        env: impl Fn(&str) -> Option<String>,
        config: &ConfigFile,
    ) -> Self {
        let paths = config.paths.clone().unwrap_or_default();
        let crawl = config.crawl.clone().unwrap_or_default();
        let env_path = |key: &str| env(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        let env_parse = |key: &str| env(key).and_then(|v| v.trim().parse::<u64>().ok());

        let conferences = args
            .conferences
            .clone()
            .or_else(|| env_path("DEADLINER_CONFERENCES"))
            .or_else(|| paths.conferences.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFERENCES));
        let rules = args
            .rules
            .clone()
            .or_else(|| env_path("DEADLINER_RULES"))
            .or_else(|| paths.rules.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RULES));
        let data_dir = args
            .data_dir
            .clone()
            .or_else(|| env_path("DEADLINER_DATA_DIR"))
            .or_else(|| paths.data_dir.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let concurrency = args
            .concurrency
            .or_else(|| env_parse("DEADLINER_CONCURRENCY").map(|v| v as usize))
            .or(crawl.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
            .max(1);
        let timeout_secs = args
            .timeout
            .or_else(|| env_parse("DEADLINER_TIMEOUT"))
            .or(crawl.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT.as_secs());
        let max_retries = args
            .max_retries
            .or_else(|| env_parse("DEADLINER_MAX_RETRIES").map(|v| v as u32))
            .or(crawl.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let user_agent = env("DEADLINER_USER_AGENT")
            .filter(|v| !v.is_empty())
            .or(crawl.user_agent)
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let allow_insecure_fallback = if args.no_insecure_fallback {
            false
        } else {
            crawl.allow_insecure_fallback.unwrap_or(true)
        };
        let lookback_days = args
            .lookback_days
            .or_else(|| env_parse("DEADLINER_LOOKBACK_DAYS").map(|v| v as u32))
            .or(crawl.lookback_days)
            .unwrap_or(DEFAULT_LOOKBACK_DAYS);

        Self {
            conferences,
            rules,
            data_dir,
            concurrency,
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            user_agent,
            allow_insecure_fallback,
            lookback_days,
        }
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            user_agent: self.user_agent.clone(),
            timeout: self.timeout,
            max_retries: self.max_retries,
            allow_insecure_fallback: self.allow_insecure_fallback,
            ..FetchSettings::default()
        }
    }
}
