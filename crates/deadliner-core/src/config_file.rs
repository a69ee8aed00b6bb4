use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML application settings.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub paths: Option<PathsConfig>,
    pub crawl: Option<CrawlConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Conference catalog TOML.
    pub conferences: Option<String>,
    /// Layered extraction rules TOML.
    pub rules: Option<String>,
    /// Directory holding `conferences.json` and `deadline_history.json`.
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub user_agent: Option<String>,
    pub allow_insecure_fallback: Option<bool>,
    pub lookback_days: Option<u32>,
}

/// Platform config directory path: `<config_dir>/deadliner/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deadliner").join("config.toml"))
}

/// Load config by cascading CWD `.deadliner.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".deadliner.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed; parse failures are logged.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let bp = base.paths.unwrap_or_default();
    let op = overlay.paths.unwrap_or_default();
    let bc = base.crawl.unwrap_or_default();
    let oc = overlay.crawl.unwrap_or_default();

    ConfigFile {
        paths: Some(PathsConfig {
            conferences: op.conferences.or(bp.conferences),
            rules: op.rules.or(bp.rules),
            data_dir: op.data_dir.or(bp.data_dir),
        }),
        crawl: Some(CrawlConfig {
            concurrency: oc.concurrency.or(bc.concurrency),
            timeout_secs: oc.timeout_secs.or(bc.timeout_secs),
            max_retries: oc.max_retries.or(bc.max_retries),
            user_agent: oc.user_agent.or(bc.user_agent),
            allow_insecure_fallback: oc.allow_insecure_fallback.or(bc.allow_insecure_fallback),
            lookback_days: oc.lookback_days.or(bc.lookback_days),
        }),
    }
}
