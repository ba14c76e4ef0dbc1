//! Runtime configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML config file, then
//! CLI flags and their environment variables. Nothing here is global; the
//! resolved [`Config`] is passed to each provider.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::FreshnessCache;
use crate::cli::{Args, QuotaSourceArg, TimeFormatArg};

pub const GIT_CACHE_KEY: &str = "claude-statusline-git-cache";
pub const USAGE_CACHE_KEY: &str = "claude-statusline-usage-cache";
pub const REPORT_CACHE_KEY: &str = "claude-statusline-ccusage-cache";

pub const DEFAULT_USAGE_ENDPOINT: &str = "https://api.anthropic.com/api/oauth/usage";
const DEFAULT_REPORT_COMMAND: [&str; 3] = ["npx", "ccusage@latest", "statusline"];

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub git_cache_key: String,
    pub usage_cache_key: String,
    pub report_cache_key: String,
    pub git_max_age: Duration,
    pub usage_max_age: Duration,
    pub report_max_age: Duration,
    pub git_timeout: Duration,
    pub http_timeout: Duration,
    pub report_timeout: Duration,
    pub quota_source: QuotaSourceArg,
    pub report_command: Vec<String>,
    pub usage_endpoint: String,
    /// Claude config directories searched for `.credentials.json`.
    pub credential_dirs: Vec<PathBuf>,
    pub time_format: TimeFormatArg,
    pub color: bool,
    pub git_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: env::temp_dir(),
            git_cache_key: GIT_CACHE_KEY.to_string(),
            usage_cache_key: USAGE_CACHE_KEY.to_string(),
            report_cache_key: REPORT_CACHE_KEY.to_string(),
            git_max_age: Duration::from_secs(5),
            usage_max_age: Duration::from_secs(60),
            report_max_age: Duration::from_secs(30),
            git_timeout: Duration::from_secs(2),
            http_timeout: Duration::from_secs(5),
            report_timeout: Duration::from_secs(15),
            quota_source: QuotaSourceArg::Api,
            report_command: DEFAULT_REPORT_COMMAND.iter().map(|s| s.to_string()).collect(),
            usage_endpoint: DEFAULT_USAGE_ENDPOINT.to_string(),
            credential_dirs: claude_dirs(None),
            time_format: TimeFormatArg::H12,
            color: true,
            git_enabled: true,
        }
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub cache_dir: Option<PathBuf>,
    pub git_max_age_secs: Option<u64>,
    pub usage_max_age_secs: Option<u64>,
    pub report_max_age_secs: Option<u64>,
    pub git_timeout_ms: Option<u64>,
    pub http_timeout_ms: Option<u64>,
    pub report_timeout_ms: Option<u64>,
    pub quota_source: Option<QuotaSourceArg>,
    pub report_command: Option<Vec<String>>,
    pub usage_endpoint: Option<String>,
    pub time_format: Option<TimeFormatArg>,
    pub color: Option<bool>,
    pub git: Option<bool>,
}

impl Config {
    /// Resolve the effective configuration. A missing or broken config file
    /// is logged and ignored.
    pub fn load(args: &Args) -> Self {
        let mut config = Config::default();

        if let Some(path) = args.config.clone().or_else(default_config_path) {
            if path.is_file() {
                match read_file_config(&path) {
                    Ok(file) => {
                        debug!(path = %path.display(), "loaded config file");
                        config.apply_file(file);
                    }
                    Err(e) => warn!(path = %path.display(), error = %format!("{e:#}"), "ignoring config file"),
                }
            }
        }

        config.apply_args(args);
        if env::var_os("NO_COLOR").is_some() {
            config.color = false;
        }
        config
    }

    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(dir) = file.cache_dir {
            self.cache_dir = dir;
        }
        if let Some(s) = file.git_max_age_secs {
            self.git_max_age = Duration::from_secs(s);
        }
        if let Some(s) = file.usage_max_age_secs {
            self.usage_max_age = Duration::from_secs(s);
        }
        if let Some(s) = file.report_max_age_secs {
            self.report_max_age = Duration::from_secs(s);
        }
        if let Some(ms) = file.git_timeout_ms {
            self.git_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.http_timeout_ms {
            self.http_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.report_timeout_ms {
            self.report_timeout = Duration::from_millis(ms);
        }
        if let Some(source) = file.quota_source {
            self.quota_source = source;
        }
        if let Some(cmd) = file.report_command.filter(|c| !c.is_empty()) {
            self.report_command = cmd;
        }
        if let Some(endpoint) = file.usage_endpoint {
            self.usage_endpoint = endpoint;
        }
        if let Some(t) = file.time_format {
            self.time_format = t;
        }
        if let Some(c) = file.color {
            self.color = c;
        }
        if let Some(g) = file.git {
            self.git_enabled = g;
        }
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref dir) = args.cache_dir {
            self.cache_dir = dir.clone();
        }
        if let Some(source) = args.quota_source {
            self.quota_source = source;
        }
        if let Some(s) = args.git_max_age {
            self.git_max_age = Duration::from_secs(s);
        }
        if let Some(s) = args.usage_max_age {
            self.usage_max_age = Duration::from_secs(s);
        }
        if let Some(s) = args.report_max_age {
            self.report_max_age = Duration::from_secs(s);
        }
        if let Some(t) = args.time_fmt {
            self.time_format = t;
        }
        if args.claude_config_dir.is_some() {
            self.credential_dirs = claude_dirs(args.claude_config_dir.as_deref());
        }
        if args.no_color {
            self.color = false;
        }
        if args.no_git {
            self.git_enabled = false;
        }
    }

    pub fn cache(&self) -> FreshnessCache {
        FreshnessCache::new(&self.cache_dir)
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.config_dir().join("cc-statusline").join("config.toml"))
}

pub fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Claude config directories: an explicit comma-separated list wins,
/// otherwise `~/.claude` then `<xdg config>/claude`.
pub fn claude_dirs(override_list: Option<&str>) -> Vec<PathBuf> {
    if let Some(list) = override_list {
        let paths: Vec<PathBuf> = list
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        if !paths.is_empty() {
            return paths;
        }
    }
    let Some(base) = directories::BaseDirs::new() else {
        return Vec::new();
    };
    vec![
        base.home_dir().join(".claude"),
        base.config_dir().join("claude"),
    ]
}
