use std::path::PathBuf;

use serde::Deserialize;

#[derive(clap::ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormatArg {
    #[default]
    #[value(name = "12h")]
    #[serde(rename = "12h")]
    H12,
    #[value(name = "24h")]
    #[serde(rename = "24h")]
    H24,
}

#[derive(clap::ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuotaSourceArg {
    /// Rolling/weekly utilization from the OAuth usage endpoint
    #[default]
    Api,
    /// Spend summary scraped from an external reporting tool (ccusage)
    Ccusage,
    /// Usage endpoint first, reporting tool when the endpoint yields nothing
    Auto,
    /// No quota segment
    Off,
}

#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Render a Claude Code statusline from the statusLine JSON on stdin")]
pub struct Args {
    /// Config file (TOML). Defaults to <config dir>/cc-statusline/config.toml
    #[arg(long, env = "CC_STATUSLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the per-source cache files (default: system temp dir)
    #[arg(long, env = "CC_STATUSLINE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Where quota data comes from: api|ccusage|auto|off
    #[arg(long, value_enum, env = "CC_STATUSLINE_QUOTA_SOURCE")]
    pub quota_source: Option<QuotaSourceArg>,

    /// Seconds a cached git scan stays fresh
    #[arg(long)]
    pub git_max_age: Option<u64>,

    /// Seconds a cached usage response stays fresh
    #[arg(long)]
    pub usage_max_age: Option<u64>,

    /// Seconds cached reporting-tool output stays fresh
    #[arg(long)]
    pub report_max_age: Option<u64>,

    /// Clock style for reset times: 12h|24h
    #[arg(long = "time", value_enum)]
    pub time_fmt: Option<TimeFormatArg>,

    /// Force Claude data path(s) used to find credentials, comma-separated
    #[arg(long, env = "CLAUDE_CONFIG_DIR")]
    pub claude_config_dir: Option<String>,

    /// Disable ANSI colors (NO_COLOR is honored as well)
    #[arg(long)]
    pub no_color: bool,

    /// Skip the git working-tree segment
    #[arg(long)]
    pub no_git: bool,

    /// Log provider and cache decisions to stderr
    #[arg(long, env = "CC_STATUSLINE_DEBUG", value_parser = clap::builder::FalseyValueParser::new())]
    pub debug: bool,
}

impl Args {
    /// Parse the process arguments. `--help` and `--version` print and exit
    /// as usual; any other argument error (including a bad env value) falls
    /// back to defaults and is returned for logging.
    pub fn parse() -> (Self, Option<clap::Error>) {
        Self::parse_from_lenient(std::env::args_os())
    }

    pub fn parse_from_lenient<I, T>(itr: I) -> (Self, Option<clap::Error>)
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        use clap::error::ErrorKind;

        match <Args as clap::Parser>::try_parse_from(itr) {
            Ok(args) => (args, None),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::DisplayHelp
                        | ErrorKind::DisplayVersion
                        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) =>
            {
                e.exit()
            }
            Err(e) => (Args::default(), Some(e)),
        }
    }
}
