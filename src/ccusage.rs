//! External usage-reporting tool (`ccusage statusline`).
//!
//! The tool gets the session JSON on stdin and prints a one-line,
//! emoji-decorated summary. Only three values are scraped from it; the
//! rest of the line is ignored. The subprocess is the slowest source, so
//! its raw output is cached with the longest window.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::error::{ProviderError, ProviderResult};
use crate::models::quota::SpendReport;
use crate::utils::run_with_timeout;

static TODAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\$[\d.,]+)\s*today").unwrap());
static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$[\d.,]+)\s*block\s*\(([^)]+)\)").unwrap());
static BURN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\$[\d.,]+/hr)").unwrap());

/// Extract today / block / burn-rate values. A missing pattern leaves that
/// field `None`; nothing here fails.
pub fn parse_report(text: &str) -> SpendReport {
    let today = TODAY_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let block = BLOCK_RE.captures(text).and_then(|c| {
        let amount = c.get(1)?.as_str();
        let note = c.get(2)?.as_str().trim();
        Some(format!("{amount} block ({note})"))
    });
    let burn_rate = BURN_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    SpendReport {
        today,
        block,
        burn_rate,
    }
}

/// Run the configured reporting command with `session_json` on stdin.
pub fn run_report(config: &Config, session_json: &[u8]) -> ProviderResult<Vec<u8>> {
    let (program, args) = config
        .report_command
        .split_first()
        .ok_or_else(|| ProviderError::Malformed("empty report command".into()))?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let out = run_with_timeout(
        program,
        &args,
        None,
        Some(session_json),
        config.report_timeout,
    )?;
    let trimmed = out.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::Malformed("empty report output".into()));
    }
    Ok(trimmed.as_bytes().to_vec())
}

/// Spend summary for the statusline, served from the cache when fresh.
/// Output in which none of the three values can be found counts as absent.
pub fn spend_report(config: &Config, session_json: &[u8]) -> Option<SpendReport> {
    let cache = config.cache();
    let (report, freshness) = cache.get_or_refresh_with(
        &config.report_cache_key,
        config.report_max_age,
        |bytes| {
            let text = String::from_utf8_lossy(bytes);
            Some(parse_report(&text)).filter(|r| !r.is_empty())
        },
        || run_report(config, session_json),
    )?;
    debug!(?report, ?freshness, "spend report");
    Some(report)
}
