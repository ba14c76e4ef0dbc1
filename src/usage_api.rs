use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{ProviderError, ProviderResult};
use crate::models::quota::{Overage, UsageQuota, WindowUsage};

const DEFAULT_USER_AGENT: &str = "claude-code";
const ANTHROPIC_BETA: &str = "oauth-2025-04-20";
const KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

/// Source of the OAuth bearer token for the usage endpoint.
pub trait TokenProvider {
    fn bearer_token(&self) -> Option<String>;
}

/// Environment, then `.credentials.json` in the Claude config dirs, then
/// the OS secret store.
#[derive(Debug, Clone)]
pub struct CredentialChain {
    pub claude_dirs: Vec<PathBuf>,
}

impl CredentialChain {
    pub fn new(claude_dirs: Vec<PathBuf>) -> Self {
        Self { claude_dirs }
    }

    fn from_env() -> Option<String> {
        ["CLAUDE_CODE_OAUTH_TOKEN", "ANTHROPIC_AUTH_TOKEN"]
            .into_iter()
            .filter_map(|key| env::var(key).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }

    fn from_credentials_file(&self) -> Option<String> {
        self.claude_dirs.iter().find_map(|dir| {
            let raw = fs::read_to_string(dir.join(".credentials.json")).ok()?;
            extract_access_token(&raw)
        })
    }
}

impl TokenProvider for CredentialChain {
    fn bearer_token(&self) -> Option<String> {
        Self::from_env()
            .or_else(|| self.from_credentials_file())
            .or_else(read_from_secret_store)
    }
}

/// Pull `claudeAiOauth.accessToken` out of a credentials JSON document.
pub fn extract_access_token(raw: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    let token = json
        .get("claudeAiOauth")
        .and_then(|v| v.get("accessToken"))
        .and_then(|v| v.as_str())?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Keychain service name. A custom `CLAUDE_CONFIG_DIR` gets an 8-char
/// SHA-256 suffix, matching how Claude Code stores per-dir credentials.
pub fn keychain_service_name(config_dir: Option<&str>) -> String {
    use sha2::{Digest, Sha256};

    let mut service = KEYCHAIN_SERVICE.to_string();
    if let Some(dir) = config_dir {
        let hash = Sha256::digest(dir.as_bytes());
        let suffix = format!("{:x}", hash).chars().take(8).collect::<String>();
        service.push('-');
        service.push_str(&suffix);
    }
    service
}

#[cfg(target_os = "macos")]
fn read_from_secret_store() -> Option<String> {
    let username = env::var("USER").ok()?;
    let service = keychain_service_name(env::var("CLAUDE_CONFIG_DIR").ok().as_deref());
    let out = crate::utils::run_with_timeout(
        "security",
        &["find-generic-password", "-a", &username, "-s", &service, "-w"],
        None,
        None,
        Duration::from_secs(2),
    )
    .ok()?;
    extract_access_token(&out)
}

#[cfg(not(target_os = "macos"))]
fn read_from_secret_store() -> Option<String> {
    None
}

fn user_agent() -> String {
    env::var("CLAUDE_STATUSLINE_USER_AGENT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
}

#[derive(Debug, Deserialize)]
struct UsageLimitDto {
    utilization: Option<f64>,
    resets_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtraUsageDto {
    #[serde(default)]
    is_enabled: bool,
    /// minor units (cents)
    monthly_limit: Option<f64>,
    /// minor units (cents)
    used_credits: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UsageResponseDto {
    #[serde(default)]
    five_hour: Option<UsageLimitDto>,
    #[serde(default)]
    seven_day: Option<UsageLimitDto>,
    #[serde(default)]
    extra_usage: Option<ExtraUsageDto>,
}

impl From<UsageLimitDto> for WindowUsage {
    fn from(value: UsageLimitDto) -> Self {
        WindowUsage {
            utilization_pct: value.utilization.filter(|u| u.is_finite()).unwrap_or(0.0),
            resets_at: value.resets_at.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Decode a usage endpoint body. A body with neither window is rejected so
/// an error document never replaces a good cache entry.
pub fn parse_usage_response(body: &[u8]) -> Option<UsageQuota> {
    let dto: UsageResponseDto = serde_json::from_slice(body).ok()?;
    if dto.five_hour.is_none() && dto.seven_day.is_none() {
        return None;
    }
    Some(UsageQuota {
        rolling_window: dto.five_hour.map(WindowUsage::from).unwrap_or_default(),
        weekly_window: dto.seven_day.map(WindowUsage::from).unwrap_or_default(),
        overage: dto.extra_usage.map(|e| Overage {
            enabled: e.is_enabled,
            used_usd: e.used_credits.unwrap_or(0.0) / 100.0,
            limit_usd: e.monthly_limit.unwrap_or(0.0) / 100.0,
        }),
    })
}

/// One authenticated GET against the usage endpoint. Non-2xx is an error.
pub fn fetch_usage_body(endpoint: &str, token: &str, timeout: Duration) -> ProviderResult<Vec<u8>> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into();

    let mut response = agent
        .get(endpoint)
        .header("Authorization", format!("Bearer {token}"))
        .header("User-Agent", user_agent())
        .header("Accept", "application/json")
        .header("anthropic-beta", ANTHROPIC_BETA)
        .call()?;

    if !response.status().is_success() {
        return Err(ProviderError::Status(response.status().as_u16()));
    }
    Ok(response.body_mut().read_to_vec()?)
}

/// Usage quota for the statusline, served from the cache when fresh.
///
/// The token lookup happens inside the refresh, so a missing token is a
/// failed refresh: a previous response is still shown, nothing is fetched.
pub fn usage_quota(config: &Config, tokens: &dyn TokenProvider) -> Option<UsageQuota> {
    let cache = config.cache();
    let (quota, freshness) = cache.get_or_refresh_with(
        &config.usage_cache_key,
        config.usage_max_age,
        parse_usage_response,
        || {
            let token = tokens.bearer_token().ok_or(ProviderError::NoToken)?;
            fetch_usage_body(&config.usage_endpoint, &token, config.http_timeout)
        },
    )?;
    debug!(
        rolling = quota.rolling_window.utilization_pct,
        weekly = quota.weekly_window.utilization_pct,
        ?freshness,
        "usage quota"
    );
    Some(quota)
}
