use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;

#[derive(Deserialize, Debug, Default)]
pub struct HookModel {
    pub display_name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct HookWorkspace {
    pub current_dir: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CurrentUsage {
    pub input_tokens: Option<u64>,
    pub cache_creation_input_tokens: Option<u64>,
    pub cache_read_input_tokens: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct HookContextWindow {
    pub used_percentage: Option<f64>,
    pub context_window_size: Option<u64>,
    pub current_usage: Option<CurrentUsage>,
}

/// Optional cost summary provided by Claude Code's statusLine input
#[derive(Deserialize, Debug, Default)]
pub struct HookCost {
    pub total_cost_usd: Option<f64>,
    pub total_duration_ms: Option<u64>,
    pub total_lines_added: Option<u64>,
    pub total_lines_removed: Option<u64>,
}

/// Raw statusLine payload. Every field is optional; unknown fields are ignored.
#[derive(Deserialize, Debug, Default)]
pub struct HookJson {
    pub cwd: Option<String>,
    pub model: Option<HookModel>,
    pub workspace: Option<HookWorkspace>,
    pub context_window: Option<HookContextWindow>,
    pub cost: Option<HookCost>,
}

/// Typed view of one statusLine invocation. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub model_name: String,
    pub context_used_tokens: u64,
    pub context_total_tokens: u64,
    /// Server-reported percentage, kept as given even when it disagrees
    /// with `context_used_tokens / context_total_tokens`.
    pub context_used_pct: f64,
    pub session_cost_usd: f64,
    pub session_duration_ms: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub working_directory: String,
}

impl SessionSnapshot {
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let hook: HookJson = serde_json::from_slice(raw).context("parse hook json")?;
        Ok(Self::from(hook))
    }
}

impl From<HookJson> for SessionSnapshot {
    fn from(hook: HookJson) -> Self {
        let model_name = hook
            .model
            .and_then(|m| m.display_name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "?".to_string());

        let ctx = hook.context_window.unwrap_or_default();
        let usage = ctx.current_usage.unwrap_or_default();
        let context_used_tokens = usage.input_tokens.unwrap_or(0)
            + usage.cache_creation_input_tokens.unwrap_or(0)
            + usage.cache_read_input_tokens.unwrap_or(0);
        let context_total_tokens = ctx
            .context_window_size
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_CONTEXT_WINDOW);
        let context_used_pct = ctx
            .used_percentage
            .filter(|p| p.is_finite())
            .unwrap_or(0.0)
            .max(0.0);

        let cost = hook.cost.unwrap_or_default();

        let working_directory = hook
            .workspace
            .and_then(|w| w.current_dir)
            .filter(|d| !d.is_empty())
            .or(hook.cwd)
            .unwrap_or_default();

        SessionSnapshot {
            model_name,
            context_used_tokens,
            context_total_tokens,
            context_used_pct,
            session_cost_usd: cost.total_cost_usd.unwrap_or(0.0).max(0.0),
            session_duration_ms: cost.total_duration_ms.unwrap_or(0),
            lines_added: cost.total_lines_added.unwrap_or(0),
            lines_removed: cost.total_lines_removed.unwrap_or(0),
            working_directory,
        }
    }
}
