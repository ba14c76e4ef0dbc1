//! # Claude Statusline
//!
//! Renders a compact statusline for Claude Code sessions from the statusLine
//! JSON the host pipes to stdin.
//!
//! ## Overview
//!
//! Up to three rows, each shown only when its data exists:
//! - Model, context window fill, session cost and the working directory
//! - Git branch with staged / modified / untracked counts
//! - Rolling and weekly quota utilization from the OAuth usage endpoint
//!
//! Git, the usage endpoint and the optional `ccusage` reporting tool are all
//! slow or rate limited, so each goes through a small on-disk freshness cache
//! and falls back to its last good value when a refresh fails. No source can
//! fail the render.
//!
//! ## Features
//!
//! - `git` (default): Repository discovery via gix
//! - `colors` (default): Terminal color output via owo-colors

/// File-backed freshness cache shared by all sources
pub mod cache;

/// External `ccusage statusline` integration
pub mod ccusage;

/// Command-line argument parsing
pub mod cli;

/// Defaults, config file and flag precedence
pub mod config;

/// Row rendering
pub mod display;

/// Provider error type
pub mod error;

/// Working-tree status
pub mod git;

/// stderr tracing setup
pub mod logging;

/// Session, git and quota data models
pub mod models;

/// Quota source selection
pub mod quota;

/// Claude OAuth usage endpoint
pub mod usage_api;

/// Paths, formatting, time and subprocess helpers
pub mod utils;
