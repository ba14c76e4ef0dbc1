use chrono::{DateTime, Local};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::cli::TimeFormatArg;
use crate::error::{ProviderError, ProviderResult};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf())
}

/// Replace a leading home directory with `~`. Only whole path components
/// match, so `/home/xy` is left alone when home is `/home/x`.
pub fn format_path(p: &str, home: Option<&Path>) -> String {
    if let Some(home) = home.and_then(|h| h.to_str()) {
        let home = home.trim_end_matches(['/', '\\']);
        if !home.is_empty() {
            if p == home {
                return "~".to_string();
            }
            if let Some(rest) = p.strip_prefix(home) {
                if rest.starts_with(['/', '\\']) {
                    return format!("~{rest}");
                }
            }
        }
    }
    p.to_owned()
}

pub fn format_currency(v: f64) -> String {
    format!("{v:.2}")
}

/// `$1.23`, or `-$1.23` for negative amounts.
pub fn format_usd(v: f64) -> String {
    if v < 0.0 {
        format!("-${}", format_currency(-v))
    } else {
        format!("${}", format_currency(v))
    }
}

pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1e6)
    } else if n >= 1_000 {
        format!("{:.1}k", n as f64 / 1e3)
    } else {
        n.to_string()
    }
}

pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m {secs}s")
    }
}

/// Nearest whole percent. Non-finite input maps to 0.
pub fn round_percent(pct: f64) -> i64 {
    if pct.is_finite() { pct.round() as i64 } else { 0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStyle {
    /// `6:30pm`, for the rolling window
    Time,
    /// `Feb 10, 6:30pm`, for the weekly window
    DayTime,
}

/// Render an ISO-8601 timestamp in the local time zone. Empty or
/// malformed input yields an empty string.
pub fn format_reset_time(iso: &str, style: ResetStyle, clock: TimeFormatArg) -> String {
    let Ok(dt) = DateTime::parse_from_rfc3339(iso.trim()) else {
        return String::new();
    };
    let local = dt.with_timezone(&Local);
    let fmt = match (style, clock) {
        (ResetStyle::Time, TimeFormatArg::H12) => "%-I:%M%P",
        (ResetStyle::Time, TimeFormatArg::H24) => "%H:%M",
        (ResetStyle::DayTime, TimeFormatArg::H12) => "%b %-d, %-I:%M%P",
        (ResetStyle::DayTime, TimeFormatArg::H24) => "%b %-d, %H:%M",
    };
    local.format(fmt).to_string()
}

/// Run `program` with a wall-clock limit and return its stdout.
///
/// stderr is discarded. A non-zero exit, spawn failure or timeout is an
/// error; on timeout the child is killed.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> ProviderResult<String> {
    let label = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| ProviderError::Spawn {
        command: label.clone(),
        source,
    })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        let input = input.to_vec();
        // Writer thread so a child that stops reading cannot wedge us.
        thread::spawn(move || {
            let _ = pipe.write_all(&input);
        });
    }

    // A background grandchild can hold stdout open after the child exits,
    // so the read is bounded by the same deadline as the wait.
    let mut out_pipe = child.stdout.take();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = out_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if start.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProviderError::Timeout {
                    command: label,
                    timeout,
                });
            }
            None => thread::sleep(POLL_INTERVAL),
        }
    };

    let stdout = match rx.recv_timeout(timeout.saturating_sub(start.elapsed())) {
        Ok(buf) => buf,
        Err(_) => {
            return Err(ProviderError::Timeout {
                command: label,
                timeout,
            });
        }
    };
    if !status.success() {
        return Err(ProviderError::CommandFailed {
            command: label,
            status: status.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&stdout).into_owned())
}
