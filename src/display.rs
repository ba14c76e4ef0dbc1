//! Text rendering. Pure: takes whatever data was gathered and returns the
//! statusline rows. Absent inputs drop their segment; nothing here fails.
//!
//! Row 1: model | context | cost | burn | duration | path
//! Row 2: git branch and change counts | line delta   (only inside a work tree)
//! Row 3: rolling / weekly quota and overage          (only with usage data)

use std::path::PathBuf;

#[cfg(feature = "colors")]
use owo_colors::OwoColorize;

use crate::cli::TimeFormatArg;
use crate::config::Config;
use crate::models::quota::{Overage, QuotaReport, SpendReport, UsageQuota, WindowUsage};
use crate::models::{SessionSnapshot, WorkingTreeStatus};
use crate::utils::{
    format_duration, format_path, format_reset_time, format_tokens, format_usd, home_dir,
    round_percent, ResetStyle,
};

const WARNING_PCT: i64 = 70;
const CRITICAL_PCT: i64 = 90;

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub color: bool,
    /// Replaced by `~` in the path segment.
    pub home: Option<PathBuf>,
    pub time_format: TimeFormatArg,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: true,
            home: None,
            time_format: TimeFormatArg::H12,
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            color: config.color,
            home: home_dir(),
            time_format: config.time_format,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Nominal,
    Warning,
    Critical,
}

pub fn severity(pct: i64) -> Severity {
    if pct >= CRITICAL_PCT {
        Severity::Critical
    } else if pct >= WARNING_PCT {
        Severity::Warning
    } else {
        Severity::Nominal
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Green,
    Yellow,
    Red,
    Dim,
    Magenta,
    Cyan,
}

impl From<Severity> for Tone {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Nominal => Tone::Green,
            Severity::Warning => Tone::Yellow,
            Severity::Critical => Tone::Red,
        }
    }
}

#[cfg(feature = "colors")]
fn paint(text: &str, tone: Tone, opts: &RenderOptions) -> String {
    if !opts.color {
        return text.to_string();
    }
    match tone {
        Tone::Green => text.green().to_string(),
        Tone::Yellow => text.yellow().to_string(),
        Tone::Red => text.red().to_string(),
        Tone::Dim => text.dimmed().to_string(),
        Tone::Magenta => text.bright_magenta().to_string(),
        Tone::Cyan => text.bright_cyan().to_string(),
    }
}

#[cfg(not(feature = "colors"))]
fn paint(text: &str, _tone: Tone, _opts: &RenderOptions) -> String {
    text.to_string()
}

fn separator(opts: &RenderOptions) -> String {
    format!(" {} ", paint("|", Tone::Dim, opts))
}

/// `45%` in its severity color.
pub fn percent_badge(pct: i64, opts: &RenderOptions) -> String {
    paint(&format!("{pct}%"), severity(pct).into(), opts)
}

fn model_segment(name: &str, opts: &RenderOptions) -> String {
    let lower = name.to_lowercase();
    if lower.contains("opus") {
        paint(name, Tone::Magenta, opts)
    } else if lower.contains("sonnet") {
        paint(name, Tone::Yellow, opts)
    } else if lower.contains("haiku") {
        paint(name, Tone::Cyan, opts)
    } else {
        name.to_string()
    }
}

fn context_segment(snap: &SessionSnapshot, opts: &RenderOptions) -> String {
    // The server percentage is shown as given, not recomputed from tokens.
    let pct = snap.context_used_pct.trunc() as i64;
    format!(
        "{}/{} {}",
        format_tokens(snap.context_used_tokens),
        format_tokens(snap.context_total_tokens),
        percent_badge(pct, opts)
    )
}

fn cost_segment(snap: &SessionSnapshot, spend: Option<&SpendReport>) -> String {
    let mut parts = vec![format_usd(snap.session_cost_usd)];
    if let Some(spend) = spend {
        if let Some(ref today) = spend.today {
            parts.push(format!("{today} today"));
        }
        if let Some(ref block) = spend.block {
            parts.push(block.clone());
        }
    }
    parts.join(" / ")
}

fn session_row(snap: &SessionSnapshot, spend: Option<&SpendReport>, opts: &RenderOptions) -> String {
    let mut items = vec![
        model_segment(&snap.model_name, opts),
        context_segment(snap, opts),
        cost_segment(snap, spend),
    ];
    if let Some(burn) = spend.and_then(|s| s.burn_rate.as_ref()) {
        items.push(burn.clone());
    }
    if snap.session_duration_ms >= 1000 {
        items.push(paint(&format_duration(snap.session_duration_ms), Tone::Dim, opts));
    }
    if !snap.working_directory.is_empty() {
        items.push(format_path(&snap.working_directory, opts.home.as_deref()));
    }
    items.join(&separator(opts))
}

/// Branch label, as an OSC 8 hyperlink to the remote when one is known.
fn branch_label(status: &WorkingTreeStatus, opts: &RenderOptions) -> String {
    let branch = if status.branch.is_empty() {
        "(detached)"
    } else {
        status.branch.as_str()
    };
    match status.remote_url {
        Some(ref url) if opts.color => format!("\u{1b}]8;;{url}\u{7}{branch}\u{1b}]8;;\u{7}"),
        _ => branch.to_string(),
    }
}

fn git_row(status: &WorkingTreeStatus, snap: &SessionSnapshot, opts: &RenderOptions) -> String {
    let mut pieces = vec![branch_label(status, opts)];
    if status.staged_count > 0 {
        pieces.push(paint(&format!("+{}", status.staged_count), Tone::Green, opts));
    }
    if status.modified_count > 0 {
        pieces.push(paint(&format!("~{}", status.modified_count), Tone::Yellow, opts));
    }
    if status.untracked_count > 0 {
        pieces.push(paint(&format!("?{}", status.untracked_count), Tone::Dim, opts));
    }

    let mut items = vec![pieces.join(" ")];
    if snap.lines_added > 0 || snap.lines_removed > 0 {
        items.push(format!(
            "{}/{}",
            paint(&format!("+{}", snap.lines_added), Tone::Green, opts),
            paint(&format!("-{}", snap.lines_removed), Tone::Red, opts)
        ));
    }
    items.join(&separator(opts))
}

fn window_segment(
    label: &str,
    window: &WindowUsage,
    style: ResetStyle,
    opts: &RenderOptions,
) -> String {
    let pct = round_percent(window.utilization_pct);
    let mut seg = format!("{label} {}", percent_badge(pct, opts));
    match window.resets_at {
        None => seg.push_str(&format!(" {}", paint("no reset info", Tone::Dim, opts))),
        Some(ref iso) => {
            let when = format_reset_time(iso, style, opts.time_format);
            if !when.is_empty() {
                seg.push_str(&format!(" {}", paint(&format!("resets {when}"), Tone::Dim, opts)));
            }
        }
    }
    seg
}

fn overage_segment(overage: &Overage, opts: &RenderOptions) -> String {
    let remaining = overage.remaining_usd();
    let remaining_txt = format!("{} left", format_usd(remaining));
    let remaining_txt = if remaining < 0.0 {
        paint(&remaining_txt, Tone::Red, opts)
    } else {
        paint(&remaining_txt, Tone::Dim, opts)
    };
    format!(
        "extra {}/{} {}",
        format_usd(overage.used_usd),
        format_usd(overage.limit_usd),
        remaining_txt
    )
}

fn quota_row(quota: &UsageQuota, opts: &RenderOptions) -> String {
    let mut items = vec![
        window_segment("5h", &quota.rolling_window, ResetStyle::Time, opts),
        window_segment("7d", &quota.weekly_window, ResetStyle::DayTime, opts),
    ];
    if let Some(overage) = quota.overage.as_ref().filter(|o| o.enabled) {
        items.push(overage_segment(overage, opts));
    }
    items.join(&separator(opts))
}

/// Build the statusline rows from whatever sources produced data.
pub fn render(
    snapshot: &SessionSnapshot,
    git: Option<&WorkingTreeStatus>,
    quota: Option<&QuotaReport>,
    opts: &RenderOptions,
) -> Vec<String> {
    let spend = match quota {
        Some(QuotaReport::Spend(s)) => Some(s),
        _ => None,
    };

    let mut lines = vec![session_row(snapshot, spend, opts)];
    if let Some(status) = git {
        lines.push(git_row(status, snapshot, opts));
    }
    if let Some(QuotaReport::Limits(limits)) = quota {
        lines.push(quota_row(limits, opts));
    }
    lines
}

/// Shown when stdin is empty or not a statusLine payload.
pub fn placeholder_line(opts: &RenderOptions) -> String {
    format!(
        "Claude Code{}{}",
        separator(opts),
        paint("[waiting for valid input]", Tone::Dim, opts)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn plain() -> RenderOptions {
        RenderOptions {
            color: false,
            home: Some(PathBuf::from("/home/x")),
            time_format: TimeFormatArg::H12,
        }
    }

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            model_name: "Opus".into(),
            context_used_tokens: 90_000,
            context_total_tokens: 200_000,
            context_used_pct: 45.0,
            session_cost_usd: 1.23,
            session_duration_ms: 0,
            lines_added: 0,
            lines_removed: 0,
            working_directory: "/home/x/proj".into(),
        }
    }

    #[test]
    fn severity_bands() {
        assert_eq!(severity(0), Severity::Nominal);
        assert_eq!(severity(69), Severity::Nominal);
        assert_eq!(severity(70), Severity::Warning);
        assert_eq!(severity(89), Severity::Warning);
        assert_eq!(severity(90), Severity::Critical);
        assert_eq!(severity(100), Severity::Critical);
    }

    #[test]
    fn session_only_renders_single_row() {
        let lines = render(&snapshot(), None, None, &plain());
        assert_eq!(lines, vec!["Opus | 90.0k/200.0k 45% | $1.23 | ~/proj"]);
    }

    #[test]
    fn percentage_is_shown_as_reported() {
        let mut snap = snapshot();
        snap.context_used_pct = 12.9;
        let lines = render(&snap, None, None, &plain());
        assert!(lines[0].contains(" 12%"), "{}", lines[0]);
    }

    #[test]
    fn duration_segment_appears_when_nonzero() {
        let mut snap = snapshot();
        snap.session_duration_ms = 125_000;
        let lines = render(&snap, None, None, &plain());
        assert!(lines[0].contains("| 2m 5s |"), "{}", lines[0]);
    }

    #[test]
    fn spend_report_extends_cost_segment() {
        let spend = QuotaReport::Spend(SpendReport {
            today: Some("$0.09".into()),
            block: Some("$0.51 block (28m left)".into()),
            burn_rate: Some("$0.13/hr".into()),
        });
        let lines = render(&snapshot(), None, Some(&spend), &plain());
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "Opus | 90.0k/200.0k 45% | $1.23 / $0.09 today / $0.51 block (28m left) | $0.13/hr | ~/proj"
        );
    }

    #[test]
    fn git_row_lists_only_nonzero_counts() {
        let status = WorkingTreeStatus {
            branch: "main".into(),
            staged_count: 2,
            modified_count: 0,
            untracked_count: 1,
            remote_url: None,
        };
        let lines = render(&snapshot(), Some(&status), None, &plain());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "main +2 ?1");
    }

    #[test]
    fn git_row_appends_line_delta() {
        let mut snap = snapshot();
        snap.lines_added = 12;
        snap.lines_removed = 0;
        let status = WorkingTreeStatus {
            branch: String::new(),
            ..Default::default()
        };
        let lines = render(&snap, Some(&status), None, &plain());
        assert_eq!(lines[1], "(detached) | +12/-0");
    }

    #[test]
    fn line_delta_without_git_is_not_rendered() {
        let mut snap = snapshot();
        snap.lines_added = 3;
        let lines = render(&snap, None, None, &plain());
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn quota_row_handles_missing_and_malformed_resets() {
        let quota = QuotaReport::Limits(UsageQuota {
            rolling_window: WindowUsage {
                utilization_pct: 71.6,
                resets_at: None,
            },
            weekly_window: WindowUsage {
                utilization_pct: 3.2,
                resets_at: Some("soon".into()),
            },
            overage: None,
        });
        let lines = render(&snapshot(), None, Some(&quota), &plain());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "5h 72% no reset info | 7d 3%");
    }

    #[test]
    fn quota_row_formats_reset_times() {
        let quota = QuotaReport::Limits(UsageQuota {
            rolling_window: WindowUsage {
                utilization_pct: 10.0,
                resets_at: Some("2025-02-10T18:30:00Z".into()),
            },
            weekly_window: WindowUsage {
                utilization_pct: 20.0,
                resets_at: Some("2025-02-10T18:30:00Z".into()),
            },
            overage: None,
        });
        let opts = plain();
        let lines = render(&snapshot(), None, Some(&quota), &opts);
        let rolling = format_reset_time("2025-02-10T18:30:00Z", ResetStyle::Time, opts.time_format);
        let weekly =
            format_reset_time("2025-02-10T18:30:00Z", ResetStyle::DayTime, opts.time_format);
        assert_eq!(
            lines[1],
            format!("5h 10% resets {rolling} | 7d 20% resets {weekly}")
        );
    }

    #[test]
    fn overage_shown_only_when_enabled_and_may_be_negative() {
        let mut limits = UsageQuota {
            overage: Some(Overage {
                enabled: false,
                used_usd: 60.0,
                limit_usd: 50.0,
            }),
            ..Default::default()
        };
        let lines = render(
            &snapshot(),
            None,
            Some(&QuotaReport::Limits(limits.clone())),
            &plain(),
        );
        assert!(!lines[1].contains("extra"));

        if let Some(ref mut o) = limits.overage {
            o.enabled = true;
        }
        let lines = render(&snapshot(), None, Some(&QuotaReport::Limits(limits)), &plain());
        assert!(lines[1].ends_with("extra $60.00/$50.00 -$10.00 left"), "{}", lines[1]);
    }

    #[test]
    fn three_rows_in_fixed_order() {
        let status = WorkingTreeStatus {
            branch: "dev".into(),
            ..Default::default()
        };
        let quota = QuotaReport::Limits(UsageQuota::default());
        let lines = render(&snapshot(), Some(&status), Some(&quota), &plain());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "dev");
        assert!(lines[2].starts_with("5h 0%"));
    }

    #[cfg(feature = "colors")]
    #[test]
    fn badge_uses_severity_color() {
        let opts = RenderOptions {
            color: true,
            ..plain()
        };
        assert!(percent_badge(45, &opts).starts_with("\u{1b}[32m45%"));
        assert!(percent_badge(75, &opts).starts_with("\u{1b}[33m75%"));
        assert!(percent_badge(95, &opts).starts_with("\u{1b}[31m95%"));
    }

    #[test]
    fn remote_becomes_hyperlink_only_with_color() {
        let status = WorkingTreeStatus {
            branch: "main".into(),
            remote_url: Some("https://github.com/acme/widgets".into()),
            ..Default::default()
        };
        assert_eq!(branch_label(&status, &plain()), "main");
        let colored = RenderOptions {
            color: true,
            ..plain()
        };
        assert!(branch_label(&status, &colored).contains("\u{1b}]8;;https://github.com/acme/widgets\u{7}main"));
    }

    #[test]
    fn path_outside_home_is_untouched() {
        let mut snap = snapshot();
        snap.working_directory = "/srv/app".into();
        let opts = RenderOptions {
            home: Some(Path::new("/home/x").to_path_buf()),
            ..plain()
        };
        assert!(render(&snap, None, None, &opts)[0].ends_with("| /srv/app"));
    }
}
