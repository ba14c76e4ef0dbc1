//! # Git Module
//!
//! Working-tree status for the second statusline row: branch name plus
//! staged / modified / untracked counts from one `git status --porcelain`
//! scan, and the origin remote rewritten into a browsable https URL.
//!
//! The scan cost grows with repository size, so results go through the
//! freshness cache (`branch|staged|modified|untracked[|remote]`).

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::error::ProviderResult;
use crate::models::git::WorkingTreeStatus;
use crate::utils::run_with_timeout;

const UNTRACKED: char = '?';

/// Working-tree status for `dir` (the session's directory, not ours).
///
/// `None` when `dir` is not inside a work tree, when git is unavailable, or
/// when the scan fails with nothing cached.
pub fn working_tree_status(config: &Config, dir: Option<&Path>) -> Option<WorkingTreeStatus> {
    if !is_work_tree(dir, config.git_timeout) {
        debug!(dir = ?dir, "not a git work tree");
        return None;
    }

    let cache = config.cache();
    let (status, freshness) = cache.get_or_refresh_with(
        &config.git_cache_key,
        config.git_max_age,
        |bytes| decode_cache_line(std::str::from_utf8(bytes).ok()?),
        || scan(dir, config.git_timeout).map(|s| encode_cache_line(&s).into_bytes()),
    )?;
    debug!(branch = %status.branch, ?freshness, "git status");
    Some(status)
}

/// Run the branch and status queries and classify the result.
pub fn scan(dir: Option<&Path>, timeout: Duration) -> ProviderResult<WorkingTreeStatus> {
    let branch = run_with_timeout("git", &["branch", "--show-current"], dir, None, timeout)?;
    let porcelain = run_with_timeout(
        "git",
        &["--no-optional-locks", "status", "--porcelain"],
        dir,
        None,
        timeout,
    )?;
    let (staged_count, modified_count, untracked_count) = classify_porcelain(&porcelain);

    Ok(WorkingTreeStatus {
        branch: branch.trim().to_string(),
        staged_count,
        modified_count,
        untracked_count,
        remote_url: origin_url(dir, timeout).and_then(|u| normalize_remote_url(&u)),
    })
}

/// Count `(staged, modified, untracked)` entries in `git status --porcelain`
/// output. Untracked entries never count as staged or modified; any other
/// entry may count as both.
pub fn classify_porcelain(porcelain: &str) -> (usize, usize, usize) {
    let mut staged = 0;
    let mut modified = 0;
    let mut untracked = 0;

    // Leading whitespace is significant: " M file" is a worktree change.
    for line in porcelain.lines() {
        let mut chars = line.chars();
        let (Some(index), Some(worktree)) = (chars.next(), chars.next()) else {
            continue;
        };
        if index == UNTRACKED {
            untracked += 1;
            continue;
        }
        if index != ' ' {
            staged += 1;
        }
        if worktree != ' ' && worktree != UNTRACKED {
            modified += 1;
        }
    }
    (staged, modified, untracked)
}

/// Rewrite a git remote into `https://host/path` with the `.git` suffix
/// removed. Credentials and ssh ports are dropped. Local paths and
/// unrecognised forms give `None`.
pub fn normalize_remote_url(raw: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() || url.contains('\\') {
        return None;
    }

    let (host, path) = if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        let (authority, path) = rest.split_once('/')?;
        (strip_userinfo(authority), path)
    } else if let Some(rest) = url.strip_prefix("ssh://") {
        let (authority, path) = rest.split_once('/')?;
        let host = strip_userinfo(authority);
        (host.split(':').next().unwrap_or(host), path)
    } else if url.contains("://") {
        return None;
    } else {
        // scp-like: [user@]host:path
        let (authority, path) = url.split_once(':')?;
        if authority.contains('/') || authority.len() < 2 || path.starts_with("//") {
            return None;
        }
        (strip_userinfo(authority), path)
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    if host.is_empty() || path.is_empty() {
        return None;
    }
    Some(format!("https://{host}/{path}"))
}

fn strip_userinfo(authority: &str) -> &str {
    authority.rsplit('@').next().unwrap_or(authority)
}

pub fn encode_cache_line(status: &WorkingTreeStatus) -> String {
    let mut line = format!(
        "{}|{}|{}|{}",
        status.branch, status.staged_count, status.modified_count, status.untracked_count
    );
    if let Some(ref remote) = status.remote_url {
        line.push('|');
        line.push_str(remote);
    }
    line
}

/// Inverse of [`encode_cache_line`]. Counts are read from the right so a
/// branch name containing `|` survives.
pub fn decode_cache_line(line: &str) -> Option<WorkingTreeStatus> {
    let parts: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('|').collect();
    let n = parts.len();
    if n < 4 {
        return None;
    }

    let counts = |slice: &[&str]| -> Option<(usize, usize, usize)> {
        Some((slice[0].parse().ok()?, slice[1].parse().ok()?, slice[2].parse().ok()?))
    };

    let last_is_count = parts[n - 1].parse::<usize>().is_ok();
    let (branch_end, (staged, modified, untracked), remote) = if last_is_count {
        (n - 3, counts(&parts[n - 3..])?, None)
    } else if n >= 5 {
        let remote = parts[n - 1];
        (n - 4, counts(&parts[n - 4..n - 1])?, Some(remote.to_string()))
    } else {
        return None;
    };

    Some(WorkingTreeStatus {
        branch: parts[..branch_end].join("|"),
        staged_count: staged,
        modified_count: modified,
        untracked_count: untracked,
        remote_url: remote.filter(|r| !r.is_empty()),
    })
}

/// Bare repositories and paths inside `.git` are discoverable but have no
/// work tree to scan.
#[cfg(feature = "git")]
fn is_work_tree(dir: Option<&Path>, _timeout: Duration) -> bool {
    let Ok(start) = dir.unwrap_or(Path::new(".")).canonicalize() else {
        return false;
    };
    let Ok(repo) = gix::discover(&start) else {
        return false;
    };
    let Some(workdir) = repo.workdir().and_then(|w| w.canonicalize().ok()) else {
        return false;
    };
    let in_git_dir = repo
        .git_dir()
        .canonicalize()
        .map(|g| start.starts_with(g))
        .unwrap_or(true);
    start.starts_with(&workdir) && !in_git_dir
}

#[cfg(not(feature = "git"))]
fn is_work_tree(dir: Option<&Path>, timeout: Duration) -> bool {
    run_with_timeout(
        "git",
        &["rev-parse", "--is-inside-work-tree"],
        dir,
        None,
        timeout,
    )
    .map(|out| out.trim() == "true")
    .unwrap_or(false)
}

#[cfg(feature = "git")]
fn origin_url(dir: Option<&Path>, _timeout: Duration) -> Option<String> {
    let repo = gix::discover(dir.unwrap_or(Path::new("."))).ok()?;
    let cfg = repo.config_snapshot();
    cfg.string("remote.origin.url").map(|url| url.to_string())
}

#[cfg(not(feature = "git"))]
fn origin_url(dir: Option<&Path>, timeout: Duration) -> Option<String> {
    run_with_timeout(
        "git",
        &["config", "--get", "remote.origin.url"],
        dir,
        None,
        timeout,
    )
    .ok()
    .map(|out| out.trim().to_string())
    .filter(|u| !u.is_empty())
}
