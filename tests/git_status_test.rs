use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use cc_statusline::config::Config;
use cc_statusline::git::working_tree_status;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("run git");
    assert!(status.success(), "git {args:?} failed");
}

fn config_with_cache(cache: &TempDir) -> Config {
    Config {
        cache_dir: cache.path().to_path_buf(),
        ..Config::default()
    }
}

// Repo on branch `trunk` with one added-then-edited file and one untracked file.
fn sample_repo() -> TempDir {
    let repo = TempDir::new().unwrap();
    git(repo.path(), &["init", "-q"]);
    git(repo.path(), &["symbolic-ref", "HEAD", "refs/heads/trunk"]);
    git(
        repo.path(),
        &["remote", "add", "origin", "git@github.com:acme/widgets.git"],
    );
    fs::write(repo.path().join("lib.rs"), "fn a() {}\n").unwrap();
    git(repo.path(), &["add", "lib.rs"]);
    fs::write(repo.path().join("lib.rs"), "fn a() {}\nfn b() {}\n").unwrap();
    fs::write(repo.path().join("notes.txt"), "todo\n").unwrap();
    repo
}

fn age_cache_file(path: &Path, by: Duration) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
}

#[test]
fn counts_staged_modified_and_untracked() {
    if !git_available() {
        eprintln!("git not installed, skipping");
        return;
    }
    let repo = sample_repo();
    let cache = TempDir::new().unwrap();
    let config = config_with_cache(&cache);

    let status = working_tree_status(&config, Some(repo.path())).expect("inside a work tree");
    assert_eq!(status.branch, "trunk");
    assert_eq!(
        (status.staged_count, status.modified_count, status.untracked_count),
        (1, 1, 1)
    );
    assert_eq!(
        status.remote_url.as_deref(),
        Some("https://github.com/acme/widgets")
    );
    assert!(cache.path().join(&config.git_cache_key).is_file());
}

#[test]
fn cached_scan_is_reused_within_window() {
    if !git_available() {
        return;
    }
    let repo = sample_repo();
    let cache = TempDir::new().unwrap();
    let config = config_with_cache(&cache);

    let first = working_tree_status(&config, Some(repo.path())).unwrap();
    fs::write(repo.path().join("more.txt"), "x").unwrap();

    let second = working_tree_status(&config, Some(repo.path())).unwrap();
    assert_eq!(second, first);

    age_cache_file(
        &cache.path().join(&config.git_cache_key),
        Duration::from_secs(60),
    );
    let third = working_tree_status(&config, Some(repo.path())).unwrap();
    assert_eq!(third.untracked_count, 2);
}

#[test]
fn outside_work_tree_is_absent_and_not_cached() {
    let plain = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let config = config_with_cache(&cache);

    assert_eq!(working_tree_status(&config, Some(plain.path())), None);
    assert!(!cache.path().join(&config.git_cache_key).exists());
}

#[test]
fn missing_directory_is_absent() {
    let cache = TempDir::new().unwrap();
    let config = config_with_cache(&cache);
    let gone = cache.path().join("does-not-exist");

    assert_eq!(working_tree_status(&config, Some(&gone)), None);
}

#[test]
fn bare_repo_is_absent() {
    if !git_available() {
        return;
    }
    let bare = TempDir::new().unwrap();
    git(bare.path(), &["init", "-q", "--bare"]);
    let cache = TempDir::new().unwrap();
    let config = config_with_cache(&cache);

    assert_eq!(working_tree_status(&config, Some(bare.path())), None);
    assert!(!cache.path().join(&config.git_cache_key).exists());
}

#[test]
fn git_dir_does_not_serve_another_trees_cache() {
    if !git_available() {
        return;
    }
    let repo = sample_repo();
    let cache = TempDir::new().unwrap();
    let config = config_with_cache(&cache);
    working_tree_status(&config, Some(repo.path())).unwrap();
    age_cache_file(
        &cache.path().join(&config.git_cache_key),
        Duration::from_secs(60),
    );

    assert_eq!(
        working_tree_status(&config, Some(&repo.path().join(".git"))),
        None
    );
}
