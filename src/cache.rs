//! # Cache Module
//!
//! File-backed freshness cache shared by the slow data sources (git scan,
//! usage endpoint, external reporting tool). Each source owns exactly one
//! file under the cache directory; its mtime is the write timestamp.
//!
//! There is no cross-process locking. Concurrent statusline processes may
//! both refresh and the last writer wins. Writes go through a temp file and
//! a rename so readers normally see either the old or the new payload; a
//! payload that still fails to decode is treated as a cache miss.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::error::ProviderResult;

/// One persisted payload and the time it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Vec<u8>,
    pub written_at: SystemTime,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        // An mtime in the future (clock skew) counts as brand new.
        SystemTime::now()
            .duration_since(self.written_at)
            .unwrap_or_default()
    }

    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.age() <= max_age
    }
}

/// How a value returned by [`FreshnessCache`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from a file within its freshness window.
    Fresh,
    /// Produced by a successful refresh just now.
    Refreshed,
    /// Refresh failed; served from an expired file.
    Stale,
}

#[derive(Debug, Clone)]
pub struct CacheOutcome {
    pub payload: Vec<u8>,
    pub freshness: Freshness,
}

#[derive(Debug, Clone)]
pub struct FreshnessCache {
    dir: PathBuf,
}

impl FreshnessCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, source_key: &str) -> PathBuf {
        self.dir.join(source_key)
    }

    pub fn read(&self, source_key: &str) -> Option<CacheEntry> {
        let path = self.path_for(source_key);
        let written_at = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let payload = fs::read(&path).ok()?;
        Some(CacheEntry {
            payload,
            written_at,
        })
    }

    /// Overwrite the entry for `source_key`.
    pub fn write(&self, source_key: &str, payload: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(source_key);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", source_key, std::process::id()));
        fs::write(&tmp, payload)?;
        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }

    /// Return the cached payload for `source_key` if it is younger than
    /// `max_age`; otherwise call `refresh` and persist its result. When the
    /// refresh fails, an expired payload is returned if one exists, and
    /// `None` if not.
    pub fn get_or_refresh<F>(
        &self,
        source_key: &str,
        max_age: Duration,
        refresh: F,
    ) -> Option<CacheOutcome>
    where
        F: FnOnce() -> ProviderResult<Vec<u8>>,
    {
        self.get_or_refresh_with(source_key, max_age, |bytes| Some(bytes.to_vec()), refresh)
            .map(|(payload, freshness)| CacheOutcome { payload, freshness })
    }

    /// Like [`get_or_refresh`](Self::get_or_refresh) but decodes the payload.
    ///
    /// A fresh file that fails to decode is a miss. A refreshed payload that
    /// fails to decode counts as a failed refresh and is not written.
    pub fn get_or_refresh_with<T, D, F>(
        &self,
        source_key: &str,
        max_age: Duration,
        decode: D,
        refresh: F,
    ) -> Option<(T, Freshness)>
    where
        D: Fn(&[u8]) -> Option<T>,
        F: FnOnce() -> ProviderResult<Vec<u8>>,
    {
        let existing = self.read(source_key);

        if let Some(entry) = existing.as_ref().filter(|e| e.is_fresh(max_age)) {
            match decode(&entry.payload) {
                Some(value) => {
                    debug!(source = source_key, age = ?entry.age(), "cache hit");
                    return Some((value, Freshness::Fresh));
                }
                None => debug!(source = source_key, "cached payload undecodable, refreshing"),
            }
        }

        match refresh() {
            Ok(payload) => match decode(&payload) {
                Some(value) => {
                    if let Err(e) = self.write(source_key, &payload) {
                        debug!(source = source_key, error = %e, "cache write failed");
                    } else {
                        debug!(source = source_key, bytes = payload.len(), "cache refreshed");
                    }
                    return Some((value, Freshness::Refreshed));
                }
                None => debug!(source = source_key, "refreshed payload undecodable"),
            },
            Err(e) => debug!(source = source_key, error = %e, "refresh failed"),
        }

        let entry = existing?;
        let value = decode(&entry.payload)?;
        debug!(source = source_key, age = ?entry.age(), "serving stale cache");
        Some((value, Freshness::Stale))
    }
}
