//! Timestamp file names for disk snapshots and proof captures.
//!
//! Names are local time `YYYYMMDD-HHMMSS-mmm`.  Two names requested within the
//! same millisecond would collide, so the namer hands out strictly increasing
//! millisecond stamps: if the clock has not moved on, the next free
//! millisecond is used.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Local, TimeZone};

const FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

/// Produces unique, sortable timestamp names.
#[derive(Debug, Default)]
pub struct SnapshotNamer {
    last_ms: AtomicI64,
}

impl SnapshotNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next stamp, e.g. `20240131-235959-042`.
    pub fn next_stamp(&self) -> String {
        let now = Local::now().timestamp_millis();
        let ms = self.reserve(now);
        match Local.timestamp_millis_opt(ms).single() {
            Some(t) => t.format(FORMAT).to_string(),
            // Ambiguous local time (DST fold): fall back to the current time.
            None => Local::now().format(FORMAT).to_string(),
        }
    }

    /// `dir/<stamp>.<extension>`.
    pub fn next_path(&self, dir: &Path, extension: &str) -> PathBuf {
        dir.join(format!("{}.{extension}", self.next_stamp()))
    }

    fn reserve(&self, now_ms: i64) -> i64 {
        let mut last = self.last_ms.load(Ordering::Relaxed);
        loop {
            let next = now_ms.max(last + 1);
            match self
                .last_ms
                .compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}
