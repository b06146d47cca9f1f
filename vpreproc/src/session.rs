//! Host-side scheduling helpers.
//!
//! A host keeps one [`Debouncer`] per editing session and asks it, after each
//! settle period, whether the buffer has been quiet long enough to rescan.

use std::path::Path;
use std::time::{Duration, Instant};

/// Extensions of files the scanner is run on
pub const HDL_EXTENSIONS: [&str; 4] = ["v", "vh", "sv", "svh"];

/// Whether `path` names a Verilog/SystemVerilog source or header
#[must_use]
pub fn is_hdl_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| HDL_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Edit/run timestamps of one session
#[derive(Clone, Copy, Debug, Default)]
pub struct Debouncer {
    last_edit: Option<Instant>,
    last_run: Option<Instant>,
}

impl Debouncer {
    /// Create a session with nothing pending
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit at `now`.
    ///
    /// Returns how long to wait before calling [`Debouncer::should_run`].
    pub fn record_edit(&mut self, now: Instant, delay: f64) -> Duration {
        self.last_edit = Some(now);
        seconds(delay * 1.05)
    }

    /// Whether an edit is newer than the last run
    #[must_use]
    pub fn is_pending(&self) -> bool {
        match (self.last_edit, self.last_run) {
            (Some(edit), Some(run)) => edit > run,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Decide whether to rescan at `now`.
    ///
    /// True once the newest edit has settled for most of `delay`; the edit is
    /// then marked as handled so later checks stay quiet until the next edit.
    pub fn should_run(&mut self, now: Instant, delay: f64) -> bool {
        let Some(edit) = self.last_edit else {
            return false;
        };
        if !self.is_pending() || now.saturating_duration_since(edit) <= seconds(delay * 0.95) {
            return false;
        }
        self.last_run = Some(edit);
        true
    }
}

fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_default()
}
