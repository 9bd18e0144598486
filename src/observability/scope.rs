//! Scopes around long-running operations
//!
//! A scope brackets one operation in the log: `{NAME}_BEGIN` when opened,
//! then exactly one closing line:
//! - `{NAME}_COMPLETE` from [`ObservationScope::complete`]
//! - `{NAME}_FAILED` from [`ObservationScope::fail`], with the error code
//! - `{NAME}_INCOMPLETE` if the scope is dropped unfinished
//!
//! Closing lines repeat the opening fields and add `elapsed_ms`.

use std::time::Instant;

use crate::errors::VaultError;

use super::logger::{Logger, Severity};

/// Log bracket for one operation
///
/// ```ignore
/// let scope = ObservationScope::begin("MIGRATION", &[("dry_run", "false")]);
/// // ... do work ...
/// scope.complete(&[("pages_processed", "12")]);
/// ```
#[derive(Debug)]
pub struct ObservationScope {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
    timer: Timer,
    finished: bool,
}

impl ObservationScope {
    /// Open a scope and log `{name}_BEGIN`
    pub fn begin(name: &'static str, fields: &[(&'static str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);
        Self {
            name,
            fields: fields.iter().map(|(k, v)| (*k, (*v).to_string())).collect(),
            timer: Timer::new(),
            finished: false,
        }
    }

    /// Milliseconds since the scope was opened
    pub fn elapsed_millis(&self) -> u64 {
        self.timer.elapsed_millis()
    }

    pub fn complete(mut self, extra: &[(&str, &str)]) {
        self.close(Severity::Info, "COMPLETE", extra);
    }

    pub fn fail(mut self, error: &VaultError) {
        let reason = error.to_string();
        self.close(
            Severity::Error,
            "FAILED",
            &[("code", error.code()), ("reason", &reason)],
        );
    }

    fn close(&mut self, severity: Severity, suffix: &str, extra: &[(&str, &str)]) {
        self.finished = true;
        let elapsed = self.timer.elapsed_ms();

        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.extend_from_slice(extra);
        fields.push(("elapsed_ms", &elapsed));

        Logger::log(severity, &format!("{}_{}", self.name, suffix), &fields);
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            self.close(
                Severity::Warn,
                "INCOMPLETE",
                &[("reason", "scope dropped before completion")],
            );
        }
    }
}

/// Monotonic stopwatch
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Elapsed milliseconds as a log field value
    pub fn elapsed_ms(&self) -> String {
        self.elapsed_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
