//! Structured JSON logger, one event per line on stderr
//!
//! Lines below the process threshold (INFO unless lowered) are dropped.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-page detail (verbose mode)
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
}

static THRESHOLD: AtomicU8 = AtomicU8::new(Severity::Info as u8);

impl Severity {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JSON line logger
///
/// Writes to stderr; stdout is reserved for CLI responses.
pub struct Logger;

impl Logger {
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = render_line(severity, event, fields);
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::threshold()
    }

    pub fn threshold() -> Severity {
        Severity::from_u8(THRESHOLD.load(Ordering::Relaxed))
    }

    /// Set the threshold until the returned guard drops.
    ///
    /// Guards restore in reverse order of creation.
    pub fn with_threshold(severity: Severity) -> ThresholdGuard {
        let previous = THRESHOLD.swap(severity as u8, Ordering::Relaxed);
        ThresholdGuard { previous }
    }
}

/// Restores the previous log threshold on drop
#[derive(Debug)]
#[must_use = "the threshold is restored when the guard drops"]
pub struct ThresholdGuard {
    previous: u8,
}

impl Drop for ThresholdGuard {
    fn drop(&mut self) {
        THRESHOLD.store(self.previous, Ordering::Relaxed);
    }
}

/// Render one newline-terminated log line.
///
/// `event` and `severity` lead; the remaining keys follow in sorted order
/// (`serde_json::Map` is BTreeMap-backed without `preserve_order`).
fn render_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let rest: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| ((*key).to_string(), Value::String((*value).to_string())))
        .collect();

    let mut line = format!(
        "{{\"event\":{},\"severity\":\"{}\"",
        Value::String(event.to_string()),
        severity
    );
    for (key, value) in rest {
        line.push(',');
        line.push_str(&Value::String(key).to_string());
        line.push(':');
        line.push_str(&value.to_string());
    }
    line.push_str("}\n");
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
    }

    #[test]
    fn test_threshold_drops_trace_until_lowered() {
        assert_eq!(Logger::threshold(), Severity::Info);
        assert!(!Logger::enabled(Severity::Trace));
        assert!(Logger::enabled(Severity::Warn));

        {
            let _verbose = Logger::with_threshold(Severity::Trace);
            assert!(Logger::enabled(Severity::Trace));

            let quiet = Logger::with_threshold(Severity::Error);
            assert!(!Logger::enabled(Severity::Warn));
            drop(quiet);
            assert!(Logger::enabled(Severity::Trace));
        }

        assert_eq!(Logger::threshold(), Severity::Info);
        assert!(!Logger::enabled(Severity::Trace));
    }

    #[test]
    fn test_log_json_format() {
        let output = render_line(Severity::Info, "MIGRATION_BEGIN", &[]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "MIGRATION_BEGIN");
        assert_eq!(parsed["severity"], "INFO");
    }

    #[test]
    fn test_log_with_fields() {
        let output = render_line(
            Severity::Info,
            "VERSION_WRITTEN",
            &[("page_id", "uuid-1"), ("version", "3")],
        );

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["page_id"], "uuid-1");
        assert_eq!(parsed["version"], "3");
    }

    #[test]
    fn test_fields_sorted_after_fixed_prefix() {
        let output = render_line(Severity::Warn, "E", &[("zeta", "1"), ("alpha", "2")]);
        assert!(output.starts_with("{\"event\":\"E\",\"severity\":\"WARN\""));
        let alpha = output.find("alpha").unwrap();
        let zeta = output.find("zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_special_characters_escaped() {
        let output = render_line(
            Severity::Error,
            "PAGE_FAILED",
            &[("title", "He said \"hi\"\nthen left")],
        );

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["title"], "He said \"hi\"\nthen left");
    }

    #[test]
    fn test_one_line_per_event() {
        let output = render_line(Severity::Info, "E", &[("a", "multi\nline")]);
        assert_eq!(output.matches('\n').count(), 1);
        assert!(output.ends_with('\n'));
    }
}
