//! Observability for the version store
//!
//! - Structured logging (JSON, one event per line, stderr)
//! - Typed lifecycle events
//! - Begin/complete scopes for long-running phases
//!
//! Observability is read-only: nothing here influences storage decisions.
//!
//! ```ignore
//! use pagevault::observability::{Event, Logger, ObservationScope};
//!
//! Logger::info(Event::VersionWritten.as_str(), &[("page_id", "uuid-1")]);
//!
//! let scope = ObservationScope::begin("MIGRATION", &[("dry_run", "false")]);
//! // ... do work ...
//! scope.complete(&[]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity, ThresholdGuard};
pub use scope::{ObservationScope, Timer};

/// Log a typed event at the given severity
pub fn emit(severity: Severity, event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity, event.as_str(), fields);
}
