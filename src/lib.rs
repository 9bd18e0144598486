//! pagevault - append-only, integrity-verified page version storage
//!
//! Every saved page version is kept forever as an immutable record, listed
//! in a per-page manifest, and reachable through a global page index. A
//! one-way migration turns a flat-file store into this layout.

pub mod cli;
pub mod config;
pub mod delta;
pub mod errors;
pub mod fsutil;
pub mod hash;
pub mod history;
pub mod index;
pub mod manifest;
pub mod migration;
pub mod observability;
pub mod store;
pub mod version;

pub use config::VaultConfig;
pub use errors::{VaultError, VaultResult};
pub use history::VersionHistoryProvider;
pub use migration::{MigrationEngine, MigrationOptions, MigrationReport};
pub use store::{FlatFileStore, LegacyPageSource, PageLocation, PageVersioning};
