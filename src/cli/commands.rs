//! CLI command implementations
//!
//! Each command loads the configuration, runs one operation against the
//! vault and prints a single JSON response. Commands that produce a report
//! with failures still print it, then exit non-zero.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;

use crate::config::VaultConfig;
use crate::history::{RestoreRequest, VersionHistoryProvider};
use crate::migration::{MigrationEngine, MigrationOptions};
use crate::store::FlatFileStore;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let result = run_command(cli.config.as_deref(), cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(config_path: Option<&Path>, cmd: Command) -> CliResult<()> {
    let config = load_config(config_path)?;

    match cmd {
        Command::Migrate {
            dry_run,
            verbose,
            report,
        } => migrate(&config, dry_run, verbose, report),
        Command::Validate => validate(&config),
        Command::Rollback { yes } => rollback(&config, yes),
        Command::Reindex => reindex(&config),
        Command::History { page, limit } => history(&config, &page, limit),
        Command::Show { page, version } => show(&config, &page, version),
        Command::Diff { page, v1, v2 } => diff(&config, &page, v1, v2),
        Command::Restore {
            page,
            version,
            author,
            comment,
        } => restore(&config, &page, version, author, comment),
        Command::Info { page } => info(&config, &page),
    }
}

/// Load and validate configuration; defaults when no file is given
pub fn load_config(path: Option<&Path>) -> CliResult<VaultConfig> {
    match path {
        Some(path) => VaultConfig::load(path).map_err(|e| CliError::config_error(e.to_string())),
        None => {
            let config = VaultConfig::default();
            config
                .validate()
                .map_err(|e| CliError::config_error(e.to_string()))?;
            Ok(config)
        }
    }
}

/// Migrate the flat-file store
///
/// The report is written before the exit status is decided, so a failed
/// run still leaves a report behind. A dry run writes a file only to an
/// explicit `--report` path; otherwise the report is in the response.
pub fn migrate(
    config: &VaultConfig,
    dry_run: bool,
    verbose: bool,
    report_path: Option<PathBuf>,
) -> CliResult<()> {
    let source = FlatFileStore::new(config.layout());
    let engine = MigrationEngine::new(config, &source);
    let options = MigrationOptions {
        dry_run,
        verbose,
        cancel: None,
    };

    let report = engine.migrate_from_flat_store(&options)?;

    let path = match report_path {
        Some(path) => Some(path),
        None if dry_run => None,
        None => Some(default_report_path(config)),
    };
    if let Some(path) = &path {
        report.write_to_file(path)?;
    }

    write_response(&json!({
        "reportPath": path.map(|path| path.display().to_string()),
        "report": report,
    }))?;

    if report.success {
        Ok(())
    } else {
        Err(CliError::migration_failed(report.pages_failed))
    }
}

/// `<data_dir>/migration-report-<timestamp>.json`
pub fn default_report_path(config: &VaultConfig) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    config
        .data_dir
        .join(format!("migration-report-{}.json", stamp))
}

/// Validate versioned storage against the page index
pub fn validate(config: &VaultConfig) -> CliResult<()> {
    let source = FlatFileStore::new(config.layout());
    let report = MigrationEngine::new(config, &source).validate_migration();

    write_response(&report)?;

    if report.valid {
        Ok(())
    } else {
        Err(CliError::validation_failed(report.errors.len()))
    }
}

/// Remove all versioned data
pub fn rollback(config: &VaultConfig, confirmed: bool) -> CliResult<()> {
    if !confirmed {
        return Err(CliError::not_confirmed());
    }

    let source = FlatFileStore::new(config.layout());
    let report = MigrationEngine::new(config, &source).rollback_migration()?;
    write_response(&report)
}

/// Rebuild the page index from manifests on disk
pub fn reindex(config: &VaultConfig) -> CliResult<()> {
    let source = FlatFileStore::new(config.layout());
    let summary = MigrationEngine::new(config, &source).rebuild_index()?;
    write_response(&summary)
}

pub fn history(config: &VaultConfig, page: &str, limit: Option<usize>) -> CliResult<()> {
    let provider = VersionHistoryProvider::open(config)?;
    let versions = provider.get_version_history(page, limit)?;
    write_response(&versions)
}

pub fn show(config: &VaultConfig, page: &str, version: u64) -> CliResult<()> {
    let provider = VersionHistoryProvider::open(config)?;
    let content = provider.get_version(page, version)?;
    write_response(&content)
}

pub fn diff(config: &VaultConfig, page: &str, v1: u64, v2: u64) -> CliResult<()> {
    let provider = VersionHistoryProvider::open(config)?;
    let comparison = provider.compare_versions(page, v1, v2)?;
    write_response(&comparison)
}

/// Restore `version` as a new version
pub fn restore(
    config: &VaultConfig,
    page: &str,
    version: u64,
    author: String,
    comment: Option<String>,
) -> CliResult<()> {
    let provider = VersionHistoryProvider::open(config)?;
    let mut request = RestoreRequest::new(author);
    if let Some(comment) = comment {
        request = request.with_comment(comment);
    }

    let page_id = provider.resolve(page)?.page_id;
    let new_version = provider.restore_version(&page_id, version, &request)?;

    write_response(&json!({
        "pageId": page_id,
        "restoredFrom": version,
        "newVersion": new_version,
    }))
}

pub fn info(config: &VaultConfig, page: &str) -> CliResult<()> {
    let provider = VersionHistoryProvider::open(config)?;
    let info = provider.storage_info(page)?;
    write_response(&info)
}
