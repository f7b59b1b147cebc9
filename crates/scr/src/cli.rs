//! Command line interface
//!
//! `validate` parses descriptor files and reports every problem `load` would
//! reject. `run` boots a runtime from configuration, loads the descriptors
//! with no-op implementations and prints the component table as JSON, which
//! shows what would be satisfied given the configured conditions and
//! configurations.

use clap::{Parser, Subcommand};
use scr_application::lifecycle::ComponentDescription;
use scr_domain::error::Result;
use scr_infrastructure::RuntimeContext;
use scr_infrastructure::config::AppConfig;
use scr_infrastructure::descriptors::{load_descriptor_file, validate_descriptors};
use scr_infrastructure::error_ext::ErrorContext;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Command line interface for the Service Component Runtime
#[derive(Parser, Debug)]
#[command(name = "scr")]
#[command(about = "Service Component Runtime - validate and dry-run component descriptors")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Parse descriptor files and report problems
    Validate {
        /// Descriptor files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Load descriptors into a fresh runtime and print the component table
    Run {
        /// Descriptor files, loaded after the configured ones
        files: Vec<PathBuf>,
    },
}

/// Outcome of validating one descriptor file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// The file
    pub path: PathBuf,
    /// Component names found, in file order
    pub components: Vec<String>,
    /// Problems found; a read or parse failure is the only entry
    pub issues: Vec<String>,
}

impl FileReport {
    /// Whether the file is loadable
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate each file on its own
///
/// Duplicate names are checked per file; `run` catches clashes across files.
pub fn validate_files(files: &[PathBuf]) -> Vec<FileReport> {
    files
        .iter()
        .map(|path| match load_descriptor_file(path) {
            Ok(descriptors) => FileReport {
                path: path.clone(),
                components: descriptors.iter().map(|d| d.name.clone()).collect(),
                issues: validate_descriptors(&descriptors)
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
            Err(err) => FileReport {
                path: path.clone(),
                components: Vec::new(),
                issues: vec![err.to_string()],
            },
        })
        .collect()
}

/// Boot a runtime, load the files and snapshot the component table
///
/// # Errors
///
/// Whatever bootstrapping or loading reports.
pub fn dry_run(config: AppConfig, files: &[PathBuf]) -> Result<Vec<ComponentDescription>> {
    let context = RuntimeContext::bootstrap(config)?;
    for path in files {
        context.load_declarative(load_descriptor_file(path)?)?;
    }
    let snapshot = context.runtime().describe();
    context.shutdown();
    Ok(snapshot)
}

/// Run a command, writing its report to `out`
///
/// Returns whether the command succeeded.
///
/// # Errors
///
/// Bootstrap and load failures of `run`, and write failures.
pub fn execute<W: Write>(command: &Command, config: AppConfig, out: &mut W) -> Result<bool> {
    match command {
        Command::Validate { files } => {
            let reports = validate_files(files);
            for report in &reports {
                if report.is_ok() {
                    writeln!(
                        out,
                        "ok    {} ({} components)",
                        report.path.display(),
                        report.components.len()
                    )
                    .io_context("Failed to write report")?;
                } else {
                    for issue in &report.issues {
                        writeln!(out, "error {}: {}", report.path.display(), issue)
                            .io_context("Failed to write report")?;
                    }
                }
            }
            let valid = reports.iter().all(FileReport::is_ok);
            info!(files = reports.len(), valid, "Descriptor validation finished");
            Ok(valid)
        }
        Command::Run { files } => {
            let snapshot = dry_run(config, files)?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            writeln!(out, "{json}").io_context("Failed to write component table")?;
            Ok(true)
        }
    }
}
