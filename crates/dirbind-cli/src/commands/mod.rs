//! CLI command implementations

pub mod auth;
pub mod check;
pub mod demo;

use crate::OutputFormat;
use dirbind_core::DirbindConfig;
use serde::Serialize;

/// Settings and output mode shared by every command
pub struct CommandContext {
    pub config: DirbindConfig,
    pub output_format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
}

impl CommandContext {
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Write a command's report to stdout as pretty JSON
    pub fn report<T: Serialize>(&self, report: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }

    /// Text output line, suppressed by --quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Diagnostics on stderr, shown with --verbose
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            eprintln!("[DEBUG] {}", msg);
        }
    }
}
