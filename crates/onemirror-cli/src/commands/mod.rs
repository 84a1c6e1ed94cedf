//! CLI command implementations

use std::path::PathBuf;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

pub mod config;
pub mod watch;

/// Global options shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub quiet: bool,
    /// Configuration file in effect, from `--config` or the default location
    pub config_path: PathBuf,
}

impl CommandContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
