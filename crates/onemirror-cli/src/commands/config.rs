//! Config command - View and check onemirror configuration
//!
//! Provides the `onemirror config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use onemirror_core::config::{Config, ValidationError};

use super::CommandContext;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

/// Outcome of checking a configuration file
#[derive(Debug)]
enum Validation {
    /// No file at the path; defaults apply
    Missing,
    /// The file exists but could not be parsed
    Unreadable(String),
    /// The file parsed; an empty list means it is valid
    Checked(Vec<ValidationError>),
}

fn check(path: &Path) -> Validation {
    if !path.exists() {
        return Validation::Missing;
    }
    match Config::load(path) {
        Ok(config) => Validation::Checked(config.validate()),
        Err(e) => Validation::Unreadable(format!("{e:#}")),
    }
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Validate => execute_validate(ctx),
        }
    }
}

fn execute_show(ctx: &CommandContext) -> Result<()> {
    let formatter = ctx.formatter();
    let config = Config::load_or_default(&ctx.config_path);

    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(())
}

fn execute_validate(ctx: &CommandContext) -> Result<()> {
    let formatter = ctx.formatter();
    let path = ctx.config_path.display().to_string();

    info!(config_path = %path, "Validating configuration");

    let errors: Vec<String> = match check(&ctx.config_path) {
        Validation::Missing => {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": true,
                    "config_path": path,
                    "errors": [],
                    "defaults": true,
                }));
            } else {
                formatter.info(&format!("Configuration file not found at {path}"));
                formatter.success("Using default configuration");
            }
            return Ok(());
        }
        Validation::Unreadable(e) => vec![format!("Failed to parse configuration: {e}")],
        Validation::Checked(errors) => errors.iter().map(ToString::to_string).collect(),
    };

    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path,
            "errors": errors,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {path}"));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {path}"));
        for error in &errors {
            formatter.info(&format!("  {error}"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Invalid configuration in {path}")
    }
}
