//! Watch command - Follow a drive and print its action stream
//!
//! Provides the `onemirror watch` CLI command which:
//! 1. Loads and validates configuration
//! 2. Reads the access token from the configured environment variable
//! 3. Wires the Graph adapters into a [`DeltaEngine`]
//! 4. Prints every action until Ctrl+C, the optional limit, or a fatal error

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use futures_util::StreamExt;
use tokio::signal;
use tracing::{info, warn};

use onemirror_core::config::Config;
use onemirror_core::domain::{ActionKind, Credential, ItemType, SyncAction};
use onemirror_graph::{GraphChangeFeed, GraphClient, GraphDownloadResolver, GraphMetadataFetcher};
use onemirror_sync::DeltaEngine;

use super::CommandContext;
use crate::output::OutputFormatter;

/// Watch command with clap options
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Stop after this many actions
    #[arg(long)]
    pub limit: Option<usize>,

    /// Override the Graph API base URL from the configuration
    #[arg(long, env = "ONEMIRROR_GRAPH_URL")]
    pub base_url: Option<String>,
}

impl WatchCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();

        let mut config = Config::load_or_default(&ctx.config_path);
        if let Some(base_url) = &self.base_url {
            config.graph.base_url = base_url.clone();
        }
        let errors = config.validate();
        if !errors.is_empty() {
            let list: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::bail!("Invalid configuration: {}", list.join("; "));
        }

        let credential = read_credential(&config.auth.access_token_env)?;
        let engine = build_engine(&config);

        info!(
            base_url = %config.graph.base_url,
            poll_interval = config.graph.poll_interval,
            "Watching drive"
        );
        formatter.info("Watching for changes. Press Ctrl+C to stop.");

        let mut stream = engine.start(credential);
        let mut summary = Summary::default();

        let outcome = loop {
            let next = tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C");
                    break Ok(());
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(action)) => {
                    summary.record(&action);
                    print_action(formatter.as_ref(), &action)?;
                    if self.limit.is_some_and(|limit| summary.total >= limit) {
                        break Ok(());
                    }
                }
                Some(Err(err)) if err.is_fatal() => break Err(anyhow::Error::new(err)),
                Some(Err(err)) => {
                    warn!(error = %err, "Shared folder unavailable");
                    formatter.warn(&err.to_string());
                }
                None => break Ok(()),
            }
        };

        if let Some(state) = stream.shutdown().await {
            info!(tracked = state.tracked_len(), "Pipeline stopped");
        }
        summary.report(formatter.as_ref());

        outcome
    }
}

/// Reads the access token from the environment variable `var`
fn read_credential(var: &str) -> Result<Credential> {
    let token = std::env::var(var)
        .with_context(|| format!("No access token: set the {var} environment variable"))?;
    Credential::new(token).with_context(|| format!("Invalid access token in {var}"))
}

fn build_engine(config: &Config) -> DeltaEngine {
    let client = Arc::new(GraphClient::with_base_url(config.graph.base_url.as_str()));
    let feeds = GraphChangeFeed::new(Arc::clone(&client))
        .with_poll_interval(config.graph.poll_interval());
    let fetcher = GraphMetadataFetcher::new(Arc::clone(&client));
    let downloads = GraphDownloadResolver::new(client);

    DeltaEngine::new(Arc::new(feeds), Arc::new(fetcher), Arc::new(downloads))
        .with_config(&config.engine)
}

fn print_action(formatter: &dyn OutputFormatter, action: &SyncAction) -> Result<()> {
    let value = serde_json::to_value(action).context("Failed to serialize action")?;
    formatter.print_record(&describe(action), &value);
    Ok(())
}

/// One-line human description of an action
fn describe(action: &SyncAction) -> String {
    let item_type = match action.item_type {
        ItemType::File => "file",
        ItemType::Folder => "folder",
        ItemType::Unknown => "?",
    };
    let detail = match &action.kind {
        ActionKind::Move { old_name } => format!("{old_name} -> {}", action.name),
        ActionKind::Copy { from } => format!("{} (copy of {from})", action.name),
        ActionKind::Error { error } => format!("{} [{}]", error.filename, error.reason),
        _ => action.name.clone(),
    };
    format!("{:<6} {:<6} {detail}", action.kind.label(), item_type)
}

/// Per-kind action counts
#[derive(Debug, Default)]
struct Summary {
    total: usize,
    by_kind: BTreeMap<&'static str, usize>,
}

impl Summary {
    fn record(&mut self, action: &SyncAction) {
        self.total += 1;
        *self.by_kind.entry(action.kind.label()).or_default() += 1;
    }

    fn report(&self, formatter: &dyn OutputFormatter) {
        formatter.info("");
        formatter.info(&format!("{} action(s)", self.total));
        for (kind, count) in &self.by_kind {
            formatter.info(&format!("  {kind:<6} {count}"));
        }
    }
}
