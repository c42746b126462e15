//! `pm`: a thin HTTP client for a running `pommeld`. Deliberately no
//! wizards, no progress bars, no credential prompts — it issues one
//! request and prints the JSON response.

mod client;
mod project;

use clap::{Parser, Subcommand};
use client::DaemonClient;
use pommel_protocol::{ReindexRequest, SearchRequest};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pm")]
#[command(version)]
#[command(about = "Query and manage a pommeld daemon from the command line")]
struct Cli {
    /// Project root to operate on; defaults to the nearest ancestor
    /// directory containing a `.pommel` directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a hybrid search query against the index.
    Search {
        query: String,
        #[arg(long, default_value_t = 25)]
        limit: usize,
        #[arg(long)]
        path: Option<String>,
    },
    /// Print indexer and store status.
    Status,
    /// Trigger a reindex.
    Reindex {
        /// Reindex only this path (relative to the project root).
        #[arg(long)]
        path: Option<String>,
        /// Force a full reindex instead of an incremental one.
        #[arg(long)]
        full: bool,
    },
    /// List detected subprojects.
    Subprojects,
    /// Print the daemon's active configuration (secrets redacted).
    Config,
    /// Check whether the daemon is reachable.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let root = cli
        .root
        .unwrap_or_else(|| project::discover_project_root(&std::env::current_dir().unwrap_or_default()));
    let client = DaemonClient::new(project::daemon_base_url(&root));

    match cli.command {
        Command::Search { query, limit, path } => {
            let response = client
                .search(&SearchRequest {
                    query,
                    limit,
                    levels: None,
                    path_prefix: path,
                    subproject_ids: None,
                })
                .await?;
            print_json(&response)?;
        }
        Command::Status => print_json(&client.status().await?)?,
        Command::Reindex { path, full } => {
            let response = client.reindex(&ReindexRequest { path, full }).await?;
            print_json(&response)?;
        }
        Command::Subprojects => print_json(&client.subprojects().await?)?,
        Command::Config => print_json(&client.config().await?)?,
        Command::Health => print_json(&client.health().await?)?,
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
