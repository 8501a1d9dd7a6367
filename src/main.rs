//! Thicket CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "thicket")]
#[command(about = "Java code graph extraction and graph-aware semantic search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root path (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the project's code graph and save it
    Index {
        /// Embed method source once indexing finishes
        #[arg(long)]
        embed: bool,
    },
    /// (Re)build method embeddings and the vector index
    Embed,
    /// Retrieve code clusters related to a question
    Query {
        text: String,

        /// Number of seed methods
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Delete the whole graph
    Reset,
    /// Show node and relationship totals
    Stats,
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "7890")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("thicket={log_level}")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Thicket v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Project root: {}", cli.root.display());

    match cli.command {
        Commands::Index { embed } => commands::index(cli.root, embed).await,
        Commands::Embed => commands::embed(cli.root).await,
        Commands::Query { text, top_n } => commands::query(cli.root, text, top_n).await,
        Commands::Reset => commands::reset(cli.root),
        Commands::Stats => commands::stats(cli.root),
        Commands::Serve { port, host } => commands::serve(cli.root, host, port).await,
    }
}
