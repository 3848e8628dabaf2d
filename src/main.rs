//! Trellis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Hierarchy-aware editing and card listing for canvas documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Vault root; canvas paths are relative to it
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to trellis.toml in the vault root)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node hierarchy of a canvas
    Tree {
        canvas: String,
    },
    /// Add a child node and re-center its siblings around the parent
    AddChild {
        canvas: String,

        #[arg(long)]
        parent: String,

        /// Where to put the node if the canvas cannot be re-laid out (default 0,0)
        #[arg(long, allow_hyphen_values = true, value_parser = commands::parse_point)]
        at: Option<trellis_core::Point>,
    },
    /// Add a node next to an existing one
    AddSibling {
        canvas: String,

        #[arg(long)]
        node: String,

        #[arg(long, allow_hyphen_values = true, value_parser = commands::parse_point)]
        at: Option<trellis_core::Point>,
    },
    /// Add an unconnected node
    AddNode {
        canvas: String,

        #[arg(long, allow_hyphen_values = true, value_parser = commands::parse_point)]
        at: trellis_core::Point,
    },
    /// Move nodes, given as id=x,y
    Move {
        canvas: String,

        #[arg(required = true, value_parser = commands::parse_move)]
        moves: Vec<trellis_canvas::PositionUpdate>,
    },
    /// Show where the children of a node would be placed
    Preview {
        canvas: String,

        #[arg(long)]
        parent: String,
    },
    /// List cards from the vault or a single canvas
    Cards {
        /// List the nodes of this canvas instead of vault notes
        #[arg(long)]
        canvas: Option<String>,

        /// Restrict the vault scan to a folder
        #[arg(long, conflicts_with = "canvas")]
        folder: Option<String>,

        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        sort: Option<trellis_cards::SortBy>,

        #[arg(long)]
        order: Option<trellis_cards::SortOrder>,

        #[arg(long)]
        limit: Option<usize>,

        /// Print cards as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // .env may carry TRELLIS_LOG
    dotenvy::dotenv().ok();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("TRELLIS_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("trellis={}", log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Trellis v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Vault root: {}", cli.root.display());

    if let Commands::Version = cli.command {
        println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = config::TrellisConfig::load(&cli.root, cli.config.as_deref())?;

    match cli.command {
        Commands::Tree { canvas } => commands::tree(&cli.root, &config, &canvas).await,
        Commands::AddChild { canvas, parent, at } => {
            commands::add_child(&cli.root, &config, &canvas, &parent, at).await
        }
        Commands::AddSibling { canvas, node, at } => {
            commands::add_sibling(&cli.root, &config, &canvas, &node, at).await
        }
        Commands::AddNode { canvas, at } => {
            commands::add_node(&cli.root, &config, &canvas, at).await
        }
        Commands::Move { canvas, moves } => {
            commands::move_nodes(&cli.root, &config, &canvas, &moves).await
        }
        Commands::Preview { canvas, parent } => {
            commands::preview(&cli.root, &config, &canvas, &parent).await
        }
        Commands::Cards {
            canvas,
            folder,
            search,
            tags,
            sort,
            order,
            limit,
            json,
        } => {
            let query = trellis_cards::CardQuery {
                search,
                tags,
                sort_by: sort,
                order,
                prioritize_documents: None,
                limit,
            };
            commands::cards(&cli.root, &config, canvas.as_deref(), folder.as_deref(), &query, json)
        }
        Commands::Version => Ok(()),
    }
}
