//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "profrag")]
#[command(about = "Chat about professors over a vector index of student reviews")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: configured level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: config.toml, then config.example.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Disable CORS headers
        #[arg(long)]
        no_cors: bool,
    },
    /// Ask one question and stream the answer to stdout
    Ask {
        /// The question, e.g. "Tell me about Dr. Jane Smith"
        question: String,
    },
    /// Scrape a professor review page into the index
    Ingest {
        /// Link to the review page
        link: String,
    },
    /// Bulk-load a reviews JSON file into the index
    Seed {
        /// Path to a {"reviews": [...]} file
        file: PathBuf,
    },
    /// Show current configuration
    Config,
}
