//! CLI module for talkpdf
//!
//! Provides command-line interface parsing and handling for the talkpdf-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod chat;
pub mod init;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// talkpdf - Talk to your PDFs
///
/// Upload PDF documents, then ask questions answered only from their content.
#[derive(Parser, Debug)]
#[command(
    name = "talkpdf-server",
    version,
    about = "talkpdf - Ask questions about your PDF documents",
    long_about = "Serves a small web app that indexes uploaded PDFs and answers questions\n\
                  about them with a language model, using retrieval-augmented generation.\n\n\
                  Run without arguments to start the server, or use 'init' to create a config file.",
    after_help = "EXAMPLES:\n    \
                  talkpdf-server init                  # Write talkpdf.toml and .env.example\n    \
                  talkpdf-server                       # Start the server\n    \
                  talkpdf-server --config my.toml      # Use a custom config file\n    \
                  talkpdf-server chat report.pdf       # Ask questions in the terminal"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "talkpdf.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Create talkpdf.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Provider for embeddings and chat
        #[arg(long, value_enum, default_value_t = InitProvider::Openai)]
        provider: InitProvider,
    },

    /// Show configuration information
    Config {
        /// Only validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Index local PDFs and ask questions in the terminal
    Chat {
        /// PDF files to load
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Provider preset written by `init`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InitProvider {
    Openai,
    Ollama,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
