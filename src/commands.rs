//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Config file to use instead of `<config_dir>/config.yaml`.
    #[arg(long, short = 'c', env = "MARIN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Ask a single question. The exchange is remembered for the rest of the process.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question to be asked.
        query: String,
    },

    /// Chat on stdin until `exit`. Every exchange becomes a new memory.
    #[clap(name = "interactive", alias = "i")]
    Interactive,

    /// Show what the memory recalls for a query, without generating anything.
    #[clap(name = "search", alias = "s")]
    Search {
        query: String,

        /// Number of fragments to show.
        #[arg(short = 'k', long, default_value_t = 3)]
        top_k: usize,
    },

    /// Write the default config, persona template and seed knowledge base.
    Init,
}
