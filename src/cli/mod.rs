//! CLI module for the QA service.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Retrieval-augmented question answering over a fixed document corpus.
#[derive(Debug, Parser)]
#[command(name = "ragqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "RAGQA_CONFIG",
        help = "Path to the TOML settings file"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the index and serve the QA endpoint
    Serve(commands::ServeArgs),

    /// Answer a single question from the command line
    Ask(commands::AskArgs),

    /// Score already-generated answers against gold answers
    Eval(commands::EvalArgs),
}
