//! Command-line interface definitions for modscan-inspect.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `modscan-inspect` binary.
#[derive(Parser, Debug)]
#[command(
    name = "modscan-inspect",
    about = "Query a bundled-module snapshot the way the runtime would",
    version
)]
pub struct Cli {
    /// Logging controls shared across modscan binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Snapshot file (JSON) describing factories, loaded modules and chunks.
    #[arg(long, short, value_name = "PATH")]
    pub snapshot: PathBuf,

    /// Optional discovery configuration (RON), e.g. `(strictness: strict)`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Which query to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Snapshot queries.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every factory whose source satisfies all filters.
    Search(SearchArgs),
    /// Print the id of the first factory containing every substring.
    FindId(CodeArgs),
    /// Print an annotated copy of a factory's source.
    Extract {
        /// Module id.
        id: String,
    },
    /// Find the first loaded module defining every property.
    Props {
        /// Property names.
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,
    },
    /// Recover a chunk entry point from factory source, load it and print its exports.
    Chunks(ChunkArgs),
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Substrings (or patterns with `--regex`) that must all appear.
    #[arg(required = true, num_args = 1..)]
    pub filters: Vec<String>,

    /// Treat filters as regular expressions.
    #[arg(long)]
    pub regex: bool,
}

/// Substrings identifying a factory.
#[derive(Args, Debug, Clone)]
pub struct CodeArgs {
    /// Substrings that must all appear in the factory source.
    #[arg(required = true, num_args = 1..)]
    pub code: Vec<String>,
}

/// Arguments for the `chunks` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    /// Substrings identifying the factory that loads the chunk.
    #[arg(required = true, num_args = 1..)]
    pub code: Vec<String>,

    /// Entry-point pattern; its last capture group is the module id.
    #[arg(long, value_name = "REGEX")]
    pub matcher: Option<String>,
}
