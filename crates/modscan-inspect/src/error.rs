//! Error handling for the modscan-inspect crate.

use std::{io, path::PathBuf, result};

use thiserror::Error;

/// Convenient result type for inspector operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while inspecting a snapshot.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading an input file failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The snapshot is not valid JSON or has the wrong shape.
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    /// Discovery errors, including misses in strict mode.
    #[error(transparent)]
    Discovery(#[from] modscan::Error),
    /// A user-supplied pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// Failed to build the async runtime.
    #[error("runtime error: {0}")]
    Runtime(io::Error),
}
