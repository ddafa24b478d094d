use std::result::Result as StdResult;

use thiserror::Error;

use crate::ids::ModuleId;

/// Convenient result type for the discovery crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors surfaced by discovery operations.
///
/// Only the not-found family (`NotFound`, `BulkMismatch`, `Extraction`) is
/// subject to the strictness policy; everything else is always returned.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input to a search or binding entry point.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A search matched nothing.
    #[error("{operation}: no module matched {filter}")]
    NotFound {
        /// Operation that performed the search.
        operation: &'static str,
        /// Description of the filter or code that was searched for.
        filter: String,
    },

    /// A bulk search satisfied fewer filters than requested.
    #[error("findBulk: found {found} of {requested} modules")]
    BulkMismatch {
        /// Number of filters that matched.
        found: usize,
        /// Number of filters requested.
        requested: usize,
    },

    /// The chunk entry-point id could not be recovered from factory source.
    #[error("extractAndLoadChunks: {reason} (filters={filters}, matcher={matcher})")]
    Extraction {
        /// Code filters used to locate the owning factory.
        filters: String,
        /// Pattern applied to the factory source.
        matcher: String,
        /// What went wrong.
        reason: String,
    },

    /// The readiness gate was initialized a second time.
    #[error("module discovery already initialized")]
    AlreadyInitialized,

    /// A deferred value was resolved a second time.
    #[error("deferred value already resolved")]
    AlreadyResolved,

    /// The readiness gate went away while being awaited.
    #[error("readiness gate closed")]
    GateClosed,

    /// The loader failed to load a chunk.
    #[error("failed to load chunk {id}: {message}")]
    ChunkLoad {
        /// Chunk entry-point id.
        id: ModuleId,
        /// Loader-provided reason.
        message: String,
    },

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A regular expression failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Helper for invalid-argument errors.
    pub fn invalid<M: Into<String>>(msg: M) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
