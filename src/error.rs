//! Errors surfaced at the edges of the crate.
//!
//! The repair pipeline itself never fails: unavailable data degrades to
//! defaults or unknown metadata. These types cover the places where a caller
//! explicitly asks for something to be loaded, and the cache seam.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure loading a file the caller explicitly pointed at.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Failure reported by a [`crate::metadata::CardCache`] implementation.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("card cache unavailable: {0}")]
    Unavailable(String),
    #[error("card cache timed out after {0} ms")]
    Timeout(u64),
    #[error("card cache returned malformed data: {0}")]
    Malformed(String),
}
