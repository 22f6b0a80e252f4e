//! Editor error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the editor core.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a file failed
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The terminal (key source or render sink) failed
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    /// Save was requested for a document with no file name
    #[error("no file name")]
    NoFileName,
}

impl Error {
    /// The underlying OS error, if there is one.
    #[must_use]
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            Self::Io { source, .. } | Self::Terminal(source) => Some(source),
            Self::NoFileName => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
