// src/error.rs
//
// Error types shared by the library. The filters and the enhancer never fail on
// their input; errors only come from I/O and from config or date parsing.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolishError {
    /// I/O failure on a specific path
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A date string matched none of the accepted formats
    #[error("Unrecognized date: {0:?}")]
    Date(String),
}

pub type Result<T> = std::result::Result<T, PolishError>;

impl PolishError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
