//! Error types for vi-chunker

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkerError {
    #[error("Invalid chunk options: {0}")]
    InvalidOptions(String),

    #[error("Input text is empty: {0}")]
    EmptyInput(PathBuf),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credentials: {0}")]
    Credentials(String),

    #[error(transparent)]
    Common(#[from] vi_common::Error),
}

pub type Result<T> = std::result::Result<T, ChunkerError>;
