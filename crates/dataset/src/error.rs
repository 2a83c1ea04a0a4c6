use std::path::PathBuf;

use mask::MaskError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset layout error at {path}: {reason}")]
    Layout { path: PathBuf, reason: String },

    #[error("Failed to convert {path}: {source}")]
    Mask {
        path: PathBuf,
        #[source]
        source: MaskError,
    },

    #[error("Invalid category table: {0}")]
    Categories(#[source] MaskError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid train/val split {0}: must be in (0, 1]")]
    InvalidSplit(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
