use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScadwatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("source unreadable: {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("compiler failed for {path}: {message}")]
    Compiler { path: PathBuf, message: String },
    #[error("image error: {0}")]
    Image(String),
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("usage: {0}")]
    Usage(String),
    #[error("template error: {0}")]
    Template(String),
}

impl From<png::DecodingError> for ScadwatchError {
    fn from(err: png::DecodingError) -> Self {
        ScadwatchError::Image(err.to_string())
    }
}

impl From<png::EncodingError> for ScadwatchError {
    fn from(err: png::EncodingError) -> Self {
        ScadwatchError::Image(err.to_string())
    }
}

impl From<image::ImageError> for ScadwatchError {
    fn from(err: image::ImageError) -> Self {
        ScadwatchError::Image(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScadwatchError>;
