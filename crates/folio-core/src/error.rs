use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FolioError {
    #[error("{0}")]
    Message(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(
        "no API token found in the environment, .env file, gh CLI or git credential helper"
    )]
    MissingToken,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} responded with {status}")]
    Api { status: u16, url: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl FolioError {
    pub fn message<T: Into<String>>(message: T) -> Self {
        FolioError::Message(message.into())
    }

    /// True when the remote side answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FolioError::Api { status: 404, .. })
    }
}
