use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the document backend
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not reach backend: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend returned {status}{}", with_detail(.detail))]
    Backend {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("request task ended unexpectedly: {0}")]
    Interrupted(String),
}

impl ClientError {
    /// The backend's `detail` message, if the error body carried one
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Backend { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file selected")]
    NoFileSelected,

    #[error("an upload is already being processed")]
    InProgress,

    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl UploadError {
    /// Message shown to the user when the upload fails
    pub fn user_message(&self) -> String {
        match self {
            UploadError::Client(err) => err
                .detail()
                .map(str::to_string)
                .unwrap_or_else(|| GENERIC_UPLOAD_ERROR.to_string()),
            UploadError::Read { .. } => self.to_string(),
            _ => GENERIC_UPLOAD_ERROR.to_string(),
        }
    }
}

fn with_detail(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

pub(crate) const GENERIC_UPLOAD_ERROR: &str = "An unexpected error occurred.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no document has been processed yet")]
    NotReady,

    #[error("question is empty")]
    EmptyQuestion,

    #[error("another question is still waiting for an answer")]
    ExchangeInFlight,

    #[error("exchange belongs to a conversation that has been reset")]
    StaleExchange,
}
