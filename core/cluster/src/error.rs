use reqwest::{Method, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Invalid cluster url: {0}")]
    InvalidUrl(String),
    #[error("Request to the cluster failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{method} {path} was rejected with {status}: {reason}")]
    Api {
        method: Method,
        path: String,
        status: StatusCode,
        reason: String,
    },
    #[error("Invalid json document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("The model definition is empty")]
    EmptyDefinition,
    #[error("The chunk size must be greater than zero")]
    InvalidChunkSize,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClusterError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClusterError::Api { status, .. } => Some(*status),
            ClusterError::Http(e) => e.status(),
            _ => None,
        }
    }
}
