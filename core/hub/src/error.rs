use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use hubload_types::{HubModelId, TaskType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Hub url '{0}' cannot have a path")]
    InvalidEndpoint(String),
    #[error("Request to the hub failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("The hub responded with {status} for '{url}'")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("File '{file}' does not exist in hub repository '{model_id}'")]
    NotFound { model_id: HubModelId, file: String },
    #[error("Failed to parse '{file}': {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),
    #[error("Tokenizer type '{tokenizer}' is not supported, must be one of: {supported}")]
    UnsupportedTokenizer { tokenizer: String, supported: String },
    #[error("Model architecture '{architecture}' is not supported for task type '{task_type}'")]
    UnsupportedModel {
        architecture: String,
        task_type: TaskType,
    },
    #[error("No TorchScript export found in '{model_id}', tried: {tried}")]
    MissingExport { model_id: HubModelId, tried: String },
    #[error("'{}' is not a TorchScript archive", .0.display())]
    InvalidExport(PathBuf),
    #[error("Tracer '{program}' exited with {status}")]
    TracerFailed { program: String, status: ExitStatus },
    #[error("No data received for '{what}' in {timeout:?}")]
    Stalled { what: String, timeout: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
