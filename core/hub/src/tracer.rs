//! Producing the TorchScript form of a hub model.
//!
//! Tracing itself is delegated: either the repository already publishes an export, or an
//! external program does the work.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use hubload_types::{HubModelId, TaskType};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::client::HubClient;
use crate::config::TracerConfig;
use crate::error::HubError;

/// Leading bytes of a TorchScript archive, which is a zip file.
pub const TORCHSCRIPT_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// A model whose hub files were downloaded to `dir`.
pub struct ModelSource<'a> {
    pub model_id: &'a HubModelId,
    pub task_type: TaskType,
    pub dir: &'a Path,
}

#[async_trait]
pub trait Tracer: Send + Sync {
    /// Write the TorchScript form of the model to `output`.
    async fn trace(&self, source: &ModelSource<'_>, output: &Path) -> Result<(), HubError>;
}

/// Build the tracer described by the configuration.
pub fn from_config(config: &TracerConfig, client: &HubClient) -> Box<dyn Tracer> {
    match config {
        TracerConfig::HubExport { files } => {
            Box::new(HubExportTracer::new(client.clone(), files.clone()))
        },
        TracerConfig::Command { program, args } => {
            Box::new(CommandTracer::new(program.clone(), args.clone()))
        },
    }
}

/// Uses a TorchScript export published in the model repository.
pub struct HubExportTracer {
    client: HubClient,
    files: Vec<String>,
}

impl HubExportTracer {
    pub fn new(client: HubClient, files: Vec<String>) -> Self {
        Self { client, files }
    }
}

#[async_trait]
impl Tracer for HubExportTracer {
    async fn trace(&self, source: &ModelSource<'_>, output: &Path) -> Result<(), HubError> {
        for file in &self.files {
            if self.client.download_to(source.model_id, file, output).await? {
                info!("Using TorchScript export '{file}' of {}", source.model_id);
                return Ok(());
            }
        }

        Err(HubError::MissingExport {
            model_id: source.model_id.clone(),
            tried: self.files.join(", "),
        })
    }
}

/// Runs `<program> <args..> <source dir> <task type> <output path>`.
///
/// The hub model id is passed in the `HUBLOAD_MODEL_ID` environment variable.
pub struct CommandTracer {
    program: String,
    args: Vec<String>,
}

impl CommandTracer {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

#[async_trait]
impl Tracer for CommandTracer {
    async fn trace(&self, source: &ModelSource<'_>, output: &Path) -> Result<(), HubError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(source.dir)
            .arg(source.task_type.as_str())
            .arg(output)
            .env("HUBLOAD_MODEL_ID", source.model_id.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        debug!("Running tracer '{}' for {}", self.program, source.model_id);
        let status = command.status().await?;
        if !status.success() {
            return Err(HubError::TracerFailed {
                program: self.program.clone(),
                status,
            });
        }

        Ok(())
    }
}

/// Make sure the file at `path` looks like a TorchScript archive.
pub async fn validate_torchscript(path: &Path) -> Result<(), HubError> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(HubError::InvalidExport(path.to_path_buf()));
        },
        Err(e) => return Err(e.into()),
    };

    let mut magic = [0; 4];
    match file.read_exact(&mut magic).await {
        Ok(_) if &magic == TORCHSCRIPT_MAGIC => Ok(()),
        Ok(_) => Err(HubError::InvalidExport(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            Err(HubError::InvalidExport(path.to_path_buf()))
        },
        Err(e) => Err(e.into()),
    }
}
