use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use hubload_cluster::{ClusterClient, TrainedModel};
use hubload_hub::{tracer, HubClient, TransformerModel};
use hubload_types::{ClusterModelId, HubModelId, TaskType};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::config::Config;

pub struct UploadRequest {
    pub model_id: HubModelId,
    pub task_type: TaskType,
    pub start: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UploadReport {
    pub model_id: ClusterModelId,
    /// `None` when no start was requested.
    pub started: Option<bool>,
}

/// Fetch, trace and upload a hub model, then optionally start its deployment.
///
/// Progress lines are written to `out`. A deployment that fails to start is reported there
/// but does not fail the command.
pub async fn exec<W: Write>(
    request: UploadRequest,
    config: &Config,
    out: &mut W,
) -> Result<UploadReport> {
    // Neither client touches the network until the first request.
    let cluster =
        ClusterClient::new(&config.cluster).context("Failed to create the cluster client")?;
    let hub = HubClient::new(&config.hub).context("Failed to create the hub client")?;
    let tracer = tracer::from_config(&config.hub.tracer, &hub);

    // The scratch directory is removed when this block is left, on success or on error.
    let model = {
        let scratch = scratch_dir(config.hub.scratch_dir.as_deref())?;
        debug!("Using scratch directory {}", scratch.path().display());

        writeln!(out, "Loading HuggingFace transformer tokenizer and model")?;
        let transformer =
            TransformerModel::fetch(&hub, request.model_id, request.task_type, scratch.path())
                .await
                .context("Failed to load the model from the hub")?;
        let artifacts = transformer
            .save(scratch.path(), tracer.as_ref())
            .await
            .context("Failed to trace the model")?;

        let model = TrainedModel::new(cluster, transformer.cluster_model_id());
        model
            .stop()
            .await
            .with_context(|| format!("Failed to stop the deployment of {}", model.model_id()))?;
        model
            .delete()
            .await
            .with_context(|| format!("Failed to delete the existing model {}", model.model_id()))?;

        writeln!(out, "Uploading model")?;
        model
            .upload(&artifacts)
            .await
            .with_context(|| format!("Failed to upload model {}", model.model_id()))?;
        model
    };

    let started = if request.start {
        writeln!(out, "Starting model deployment")?;
        let started = match model.start().await {
            Ok(started) => started,
            Err(e) => {
                warn!("Failed to start deployment of {}: {e}", model.model_id());
                false
            },
        };
        match started {
            true => writeln!(out, " - started: {}", model.model_id())?,
            false => writeln!(out, " - failed")?,
        }
        Some(started)
    } else {
        None
    };

    Ok(UploadReport {
        model_id: model.model_id().clone(),
        started,
    })
}

fn scratch_dir(root: Option<&Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("hubload-");
    match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .context("Failed to create a temporary directory")
}
