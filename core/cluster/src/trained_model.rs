use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hubload_types::{ClusterModelId, DefinitionPart, TracedArtifacts};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::client::ClusterClient;
use crate::error::ClusterError;

/// A PyTorch trained model stored in the cluster under `model_id`.
///
/// Every operation is a single remote state transition, nothing is cached locally.
pub struct TrainedModel {
    client: ClusterClient,
    model_id: ClusterModelId,
}

impl TrainedModel {
    pub fn new(client: ClusterClient, model_id: ClusterModelId) -> Self {
        Self { client, model_id }
    }

    pub fn model_id(&self) -> &ClusterModelId {
        &self.model_id
    }

    fn path(&self, suffix: &str) -> String {
        format!("_ml/trained_models/{}{suffix}", self.model_id)
    }

    /// Stop the deployment of the model. A model that is not deployed is left alone.
    pub async fn stop(&self) -> Result<(), ClusterError> {
        let path = self.path("/deployment/_stop");
        let request = self
            .client
            .request(Method::POST, &path)?
            .query(&[("force", "true")]);

        match self.client.send(Method::POST, &path, request).await {
            Ok(_) => {
                info!("Stopped deployment of {}", self.model_id);
                Ok(())
            },
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                debug!("{} has no deployment to stop", self.model_id);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    /// Delete the stored model. A missing model is left alone.
    pub async fn delete(&self) -> Result<(), ClusterError> {
        let path = self.path("");
        let request = self.client.request(Method::DELETE, &path)?;

        match self.client.send(Method::DELETE, &path, request).await {
            Ok(_) => {
                info!("Deleted stored model {}", self.model_id);
                Ok(())
            },
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                debug!("{} is not stored, nothing to delete", self.model_id);
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    /// Store the configuration, vocabulary and model definition, in that order.
    pub async fn upload(&self, artifacts: &TracedArtifacts) -> Result<(), ClusterError> {
        self.put_config(&artifacts.config_path).await?;
        self.put_vocabulary(&artifacts.vocab_path).await?;
        self.put_definition(&artifacts.model_path).await
    }

    async fn put_config(&self, config_path: &Path) -> Result<(), ClusterError> {
        let config = read_json(config_path).await?;
        let path = self.path("");
        let request = self.client.request(Method::PUT, &path)?.json(&config);
        self.client.send(Method::PUT, &path, request).await?;
        debug!("Stored config of {}", self.model_id);
        Ok(())
    }

    async fn put_vocabulary(&self, vocab_path: &Path) -> Result<(), ClusterError> {
        let vocabulary = read_json(vocab_path).await?;
        let path = self.path("/vocabulary");
        let request = self.client.request(Method::PUT, &path)?.json(&vocabulary);
        self.client.send(Method::PUT, &path, request).await?;
        debug!("Stored vocabulary of {}", self.model_id);
        Ok(())
    }

    async fn put_definition(&self, model_path: &Path) -> Result<(), ClusterError> {
        let chunk_size = self.client.config().chunk_size;
        if chunk_size == 0 {
            return Err(ClusterError::InvalidChunkSize);
        }

        let mut file = tokio::fs::File::open(model_path).await?;
        let total_definition_length = file.metadata().await?.len();
        if total_definition_length == 0 {
            return Err(ClusterError::EmptyDefinition);
        }
        let total_parts = total_definition_length.div_ceil(chunk_size as u64) as u32;

        let mut chunk = Vec::with_capacity(chunk_size);
        for part in 0..total_parts {
            chunk.clear();
            (&mut file)
                .take(chunk_size as u64)
                .read_to_end(&mut chunk)
                .await?;

            let body = DefinitionPart {
                definition: STANDARD.encode(&chunk),
                total_definition_length,
                total_parts,
            };
            let path = self.path(&format!("/definition/{part}"));
            let request = self.client.request(Method::PUT, &path)?.json(&body);
            self.client.send(Method::PUT, &path, request).await?;
            debug!("Uploaded part {}/{total_parts} of {}", part + 1, self.model_id);
        }

        info!(
            "Uploaded {} ({total_definition_length} bytes in {total_parts} parts)",
            self.model_id
        );
        Ok(())
    }

    /// Start a deployment and wait for it to be started.
    ///
    /// Returns `false` when the cluster refuses to start the deployment, transport failures
    /// are still errors.
    pub async fn start(&self) -> Result<bool, ClusterError> {
        let timeout = format!("{}ms", self.client.config().start_timeout.as_millis());
        let path = self.path("/deployment/_start");
        let request = self
            .client
            .request(Method::POST, &path)?
            .query(&[("wait_for", "started"), ("timeout", timeout.as_str())]);

        match self.client.send(Method::POST, &path, request).await {
            Ok(_) => Ok(true),
            Err(e @ ClusterError::Api { .. }) => {
                warn!("Failed to start deployment of {}: {e}", self.model_id);
                Ok(false)
            },
            Err(e) => Err(e),
        }
    }
}

async fn read_json(path: &Path) -> Result<Value, ClusterError> {
    let content = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}
