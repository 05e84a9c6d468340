use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hubload_types::HubModelId;
use reqwest::{Client, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::config::HubConfig;
use crate::error::HubError;

/// A thin client for the file resolution endpoint of a Hugging Face compatible hub.
#[derive(Clone)]
pub struct HubClient {
    client: Client,
    endpoint: Url,
    revision: String,
    token: Option<String>,
    idle_timeout: Duration,
}

impl HubClient {
    pub fn new(config: &HubConfig) -> Result<Self, HubError> {
        if config.endpoint.cannot_be_a_base() {
            return Err(HubError::InvalidEndpoint(config.endpoint.to_string()));
        }

        // No deadline on a whole download, only on connecting and between two chunks.
        let client = Client::builder().connect_timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            revision: config.revision.clone(),
            token: config.token.clone(),
            idle_timeout: config.timeout,
        })
    }

    /// `<endpoint>/<model id>/resolve/<revision>/<file>`, every part percent-encoded as path
    /// segments so neither the id nor the file can leave the endpoint.
    pub fn file_url(&self, model_id: &HubModelId, file: &str) -> Result<Url, HubError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| HubError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(model_id.as_str().split('/'))
            .push("resolve")
            .push(&self.revision)
            .extend(file.split('/'));
        Ok(url)
    }

    /// Download `file` of the repository into `dir`, failing if it does not exist.
    pub async fn download(
        &self,
        model_id: &HubModelId,
        file: &str,
        dir: &Path,
    ) -> Result<PathBuf, HubError> {
        self.download_optional(model_id, file, dir)
            .await?
            .ok_or_else(|| HubError::NotFound {
                model_id: model_id.clone(),
                file: file.to_string(),
            })
    }

    /// Download `file` of the repository into `dir`, returning `None` if it does not exist.
    pub async fn download_optional(
        &self,
        model_id: &HubModelId,
        file: &str,
        dir: &Path,
    ) -> Result<Option<PathBuf>, HubError> {
        let dest = dir.join(file);
        match self.download_to(model_id, file, &dest).await? {
            true => Ok(Some(dest)),
            false => Ok(None),
        }
    }

    /// Stream `file` of the repository to `dest`. Returns `false` if the file does not exist.
    pub async fn download_to(
        &self,
        model_id: &HubModelId,
        file: &str,
        dest: &Path,
    ) -> Result<bool, HubError> {
        let url = self.file_url(model_id, file)?;
        let Some(mut response) = self.get(url).await? else {
            debug!("{file} not found in {model_id}");
            return Ok(false);
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut out = tokio::fs::File::create(dest).await?;
        let mut written = 0;
        while let Some(chunk) = self.idle(file, response.chunk()).await?? {
            out.write_all(&chunk).await?;
            written += chunk.len();
        }
        out.flush().await?;

        debug!("downloaded {file} from {model_id} ({written} bytes)");
        Ok(true)
    }

    /// Fail with [`HubError::Stalled`] if `future` makes no progress within the idle timeout.
    async fn idle<T>(&self, what: &str, future: impl Future<Output = T>) -> Result<T, HubError> {
        tokio::time::timeout(self.idle_timeout, future)
            .await
            .map_err(|_| HubError::Stalled {
                what: what.to_string(),
                timeout: self.idle_timeout,
            })
    }

    async fn get(&self, url: Url) -> Result<Option<Response>, HubError> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = self.idle(url.as_str(), request.send()).await??;
        match response.status() {
            status if status.is_success() => Ok(Some(response)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(HubError::Status {
                status,
                url: url.to_string(),
            }),
        }
    }
}
