use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::config::ClusterConfig;
use crate::error::ClusterError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

/// A handle to the cluster.
///
/// Building a client never touches the network, an unreachable cluster only surfaces as an
/// error on the first request.
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
    base: Url,
    credentials: Option<Credentials>,
    config: ClusterConfig,
}

impl ClusterClient {
    pub fn new(config: &ClusterConfig) -> Result<Self, ClusterError> {
        let (base, credentials) = split_credentials(&config.url)?;

        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_certs)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base,
            credentials,
            config: config.clone(),
        })
    }

    /// The cluster url, stripped of any credentials.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClusterError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ClusterError::InvalidUrl(format!("{path}: {e}")))?;

        let mut request = self.client.request(method, url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_ref());
        }
        Ok(request)
    }

    /// Send the request and turn any non-success status into [`ClusterError::Api`].
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response, ClusterError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClusterError::Api {
            method,
            path: path.to_string(),
            status,
            reason: error_reason(&body),
        })
    }
}

/// Move `user:password@` out of the url so they are never logged or sent in the request line.
pub(crate) fn split_credentials(url: &Url) -> Result<(Url, Option<Credentials>), ClusterError> {
    let mut base = url.clone();
    let credentials = match url.username() {
        "" => None,
        username => Some(Credentials {
            username: decode(username)?,
            password: url.password().map(decode).transpose()?,
        }),
    };

    base.set_username("")
        .and_then(|_| base.set_password(None))
        .map_err(|_| ClusterError::InvalidUrl(format!("cannot remove credentials from '{url}'")))?;

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    Ok((base, credentials))
}

fn decode(part: &str) -> Result<String, ClusterError> {
    urlencoding::decode(part)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ClusterError::InvalidUrl(format!("credentials are not valid utf-8: {e}")))
}

/// Extract the human readable reason from an error response body.
fn error_reason(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    match &value["error"] {
        Value::Object(error) => error
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value["error"].to_string()),
        Value::String(reason) => reason.clone(),
        _ => body.to_string(),
    }
}
