use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;

use crate::server::spawn_router;

/// The files of a single model repository on the mock hub.
#[derive(Clone, Default)]
pub struct HubRepo {
    pub model_id: String,
    pub revision: String,
    pub files: HashMap<String, Vec<u8>>,
}

impl HubRepo {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            revision: "main".to_string(),
            files: HashMap::new(),
        }
    }

    pub fn revision(mut self, revision: &str) -> Self {
        self.revision = revision.to_string();
        self
    }

    pub fn file(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.to_string(), content.into());
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.files.remove(name);
        self
    }
}

#[derive(Default)]
struct HubState {
    files: HashMap<String, Vec<u8>>,
    token: Option<String>,
    requests: Vec<String>,
    /// Stream files one byte at a time with this pause before each byte.
    byte_delay: Option<Duration>,
}

type SharedHub = Arc<Mutex<HubState>>;

/// A minimal model hub serving `/<model id>/resolve/<revision>/<file>`.
pub struct MockHub {
    addr: SocketAddr,
    state: SharedHub,
}

impl MockHub {
    pub async fn spawn(repos: Vec<HubRepo>) -> Self {
        Self::spawn_inner(repos, None, None).await
    }

    /// Spawn a hub that rejects requests not carrying `Bearer <token>`.
    pub async fn spawn_with_token(repos: Vec<HubRepo>, token: &str) -> Self {
        Self::spawn_inner(repos, Some(token.to_string()), None).await
    }

    /// Spawn a hub that sends every file one byte at a time, `delay` apart.
    pub async fn spawn_trickling(repos: Vec<HubRepo>, delay: Duration) -> Self {
        Self::spawn_inner(repos, None, Some(delay)).await
    }

    async fn spawn_inner(
        repos: Vec<HubRepo>,
        token: Option<String>,
        byte_delay: Option<Duration>,
    ) -> Self {
        let mut files = HashMap::new();
        for repo in repos {
            for (name, content) in repo.files {
                files.insert(
                    format!("{}/resolve/{}/{}", repo.model_id, repo.revision, name),
                    content,
                );
            }
        }

        let state: SharedHub = Arc::new(Mutex::new(HubState {
            files,
            token,
            requests: Vec::new(),
            byte_delay,
        }));

        let router = Router::new()
            .route("/*path", get(serve_file))
            .with_state(state.clone());

        let addr = spawn_router(router).await;
        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Paths requested so far, without the leading slash.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }
}

async fn serve_file(
    State(state): State<SharedHub>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let (content, byte_delay) = {
        let mut state = state.lock();
        state.requests.push(path.clone());

        if let Some(token) = &state.token {
            let expected = format!("Bearer {token}");
            let provided = headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok());
            if provided != Some(expected.as_str()) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
        }

        match state.files.get(&path) {
            Some(content) => (content.clone(), state.byte_delay),
            None => return StatusCode::NOT_FOUND.into_response(),
        }
    };

    let Some(delay) = byte_delay else {
        return content.into_response();
    };

    let (mut sender, body) = Body::channel();
    tokio::spawn(async move {
        for byte in content {
            tokio::time::sleep(delay).await;
            if sender.send_data(Bytes::from(vec![byte])).await.is_err() {
                return;
            }
        }
    });
    axum::http::Response::new(body).into_response()
}
