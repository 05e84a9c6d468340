use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::server::spawn_router;

/// A request received by the mock cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

impl RecordedCall {
    /// `METHOD /path`, handy for asserting on call order.
    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Clone, Debug, Default)]
pub struct StoredModel {
    pub config: Value,
    pub vocabulary: Option<Value>,
    pub parts: BTreeMap<u32, Value>,
    pub deployed: bool,
}

impl StoredModel {
    pub fn is_complete(&self) -> bool {
        let Some(total) = self
            .parts
            .values()
            .next()
            .and_then(|part| part["total_parts"].as_u64())
        else {
            return false;
        };
        self.vocabulary.is_some() && self.parts.len() as u64 == total
    }
}

#[derive(Default)]
pub struct ClusterState {
    pub calls: Vec<RecordedCall>,
    pub models: HashMap<String, StoredModel>,
    /// Reject every start request with an internal error.
    pub fail_start: bool,
}

type SharedCluster = Arc<Mutex<ClusterState>>;

/// An in-memory stand-in for the `_ml/trained_models` API of a cluster.
pub struct MockCluster {
    addr: SocketAddr,
    state: SharedCluster,
}

impl MockCluster {
    pub async fn spawn() -> Self {
        Self::spawn_with_state(ClusterState::default()).await
    }

    pub async fn spawn_with_state(state: ClusterState) -> Self {
        let state: SharedCluster = Arc::new(Mutex::new(state));

        let router = Router::new()
            .route(
                "/_ml/trained_models/:model_id",
                put(put_config).delete(delete_model),
            )
            .route(
                "/_ml/trained_models/:model_id/vocabulary",
                put(put_vocabulary),
            )
            .route(
                "/_ml/trained_models/:model_id/definition/:part",
                put(put_definition_part),
            )
            .route(
                "/_ml/trained_models/:model_id/deployment/_stop",
                post(stop_deployment),
            )
            .route(
                "/_ml/trained_models/:model_id/deployment/_start",
                post(start_deployment),
            )
            .layer(DefaultBodyLimit::disable())
            .layer(middleware::from_fn_with_state(state.clone(), record_call))
            .with_state(state.clone());

        let addr = spawn_router(router).await;
        Self { addr, state }
    }

    /// The base url, without credentials.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The base url with embedded basic auth credentials.
    pub fn url_with_credentials(&self, user: &str, password: &str) -> String {
        format!("http://{user}:{password}@{}", self.addr)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::line).collect()
    }

    pub fn model(&self, model_id: &str) -> Option<StoredModel> {
        self.state.lock().models.get(model_id).cloned()
    }

    pub fn insert_model(&self, model_id: &str, model: StoredModel) {
        self.state.lock().models.insert(model_id.to_string(), model);
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.state.lock().fail_start = fail;
    }
}

async fn record_call<B>(
    State(state): State<SharedCluster>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let call = RecordedCall {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };
    state.lock().calls.push(call);
    next.run(request).await
}

fn error(status: StatusCode, kind: &str, reason: String) -> Response {
    (
        status,
        Json(json!({
            "error": { "type": kind, "reason": reason },
            "status": status.as_u16(),
        })),
    )
        .into_response()
}

fn not_found(model_id: &str) -> Response {
    error(
        StatusCode::NOT_FOUND,
        "resource_not_found_exception",
        format!("Could not find trained model [{model_id}]"),
    )
}

async fn put_config(
    State(state): State<SharedCluster>,
    Path(model_id): Path<String>,
    Json(config): Json<Value>,
) -> Response {
    let mut state = state.lock();
    if state.models.contains_key(&model_id) {
        return error(
            StatusCode::BAD_REQUEST,
            "resource_already_exists_exception",
            format!("Trained machine learning model [{model_id}] already exists"),
        );
    }
    state.models.insert(
        model_id.clone(),
        StoredModel {
            config: config.clone(),
            ..Default::default()
        },
    );
    Json(json!({ "model_id": model_id, "config": config })).into_response()
}

async fn delete_model(State(state): State<SharedCluster>, Path(model_id): Path<String>) -> Response {
    let mut state = state.lock();
    match state.models.get(&model_id) {
        None => not_found(&model_id),
        Some(model) if model.deployed => error(
            StatusCode::CONFLICT,
            "status_exception",
            format!("Cannot delete model [{model_id}] as it is currently deployed"),
        ),
        Some(_) => {
            state.models.remove(&model_id);
            Json(json!({ "acknowledged": true })).into_response()
        },
    }
}

async fn put_vocabulary(
    State(state): State<SharedCluster>,
    Path(model_id): Path<String>,
    Json(vocabulary): Json<Value>,
) -> Response {
    let mut state = state.lock();
    match state.models.get_mut(&model_id) {
        None => not_found(&model_id),
        Some(model) => {
            model.vocabulary = Some(vocabulary);
            Json(json!({ "acknowledged": true })).into_response()
        },
    }
}

async fn put_definition_part(
    State(state): State<SharedCluster>,
    Path((model_id, part)): Path<(String, u32)>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock();
    match state.models.get_mut(&model_id) {
        None => not_found(&model_id),
        Some(model) => {
            model.parts.insert(part, body);
            Json(json!({ "acknowledged": true })).into_response()
        },
    }
}

async fn stop_deployment(
    State(state): State<SharedCluster>,
    Path(model_id): Path<String>,
) -> Response {
    let mut state = state.lock();
    match state.models.get_mut(&model_id) {
        Some(model) if model.deployed => {
            model.deployed = false;
            Json(json!({ "stopped": true })).into_response()
        },
        _ => error(
            StatusCode::NOT_FOUND,
            "resource_not_found_exception",
            format!("No known model deployment with id [{model_id}]"),
        ),
    }
}

async fn start_deployment(
    State(state): State<SharedCluster>,
    Path(model_id): Path<String>,
) -> Response {
    let mut state = state.lock();
    if state.fail_start {
        return error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "exception",
            format!("Failed to start deployment of [{model_id}]"),
        );
    }
    match state.models.get_mut(&model_id) {
        None => not_found(&model_id),
        Some(model) if !model.is_complete() => error(
            StatusCode::CONFLICT,
            "status_exception",
            format!("Model definition of [{model_id}] is incomplete"),
        ),
        Some(model) => {
            model.deployed = true;
            Json(json!({
                "assignment": {
                    "task_parameters": { "model_id": model_id },
                    "assignment_state": "started",
                }
            }))
            .into_response()
        },
    }
}
