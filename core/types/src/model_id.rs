use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Maximum length of a trained model id accepted by the cluster.
pub const MAX_CLUSTER_MODEL_ID_LEN: usize = 64;

/// A model identifier on the hub, usually of the form `namespace/name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HubModelId(String);

impl HubModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HubModelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Display for HubModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The id a model is stored under in the cluster.
///
/// Derived from a [`HubModelId`] by replacing `/` with `__`, lowercasing, and keeping at most
/// [`MAX_CLUSTER_MODEL_ID_LEN`] characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterModelId(String);

impl ClusterModelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&HubModelId> for ClusterModelId {
    fn from(hub_id: &HubModelId) -> Self {
        let id = hub_id
            .as_str()
            .replace('/', "__")
            .to_lowercase()
            .chars()
            .take(MAX_CLUSTER_MODEL_ID_LEN)
            .collect();
        Self(id)
    }
}

impl Display for ClusterModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
