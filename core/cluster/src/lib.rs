//! Client for the trained model API of a search cluster.

mod client;
mod config;
mod error;
mod trained_model;

pub use client::ClusterClient;
pub use config::{ClusterConfig, DEFAULT_CHUNK_SIZE, DEFAULT_CLUSTER_URL};
pub use error::ClusterError;
pub use trained_model::TrainedModel;
