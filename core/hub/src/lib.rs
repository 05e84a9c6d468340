//! Fetching transformer models from a model hub and turning them into uploadable artifacts.

pub mod architecture;
mod client;
mod config;
mod error;
pub mod tracer;
mod transformer;

pub use client::HubClient;
pub use config::{HubConfig, TracerConfig, DEFAULT_HUB_URL};
pub use error::HubError;
pub use tracer::{CommandTracer, HubExportTracer, ModelSource, Tracer};
pub use transformer::TransformerModel;

#[cfg(test)]
mod tests;
