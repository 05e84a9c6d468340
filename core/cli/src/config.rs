use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hubload_cluster::ClusterConfig;
use hubload_hub::{HubConfig, TracerConfig};
use serde::{Deserialize, Serialize};

use crate::args::Args;

/// Everything the upload pipeline needs to know, read from an optional toml file and
/// overridden by command line flags.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub hub: HubConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads the file given with `--config`, if any, and applies the remaining flags on top.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.url {
            self.cluster.url = url.clone();
        }
        if let Some(url) = &args.hub_url {
            self.hub.endpoint = url.clone();
        }
        if let Some(token) = &args.hub_token {
            self.hub.token = Some(token.clone());
        }
        if let Some(revision) = &args.revision {
            self.hub.revision = revision.clone();
        }
        if let Some(program) = &args.tracer_cmd {
            self.hub.tracer = TracerConfig::Command {
                program: program.clone(),
                args: Vec::new(),
            };
        }
    }
}
