use std::path::PathBuf;
use std::time::Duration;

use hubload_types::TRACED_MODEL_FILE;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct HubConfig {
    /// Base url of the model hub.
    pub endpoint: Url,
    /// Access token sent as a bearer token, needed for private or gated models.
    pub token: Option<String>,
    /// The branch, tag or commit to download files from.
    pub revision: String,
    /// Limit on connecting, and on how long a download may go without receiving data.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Where the scoped working directory is created. Defaults to the system temp directory.
    pub scratch_dir: Option<PathBuf>,
    pub tracer: TracerConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_HUB_URL).expect("default hub url is valid"),
            token: None,
            revision: "main".to_string(),
            timeout: Duration::from_secs(300),
            scratch_dir: None,
            tracer: TracerConfig::default(),
        }
    }
}

/// How the TorchScript form of a model is produced.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TracerConfig {
    /// Download an export already published in the model repository. The first file that
    /// exists is used.
    HubExport { files: Vec<String> },
    /// Run an external tracing program.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig::HubExport {
            files: vec![TRACED_MODEL_FILE.to_string()],
        }
    }
}
