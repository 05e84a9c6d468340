use std::collections::HashMap;
use std::path::{Path, PathBuf};

use hubload_types::{
    ClusterModelId,
    HubModelId,
    TaskConfig,
    TaskType,
    TracedArtifacts,
    TrainedModelConfig,
    Vocabulary,
    MODEL_CONFIG_FILE,
    TRACED_MODEL_FILE,
    VOCABULARY_FILE,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::architecture::{self, ModelConfig, TokenizerConfig};
use crate::client::HubClient;
use crate::error::HubError;
use crate::tracer::{validate_torchscript, ModelSource, Tracer};

const SOURCE_DIR: &str = "source";

/// A hub transformer model together with its tokenizer, checked to be supported for a task.
pub struct TransformerModel {
    model_id: HubModelId,
    task_type: TaskType,
    source_dir: PathBuf,
    tokenizer_class: &'static str,
    task_config: TaskConfig,
    vocabulary: Vocabulary,
}

impl TransformerModel {
    /// Download the model configuration, tokenizer definition and vocabulary into
    /// `<work_dir>/source` and check that the model can serve the task.
    pub async fn fetch(
        client: &HubClient,
        model_id: HubModelId,
        task_type: TaskType,
        work_dir: &Path,
    ) -> Result<Self, HubError> {
        let source_dir = work_dir.join(SOURCE_DIR);
        tokio::fs::create_dir_all(&source_dir).await?;

        let config_path = client
            .download(&model_id, "config.json", &source_dir)
            .await?;
        let model_config: ModelConfig = read_json(&config_path).await?;

        let tokenizer_config = match client
            .download_optional(&model_id, "tokenizer_config.json", &source_dir)
            .await?
        {
            Some(path) => read_json::<TokenizerConfig>(&path).await?,
            None => TokenizerConfig::default(),
        };

        let tokenizer_class = architecture::tokenizer_class(&model_config, &tokenizer_config)?;
        architecture::check_task(task_type, &model_config)?;
        let task_config = architecture::task_config(task_type, &model_config, &tokenizer_config)?;
        let vocabulary = fetch_vocabulary(client, &model_id, &source_dir).await?;

        info!(
            "Loaded {model_id} ({tokenizer_class}, {} tokens) for {task_type}",
            vocabulary.vocabulary.len()
        );

        Ok(Self {
            model_id,
            task_type,
            source_dir,
            tokenizer_class,
            task_config,
            vocabulary,
        })
    }

    pub fn tokenizer_class(&self) -> &'static str {
        self.tokenizer_class
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// The id the model is stored under in the cluster.
    pub fn cluster_model_id(&self) -> ClusterModelId {
        ClusterModelId::from(&self.model_id)
    }

    pub fn config(&self) -> TrainedModelConfig {
        TrainedModelConfig::pytorch(&self.model_id, self.task_type, self.task_config.clone())
    }

    /// Trace the model and write the model, config and vocabulary files to `dir`.
    pub async fn save(&self, dir: &Path, tracer: &dyn Tracer) -> Result<TracedArtifacts, HubError> {
        let model_path = dir.join(TRACED_MODEL_FILE);
        let source = ModelSource {
            model_id: &self.model_id,
            task_type: self.task_type,
            dir: &self.source_dir,
        };
        tracer.trace(&source, &model_path).await?;
        validate_torchscript(&model_path).await?;

        let config_path = dir.join(MODEL_CONFIG_FILE);
        write_json(&config_path, &self.config()).await?;

        let vocab_path = dir.join(VOCABULARY_FILE);
        write_json(&vocab_path, &self.vocabulary).await?;

        debug!("Saved artifacts of {} to {}", self.model_id, dir.display());
        Ok(TracedArtifacts {
            model_path,
            config_path,
            vocab_path,
        })
    }
}

#[derive(Deserialize)]
struct TokenizerJson {
    model: TokenizerJsonModel,
}

#[derive(Deserialize)]
struct TokenizerJsonModel {
    vocab: HashMap<String, u32>,
}

/// Read the WordPiece vocabulary from `vocab.txt`, falling back to `tokenizer.json`.
async fn fetch_vocabulary(
    client: &HubClient,
    model_id: &HubModelId,
    dir: &Path,
) -> Result<Vocabulary, HubError> {
    if let Some(path) = client.download_optional(model_id, "vocab.txt", dir).await? {
        let content = tokio::fs::read_to_string(&path).await?;
        return Ok(parse_vocab_txt(&content));
    }

    match client
        .download_optional(model_id, "tokenizer.json", dir)
        .await?
    {
        Some(path) => {
            let tokenizer: TokenizerJson = read_json(&path).await?;
            let mut tokens = tokenizer.model.vocab.into_iter().collect::<Vec<_>>();
            tokens.sort_unstable_by_key(|(_, index)| *index);
            Ok(Vocabulary {
                vocabulary: tokens.into_iter().map(|(token, _)| token).collect(),
            })
        },
        None => Err(HubError::NotFound {
            model_id: model_id.clone(),
            file: "vocab.txt".to_string(),
        }),
    }
}

pub(crate) fn parse_vocab_txt(content: &str) -> Vocabulary {
    Vocabulary {
        vocabulary: content.lines().map(str::to_string).collect(),
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, HubError> {
    let content = tokio::fs::read(path).await?;
    serde_json::from_slice(&content).map_err(|source| HubError::Parse {
        file: path.display().to_string(),
        source,
    })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), HubError> {
    let content = serde_json::to_vec_pretty(value).map_err(|source| HubError::Parse {
        file: path.display().to_string(),
        source,
    })?;
    tokio::fs::write(path, content).await?;
    Ok(())
}
