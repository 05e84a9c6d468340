use std::path::PathBuf;

pub const TRACED_MODEL_FILE: &str = "traced_pytorch_model.pt";
pub const MODEL_CONFIG_FILE: &str = "config.json";
pub const VOCABULARY_FILE: &str = "vocabulary.json";

/// The three files produced by tracing a hub model, ready to be uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracedArtifacts {
    /// The TorchScript archive of the model.
    pub model_path: PathBuf,
    /// The trained model configuration document.
    pub config_path: PathBuf,
    /// The tokenizer vocabulary document.
    pub vocab_path: PathBuf,
}
