use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{HubModelId, TaskType};

pub const ZERO_SHOT_HYPOTHESIS_TEMPLATE: &str = "This example is {}.";
pub const DEFAULT_INPUT_FIELD: &str = "text_field";

/// The configuration document stored alongside a PyTorch trained model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedModelConfig {
    pub description: String,
    pub model_type: String,
    /// Keyed by the task type, always exactly one entry.
    pub inference_config: BTreeMap<TaskType, TaskConfig>,
    pub input: ModelInput,
}

impl TrainedModelConfig {
    pub fn pytorch(model_id: &HubModelId, task_type: TaskType, task_config: TaskConfig) -> Self {
        Self {
            description: format!("Model {model_id} for task type '{task_type}'"),
            model_type: "pytorch".to_string(),
            inference_config: BTreeMap::from([(task_type, task_config)]),
            input: ModelInput::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub tokenization: Tokenization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hypothesis_template: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tokenization {
    Bert(BertTokenization),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BertTokenization {
    pub do_lower_case: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sequence_length: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInput {
    pub field_names: Vec<String>,
}

impl Default for ModelInput {
    fn default() -> Self {
        Self {
            field_names: vec![DEFAULT_INPUT_FIELD.to_string()],
        }
    }
}

/// The tokenizer vocabulary, ordered by token index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub vocabulary: Vec<String>,
}

/// One base64 encoded slice of a model definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionPart {
    pub definition: String,
    pub total_definition_length: u64,
    pub total_parts: u32,
}
