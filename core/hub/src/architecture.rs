//! Support checks for hub model and tokenizer architectures.

use std::collections::HashMap;

use hubload_types::{
    BertTokenization,
    TaskConfig,
    TaskType,
    Tokenization,
    ZERO_SHOT_HYPOTHESIS_TEMPLATE,
};
use serde::Deserialize;

use crate::error::HubError;

/// Tokenizers whose vocabulary and tokenization the cluster can reproduce.
pub const SUPPORTED_TOKENIZERS: &[&str] = &[
    "BertTokenizer",
    "DPRContextEncoderTokenizer",
    "DPRQuestionEncoderTokenizer",
    "DistilBertTokenizer",
    "ElectraTokenizer",
    "MobileBertTokenizer",
    "RetriBertTokenizer",
    "SqueezeBertTokenizer",
];

// Tokenizers report absurdly large values when they have no length limit.
const MAX_REASONABLE_SEQUENCE_LENGTH: f64 = 1_000_000.0;

/// The subset of a hub `config.json` we care about.
#[derive(Debug, Default, Deserialize)]
pub struct ModelConfig {
    pub model_type: Option<String>,
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
    #[serde(default)]
    pub label2id: HashMap<String, serde_json::Value>,
    pub max_position_embeddings: Option<u32>,
}

/// The subset of a hub `tokenizer_config.json` we care about.
#[derive(Debug, Default, Deserialize)]
pub struct TokenizerConfig {
    pub tokenizer_class: Option<String>,
    pub do_lower_case: Option<bool>,
    pub model_max_length: Option<f64>,
}

/// Resolve the tokenizer class of a model and make sure it is supported.
///
/// An explicit `tokenizer_class` wins, a `Fast` suffix is ignored. Without one the class is
/// inferred from the model type.
pub fn tokenizer_class(
    model: &ModelConfig,
    tokenizer: &TokenizerConfig,
) -> Result<&'static str, HubError> {
    let name = match (&tokenizer.tokenizer_class, &model.model_type) {
        (Some(class), _) => class.trim_end_matches("Fast").to_string(),
        (None, Some(model_type)) => match tokenizer_for_model_type(model_type) {
            Some(class) => class.to_string(),
            None => format!("<tokenizer of model type {model_type}>"),
        },
        (None, None) => "<unknown>".to_string(),
    };

    SUPPORTED_TOKENIZERS
        .iter()
        .find(|supported| **supported == name)
        .copied()
        .ok_or_else(|| HubError::UnsupportedTokenizer {
            tokenizer: name,
            supported: SUPPORTED_TOKENIZERS.join(", "),
        })
}

fn tokenizer_for_model_type(model_type: &str) -> Option<&'static str> {
    let class = match model_type {
        "bert" => "BertTokenizer",
        "distilbert" => "DistilBertTokenizer",
        "dpr" => "DPRContextEncoderTokenizer",
        "electra" => "ElectraTokenizer",
        "mobilebert" => "MobileBertTokenizer",
        "retribert" => "RetriBertTokenizer",
        "squeezebert" => "SqueezeBertTokenizer",
        _ => return None,
    };
    Some(class)
}

/// Make sure the model head fits the task.
pub fn check_task(task_type: TaskType, model: &ModelConfig) -> Result<(), HubError> {
    let suffixes: &[&str] = match task_type {
        // Any base model can produce embeddings.
        TaskType::TextEmbedding => return Ok(()),
        TaskType::FillMask => &["ForMaskedLM", "ForPreTraining"],
        TaskType::Ner => &["ForTokenClassification"],
        TaskType::TextClassification | TaskType::ZeroShotClassification => {
            &["ForSequenceClassification"]
        },
    };

    let matching = model
        .architectures
        .iter()
        .any(|arch| suffixes.iter().any(|suffix| arch.ends_with(suffix)));
    if !matching {
        return Err(HubError::UnsupportedModel {
            architecture: architecture_name(model),
            task_type,
        });
    }

    if task_type == TaskType::ZeroShotClassification && !has_entailment_label(model) {
        return Err(HubError::InvalidConfig(
            "zero shot classification requires an 'entailment' label".to_string(),
        ));
    }

    Ok(())
}

fn architecture_name(model: &ModelConfig) -> String {
    match (model.architectures.first(), &model.model_type) {
        (Some(arch), _) => arch.clone(),
        (None, Some(model_type)) => model_type.clone(),
        (None, None) => "<unknown>".to_string(),
    }
}

fn has_entailment_label(model: &ModelConfig) -> bool {
    model
        .label2id
        .keys()
        .chain(model.id2label.values())
        .any(|label| label.eq_ignore_ascii_case("entailment"))
}

/// The label names of a classification head, ordered by label id.
pub fn classification_labels(model: &ModelConfig) -> Result<Vec<String>, HubError> {
    let mut labels = model
        .id2label
        .iter()
        .map(|(id, label)| {
            id.parse::<u32>()
                .map(|id| (id, label.clone()))
                .map_err(|_| HubError::InvalidConfig(format!("label id '{id}' is not a number")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    labels.sort_unstable_by_key(|(id, _)| *id);
    Ok(labels.into_iter().map(|(_, label)| label).collect())
}

/// Build the inference configuration of the task.
pub fn task_config(
    task_type: TaskType,
    model: &ModelConfig,
    tokenizer: &TokenizerConfig,
) -> Result<TaskConfig, HubError> {
    let max_sequence_length = tokenizer
        .model_max_length
        .filter(|len| len.is_finite() && *len > 0.0 && *len <= MAX_REASONABLE_SEQUENCE_LENGTH)
        .map(|len| len as u32)
        .or(model.max_position_embeddings);

    let tokenization = Tokenization::Bert(BertTokenization {
        // Matches the default of the BERT family tokenizers.
        do_lower_case: tokenizer.do_lower_case.unwrap_or(true),
        max_sequence_length,
    });

    let classification_labels = match task_type.has_classification_labels() {
        true => Some(classification_labels(model)?),
        false => None,
    };

    let hypothesis_template = (task_type == TaskType::ZeroShotClassification)
        .then(|| ZERO_SHOT_HYPOTHESIS_TEMPLATE.to_string());

    Ok(TaskConfig {
        tokenization,
        classification_labels,
        hypothesis_template,
    })
}
