use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The NLP task a model is uploaded for. Determines which model head is
/// accepted and which inference configuration is generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    FillMask,
    Ner,
    TextClassification,
    TextEmbedding,
    ZeroShotClassification,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::FillMask => "fill_mask",
            TaskType::Ner => "ner",
            TaskType::TextClassification => "text_classification",
            TaskType::TextEmbedding => "text_embedding",
            TaskType::ZeroShotClassification => "zero_shot_classification",
        }
    }

    /// Whether the uploaded configuration carries the model's label names.
    pub fn has_classification_labels(&self) -> bool {
        matches!(
            self,
            TaskType::Ner | TaskType::TextClassification | TaskType::ZeroShotClassification
        )
    }
}

impl Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
