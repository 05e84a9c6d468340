use serde_json::json;

use crate::hub::HubRepo;

pub const NER_MODEL_ID: &str = "dbmdz/bert-large-cased-finetuned-conll03-english";
pub const NER_CLUSTER_MODEL_ID: &str = "dbmdz__bert-large-cased-finetuned-conll03-english";

pub const VOCAB: &[&str] = &["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "hello", "world"];

/// Bytes that look like a TorchScript archive.
pub fn torchscript_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend((0..len.saturating_sub(4)).map(|i| (i % 251) as u8));
    bytes
}

pub fn vocab_txt() -> String {
    VOCAB.iter().map(|token| format!("{token}\n")).collect()
}

/// A cased BERT token classification model with a published TorchScript export.
pub fn bert_ner_repo(model_id: &str) -> HubRepo {
    let config = json!({
        "model_type": "bert",
        "architectures": ["BertForTokenClassification"],
        "max_position_embeddings": 512,
        "id2label": {
            "0": "O",
            "1": "B-MISC",
            "2": "I-MISC",
            "3": "B-PER",
            "4": "I-PER",
            "5": "B-ORG",
            "6": "I-ORG",
            "7": "B-LOC",
            "8": "I-LOC",
            "10": "X-EXTRA",
            "9": "I-EXTRA"
        }
    });
    let tokenizer_config = json!({
        "tokenizer_class": "BertTokenizer",
        "do_lower_case": false,
        "model_max_length": 512
    });

    HubRepo::new(model_id)
        .file("config.json", config.to_string())
        .file("tokenizer_config.json", tokenizer_config.to_string())
        .file("vocab.txt", vocab_txt())
        .file("traced_pytorch_model.pt", torchscript_bytes(1000))
}

/// An uncased DistilBERT sentence embedding model without a tokenizer config.
pub fn distilbert_embedding_repo(model_id: &str) -> HubRepo {
    let config = json!({
        "model_type": "distilbert",
        "architectures": ["DistilBertModel"]
    });

    HubRepo::new(model_id)
        .file("config.json", config.to_string())
        .file("vocab.txt", vocab_txt())
        .file("traced_pytorch_model.pt", torchscript_bytes(64))
}
