use std::time::Duration;

use hubload_test_utils::fixtures::{
    bert_ner_repo,
    distilbert_embedding_repo,
    torchscript_bytes,
    NER_CLUSTER_MODEL_ID,
    NER_MODEL_ID,
    VOCAB,
};
use hubload_test_utils::hub::{HubRepo, MockHub};
use hubload_types::{
    BertTokenization,
    HubModelId,
    TaskType,
    Tokenization,
    TrainedModelConfig,
    Vocabulary,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::tempdir;
use url::Url;

use crate::architecture::{self, ModelConfig, TokenizerConfig};
use crate::transformer::parse_vocab_txt;
use crate::*;

fn config_for(hub: &MockHub) -> HubConfig {
    HubConfig {
        endpoint: Url::parse(&hub.url()).unwrap(),
        ..Default::default()
    }
}

fn default_tracer(client: &HubClient) -> Box<dyn Tracer> {
    tracer::from_config(&TracerConfig::default(), client)
}

#[tokio::test]
async fn test_fetch_and_save_ner_model() {
    let hub = MockHub::spawn(vec![bert_ner_repo(NER_MODEL_ID)]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let model = TransformerModel::fetch(
        &client,
        HubModelId::from(NER_MODEL_ID),
        TaskType::Ner,
        work_dir.path(),
    )
    .await
    .unwrap();
    assert_eq!(model.tokenizer_class(), "BertTokenizer");
    assert_eq!(model.cluster_model_id().as_str(), NER_CLUSTER_MODEL_ID);

    let artifacts = model
        .save(work_dir.path(), default_tracer(&client).as_ref())
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(&artifacts.model_path).unwrap(),
        torchscript_bytes(1000)
    );

    let config: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&artifacts.config_path).unwrap()).unwrap();
    assert_eq!(
        config["inference_config"]["ner"],
        json!({
            "tokenization": {
                "bert": { "do_lower_case": false, "max_sequence_length": 512 }
            },
            "classification_labels": [
                "O", "B-MISC", "I-MISC", "B-PER", "I-PER",
                "B-ORG", "I-ORG", "B-LOC", "I-LOC", "I-EXTRA", "X-EXTRA"
            ]
        })
    );
    assert_eq!(config["model_type"], "pytorch");

    let vocab: Vocabulary =
        serde_json::from_slice(&std::fs::read(&artifacts.vocab_path).unwrap()).unwrap();
    assert_eq!(vocab.vocabulary, VOCAB);

    let requests = hub.requests();
    assert!(requests.contains(&format!("{NER_MODEL_ID}/resolve/main/config.json")));
    assert!(requests.contains(&format!("{NER_MODEL_ID}/resolve/main/traced_pytorch_model.pt")));
}

#[tokio::test]
async fn test_embedding_model_infers_tokenizer_from_model_type() {
    let model_id = "sentence-transformers/msmarco-distilbert";
    let hub = MockHub::spawn(vec![distilbert_embedding_repo(model_id)]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let model = TransformerModel::fetch(
        &client,
        HubModelId::from(model_id),
        TaskType::TextEmbedding,
        work_dir.path(),
    )
    .await
    .unwrap();

    assert_eq!(model.tokenizer_class(), "DistilBertTokenizer");
    let config: TrainedModelConfig = model.config();
    let task_config = &config.inference_config[&TaskType::TextEmbedding];
    assert_eq!(
        task_config.tokenization,
        Tokenization::Bert(BertTokenization {
            do_lower_case: true,
            max_sequence_length: None,
        })
    );
    assert_eq!(task_config.classification_labels, None);
}

#[tokio::test]
async fn test_unsupported_tokenizer_is_rejected() {
    let model_id = "gpt2";
    let repo = HubRepo::new(model_id)
        .file(
            "config.json",
            json!({ "model_type": "gpt2", "architectures": ["GPT2LMHeadModel"] }).to_string(),
        )
        .file(
            "tokenizer_config.json",
            json!({ "tokenizer_class": "GPT2TokenizerFast" }).to_string(),
        );
    let hub = MockHub::spawn(vec![repo]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let result = TransformerModel::fetch(
        &client,
        HubModelId::from(model_id),
        TaskType::TextEmbedding,
        work_dir.path(),
    )
    .await;

    match result {
        Err(HubError::UnsupportedTokenizer { tokenizer, .. }) => {
            assert_eq!(tokenizer, "GPT2Tokenizer")
        },
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("gpt2 must be rejected"),
    }
}

#[tokio::test]
async fn test_mismatched_head_is_rejected() {
    let hub = MockHub::spawn(vec![bert_ner_repo(NER_MODEL_ID)]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let result = TransformerModel::fetch(
        &client,
        HubModelId::from(NER_MODEL_ID),
        TaskType::FillMask,
        work_dir.path(),
    )
    .await;

    assert!(matches!(
        result,
        Err(HubError::UnsupportedModel {
            task_type: TaskType::FillMask,
            ..
        })
    ));
}

#[tokio::test]
async fn test_missing_config_is_an_error() {
    let hub = MockHub::spawn(vec![]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let result = TransformerModel::fetch(
        &client,
        HubModelId::from("nobody/nothing"),
        TaskType::Ner,
        work_dir.path(),
    )
    .await;

    match result {
        Err(HubError::NotFound { file, .. }) => assert_eq!(file, "config.json"),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("fetch must fail"),
    }
}

#[tokio::test]
async fn test_vocabulary_falls_back_to_tokenizer_json() {
    let model_id = "org/fast-only";
    let tokenizer_json = json!({
        "model": { "type": "WordPiece", "vocab": { "b": 1, "[PAD]": 0, "c": 2 } }
    });
    let repo = bert_ner_repo(model_id)
        .without("vocab.txt")
        .file("tokenizer.json", tokenizer_json.to_string());
    let hub = MockHub::spawn(vec![repo]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let model = TransformerModel::fetch(
        &client,
        HubModelId::from(model_id),
        TaskType::Ner,
        work_dir.path(),
    )
    .await
    .unwrap();

    assert_eq!(model.vocabulary().vocabulary, vec!["[PAD]", "b", "c"]);
}

#[tokio::test]
async fn test_missing_export_is_reported() {
    let repo = bert_ner_repo(NER_MODEL_ID).without("traced_pytorch_model.pt");
    let hub = MockHub::spawn(vec![repo]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let model = TransformerModel::fetch(
        &client,
        HubModelId::from(NER_MODEL_ID),
        TaskType::Ner,
        work_dir.path(),
    )
    .await
    .unwrap();
    let tracer = HubExportTracer::new(
        client.clone(),
        vec!["traced_pytorch_model.pt".to_string(), "model.pt".to_string()],
    );
    let result = model.save(work_dir.path(), &tracer).await;

    match result {
        Err(HubError::MissingExport { tried, .. }) => {
            assert_eq!(tried, "traced_pytorch_model.pt, model.pt")
        },
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("save must fail"),
    }
}

#[tokio::test]
async fn test_export_must_be_torchscript() {
    let repo = bert_ner_repo(NER_MODEL_ID).file("traced_pytorch_model.pt", "not a zip");
    let hub = MockHub::spawn(vec![repo]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let model = TransformerModel::fetch(
        &client,
        HubModelId::from(NER_MODEL_ID),
        TaskType::Ner,
        work_dir.path(),
    )
    .await
    .unwrap();
    let result = model
        .save(work_dir.path(), default_tracer(&client).as_ref())
        .await;

    assert!(matches!(result, Err(HubError::InvalidExport(_))));
}

#[tokio::test]
async fn test_token_is_sent_as_bearer() {
    let hub = MockHub::spawn_with_token(vec![bert_ner_repo(NER_MODEL_ID)], "secret").await;
    let work_dir = tempdir().unwrap();
    let model_id = HubModelId::from(NER_MODEL_ID);

    let anonymous = HubClient::new(&config_for(&hub)).unwrap();
    let result = anonymous
        .download(&model_id, "config.json", work_dir.path())
        .await;
    assert!(matches!(
        result,
        Err(HubError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            ..
        })
    ));

    let authorized = HubClient::new(&HubConfig {
        token: Some("secret".to_string()),
        ..config_for(&hub)
    })
    .unwrap();
    let path = authorized
        .download(&model_id, "config.json", work_dir.path())
        .await
        .unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_revision_is_used_in_file_urls() {
    let repo = bert_ner_repo(NER_MODEL_ID).revision("v1.0");
    let hub = MockHub::spawn(vec![repo]).await;
    let client = HubClient::new(&HubConfig {
        revision: "v1.0".to_string(),
        ..config_for(&hub)
    })
    .unwrap();
    let work_dir = tempdir().unwrap();

    let path = client
        .download(&HubModelId::from(NER_MODEL_ID), "vocab.txt", work_dir.path())
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), VOCAB.len());
}

#[test]
fn test_file_url_keeps_endpoint_prefix() {
    let client = HubClient::new(&HubConfig {
        endpoint: Url::parse("https://mirror.example.com/hub").unwrap(),
        ..Default::default()
    })
    .unwrap();

    let url = client
        .file_url(&HubModelId::from("org/model"), "config.json")
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://mirror.example.com/hub/org/model/resolve/main/config.json"
    );
}

#[test]
fn test_file_url_cannot_leave_the_endpoint() {
    let client = HubClient::new(&HubConfig::default()).unwrap();

    for model_id in ["//evil.example/x", "https://evil.example/x"] {
        let url = client
            .file_url(&HubModelId::from(model_id), "config.json")
            .unwrap();
        assert_eq!(url.host_str(), Some("huggingface.co"), "{url}");
        assert!(url.path().ends_with("/evil.example/x/resolve/main/config.json"));
    }

    let url = client
        .file_url(&HubModelId::from("org/model#frag"), "config.json")
        .unwrap();
    assert_eq!(url.fragment(), None);
    assert_eq!(
        url.as_str(),
        "https://huggingface.co/org/model%23frag/resolve/main/config.json"
    );

    let url = client
        .file_url(&HubModelId::from("org/model?x=1"), "config.json")
        .unwrap();
    assert_eq!(url.query(), None);
    assert_eq!(
        url.as_str(),
        "https://huggingface.co/org/model%3Fx=1/resolve/main/config.json"
    );
}

#[tokio::test]
async fn test_slow_download_is_not_cut_short() {
    let hub = MockHub::spawn_trickling(
        vec![HubRepo::new("org/model").file("config.json", "0123456789")],
        Duration::from_millis(300),
    )
    .await;
    let client = HubClient::new(&HubConfig {
        timeout: Duration::from_secs(1),
        ..config_for(&hub)
    })
    .unwrap();
    let work_dir = tempdir().unwrap();

    // Three seconds in total, but never more than 300ms without data.
    let path = client
        .download(&HubModelId::from("org/model"), "config.json", work_dir.path())
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "0123456789");
}

#[tokio::test]
async fn test_stalled_download_times_out() {
    let hub = MockHub::spawn_trickling(
        vec![HubRepo::new("org/model").file("config.json", "{}")],
        Duration::from_secs(5),
    )
    .await;
    let client = HubClient::new(&HubConfig {
        timeout: Duration::from_millis(200),
        ..config_for(&hub)
    })
    .unwrap();
    let work_dir = tempdir().unwrap();

    let err = client
        .download(&HubModelId::from("org/model"), "config.json", work_dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Stalled { .. }), "{err:?}");
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_tracer() {
    let hub = MockHub::spawn(vec![bert_ner_repo(NER_MODEL_ID).without("traced_pytorch_model.pt")]).await;
    let client = HubClient::new(&config_for(&hub)).unwrap();
    let work_dir = tempdir().unwrap();

    let model = TransformerModel::fetch(
        &client,
        HubModelId::from(NER_MODEL_ID),
        TaskType::Ner,
        work_dir.path(),
    )
    .await
    .unwrap();

    // $1 is the source directory, $2 the task type and $3 the output path.
    let script = r#"test -f "$1/config.json" && test "$2" = ner && printf 'PK\003\004traced' > "$3""#;
    let tracer = CommandTracer::new(
        "sh".to_string(),
        vec!["-c".to_string(), script.to_string(), "tracer".to_string()],
    );
    let artifacts = model.save(work_dir.path(), &tracer).await.unwrap();
    assert_eq!(
        std::fs::read(artifacts.model_path).unwrap(),
        b"PK\x03\x04traced"
    );

    let failing = CommandTracer::new("sh".to_string(), vec!["-c".to_string(), "exit 3".to_string()]);
    let result = model.save(work_dir.path(), &failing).await;
    assert!(matches!(result, Err(HubError::TracerFailed { .. })));
}

#[test]
fn test_zero_shot_requires_entailment_label() {
    let mut model = ModelConfig {
        model_type: Some("bert".to_string()),
        architectures: vec!["BertForSequenceClassification".to_string()],
        id2label: [("0", "contradiction"), ("1", "neutral")]
            .into_iter()
            .map(|(id, label)| (id.to_string(), label.to_string()))
            .collect(),
        ..Default::default()
    };
    assert!(matches!(
        architecture::check_task(TaskType::ZeroShotClassification, &model),
        Err(HubError::InvalidConfig(_))
    ));

    model.id2label.insert("2".to_string(), "ENTAILMENT".to_string());
    architecture::check_task(TaskType::ZeroShotClassification, &model).unwrap();

    let task_config =
        architecture::task_config(TaskType::ZeroShotClassification, &model, &TokenizerConfig::default())
            .unwrap();
    assert_eq!(
        task_config.hypothesis_template.as_deref(),
        Some("This example is {}.")
    );
    assert_eq!(
        task_config.classification_labels.unwrap(),
        vec!["contradiction", "neutral", "ENTAILMENT"]
    );
}

#[test]
fn test_fill_mask_accepts_pretraining_heads() {
    let model = ModelConfig {
        architectures: vec!["ElectraForPreTraining".to_string()],
        ..Default::default()
    };
    architecture::check_task(TaskType::FillMask, &model).unwrap();
    assert!(architecture::check_task(TaskType::Ner, &model).is_err());
}

#[test]
fn test_unbounded_model_max_length_is_ignored() {
    let model = ModelConfig {
        max_position_embeddings: Some(384),
        ..Default::default()
    };
    let tokenizer = TokenizerConfig {
        model_max_length: Some(1e30),
        do_lower_case: Some(false),
        ..Default::default()
    };

    let task_config = architecture::task_config(TaskType::TextEmbedding, &model, &tokenizer).unwrap();
    assert_eq!(
        task_config.tokenization,
        Tokenization::Bert(BertTokenization {
            do_lower_case: false,
            max_sequence_length: Some(384),
        })
    );
}

#[test]
fn test_non_numeric_label_ids_are_rejected() {
    let model = ModelConfig {
        id2label: [("first".to_string(), "A".to_string())].into_iter().collect(),
        ..Default::default()
    };
    assert!(matches!(
        architecture::classification_labels(&model),
        Err(HubError::InvalidConfig(_))
    ));
}

#[test]
fn test_parse_vocab_txt_handles_crlf() {
    assert_eq!(
        parse_vocab_txt("[PAD]\r\nhello\r\nworld\n").vocabulary,
        vec!["[PAD]", "hello", "world"]
    );
}
