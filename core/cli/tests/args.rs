use std::time::Duration;

use assert_cmd::Command;
use clap::error::ErrorKind;
use clap::Parser;
use hubload_cli::args::{Args, TaskTypeArg};
use hubload_cli::config::Config;
use hubload_cluster::DEFAULT_CLUSTER_URL;
use hubload_hub::TracerConfig;
use hubload_test_utils::cluster::MockCluster;
use hubload_types::TaskType;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
    let mut argv = vec!["hubload"];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv)
}

#[test]
fn test_defaults() {
    let args = parse(&["--model-id", "bert-base-uncased", "--task-type", "fill_mask"]).unwrap();
    assert_eq!(args.model_id, "bert-base-uncased");
    assert_eq!(args.task_type, TaskTypeArg::FillMask);
    assert!(!args.start);
    assert_eq!(args.verbose, 0);

    let config = Config::resolve(&args).unwrap();
    assert_eq!(config.cluster.url.as_str(), format!("{DEFAULT_CLUSTER_URL}/"));
    assert_eq!(config.hub.endpoint.as_str(), "https://huggingface.co/");
    assert_eq!(config.hub.revision, "main");
}

#[test]
fn test_every_task_type_is_accepted() {
    let cases = [
        ("fill_mask", TaskType::FillMask),
        ("ner", TaskType::Ner),
        ("text_classification", TaskType::TextClassification),
        ("text_embedding", TaskType::TextEmbedding),
        ("zero_shot_classification", TaskType::ZeroShotClassification),
    ];
    for (name, expected) in cases {
        let args = parse(&["--model-id", "m", "--task-type", name]).unwrap();
        assert_eq!(TaskType::from(args.task_type), expected);
    }
}

#[test]
fn test_unknown_task_type_is_rejected() {
    let err = parse(&["--model-id", "m", "--task-type", "bogus"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn test_model_id_is_required() {
    let err = parse(&["--task-type", "ner"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn test_flags_override_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hubload.toml");
    std::fs::write(
        &path,
        r#"
[cluster]
url = "https://search.internal:9243"
verify_certs = true
start_timeout = "2m"
chunk_size = 1048576

[hub]
endpoint = "https://hub.internal"
revision = "v1"
"#,
    )
    .unwrap();

    let args = parse(&[
        "--model-id",
        "m",
        "--task-type",
        "ner",
        "--config",
        path.to_str().unwrap(),
        "--revision",
        "v2",
        "--tracer-cmd",
        "trace-model",
    ])
    .unwrap();
    let config = Config::resolve(&args).unwrap();

    assert_eq!(config.cluster.url.as_str(), "https://search.internal:9243/");
    assert!(config.cluster.verify_certs);
    assert_eq!(config.cluster.start_timeout, Duration::from_secs(120));
    assert_eq!(config.cluster.timeout, Duration::from_secs(300));
    assert_eq!(config.cluster.chunk_size, 1024 * 1024);
    assert_eq!(config.hub.endpoint.as_str(), "https://hub.internal/");
    assert_eq!(config.hub.revision, "v2");
    assert_eq!(
        config.hub.tracer,
        TracerConfig::Command {
            program: "trace-model".to_string(),
            args: Vec::new(),
        }
    );
}

#[test]
fn test_missing_config_file() {
    let args = parse(&[
        "--model-id",
        "m",
        "--task-type",
        "ner",
        "-c",
        "/nonexistent/hubload.toml",
    ])
    .unwrap();
    let err = Config::resolve(&args).unwrap_err();
    assert!(err.to_string().contains("Could not read config file"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_rejects_bogus_task_before_network() {
    let cluster = MockCluster::spawn().await;
    let url = cluster.url();

    tokio::task::spawn_blocking(move || {
        Command::cargo_bin("hubload")
            .unwrap()
            .args(["--url", url.as_str(), "--model-id", "m", "--task-type", "bogus"])
            .assert()
            .failure()
            .code(2);
    })
    .await
    .unwrap();

    assert!(cluster.calls().is_empty());
}
