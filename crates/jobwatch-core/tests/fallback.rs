//! Opening a log object never fails: whatever goes wrong on the remote side,
//! the log continues from its compiled-in template and writes locally.

use std::sync::Arc;

use jobwatch_core::JobwatchConfig;
use jobwatch_core::domain::{JobStatus, StatusRecord};
use jobwatch_core::impls::InMemoryObjectStore;
use jobwatch_core::log::{Certificate, LogDocument, StatusLog};
use jobwatch_core::sink::{SinkMode, WriteSink};
use rstest::rstest;

const CERT_URI: &str = "s3://lab/grp/results/job1/certificate.txt";

fn config(dir: &tempfile::TempDir) -> JobwatchConfig {
    JobwatchConfig {
        fallback_dir: dir.path().join("logs"),
        ..JobwatchConfig::default()
    }
}

#[rstest]
#[case::wrong_scheme("gs://lab/grp/results/job1/certificate.txt")]
#[case::no_key("s3://lab")]
#[case::not_a_uri("certificate.txt")]
#[case::missing_object("s3://lab/grp/results/job2/certificate.txt")]
#[tokio::test]
async fn certificate_falls_back_to_template(#[case] uri: &str) {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let store = Arc::new(InMemoryObjectStore::new());

    let log = StatusLog::<Certificate>::open(store, uri, &config).await;

    assert!(!log.is_remote());
    assert_eq!(log.render(), Certificate::default_template());
    assert!(
        matches!(log.sink(), WriteSink::Local { path } if *path == config.certificate_fallback())
    );
}

#[tokio::test]
async fn offline_store_falls_back_for_both_documents() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("lab", "grp/results/job1/certificate.txt", Certificate::default_template());
    store.set_offline(true);

    let cert = StatusLog::<Certificate>::open(store.clone(), CERT_URI, &config).await;
    let status = StatusLog::<StatusRecord>::open(
        store.clone(),
        "s3://lab/grp/results/job1/logs/DATASET_NAME:a.bam_STATUS.txt",
        &config,
    )
    .await;

    assert_eq!(cert.sink().mode(), SinkMode::Local);
    assert_eq!(status.sink().mode(), SinkMode::Local);
    assert_eq!(status.status, JobStatus::Initializing);
}

#[tokio::test]
async fn unparsable_remote_certificate_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("lab", "grp/results/job1/certificate.txt", "no dividers here\n");

    let log = StatusLog::<Certificate>::open(store, CERT_URI, &config).await;

    assert!(!log.is_remote());
    assert_eq!(log.render(), Certificate::default_template());
}

#[tokio::test]
async fn fallen_back_log_writes_to_fallback_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let store = Arc::new(InMemoryObjectStore::new());
    store.set_offline(true);

    let mut log = StatusLog::<Certificate>::open(store.clone(), CERT_URI, &config).await;
    log.update_instance_info(
        &jobwatch_core::log::InstanceInfo::named("a.bam").status("RUNNING"),
        0,
    )
    .unwrap();

    // the store coming back does not redirect a log that already fell back
    store.set_offline(false);
    log.write().await.unwrap();

    let written = std::fs::read_to_string(config.certificate_fallback()).unwrap();
    assert_eq!(written, log.render());
    assert!(store.text("lab", "grp/results/job1/certificate.txt").is_none());
}
