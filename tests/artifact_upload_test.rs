//! Artifact upload against a mock tracking service and object store

mod common;

use std::path::{Path, PathBuf};

use axum::http::Method;
use common::MockServer;
use mlflow_cli::artifact::{ArtifactRouter, UploadRequest};
use mlflow_cli::client::ApiClient;
use mlflow_cli::config::SecretString;
use mlflow_cli::experiment::{RunRecord, StorageKind};
use mlflow_cli::tracking::{HttpTracking, MemoryTracking};
use mlflow_cli::Error;
use tempfile::TempDir;

const CREDENTIALS_PATH: &str = "/api/2.0/mlflow/artifacts/credentials-for-write";

fn api(server: &MockServer, token: Option<&str>) -> ApiClient {
    ApiClient::with_http(
        reqwest::Client::new(),
        &server.base_url,
        token.map(SecretString::from),
    )
}

fn router_for(server: &MockServer, artifact_uri: &str, token: Option<&str>) -> ArtifactRouter<MemoryTracking> {
    let backend = MemoryTracking::new();
    backend.insert_run(RunRecord::builder("r1", "1").artifact_uri(artifact_uri).build());
    ArtifactRouter::new(backend, api(server, token))
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn credentials_body(server: &MockServer, path: &str, kind: &str, headers: &str) -> String {
    format!(
        r#"{{"credential_infos":[{{"run_id":"r1","path":"{path}","signed_uri":"{}","headers":{headers},"type":"{kind}"}}]}}"#,
        server.url(&format!("/bucket/{path}?X-Signature=abc123"))
    )
}

#[tokio::test]
async fn test_credentialed_upload_aws() {
    let server = MockServer::spawn().await;
    server.respond(
        Method::POST,
        CREDENTIALS_PATH,
        200,
        credentials_body(
            &server,
            "model.pkl",
            "AWS_PRESIGNED_URL",
            r#"[{"name":"x-amz-server-side-encryption","value":"AES256"}]"#,
        ),
    );
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "model.pkl", b"pickled-weights");

    let router = router_for(
        &server,
        "dbfs:/databricks/mlflow-tracking/1/r1/artifacts",
        Some("dapi-token"),
    );
    let record = router.upload("r1", &file, None).await.unwrap();

    assert_eq!(record.destination(), StorageKind::CredentialedStore);
    assert_eq!(record.artifact_path(), "model.pkl");
    assert_eq!(record.size_bytes(), 15);

    let exchange = server.requests_to(&Method::POST, CREDENTIALS_PATH);
    assert_eq!(exchange.len(), 1);
    assert_eq!(exchange[0].header("authorization"), Some("Bearer dapi-token"));
    assert_eq!(
        exchange[0].json(),
        serde_json::json!({"run_id": "r1", "path": ["model.pkl"]})
    );

    let puts = server.requests_to(&Method::PUT, "/bucket/model.pkl");
    assert_eq!(puts.len(), 1);
    let put = &puts[0];
    assert_eq!(put.query.as_deref(), Some("X-Signature=abc123"));
    assert_eq!(put.header("content-type"), Some("application/octet-stream"));
    assert_eq!(put.header("content-length"), Some("15"));
    assert_eq!(put.header("x-amz-server-side-encryption"), Some("AES256"));
    assert!(put.header("transfer-encoding").is_none());
    assert!(put.header("authorization").is_none());
    assert_eq!(put.body, b"pickled-weights");
}

#[tokio::test]
async fn test_credentialed_upload_azure_blob_type() {
    let server = MockServer::spawn().await;
    server.respond(
        Method::POST,
        CREDENTIALS_PATH,
        200,
        credentials_body(&server, "plots/loss.png", "AZURE_SAS_URI", "[]"),
    );
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "loss.png", b"png");

    let router = router_for(&server, "dbfs:/databricks/mlflow-tracking/1/r1/artifacts", Some("t"));
    router
        .upload("r1", &file, Some("plots/loss.png"))
        .await
        .unwrap();

    let put = &server.requests_to(&Method::PUT, "/bucket/plots/loss.png")[0];
    assert_eq!(put.header("x-ms-blob-type"), Some("BlockBlob"));
    assert_eq!(put.header("content-type"), Some("application/octet-stream"));
}

#[tokio::test]
async fn test_credentialed_upload_rejected_by_storage() {
    let server = MockServer::spawn().await;
    server.respond(
        Method::POST,
        CREDENTIALS_PATH,
        200,
        credentials_body(&server, "model.pkl", "GCP_SIGNED_URL", "[]"),
    );
    server.respond(Method::PUT, "/bucket/model.pkl", 403, "SignatureDoesNotMatch");
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "model.pkl", b"x");

    let router = router_for(&server, "dbfs:/databricks/mlflow-tracking/1/r1/artifacts", Some("t"));
    let err = router.upload("r1", &file, None).await.unwrap_err();

    assert!(matches!(
        err,
        Error::UploadRejected { status: 403, ref body } if body == "SignatureDoesNotMatch"
    ));
}

#[tokio::test]
async fn test_all_rejected_keeps_status_and_body() {
    let server = MockServer::spawn().await;
    server.respond(
        Method::PUT,
        "/api/2.0/mlflow-artifacts/artifacts/1/r1/artifacts/model.pkl",
        403,
        "AccessDenied",
    );
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "model.pkl", b"x");

    let router = router_for(&server, "mlflow-artifacts:/1/r1/artifacts", Some("t"));
    let err = router
        .upload_many("r1", &[UploadRequest::new(&file)])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("AccessDenied"));
    let Error::PartialFailure { failures, total } = err else {
        panic!("expected PartialFailure");
    };
    assert_eq!(total, 1);
    assert_eq!(failures[0].0, file);
    assert!(matches!(
        &failures[0].1,
        Error::UploadRejected { status: 403, body } if body == "AccessDenied"
    ));
}

#[tokio::test]
async fn test_empty_credentials_is_failure() {
    let server = MockServer::spawn().await;
    server.respond(Method::POST, CREDENTIALS_PATH, 200, r#"{"credential_infos":[]}"#);
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "model.pkl", b"x");

    let router = router_for(&server, "dbfs:/databricks/mlflow-tracking/1/r1/artifacts", Some("t"));
    let err = router.upload("r1", &file, None).await.unwrap_err();

    assert!(matches!(err, Error::MissingCredentials { ref path } if path == "model.pkl"));
    assert!(server.requests().iter().all(|r| r.method != Method::PUT));
}

#[tokio::test]
async fn test_credentialed_without_token_sends_nothing() {
    let server = MockServer::spawn().await;
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "model.pkl", b"x");

    let router = router_for(&server, "dbfs:/databricks/mlflow-tracking/1/r1/artifacts", None);
    let err = router.upload("r1", &file, None).await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_direct_store_upload() {
    let server = MockServer::spawn().await;
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "weights.bin", &[7u8; 1024]);

    let router = router_for(&server, "mlflow-artifacts:/1/r1/artifacts", Some("tok"));
    let record = router
        .upload("r1", &file, Some("models/v2/weights.bin"))
        .await
        .unwrap();

    assert_eq!(record.destination(), StorageKind::DirectStore);
    let puts = server.requests_to(
        &Method::PUT,
        "/api/2.0/mlflow-artifacts/artifacts/1/r1/artifacts/models/v2/weights.bin",
    );
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].header("content-length"), Some("1024"));
    assert_eq!(puts[0].header("content-type"), Some("application/octet-stream"));
    assert_eq!(puts[0].header("authorization"), Some("Bearer tok"));
    assert_eq!(puts[0].body.len(), 1024);
}

#[tokio::test]
async fn test_direct_store_rejected() {
    let server = MockServer::spawn().await;
    server.respond(
        Method::PUT,
        "/api/2.0/mlflow-artifacts/artifacts/1/r1/artifacts/a.txt",
        500,
        "disk full",
    );
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.txt", b"a");

    let router = router_for(&server, "mlflow-artifacts:/1/r1/artifacts", None);
    let err = router.upload("r1", &file, None).await.unwrap_err();
    assert!(matches!(err, Error::UploadRejected { status: 500, .. }));
}

#[tokio::test]
async fn test_three_files_second_missing() {
    let server = MockServer::spawn().await;
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "one.txt", b"1");
    let missing = dir.path().join("two.txt");
    let third = write_file(&dir, "three.txt", b"3");

    let router = router_for(&server, "mlflow-artifacts:/1/r1/artifacts", None);
    let report = router
        .upload_many(
            "r1",
            &[
                UploadRequest::new(&first),
                UploadRequest::new(&missing),
                UploadRequest::new(&third),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.succeeded().len(), 2);
    assert_eq!(report.total(), 3);
    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.failed()[0].0, missing);
    assert!(matches!(report.failed()[0].1, Error::NotFound { .. }));

    let uploaded: Vec<&str> = report.succeeded().iter().map(|r| r.artifact_path()).collect();
    assert_eq!(uploaded, ["one.txt", "three.txt"]);
    assert_eq!(
        server
            .requests_to(&Method::PUT, "/api/2.0/mlflow-artifacts/artifacts/1/r1/artifacts/three.txt")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_unsupported_scheme_before_any_request() {
    let server = MockServer::spawn().await;
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.txt", b"a");

    let router = router_for(&server, "s3://bucket/1/r1/artifacts", Some("t"));
    let err = router
        .upload_many("r1", &[UploadRequest::new(&file)])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedScheme { ref uri } if uri == "s3://bucket/1/r1/artifacts"));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_local_filesystem_upload() {
    let server = MockServer::spawn().await;
    let src = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let file = write_file(&src, "config.yaml", b"lr: 0.1\n");

    let router = router_for(&server, &format!("file://{}", root.path().display()), None);
    let record = router
        .upload("r1", &file, Some("configs/train.yaml"))
        .await
        .unwrap();

    assert_eq!(record.destination(), StorageKind::LocalFilesystem);
    assert_eq!(
        std::fs::read(root.path().join("configs/train.yaml")).unwrap(),
        b"lr: 0.1\n"
    );
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_artifact_root_resolved_over_rest() {
    let server = MockServer::spawn().await;
    server.respond(
        Method::GET,
        "/api/2.0/mlflow/runs/get",
        200,
        r#"{"run":{"info":{"run_id":"abc","experiment_id":"5","status":"RUNNING",
            "artifact_uri":"mlflow-artifacts:/5/abc/artifacts"}}}"#,
    );
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "report.html", b"<html/>");

    let api = api(&server, None);
    let router = ArtifactRouter::new(HttpTracking::new(api.clone()), api);
    router.upload("abc", Path::new(&file), None).await.unwrap();

    let gets = server.requests_to(&Method::GET, "/api/2.0/mlflow/runs/get");
    assert_eq!(gets[0].query.as_deref(), Some("run_id=abc"));
    assert_eq!(
        server
            .requests_to(&Method::PUT, "/api/2.0/mlflow-artifacts/artifacts/5/abc/artifacts/report.html")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_run_without_artifact_root() {
    let server = MockServer::spawn().await;
    server.respond(
        Method::GET,
        "/api/2.0/mlflow/runs/get",
        200,
        r#"{"run":{"info":{"run_id":"abc","artifact_uri":""}}}"#,
    );
    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "a.txt", b"a");

    let api = api(&server, None);
    let router = ArtifactRouter::new(HttpTracking::new(api.clone()), api);
    let err = router.upload("abc", &file, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArtifactUri { .. }));
}
