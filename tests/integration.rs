use pixelhost::{
    models::{Config, SelectedFile, StrategyKind, TokenStatus, WorkflowState},
    storage::{FileStore, KeyValueStore, UPLOAD_COUNT_KEY},
    workflow::Workflow,
    Error,
};
use std::path::Path;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "ghp_integration";
const ISSUE_URL: &str = "https://github.com/octo/photos/issues/1";

fn config_for(server: &MockServer, store: &Path, strategy: &str) -> Config {
    let uri = server.uri();
    let store = store.to_string_lossy().to_string();
    let strategy = strategy.to_string();
    Config::from_lookup(move |key| match key {
        "GITHUB_OWNER" => Some("octo".to_string()),
        "GITHUB_REPO" => Some("photos".to_string()),
        "TOKEN_OBFUSCATION_KEY" => Some("integration-key".to_string()),
        "GITHUB_API_URL" => Some(uri.clone()),
        "GITHUB_TOKEN" => Some(TOKEN.to_string()),
        "UPLOAD_STRATEGY" => Some(strategy.clone()),
        "REQUEST_TIMEOUT_SECS" => Some("10".to_string()),
        "PIXELHOST_STORE" => Some(store.clone()),
        _ => None,
    })
    .unwrap()
}

/// A PNG signature followed by padding up to `len` bytes.
fn png_of_len(len: usize) -> SelectedFile {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(len, 0);
    SelectedFile::new("holiday.png", "image/png", bytes)
}

async fn mount_user(server: &MockServer, status: u16, expected_calls: u64) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "login": "x" }))
    } else {
        ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "message": "Bad credentials"
        }))
    };

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(template)
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_issue(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/repos/octo/photos/issues"))
        .and(body_partial_json(serde_json::json!({
            "labels": ["photo", "upload", "automated"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "html_url": ISSUE_URL
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn stored_count(store_path: &Path) -> Option<String> {
    FileStore::new(store_path).get(UPLOAD_COUNT_KEY).unwrap()
}

#[tokio::test]
async fn test_issue_upload_end_to_end() {
    let server = MockServer::start().await;
    mount_user(&server, 200, 1).await;
    mount_issue(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let workflow = Workflow::from_config(&config_for(&server, &store_path, "issue")).unwrap();

    workflow
        .handle_file_selected(png_of_len(2 * 1024 * 1024))
        .unwrap();
    let result = workflow.upload().await.unwrap();

    assert_eq!(result.url, ISSUE_URL);
    assert_eq!(result.strategy, StrategyKind::Issue);
    assert_eq!(workflow.state(), WorkflowState::Success);
    assert_eq!(workflow.upload_count(), 1);
    assert_eq!(stored_count(&store_path).as_deref(), Some("1"));
}

#[tokio::test]
async fn test_rejected_token_skips_issue_creation() {
    let server = MockServer::start().await;
    mount_user(&server, 401, 1).await;
    mount_issue(&server, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let workflow = Workflow::from_config(&config_for(&server, &store_path, "issue")).unwrap();

    workflow
        .handle_file_selected(png_of_len(2 * 1024 * 1024))
        .unwrap();
    let err = workflow.upload().await.unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    let snapshot = workflow.snapshot();
    assert_eq!(snapshot.state, WorkflowState::Error);
    assert_eq!(snapshot.token_status, TokenStatus::Invalid);
    assert_eq!(workflow.upload_count(), 0);
    assert_eq!(stored_count(&store_path), None);
}

#[tokio::test]
async fn test_release_upload_end_to_end() {
    let server = MockServer::start().await;
    mount_user(&server, 200, 1).await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/photos/releases"))
        .and(body_partial_json(serde_json::json!({ "draft": false })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "upload_url": format!(
                "{}/uploads/repos/octo/photos/releases/9/assets{{?name,label}}",
                server.uri()
            )
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/uploads/repos/octo/photos/releases/9/assets"))
        .and(query_param("name", "holiday.png"))
        .and(header("Content-Type", "image/png"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "browser_download_url": "https://github.com/octo/photos/releases/download/x/holiday.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let workflow = Workflow::from_config(&config_for(&server, &store_path, "release")).unwrap();

    workflow.handle_file_selected(png_of_len(4096)).unwrap();
    let result = workflow.upload().await.unwrap();

    assert_eq!(
        result.url,
        "https://github.com/octo/photos/releases/download/x/holiday.png"
    );
    assert_eq!(
        result.markdown,
        "![holiday.png](https://github.com/octo/photos/releases/download/x/holiday.png)"
    );
    assert_eq!(workflow.upload_count(), 1);
}

#[tokio::test]
async fn test_invalid_files_never_reach_the_network() {
    let server = MockServer::start().await;
    mount_user(&server, 200, 0).await;
    mount_issue(&server, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let workflow = Workflow::from_config(&config_for(&server, &store_path, "issue")).unwrap();

    let not_image = SelectedFile::new("notes.pdf", "application/pdf", b"%PDF-1.7".to_vec());
    assert!(matches!(
        workflow.handle_file_selected(not_image),
        Err(Error::Validation(_))
    ));

    let too_big = png_of_len(10 * 1024 * 1024 + 1);
    assert!(matches!(
        workflow.handle_file_selected(too_big),
        Err(Error::Validation(_))
    ));

    assert!(matches!(workflow.upload().await, Err(Error::Validation(_))));
    assert_eq!(workflow.state(), WorkflowState::Idle);
}

#[tokio::test]
async fn test_credential_persists_across_restarts() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let config = config_for(&server, &store_path, "issue");

    let first = Workflow::from_config(&config).unwrap();
    first.set_credential("ghp_saved");

    let raw = std::fs::read_to_string(&store_path).unwrap();
    assert!(!raw.contains("ghp_saved"));

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("Authorization", "Bearer ghp_saved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "login": "saved"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let second = Workflow::from_config(&config).unwrap();
    assert_eq!(second.test_credential().await, TokenStatus::Valid);
}

#[tokio::test]
async fn test_reset_after_success_and_retry_after_failure() {
    let server = MockServer::start().await;
    mount_user(&server, 200, 2).await;

    Mock::given(method("POST"))
        .and(path("/repos/octo/photos/issues"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_issue(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("store.json");
    let workflow = Workflow::from_config(&config_for(&server, &store_path, "issue")).unwrap();

    workflow.handle_file_selected(png_of_len(1024)).unwrap();
    let err = workflow.upload().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(
        workflow.snapshot().error.as_deref(),
        Some("GitHub API error (status 500): GitHub API returned status 500")
    );

    // Error keeps the file so the same selection can be retried.
    workflow.upload().await.unwrap();
    assert_eq!(workflow.state(), WorkflowState::Success);
    assert_eq!(workflow.upload_count(), 1);

    workflow.reset().unwrap();
    let snapshot = workflow.snapshot();
    assert_eq!(snapshot.state, WorkflowState::Idle);
    assert_eq!(snapshot.file_name, None);
}
