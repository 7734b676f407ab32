//! Unit tests for the github_client crate.

use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWNER: &str = "acme";
const REPO: &str = "widgets";

fn create_test_client(mock_server: &MockServer) -> GitHubClient {
    let octocrab = create_token_client("test-token", Some(&mock_server.uri())).unwrap();
    GitHubClient::new(octocrab)
}

fn github_error(message: &str) -> serde_json::Value {
    json!({
        "message": message,
        "documentation_url": "https://docs.github.com/rest"
    })
}

fn pull_request_body(number: u64) -> serde_json::Value {
    json!({
        "number": number,
        "title": "Add widget support",
        "body": "Adds widgets.",
        "state": "open",
        "mergeable": true,
        "draft": false,
        "head": { "ref": "feature/widgets", "sha": "abc123", "label": "acme:feature/widgets",
                  "repo": { "id": 1, "name": REPO, "full_name": "acme/widgets", "owner": { "login": OWNER } } },
        "base": { "ref": "main", "sha": "def456", "label": "acme:main",
                  "repo": { "id": 1, "name": REPO, "full_name": "acme/widgets", "owner": { "login": OWNER } } },
        "labels": []
    })
}

#[tokio::test]
async fn test_get_pull_request_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/pulls/42")))
        .respond_with(ResponseTemplate::new(200).set_body_json(pull_request_body(42)))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let pr = client.get_pull_request(OWNER, REPO, 42).await.unwrap();

    assert_eq!(pr.number, 42);
    assert_eq!(pr.mergeable, Some(true));
    assert_eq!(pr.head.ref_name, "feature/widgets");
}

#[tokio::test]
async fn test_get_pull_request_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/pulls/404")))
        .respond_with(ResponseTemplate::new(404).set_body_json(github_error("Not Found")))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.get_pull_request(OWNER, REPO, 404).await;

    assert!(matches!(result, Err(Error::NotFound)));
}

#[tokio::test]
async fn test_list_open_pull_requests_filters_by_base() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/pulls")))
        .and(query_param("state", "open"))
        .and(query_param("base", "feature/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([pull_request_body(7)])))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let prs = client
        .list_open_pull_requests(OWNER, REPO, Some("feature/widgets"))
        .await
        .unwrap();

    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0].number, 7);
}

#[tokio::test]
async fn test_get_required_status_checks_for_unprotected_branch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/repos/{OWNER}/{REPO}/branches/main/protection/required_status_checks"
        )))
        .respond_with(ResponseTemplate::new(404).set_body_json(github_error("Branch not protected")))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let checks = client
        .get_required_status_checks(OWNER, REPO, "main")
        .await
        .unwrap();

    assert!(checks.is_empty());
}

#[tokio::test]
async fn test_get_required_status_checks_returns_names() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/repos/{OWNER}/{REPO}/branches/main/protection/required_status_checks"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "strict": false,
            "contexts": ["ci"],
            "checks": [{ "context": "ci", "app_id": null }, { "context": "lint", "app_id": 3 }]
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let checks = client
        .get_required_status_checks(OWNER, REPO, "main")
        .await
        .unwrap();

    assert_eq!(checks, vec!["ci", "lint"]);
}

#[tokio::test]
async fn test_has_push_restrictions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/repos/{OWNER}/{REPO}/branches/main/protection/restrictions"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [], "teams": [], "apps": []
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/repos/{OWNER}/{REPO}/branches/develop/protection/restrictions"
        )))
        .respond_with(ResponseTemplate::new(404).set_body_json(github_error("Push restrictions not enabled")))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);

    assert!(client.has_push_restrictions(OWNER, REPO, "main").await.unwrap());
    assert!(!client
        .has_push_restrictions(OWNER, REPO, "develop")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_merge_pull_request_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/repos/{OWNER}/{REPO}/pulls/42/merge")))
        .and(body_json(json!({
            "commit_title": "Add widget support (#42)",
            "merge_method": "squash",
            "sha": "abc123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "merged-sha",
            "merged": true,
            "message": "Pull Request successfully merged"
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let request = models::MergeRequest {
        commit_title: Some("Add widget support (#42)".to_string()),
        commit_message: None,
        sha: Some("abc123".to_string()),
        merge_method: "squash".to_string(),
    };
    let result = client
        .merge_pull_request(OWNER, REPO, 42, &request)
        .await
        .unwrap();

    assert!(result.merged);
    assert_eq!(result.sha, "merged-sha");
}

#[tokio::test]
async fn test_merge_pull_request_method_not_allowed_keeps_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/repos/{OWNER}/{REPO}/pulls/42/merge")))
        .respond_with(
            ResponseTemplate::new(405)
                .set_body_json(github_error("At least 1 approving review is required")),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let request = models::MergeRequest {
        merge_method: "merge".to_string(),
        ..Default::default()
    };
    let error = client
        .merge_pull_request(OWNER, REPO, 42, &request)
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(405));
}

#[tokio::test]
async fn test_delete_reference_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/repos/{OWNER}/{REPO}/git/refs/heads/feature/widgets")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client
        .delete_reference(OWNER, REPO, "feature/widgets")
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_compare_commits_reports_behind_by() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/compare/main...abc123")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "diverged",
            "ahead_by": 2,
            "behind_by": 3
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let comparison = client
        .compare_commits(OWNER, REPO, "main", "abc123")
        .await
        .unwrap();

    assert_eq!(comparison.behind_by, 3);
    assert_eq!(comparison.ahead_by, 2);
}

#[tokio::test]
async fn test_merge_branches_conflict_keeps_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/repos/{OWNER}/{REPO}/merges")))
        .respond_with(ResponseTemplate::new(409).set_body_json(github_error("Merge conflict")))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let error = client
        .merge_branches(OWNER, REPO, "feature/widgets", "main")
        .await
        .unwrap_err();

    assert_eq!(error.status_code(), Some(409));
}

#[tokio::test]
async fn test_get_file_contents_decodes_base64() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/contents/.merge-roller.yml")))
        .and(query_param("ref", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "path": ".merge-roller.yml",
            // "version: 1\n" split across lines the way GitHub wraps base64 content
            "content": "dmVyc2lv\nbjogMQo=\n",
            "encoding": "base64"
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let contents = client
        .get_file_contents(OWNER, REPO, ".merge-roller.yml", "main")
        .await
        .unwrap();

    assert_eq!(contents.as_deref(), Some("version: 1\n"));
}

#[tokio::test]
async fn test_get_file_contents_missing_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/repos/{OWNER}/{REPO}/contents/.merge-roller.yml")))
        .respond_with(ResponseTemplate::new(404).set_body_json(github_error("Not Found")))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let contents = client
        .get_file_contents(OWNER, REPO, ".merge-roller.yml", "main")
        .await
        .unwrap();

    assert!(contents.is_none());
}

#[test]
fn test_create_app_client_rejects_invalid_key() {
    let result = create_app_client(12345, "not a pem key", None);

    assert!(matches!(result, Err(Error::AuthError(_))));
}
