use super::*;
use crate::testing::{request_failed, FakePullContext, FakeUpdater};
use std::time::Duration;

fn fast_poll() -> PollConfig {
    PollConfig::new(3, Duration::ZERO)
}

#[tokio::test]
async fn test_behind_pull_request_is_updated_once() {
    let ctx = FakePullContext::default();
    let updater = FakeUpdater::new(vec![Ok(4)], vec![]);

    let outcome = run_update(&ctx, &updater, "main", &fast_poll()).await;

    assert_eq!(outcome, UpdateOutcome::Updated);
    assert_eq!(*updater.forwards.lock().unwrap(), vec!["main".to_string()]);
}

#[tokio::test]
async fn test_up_to_date_pull_request_is_left_alone() {
    let ctx = FakePullContext::default();
    let updater = FakeUpdater::new(vec![Ok(0)], vec![]);

    let outcome = run_update(&ctx, &updater, "main", &fast_poll()).await;

    assert_eq!(outcome, UpdateOutcome::UpToDate);
    assert_eq!(updater.forward_count(), 0);
}

#[tokio::test]
async fn test_fork_is_never_updated() {
    let ctx = FakePullContext {
        head: "contributor:feature/widgets".to_string(),
        ..Default::default()
    };
    let updater = FakeUpdater::new(vec![Ok(4)], vec![]);

    let outcome = run_update(&ctx, &updater, "main", &fast_poll()).await;

    assert_eq!(outcome, UpdateOutcome::Fork);
    assert_eq!(updater.compare_count(), 0);
}

#[tokio::test]
async fn test_conflict_stops_the_loop() {
    let ctx = FakePullContext::default();
    let updater = FakeUpdater::new(vec![Ok(2), Ok(2)], vec![Err(request_failed(409))]);

    let outcome = run_update(&ctx, &updater, "main", &fast_poll()).await;

    assert_eq!(outcome, UpdateOutcome::Conflict);
    assert_eq!(updater.forward_count(), 1);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let ctx = FakePullContext::default();
    let updater = FakeUpdater::new(
        vec![Err(request_failed(502)), Ok(1), Ok(1)],
        vec![Err(request_failed(500))],
    );

    let outcome = run_update(&ctx, &updater, "main", &fast_poll()).await;

    assert_eq!(outcome, UpdateOutcome::Updated);
    assert_eq!(updater.compare_count(), 3);
    assert_eq!(updater.forward_count(), 2);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let ctx = FakePullContext::default();
    let updater = FakeUpdater::new(
        vec![
            Err(request_failed(500)),
            Err(request_failed(500)),
            Err(request_failed(500)),
        ],
        vec![],
    );

    let outcome = run_update(&ctx, &updater, "main", &fast_poll()).await;

    assert_eq!(outcome, UpdateOutcome::GaveUp);
    assert_eq!(updater.compare_count(), 3);
    assert_eq!(updater.forward_count(), 0);
}

#[tokio::test]
async fn test_update_pr_runs_detached() {
    let ctx: Arc<dyn PullContext> = Arc::new(FakePullContext::default());
    let updater = Arc::new(FakeUpdater::new(vec![Ok(1)], vec![]));

    let outcome = update_pr(ctx, updater.clone(), "develop".to_string(), fast_poll())
        .await
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::Updated);
    assert_eq!(*updater.forwards.lock().unwrap(), vec!["develop".to_string()]);
}

mod github_updater_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_updater(mock_server: &MockServer) -> GitHubUpdater {
        let octocrab =
            github_client::create_token_client("test-token", Some(&mock_server.uri())).unwrap();
        GitHubUpdater::new(GitHubClient::new(octocrab))
    }

    #[tokio::test]
    async fn test_behind_by_compares_against_the_current_head() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/pulls/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "number": 42,
                "title": "Add widget support",
                "state": "open",
                "head": { "ref": "feature/widgets", "sha": "newer-sha" },
                "base": { "ref": "main", "sha": "def456" }
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/compare/main...newer-sha"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "behind",
                "ahead_by": 0,
                "behind_by": 5
            })))
            .mount(&mock_server)
            .await;

        let updater = create_updater(&mock_server);

        let behind = updater
            .behind_by(&FakePullContext::default(), "main")
            .await
            .unwrap();

        assert_eq!(behind, 5);
    }

    #[tokio::test]
    async fn test_merge_forward_merges_base_into_head() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/merges"))
            .and(body_json(json!({ "base": "feature/widgets", "head": "main" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": "merge-sha" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let updater = create_updater(&mock_server);

        updater
            .merge_forward(&FakePullContext::default(), "main")
            .await
            .unwrap();
    }
}
