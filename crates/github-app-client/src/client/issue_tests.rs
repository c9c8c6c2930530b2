//! Tests for issue operations.

use super::*;
use crate::test_fixtures::{
    issue_json, mount_token_exchange, pull_request_issue_json, test_client, TEST_INSTALLATION_ID,
};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod model_tests {
    use super::*;

    #[test]
    fn test_pull_request_marker_detected() {
        let issue: Issue = serde_json::from_value(pull_request_issue_json(1, "2024-01-01T00:00:00Z"))
            .expect("should deserialize");
        assert!(issue.is_pull_request());

        let issue: Issue =
            serde_json::from_value(issue_json(2, "2024-01-01T00:00:00Z")).expect("should deserialize");
        assert!(!issue.is_pull_request());
        assert_eq!(issue.author_login(), Some("alice"));
    }

    #[test]
    fn test_deleted_author_is_none() {
        let mut value = issue_json(3, "2024-01-01T00:00:00Z");
        value["user"] = serde_json::Value::Null;

        let issue: Issue = serde_json::from_value(value).expect("should deserialize");
        assert_eq!(issue.author_login(), None);
    }

    #[test]
    fn test_state_filter_parses_case_insensitively() {
        assert_eq!("ALL".parse::<StateFilter>().unwrap(), StateFilter::All);
        assert_eq!(" closed ".parse::<StateFilter>().unwrap(), StateFilter::Closed);
        assert!("merged".parse::<StateFilter>().is_err());
    }

    #[test]
    fn test_update_request_serializes_only_set_fields() {
        let request = UpdateIssueRequest {
            state: Some(IssueState::Closed),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "state": "closed" })
        );
    }
}

mod list_tests {
    use super::*;

    /// One pull-request-flagged entry and two issues yield the two issues.
    #[tokio::test]
    async fn test_list_repository_issues_drops_pull_requests() {
        let server = MockServer::start().await;
        mount_token_exchange(&server, TEST_INSTALLATION_ID).await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues"))
            .and(query_param("state", "open"))
            .and(query_param("per_page", "30"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                pull_request_issue_json(1, "2024-01-03T00:00:00Z"),
                issue_json(2, "2024-01-02T00:00:00Z"),
                issue_json(3, "2024-01-01T00:00:00Z"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let response = test_client(&server)
            .configured_installation()
            .list_repository_issues("octo", "repo", StateFilter::Open, 1, 30)
            .await
            .expect("listing should succeed");

        let ids: Vec<u64> = response.data.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_list_passes_state_and_page() {
        let server = MockServer::start().await;
        mount_token_exchange(&server, TEST_INSTALLATION_ID).await;

        Mock::given(method("GET"))
            .and(path("/repos/octo/repo/issues"))
            .and(query_param("state", "all"))
            .and(query_param("page", "3"))
            .and(query_param("sort", "updated"))
            .and(query_param("direction", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let response = test_client(&server)
            .configured_installation()
            .list_repository_issues("octo", "repo", StateFilter::All, 3, 10)
            .await
            .unwrap();

        assert!(response.data.is_empty());
    }
}

mod write_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_issue_posts_request() {
        let server = MockServer::start().await;
        mount_token_exchange(&server, TEST_INSTALLATION_ID).await;

        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/issues"))
            .and(body_json(serde_json::json!({
                "title": "Broken build",
                "body": "It fails",
                "labels": ["bug"]
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(issue_json(42, "2024-01-05T00:00:00Z")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = CreateIssueRequest {
            title: "Broken build".to_string(),
            body: Some("It fails".to_string()),
            labels: Some(vec!["bug".to_string()]),
            ..Default::default()
        };
        let response = test_client(&server)
            .configured_installation()
            .create_issue("octo", "repo", &request)
            .await
            .expect("create should succeed");

        assert_eq!(response.data.number, 42);
    }

    #[tokio::test]
    async fn test_update_issue_patches_issue() {
        let server = MockServer::start().await;
        mount_token_exchange(&server, TEST_INSTALLATION_ID).await;

        let mut closed = issue_json(7, "2024-01-06T00:00:00Z");
        closed["state"] = serde_json::json!("closed");

        Mock::given(method("PATCH"))
            .and(path("/repos/octo/repo/issues/7"))
            .and(body_json(serde_json::json!({ "state": "closed" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(closed))
            .expect(1)
            .mount(&server)
            .await;

        let request = UpdateIssueRequest {
            state: Some(IssueState::Closed),
            ..Default::default()
        };
        let response = test_client(&server)
            .configured_installation()
            .update_issue("octo", "repo", 7, &request)
            .await
            .expect("update should succeed");

        assert_eq!(response.data.state, IssueState::Closed);
    }

    #[tokio::test]
    async fn test_create_issue_validation_failure_uses_github_message() {
        let server = MockServer::start().await;
        mount_token_exchange(&server, TEST_INSTALLATION_ID).await;

        Mock::given(method("POST"))
            .and(path("/repos/octo/repo/issues"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "Validation Failed"
            })))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .configured_installation()
            .create_issue("octo", "repo", &CreateIssueRequest::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert_eq!(err.to_string(), "Validation Failed");
    }
}
