//! Integration tests for candidate processing, searches and the index walk.

use std::fs;
use std::time::Duration;

use inoliblist_core::{
    AuditLog, Catalog, ForkFilter, LicenseId, Repository, RowOutcome, SearchConfig, SearchQuery,
    SearchSegmenter, SearchWindow,
};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::{
    client_for, file, mount_listing, mount_rate_limit, mount_raw, mount_repository_details,
    repository, repository_json,
};

fn catalog_for(server: &MockServer, audit: AuditLog) -> Catalog {
    Catalog::new(client_for(server), audit).with_search_config(SearchConfig {
        max_retries: 3,
        retry_delay: Duration::ZERO,
    })
}

#[tokio::test]
async fn test_accepted_row_is_filled() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_raw(&server, "o/Servo", None, "library.properties", "name=Servo\nsentence=Control servos\n").await;
    mount_repository_details(&server, "o/Servo", "success", 7).await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    let outcome = catalog.populate_row(repository("o", "Servo"), true, false, false).await;
    assert_eq!(outcome, RowOutcome::Accepted);

    let record = &catalog.records()[0];
    assert_eq!(record.repository_url, "https://github.com/o/Servo");
    assert_eq!(record.library_path, "/");
    assert_eq!(record.contributors, Some(7));
    assert_eq!(record.status.as_deref(), Some("success"));
    assert_eq!(record.license, LicenseId::Spdx("MIT".to_string()));
    assert!(record.in_library_manager);
    let properties = record.properties.as_ref().unwrap();
    assert_eq!(properties.sentence.as_deref(), Some("Control servos"));
}

#[tokio::test]
async fn test_branch_with_slash_kept_in_paths() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_repository_details(&server, "o/Lib", "success", 1).await;
    Mock::given(method("GET"))
        .and(path("/raw/o/Lib/dev/next/library.properties"))
        .respond_with(ResponseTemplate::new(200).set_body_string("name=Lib\n"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/repos/o/Lib/commits/dev/next/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "failure"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut item = repository_json("o", "Lib");
    item["default_branch"] = json!("dev/next");
    let repository: Repository = serde_json::from_value(item).unwrap();

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    let outcome = catalog.populate_row(repository, false, true, false).await;
    assert_eq!(outcome, RowOutcome::Accepted);
    assert_eq!(catalog.records()[0].status.as_deref(), Some("failure"));
}

#[tokio::test]
async fn test_pending_status_written_blank() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_raw(&server, "o/Lib", None, "library.json", r#"{"name": "Lib", "keywords": ["a", "b"]}"#).await;
    mount_repository_details(&server, "o/Lib", "pending", 1).await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    catalog.populate_row(repository("o", "Lib"), false, true, false).await;

    let record = &catalog.records()[0];
    assert_eq!(record.status, None);
    let manifest = record.manifest.as_ref().unwrap();
    assert_eq!(manifest.keywords.as_deref(), Some("a, b"));
}

#[tokio::test]
async fn test_duplicates_skipped() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_raw(&server, "o/Lib", None, "library.properties", "name=Lib\n").await;
    mount_repository_details(&server, "o/Lib", "success", 1).await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    let first = catalog.populate_row(repository("o", "Lib"), true, false, false).await;
    let second = catalog.populate_row(repository("o", "Lib"), false, true, false).await;

    assert_eq!(first, RowOutcome::Accepted);
    assert_eq!(second, RowOutcome::Duplicate);
    assert_eq!(catalog.records().len(), 1);
    let stats = catalog.stats();
    assert_eq!((stats.sources, stats.non_blacklisted, stats.unique), (2, 2, 1));
}

#[tokio::test]
async fn test_deny_lists_apply_only_with_verification() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    Mock::given(method("GET"))
        .and(path_regex("^/raw/o/arduino-projects/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    let outcome = catalog
        .populate_row(repository("o", "arduino-projects"), false, true, true)
        .await;
    assert_eq!(outcome, RowOutcome::DeniedName);

    let mut particle: serde_json::Value = repository_json("o", "Photon");
    particle["topics"] = json!(["particle-photon"]);
    let outcome = catalog
        .populate_row(serde_json::from_value(particle).unwrap(), false, true, true)
        .await;
    assert_eq!(outcome, RowOutcome::DeniedTopic);

    let stats = catalog.stats();
    assert_eq!((stats.sources, stats.non_blacklisted, stats.unique), (2, 0, 0));
}

#[tokio::test]
async fn test_verification_failure_logged() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_listing(&server, "o/Robot", None, vec![file("robot.ino"), file("robot.h")]).await;

    let temp = tempfile::tempdir().unwrap();
    let audit = AuditLog::in_dir(temp.path()).unwrap();
    let log_path = audit.verification_failed_path().unwrap();
    let mut catalog = catalog_for(&server, audit);

    let outcome = catalog.populate_row(repository("o", "Robot"), false, true, true).await;
    assert_eq!(outcome, RowOutcome::FailedVerification);
    assert!(catalog.records().is_empty());
    assert_eq!(fs::read_to_string(log_path).unwrap(), "https://github.com/o/Robot\n");
}

#[tokio::test]
async fn test_unverified_candidate_kept_without_library() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_listing(&server, "o/Thing", None, vec![file("README.md")]).await;
    mount_repository_details(&server, "o/Thing", "failure", 2).await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    let outcome = catalog.populate_row(repository("o", "Thing"), false, false, true).await;

    assert_eq!(outcome, RowOutcome::Accepted);
    assert_eq!(catalog.records()[0].library_path, "");
}

#[tokio::test]
async fn test_fork_parent_fetched_when_missing() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_raw(&server, "me/Servo", None, "library.properties", "name=Servo\n").await;
    mount_repository_details(&server, "me/Servo", "success", 1).await;

    let mut full = repository_json("me", "Servo");
    full["fork"] = json!(true);
    full["parent"] = json!({"full_name": "arduino-libraries/Servo"});
    Mock::given(method("GET"))
        .and(path("/api/repos/me/Servo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full))
        .expect(1)
        .mount(&server)
        .await;

    let mut search_item = repository_json("me", "Servo");
    search_item["fork"] = json!(true);

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    catalog
        .populate_row(serde_json::from_value(search_item).unwrap(), false, false, false)
        .await;

    assert_eq!(
        catalog.records()[0].fork_of.as_deref(),
        Some("arduino-libraries/Servo")
    );
}

#[tokio::test]
async fn test_failed_status_request_skips_candidate() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_raw(&server, "o/Lib", None, "library.properties", "name=Lib\n").await;
    Mock::given(method("GET"))
        .and(path("/api/repos/o/Lib/commits/master/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    let outcome = catalog.populate_row(repository("o", "Lib"), false, false, false).await;

    assert_eq!(outcome, RowOutcome::Failed);
    assert!(catalog.records().is_empty());
}

fn single_window_query() -> SearchQuery {
    SearchQuery {
        query: "topic:arduino-library".to_string(),
        windows: vec![SearchWindow {
            start: None,
            end: None,
        }],
        fork: ForkFilter::True,
        verify: false,
        log_verification_failures: false,
    }
}

#[tokio::test]
async fn test_search_pages_processed_in_order() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    for name in ["A", "B"] {
        let full_name = format!("o/{}", name);
        mount_raw(&server, &full_name, None, "library.properties", "name=x\n").await;
        mount_repository_details(&server, &full_name, "success", 1).await;
    }

    let next = format!(
        "<{}/api/search/repositories?page=2>; rel=\"next\"",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/api/search/repositories"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next.as_str())
                .set_body_json(json!({
                    "total_count": 2,
                    "incomplete_results": false,
                    "items": [repository_json("o", "A")]
                })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search/repositories"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "incomplete_results": false,
            "items": [repository_json("o", "B")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    catalog.search_repositories(&single_window_query()).await;

    let urls: Vec<&str> = catalog
        .records()
        .iter()
        .map(|record| record.repository_url.as_str())
        .collect();
    assert_eq!(urls, ["https://github.com/o/A", "https://github.com/o/B"]);
}

#[tokio::test]
async fn test_window_short_of_total_count_is_reported() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1500,
            "incomplete_results": false,
            "items": [repository_json("o", "A")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let query = single_window_query();
    let config = SearchConfig {
        max_retries: 3,
        retry_delay: Duration::ZERO,
    };
    let mut segmenter = SearchSegmenter::new(&client, &query, config);

    let batch = segmenter.next_batch().await.unwrap();
    assert_eq!(batch.len(), 1);
    assert!(segmenter.next_batch().await.is_none());
    assert_eq!(segmenter.capped_windows(), query.windows.as_slice());
}

#[tokio::test]
async fn test_incomplete_search_page_retried() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_raw(&server, "o/A", None, "library.properties", "name=A\n").await;
    mount_repository_details(&server, "o/A", "success", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "incomplete_results": true,
            "items": []
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "incomplete_results": false,
            "items": [repository_json("o", "A")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    catalog.search_repositories(&single_window_query()).await;

    assert_eq!(catalog.records().len(), 1);
}

#[tokio::test]
async fn test_empty_search_retried_up_to_bound() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 0,
            "incomplete_results": false,
            "items": []
        })))
        .expect(3)
        .mount(&server)
        .await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    catalog.search_repositories(&single_window_query()).await;

    assert!(catalog.records().is_empty());
    assert_eq!(catalog.stats().sources, 0);
}

#[tokio::test]
async fn test_failed_window_skipped() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_raw(&server, "o/B", None, "library.properties", "name=B\n").await;
    mount_repository_details(&server, "o/B", "success", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/search/repositories"))
        .and(query_param("q", "topic:arduino-library created:<=2017-12-31 fork:true"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search/repositories"))
        .and(query_param("q", "topic:arduino-library created:>=2018-01-01 fork:true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "incomplete_results": false,
            "items": [repository_json("o", "B")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let boundary = chrono::NaiveDate::from_ymd_opt(2017, 12, 31).unwrap();
    let mut query = single_window_query();
    query.windows = vec![
        SearchWindow::until(boundary),
        SearchWindow::since(boundary.succ_opt().unwrap()),
    ];

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    catalog.search_repositories(&query).await;

    assert_eq!(catalog.records().len(), 1);
}

#[tokio::test]
async fn test_library_manager_index_walk() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;

    let index = json!({
        "libraries": [
            {"name": "A", "version": "1.0.0", "repository": "https://github.com/o/A.git"},
            {"name": "A", "version": "1.0.1", "repository": "https://github.com/o/A.git"},
            {"name": "C", "version": "0.1.0", "repository": "https://gitlab.com/o/C.git"},
            {"name": "B", "version": "2.0.0", "repository": "https://github.com/o/B.git"},
            {"name": "Gone", "version": "1.0.0", "repository": "https://github.com/o/Gone.git"}
        ]
    });
    Mock::given(method("GET"))
        .and(path("/library_index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(index))
        .mount(&server)
        .await;

    for name in ["A", "B"] {
        let full_name = format!("o/{}", name);
        Mock::given(method("GET"))
            .and(path(format!("/api/repos/{}", full_name)))
            .respond_with(ResponseTemplate::new(200).set_body_json(repository_json("o", name)))
            .expect(1)
            .mount(&server)
            .await;
        mount_raw(&server, &full_name, None, "library.properties", "name=x\n").await;
        mount_repository_details(&server, &full_name, "success", 1).await;
    }

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    catalog
        .process_library_manager_index(&format!("{}/library_index.json", server.uri()))
        .await
        .unwrap();

    assert_eq!(catalog.records().len(), 2);
    assert!(catalog.records().iter().all(|record| record.in_library_manager));
    assert_eq!(catalog.stats().sources, 2);
}

#[tokio::test]
async fn test_unreachable_index_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/library_index.json"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut catalog = catalog_for(&server, AuditLog::disabled());
    let result = catalog
        .process_library_manager_index(&format!("{}/library_index.json", server.uri()))
        .await;

    assert!(matches!(result, Err(inoliblist_core::CatalogError::Timeout(_))));
}
