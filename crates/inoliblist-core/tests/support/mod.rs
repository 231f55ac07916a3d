//! Shared fixtures for the mock-server integration tests.

#![allow(dead_code)]

use std::time::Duration;

use inoliblist_core::{ClientConfig, GithubClient, Repository};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";

/// Client pointed at the mock server, with every delay set to zero
pub fn client_for(server: &MockServer) -> GithubClient {
    GithubClient::with_config(config_for(server)).unwrap()
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        api_base_url: format!("{}/api", server.uri()),
        raw_base_url: format!("{}/raw", server.uri()),
        token: Some(TOKEN.to_string()),
        max_retries: 2,
        retry_delay: Duration::ZERO,
        rate_limit_grace: Duration::ZERO,
        rate_limit_notification_interval: Duration::ZERO,
        ..ClientConfig::default()
    }
}

pub fn rate_limit_body(core: u64, search: u64) -> Value {
    json!({
        "resources": {
            "core": {"limit": 5000, "remaining": core, "reset": 0},
            "search": {"limit": 30, "remaining": search, "reset": 0}
        }
    })
}

/// Generous budget for both classes
pub async fn mount_rate_limit(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rate_limit_body(5000, 30)))
        .mount(server)
        .await;
}

pub fn repository_json(owner: &str, name: &str) -> Value {
    json!({
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "html_url": format!("https://github.com/{}/{}", owner, name),
        "owner": {"login": owner},
        "default_branch": "master",
        "archived": false,
        "fork": false,
        "pushed_at": "2018-06-01T12:00:00Z",
        "forks_count": 2,
        "stargazers_count": 10,
        "license": {"spdx_id": "MIT"},
        "language": "C++",
        "description": "A library",
        "topics": ["arduino"]
    })
}

pub fn repository(owner: &str, name: &str) -> Repository {
    serde_json::from_value(repository_json(owner, name)).unwrap()
}

pub fn file(name: &str) -> Value {
    json!({"name": name, "type": "file"})
}

pub fn dir(name: &str) -> Value {
    json!({"name": name, "type": "dir"})
}

/// Serve a one-page contents listing; `folder` is `None` for the root
pub async fn mount_listing(server: &MockServer, full_name: &str, folder: Option<&str>, entries: Vec<Value>) {
    let listing_path = match folder {
        Some(folder) => format!("/api/repos/{}/contents/{}", full_name, folder),
        None => format!("/api/repos/{}/contents", full_name),
    };
    Mock::given(method("GET"))
        .and(path(listing_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(entries)))
        .mount(server)
        .await;
}

/// Serve a raw file from the default branch; `folder` is `None` for the root
pub async fn mount_raw(server: &MockServer, full_name: &str, folder: Option<&str>, file: &str, body: &str) {
    let raw_path = match folder {
        Some(folder) => format!("/raw/{}/master/{}/{}", full_name, folder, file),
        None => format!("/raw/{}/master/{}", full_name, file),
    };
    Mock::given(method("GET"))
        .and(path(raw_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serve the commit status and a contributor list spanning `contributors` pages
pub async fn mount_repository_details(server: &MockServer, full_name: &str, state: &str, contributors: u32) {
    Mock::given(method("GET"))
        .and(path(format!("/api/repos/{}/commits/master/status", full_name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": state})))
        .mount(server)
        .await;

    let link = format!(
        "<{uri}/api/repos/{name}/contributors?per_page=1&page=2>; rel=\"next\", <{uri}/api/repos/{name}/contributors?per_page=1&page={last}>; rel=\"last\"",
        uri = server.uri(),
        name = full_name,
        last = contributors
    );
    Mock::given(method("GET"))
        .and(path(format!("/api/repos/{}/contributors", full_name)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", link.as_str())
                .set_body_json(json!([{"login": "someone"}])),
        )
        .mount(server)
        .await;
}
