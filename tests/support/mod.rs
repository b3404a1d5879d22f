//! Shared test utilities for serving a pull request from a Wiremock server.

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds the pull request URL for `number` on the mock server.
///
/// The locator derives `<server>/api/v3` as the API base for any host other
/// than `github.com`, so every mounted route lives under that prefix.
pub fn pull_request_url(server: &MockServer, number: u64) -> String {
    format!("{}/owner/repo/pull/{number}", server.uri())
}

/// A commit as listed by the pull request commits endpoint.
pub fn commit_json(sha: &str, parent: &str, message: &str) -> Value {
    json!({
        "sha": sha,
        "html_url": format!("https://example.invalid/commit/{sha}"),
        "commit": {
            "message": message,
            "author": { "name": "Octo Cat", "date": "2025-03-01T12:00:00Z" }
        },
        "parents": [{ "sha": parent }]
    })
}

/// A changed file as listed by the pull request files endpoint.
pub fn file_json(filename: &str, status: &str, patch: Option<&str>) -> Value {
    let mut file = json!({
        "filename": filename,
        "status": status,
        "additions": 1,
        "deletions": 1
    });
    if let (Some(body), Some(object)) = (patch, file.as_object_mut()) {
        object.insert("patch".to_owned(), Value::String(body.to_owned()));
    }
    file
}

/// Serves `body` with `status` for `GET /api/v3/repos/owner/repo{route}`.
pub async fn mount_json(server: &MockServer, route: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v3/repos/owner/repo{route}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Serves pull request `number` with its commits and files.
pub async fn mount_pull_request(
    server: &MockServer,
    number: u64,
    commits: Vec<Value>,
    files: Vec<Value>,
) {
    let details = json!({
        "number": number,
        "title": "Speed up lookups",
        "body": "Adds a cache in front of the store.",
        "html_url": format!("https://example.invalid/owner/repo/pull/{number}"),
        "user": { "login": "octocat" }
    });
    mount_json(server, &format!("/pulls/{number}"), 200, details).await;
    mount_json(
        server,
        &format!("/pulls/{number}/commits"),
        200,
        Value::Array(commits),
    )
    .await;
    mount_json(
        server,
        &format!("/pulls/{number}/files"),
        200,
        Value::Array(files),
    )
    .await;
}
