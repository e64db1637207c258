//! Mock identity directory using wiremock for integration testing.
//!
//! Each test starts its own server; nothing is shared between tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use xavyo_directory_client::{
    CredentialTokenSource, DirectoryClient, MappingPolicy, RetryPolicy,
};

pub const TEST_TOKEN: &str = "test-token-123";

/// A mock directory service with helpers for the account endpoints.
pub struct MockDirectoryServer {
    server: MockServer,
}

impl MockDirectoryServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// The underlying wiremock server, for custom mocks and request inspection.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// A client with bearer auth and zero-delay retries.
    pub fn client(&self) -> DirectoryClient {
        self.client_with_token(TEST_TOKEN)
    }

    pub fn client_with_token(&self, token: &str) -> DirectoryClient {
        DirectoryClient::with_http_client(
            self.uri(),
            Arc::new(CredentialTokenSource::bearer(token)),
            reqwest::Client::new(),
        )
        .with_retry_policy(RetryPolicy::new(3, 0))
    }

    pub fn partial_client(&self) -> DirectoryClient {
        self.client().with_mapping_policy(MappingPolicy::AllowPartial)
    }

    /// Number of requests received on `endpoint`.
    pub async fn request_count(&self, endpoint: &str) -> usize {
        let target = format!("/{endpoint}");
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == target)
            .count()
    }

    /// JSON bodies received on `endpoint`, in arrival order.
    pub async fn request_bodies(&self, endpoint: &str) -> Vec<Value> {
        let target = format!("/{endpoint}");
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == target)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub async fn mock_get_account_info(&self, users: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path("/getAccountInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "identitytoolkit#GetAccountInfoResponse",
                "users": users,
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Mount one listing page. `token` is the cursor the request must carry;
    /// `None` matches the first request of a listing.
    pub async fn mock_download_page(&self, token: Option<&str>, users: Vec<Value>, next: Option<&str>) {
        let mut body = json!({
            "kind": "identitytoolkit#DownloadAccountResponse",
            "users": users,
        });
        if let Some(next) = next {
            body["nextPageToken"] = json!(next);
        }

        let mock = Mock::given(method("POST")).and(path("/downloadAccount"));
        let mock = match token {
            Some(token) => mock.and(body_partial_json(json!({ "nextPageToken": token }))),
            None => mock.and(|req: &Request| {
                serde_json::from_slice::<Value>(&req.body)
                    .map(|body| body.get("nextPageToken").is_none())
                    .unwrap_or(false)
            }),
        };
        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn mock_signup_new_user(&self, uid: &str) {
        Mock::given(method("POST"))
            .and(path("/signupNewUser"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "identitytoolkit#SignupNewUserResponse",
                "localId": uid,
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_set_account_info(&self, uid: &str) {
        Mock::given(method("POST"))
            .and(path("/setAccountInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "identitytoolkit#SetAccountInfoResponse",
                "localId": uid,
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_delete_account(&self) {
        Mock::given(method("POST"))
            .and(path("/deleteAccount"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "identitytoolkit#DeleteAccountResponse",
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount an upload response rejecting the given batch-relative indices.
    pub async fn mock_upload_account(&self, rejected: &[(usize, &str)]) {
        let errors: Vec<Value> = rejected
            .iter()
            .map(|(index, message)| json!({ "index": index, "message": message }))
            .collect();
        let mut body = json!({ "kind": "identitytoolkit#UploadAccountResponse" });
        if !errors.is_empty() {
            body["error"] = Value::Array(errors);
        }
        Mock::given(method("POST"))
            .and(path("/uploadAccount"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Mount a service error envelope on `endpoint`.
    pub async fn mock_service_error(&self, endpoint: &str, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/{endpoint}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": { "code": status, "message": message }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a bare status with no envelope on `endpoint`.
    pub async fn mock_status(&self, endpoint: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("/{endpoint}")))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}
