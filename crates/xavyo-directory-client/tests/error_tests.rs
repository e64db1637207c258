//! Error handling tests: service error codes, transport classification,
//! read retries and the single-attempt rule for writes.

mod helpers;

use helpers::mock_directory_server::MockDirectoryServer;
use helpers::test_data::user;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};
use xavyo_directory_client::{
    DirectoryError, ImportUserRecord, RetryPolicy, UserCreate, UserImportOptions, UserUpdate,
};

// ═══════════════════════════════════════════════════════════════════════════
// Service error codes
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_not_found_envelope() {
    let mock = MockDirectoryServer::new().await;
    mock.mock_service_error("getAccountInfo", 400, "USER_NOT_FOUND")
        .await;

    let result = mock.client().get_user(&CancellationToken::new(), "x").await;
    assert!(matches!(result, Err(DirectoryError::UserNotFound(_))));
    // Service errors are never retried.
    assert_eq!(mock.request_count("getAccountInfo").await, 1);
}

#[tokio::test]
async fn test_create_error_codes_map_to_kinds() {
    let cases = [
        ("EMAIL_EXISTS", "email"),
        ("PHONE_NUMBER_EXISTS", "phone"),
        ("DUPLICATE_LOCAL_ID", "uid"),
        ("INVALID_LOCAL_ID", "invalid-uid"),
        ("WEAK_PASSWORD : Password should be at least 6 characters", "weak"),
    ];

    for (message, label) in cases {
        let mock = MockDirectoryServer::new().await;
        mock.mock_service_error("signupNewUser", 400, message).await;
        let err = mock
            .client()
            .create_user(
                &CancellationToken::new(),
                &UserCreate::new().email("a@example.com"),
            )
            .await
            .unwrap_err();

        let matched = match label {
            "email" => matches!(err, DirectoryError::EmailAlreadyExists(_)),
            "phone" => matches!(err, DirectoryError::PhoneNumberAlreadyExists(_)),
            "uid" => matches!(err, DirectoryError::UidAlreadyExists(_)),
            "invalid-uid" => matches!(err, DirectoryError::InvalidUid(_)),
            "weak" => {
                matches!(err, DirectoryError::WeakPassword(ref d) if d == "Password should be at least 6 characters")
            }
            _ => false,
        };
        assert!(matched, "{message} mapped to {err:?}");
        assert!(err.is_service_error());
    }
}

#[tokio::test]
async fn test_unknown_code_is_upstream() {
    let mock = MockDirectoryServer::new().await;
    mock.mock_service_error("setAccountInfo", 400, "TOO_MANY_ATTEMPTS_TRY_LATER : slow down")
        .await;

    let err = mock
        .client()
        .update_user(
            &CancellationToken::new(),
            "uid-1",
            &UserUpdate::new().display_name("x"),
        )
        .await
        .unwrap_err();
    match err {
        DirectoryError::Upstream {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, "TOO_MANY_ATTEMPTS_TRY_LATER");
            assert_eq!(message, "slow down");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_envelope_error_body_is_upstream_with_status() {
    let mock = MockDirectoryServer::new().await;
    mock.mock_status("deleteAccount", 404).await;

    match mock
        .client()
        .delete_user(&CancellationToken::new(), "uid-1")
        .await
    {
        Err(DirectoryError::Upstream { status, code, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(code, "404");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let mock = MockDirectoryServer::new().await;
    mock.mock_status("getAccountInfo", 401).await;

    let result = mock
        .client_with_token("expired")
        .get_user(&CancellationToken::new(), "uid-1")
        .await;
    assert!(matches!(result, Err(DirectoryError::Auth(_))));
    assert_eq!(mock.request_count("getAccountInfo").await, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Decode errors
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_malformed_envelope_is_decode_error() {
    let mock = MockDirectoryServer::new().await;
    Mock::given(method("POST"))
        .and(path("/getAccountInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"users\": [}"))
        .mount(mock.server())
        .await;

    let result = mock.client().get_user(&CancellationToken::new(), "u").await;
    assert!(matches!(result, Err(DirectoryError::Decode(_))));
    assert_eq!(mock.request_count("getAccountInfo").await, 1);
}

#[tokio::test]
async fn test_unexpected_kind_is_decode_error() {
    let mock = MockDirectoryServer::new().await;
    Mock::given(method("POST"))
        .and(path("/getAccountInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "identitytoolkit#DownloadAccountResponse",
            "users": [user("u")],
        })))
        .mount(mock.server())
        .await;

    let result = mock.client().get_user(&CancellationToken::new(), "u").await;
    assert!(matches!(result, Err(DirectoryError::Decode(_))));
}

#[tokio::test]
async fn test_login_before_creation_fails_record() {
    let mock = MockDirectoryServer::new().await;
    mock.mock_get_account_info(vec![json!({
        "localId": "u",
        "createdAt": "2000",
        "lastLoginAt": "1000",
    })])
    .await;

    match mock.client().get_user(&CancellationToken::new(), "u").await {
        Err(DirectoryError::FieldDecode { field, .. }) => assert_eq!(field, "lastLoginAt"),
        other => panic!("expected FieldDecode, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Retries
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_read_retried_after_unavailable() {
    let mock = MockDirectoryServer::new().await;
    Mock::given(method("POST"))
        .and(path("/getAccountInfo"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(mock.server())
        .await;
    mock.mock_get_account_info(vec![user("uid-1")]).await;

    let user = mock
        .client()
        .get_user(&CancellationToken::new(), "uid-1")
        .await
        .unwrap();
    assert_eq!(user.uid, "uid-1");
    assert_eq!(mock.request_count("getAccountInfo").await, 3);
}

#[tokio::test]
async fn test_listing_page_retried_after_bad_gateway() {
    let mock = MockDirectoryServer::new().await;
    Mock::given(method("POST"))
        .and(path("/downloadAccount"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(mock.server())
        .await;
    mock.mock_download_page(None, vec![user("a")], None).await;

    let mut pager = mock.client().list_users(None, None).unwrap();
    let page = pager
        .next_page(&CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.users.len(), 1);
    assert_eq!(mock.request_count("downloadAccount").await, 2);
}

#[tokio::test]
async fn test_read_retries_exhausted() {
    let mock = MockDirectoryServer::new().await;
    mock.mock_status("getAccountInfo", 504).await;

    let result = mock
        .client()
        .with_retry_policy(RetryPolicy::new(2, 0))
        .get_user(&CancellationToken::new(), "uid-1")
        .await;
    match result {
        Err(DirectoryError::MaxRetriesExceeded {
            attempts, source, ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*source, DirectoryError::Unavailable { status: 504, .. }));
        }
        other => panic!("expected MaxRetriesExceeded, got {other:?}"),
    }
    assert_eq!(mock.request_count("getAccountInfo").await, 3);
}

#[tokio::test]
async fn test_writes_are_not_retried() {
    let mock = MockDirectoryServer::new().await;
    mock.mock_status("signupNewUser", 503).await;
    mock.mock_status("setAccountInfo", 503).await;
    mock.mock_status("deleteAccount", 503).await;
    mock.mock_status("uploadAccount", 503).await;
    let client = mock.client();
    let cancel = CancellationToken::new();

    let create = client.create_user(&cancel, &UserCreate::new()).await;
    let update = client
        .update_user(&cancel, "u", &UserUpdate::new().disabled(true))
        .await;
    let delete = client.delete_user(&cancel, "u").await;
    let import = client
        .import_users(
            &cancel,
            &[ImportUserRecord::new("u")],
            &UserImportOptions::default(),
        )
        .await;

    for result in [create.map(|_| ()), update.map(|_| ()), delete, import.map(|_| ())] {
        assert!(matches!(
            result,
            Err(DirectoryError::Unavailable { status: 503, .. })
        ));
    }
    for endpoint in ["signupNewUser", "setAccountInfo", "deleteAccount", "uploadAccount"] {
        assert_eq!(mock.request_count(endpoint).await, 1, "{endpoint}");
    }
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    let mock = MockDirectoryServer::new().await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let client = mock.client();

    assert!(matches!(
        client.get_user(&cancel, "u").await,
        Err(DirectoryError::Cancelled)
    ));
    assert!(matches!(
        client.delete_user(&cancel, "u").await,
        Err(DirectoryError::Cancelled)
    ));
    assert!(mock.server().received_requests().await.unwrap().is_empty());
}
