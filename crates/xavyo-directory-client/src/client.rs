//! Identity directory HTTP client (reqwest-based).
//!
//! Every operation is a single `POST <base_url>/<endpoint>` with a JSON body.
//! Reads go through the [`RetryPolicy`]; writes are sent exactly once.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::auth::{authorize, TokenSource};
use crate::config::{validate_page_size, DirectoryConfig};
use crate::error::{DirectoryError, DirectoryResult};
use crate::import::{build_batches, ImportUserRecord, UserImportOptions, UserImportResult};
use crate::mapper::{MappedUsers, MappingPolicy, ResponseMapper};
use crate::model::{ExportedUserRecord, PageCursor, UserRecord};
use crate::pager::UserPager;
use crate::request::{UserCreate, UserLookup, UserUpdate};
use crate::retry::RetryPolicy;
use crate::validate;
use crate::wire::{
    endpoint, kind, DeleteAccountRequest, DownloadAccountRequest, DownloadAccountResponse,
    ErrorEnvelope, GetAccountInfoResponse, KindOnlyResponse, LocalIdResponse,
    UploadAccountError, UploadAccountRequest, UploadAccountResponse,
};

/// Client for the identity directory's account management API.
///
/// Cheap to clone; clones share the HTTP connection pool and token source.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    base_url: String,
    http_client: Client,
    token_source: Arc<dyn TokenSource>,
    retry: RetryPolicy,
    mapping_policy: MappingPolicy,
    default_page_size: u32,
}

impl DirectoryClient {
    /// Create a client from validated configuration.
    pub fn new(config: DirectoryConfig, token_source: Arc<dyn TokenSource>) -> DirectoryResult<Self> {
        config.validate()?;
        let http_client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                DirectoryError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            token_source,
            retry: config.retry,
            mapping_policy: config.mapping_policy,
            default_page_size: config.default_page_size,
        })
    }

    /// Create a client with a pre-built `reqwest::Client` and default policies.
    #[must_use]
    pub fn with_http_client(
        base_url: impl Into<String>,
        token_source: Arc<dyn TokenSource>,
        http_client: Client,
    ) -> Self {
        let defaults = DirectoryConfig::default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            token_source,
            retry: defaults.retry,
            mapping_policy: defaults.mapping_policy,
            default_page_size: defaults.default_page_size,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_mapping_policy(mut self, policy: MappingPolicy) -> Self {
        self.mapping_policy = policy;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn mapping_policy(&self) -> MappingPolicy {
        self.mapping_policy
    }

    // ── Lookups ───────────────────────────────────────────────────────

    /// Fetch the user with the given uid.
    #[instrument(skip(self, cancel))]
    pub async fn get_user(&self, cancel: &CancellationToken, uid: &str) -> DirectoryResult<UserRecord> {
        self.get_user_by(cancel, &UserLookup::Uid(uid.to_string()))
            .await
    }

    /// Fetch the user with the given email address.
    #[instrument(skip(self, cancel))]
    pub async fn get_user_by_email(
        &self,
        cancel: &CancellationToken,
        email: &str,
    ) -> DirectoryResult<UserRecord> {
        self.get_user_by(cancel, &UserLookup::Email(email.to_string()))
            .await
    }

    /// Fetch the user with the given E.164 phone number.
    #[instrument(skip(self, cancel))]
    pub async fn get_user_by_phone_number(
        &self,
        cancel: &CancellationToken,
        phone_number: &str,
    ) -> DirectoryResult<UserRecord> {
        self.get_user_by(cancel, &UserLookup::PhoneNumber(phone_number.to_string()))
            .await
    }

    /// Point lookup by any identifier.
    ///
    /// No match is [`DirectoryError::UserNotFound`]; more than one is
    /// [`DirectoryError::AmbiguousResult`].
    pub async fn get_user_by(
        &self,
        cancel: &CancellationToken,
        lookup: &UserLookup,
    ) -> DirectoryResult<UserRecord> {
        let req = lookup.to_request()?;
        let response: GetAccountInfoResponse = self
            .retry
            .execute("get_account_info", cancel, || {
                self.post(endpoint::GET_ACCOUNT_INFO, &req, cancel)
            })
            .await?;
        ResponseMapper::expect_kind(response.kind.as_deref(), kind::GET_ACCOUNT_INFO)?;
        let user = ResponseMapper::single_user(&response.users, lookup.identifier())?;

        if cancel.is_cancelled() {
            return Err(DirectoryError::Cancelled);
        }
        Ok(user)
    }

    // ── Listing ───────────────────────────────────────────────────────

    /// Start a paged listing of every account, including password material.
    ///
    /// `page_size` defaults to the configured size and must be within
    /// `1..=1000`. Pass a cursor from [`UserPager::cursor`] to resume.
    pub fn list_users(
        &self,
        page_size: Option<u32>,
        start: Option<PageCursor>,
    ) -> DirectoryResult<UserPager> {
        let page_size = page_size.unwrap_or(self.default_page_size);
        validate_page_size(page_size)?;
        Ok(UserPager::new(self.clone(), page_size, start))
    }

    /// Fetch and map one listing page.
    pub(crate) async fn download_page(
        &self,
        cancel: &CancellationToken,
        page_size: u32,
        cursor: Option<&PageCursor>,
    ) -> DirectoryResult<(MappedUsers<ExportedUserRecord>, Option<PageCursor>)> {
        let req = DownloadAccountRequest {
            max_results: page_size,
            next_page_token: cursor.map(|c| c.as_str().to_string()),
        };
        let response: DownloadAccountResponse = self
            .retry
            .execute("download_account", cancel, || {
                self.post(endpoint::DOWNLOAD_ACCOUNT, &req, cancel)
            })
            .await?;
        ResponseMapper::expect_kind(response.kind.as_deref(), kind::DOWNLOAD_ACCOUNT)?;

        let mapped = ResponseMapper::map_exported_users(&response.users);
        if !mapped.failures.is_empty() {
            warn!(
                failed = mapped.failures.len(),
                total = mapped.total,
                "Listing page contains unmappable user records"
            );
        }
        Ok((mapped, PageCursor::from_token(response.next_page_token)))
    }

    // ── Writes ────────────────────────────────────────────────────────

    /// Create an account and return its uid.
    #[instrument(skip(self, cancel, user))]
    pub async fn create_user(
        &self,
        cancel: &CancellationToken,
        user: &UserCreate,
    ) -> DirectoryResult<String> {
        let req = user.to_request()?;
        let response: LocalIdResponse = self
            .post(endpoint::SIGNUP_NEW_USER, &req, cancel)
            .await?;
        ResponseMapper::expect_kind(response.kind.as_deref(), kind::SIGNUP_NEW_USER)?;
        response.local_id.filter(|id| !id.is_empty()).ok_or_else(|| {
            DirectoryError::Decode("signupNewUser response has no localId".to_string())
        })
    }

    /// Apply a partial update and return the uid of the updated account.
    #[instrument(skip(self, cancel, update))]
    pub async fn update_user(
        &self,
        cancel: &CancellationToken,
        uid: &str,
        update: &UserUpdate,
    ) -> DirectoryResult<String> {
        let req = update.to_request(uid)?;
        let response: LocalIdResponse = self
            .post(endpoint::SET_ACCOUNT_INFO, &req, cancel)
            .await?;
        ResponseMapper::expect_kind(response.kind.as_deref(), kind::SET_ACCOUNT_INFO)?;
        Ok(response
            .local_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uid.to_string()))
    }

    #[instrument(skip(self, cancel))]
    pub async fn delete_user(&self, cancel: &CancellationToken, uid: &str) -> DirectoryResult<()> {
        validate::uid(uid)?;
        let req = DeleteAccountRequest {
            local_id: uid.to_string(),
        };
        let response: KindOnlyResponse = self
            .post(endpoint::DELETE_ACCOUNT, &req, cancel)
            .await?;
        ResponseMapper::expect_kind(response.kind.as_deref(), kind::DELETE_ACCOUNT)
    }

    /// Replace the account's custom claims. An empty map removes them all.
    #[instrument(skip(self, cancel, claims))]
    pub async fn set_custom_user_claims(
        &self,
        cancel: &CancellationToken,
        uid: &str,
        claims: &Map<String, Value>,
    ) -> DirectoryResult<()> {
        let update = UserUpdate::new().custom_claims(claims.clone());
        self.update_user(cancel, uid, &update).await.map(|_| ())
    }

    /// Invalidate every refresh token issued to the account before now.
    #[instrument(skip(self, cancel))]
    pub async fn revoke_refresh_tokens(
        &self,
        cancel: &CancellationToken,
        uid: &str,
    ) -> DirectoryResult<()> {
        let update = UserUpdate::new().valid_since(chrono::Utc::now().timestamp());
        self.update_user(cancel, uid, &update).await.map(|_| ())
    }

    /// Import accounts in batches of at most
    /// [`MAX_IMPORT_BATCH_SIZE`](crate::import::MAX_IMPORT_BATCH_SIZE).
    ///
    /// Records are validated before any request is sent. Per-record
    /// rejections are reported in the result with indices into `records`.
    ///
    /// If the first batch fails as a whole, its error is returned. A later
    /// batch-level failure (including cancellation) stops the import and is
    /// reported through [`UserImportResult::aborted`]; earlier batches stay
    /// applied and every record from the failed batch onward is marked as
    /// not imported.
    #[instrument(skip(self, cancel, records, options), fields(records = records.len()))]
    pub async fn import_users(
        &self,
        cancel: &CancellationToken,
        records: &[ImportUserRecord],
        options: &UserImportOptions,
    ) -> DirectoryResult<UserImportResult> {
        let batches = build_batches(records, options)?;
        let mut result = UserImportResult::default();

        for (offset, len, req) in batches {
            let outcome = self
                .upload_batch(cancel, &req)
                .await
                .and_then(|rejected| result.record_batch(offset, len, rejected));
            match outcome {
                Ok(()) => debug!(offset, len, "Import batch uploaded"),
                Err(error) if offset == 0 => return Err(error),
                Err(error) => {
                    warn!(offset, error = %error, "Import stopped; remaining records not imported");
                    result.abort(offset, records.len(), error);
                    break;
                }
            }
        }

        Ok(result)
    }

    async fn upload_batch(
        &self,
        cancel: &CancellationToken,
        req: &UploadAccountRequest,
    ) -> DirectoryResult<Vec<UploadAccountError>> {
        let response: UploadAccountResponse = self
            .post(endpoint::UPLOAD_ACCOUNT, req, cancel)
            .await?;
        ResponseMapper::expect_kind(response.kind.as_deref(), kind::UPLOAD_ACCOUNT)?;
        Ok(response.error)
    }

    // ── Transport ─────────────────────────────────────────────────────

    /// One authorized round trip, raced against cancellation.
    async fn post<B, T>(
        &self,
        endpoint: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> DirectoryResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if cancel.is_cancelled() {
            return Err(DirectoryError::Cancelled);
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("Directory POST {}", url);

        let round_trip = async {
            let builder = authorize(self.token_source.as_ref(), self.http_client.post(&url)).await?;
            let response = builder.json(body).send().await?;
            self.handle_response(endpoint, response).await
        };

        tokio::select! {
            () = cancel.cancelled() => Err(DirectoryError::Cancelled),
            result = round_trip => result,
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> DirectoryResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            return serde_json::from_slice(&body).map_err(|e| {
                DirectoryError::Decode(format!("Failed to parse {endpoint} response: {e}"))
            });
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        match status {
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                Err(DirectoryError::Unavailable {
                    status: status.as_u16(),
                    detail: body,
                })
            }
            StatusCode::UNAUTHORIZED => {
                self.token_source.invalidate().await;
                Err(DirectoryError::Auth(format!(
                    "Authentication failed (401): {body}"
                )))
            }
            _ => Err(service_error(status, &body)),
        }
    }
}

/// Decode a non-2xx body as the service's error envelope.
fn service_error(status: StatusCode, body: &str) -> DirectoryError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let (code, detail) = envelope.error.code_and_detail();
            let status = envelope.error.code.unwrap_or(status.as_u16());
            DirectoryError::from_service_code(status, code, detail)
        }
        Err(_) => DirectoryError::Upstream {
            status: status.as_u16(),
            code: status.as_u16().to_string(),
            message: if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.to_string()
            },
        },
    }
}
