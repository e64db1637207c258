//! Wire representations of directory requests and responses.
//!
//! User fields are kept as raw [`Value`]s here and interpreted by
//! [`crate::normalize`]; envelopes are decoded by serde directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response `kind` discriminators.
pub mod kind {
    pub const GET_ACCOUNT_INFO: &str = "identitytoolkit#GetAccountInfoResponse";
    pub const DOWNLOAD_ACCOUNT: &str = "identitytoolkit#DownloadAccountResponse";
    pub const UPLOAD_ACCOUNT: &str = "identitytoolkit#UploadAccountResponse";
    pub const SIGNUP_NEW_USER: &str = "identitytoolkit#SignupNewUserResponse";
    pub const SET_ACCOUNT_INFO: &str = "identitytoolkit#SetAccountInfoResponse";
    pub const DELETE_ACCOUNT: &str = "identitytoolkit#DeleteAccountResponse";
}

/// Endpoint paths relative to the configured base URL.
pub mod endpoint {
    pub const GET_ACCOUNT_INFO: &str = "getAccountInfo";
    pub const DOWNLOAD_ACCOUNT: &str = "downloadAccount";
    pub const UPLOAD_ACCOUNT: &str = "uploadAccount";
    pub const SIGNUP_NEW_USER: &str = "signupNewUser";
    pub const SET_ACCOUNT_INFO: &str = "setAccountInfo";
    pub const DELETE_ACCOUNT: &str = "deleteAccount";
}

/// A user object as sent and received by the service.
///
/// Every field is held as a raw [`Value`] so a malformed field is reported
/// by name when the user is mapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<Value>,
    /// `bool` or `"true"`/`"false"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<Value>,
    /// `bool` or `"true"`/`"false"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<Value>,
    /// Epoch ms as decimal string or (possibly fractional) number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    /// Epoch ms as decimal string or (possibly fractional) number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<Value>,
    /// Epoch ms as decimal string or (possibly fractional) number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_updated_at: Option<Value>,
    /// Epoch seconds as decimal string or number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_since: Option<Value>,
    /// JSON object encoded as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_attributes: Option<Value>,
    /// Array of [`RawProviderInfo`] objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_user_info: Option<Value>,
}

/// A linked provider entry as sent and received by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProviderInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federated_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<Value>,
}

// ── Responses ─────────────────────────────────────────────────────────

/// Envelope for lookups. Users stay raw so each one maps independently.
#[derive(Debug, Deserialize)]
pub struct GetAccountInfoResponse {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub users: Vec<Value>,
}

/// Envelope for one page of an account listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadAccountResponse {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub users: Vec<Value>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Per-record rejection reported by a bulk upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAccountError {
    pub index: usize,
    #[serde(default)]
    pub message: String,
}

/// Envelope for a bulk upload.
#[derive(Debug, Deserialize)]
pub struct UploadAccountResponse {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub error: Vec<UploadAccountError>,
}

/// Envelope for create and update operations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIdResponse {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub local_id: Option<String>,
}

/// Envelope for delete operations.
#[derive(Debug, Deserialize)]
pub struct KindOnlyResponse {
    #[serde(default)]
    pub kind: Option<String>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

impl ErrorBody {
    /// Split `"CODE : detail"` into its code and detail parts.
    #[must_use]
    pub fn code_and_detail(&self) -> (&str, &str) {
        split_service_message(&self.message)
    }
}

/// Split a service message of the form `"CODE : detail"`.
#[must_use]
pub fn split_service_message(message: &str) -> (&str, &str) {
    match message.split_once(':') {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    }
}

// ── Requests ──────────────────────────────────────────────────────────

/// Lookup payload; exactly one field is set.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAccountInfoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<Vec<String>>,
}

/// Listing payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadAccountRequest {
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Account creation payload; unset fields are omitted.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupNewUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// Partial update payload; only explicitly changed fields are present.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAccountInfoRequest {
    pub local_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attributes: Option<String>,
    /// Epoch seconds as a decimal string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_since: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete_attribute: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete_provider: Vec<String>,
}

/// Account deletion payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    pub local_id: String,
}

/// Bulk upload payload.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccountRequest {
    pub users: Vec<RawUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_cost: Option<u32>,
}
