//! Canonical user record model.
//!
//! Records are read-only snapshots produced by the response mapper. They are
//! `#[non_exhaustive]` so that code outside this crate can inspect them but
//! cannot construct records that bypass the mapping invariants.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of an authentication provider linked to an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Password,
    Phone,
    Google,
    Facebook,
    Twitter,
    GitHub,
    /// Any provider this client has no dedicated variant for (SAML, OIDC, ...).
    Other(String),
}

impl ProviderId {
    /// The wire representation of the provider id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Password => "password",
            Self::Phone => "phone",
            Self::Google => "google.com",
            Self::Facebook => "facebook.com",
            Self::Twitter => "twitter.com",
            Self::GitHub => "github.com",
            Self::Other(id) => id,
        }
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        match value {
            "password" => Self::Password,
            "phone" => Self::Phone,
            "google.com" => Self::Google,
            "facebook.com" => Self::Facebook,
            "twitter.com" => Self::Twitter,
            "github.com" => Self::GitHub,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProviderId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// A provider identity linked to a user account.
///
/// Which fields are populated depends on the provider: a `phone` provider
/// typically carries only `phone_number` and `raw_id`. Missing fields are
/// `None`, never empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider_id: ProviderId,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub federated_id: Option<String>,
    pub raw_id: Option<String>,
}

impl ProviderInfo {
    /// A provider entry with only its id set.
    #[must_use]
    pub fn new(provider_id: impl Into<ProviderId>) -> Self {
        Self {
            provider_id: provider_id.into(),
            display_name: None,
            photo_url: None,
            email: None,
            phone_number: None,
            federated_id: None,
            raw_id: None,
        }
    }
}

/// Account lifecycle timestamps in epoch milliseconds; 0 means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct UserMetadata {
    pub creation_timestamp: i64,
    pub last_log_in_timestamp: i64,
}

impl UserMetadata {
    #[must_use]
    pub fn new(creation_timestamp: i64, last_log_in_timestamp: i64) -> Self {
        Self {
            creation_timestamp,
            last_log_in_timestamp,
        }
    }

    /// Whether the creation time precedes (or equals) the last sign-in,
    /// ignoring unknown values.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.creation_timestamp == 0
            || self.last_log_in_timestamp == 0
            || self.creation_timestamp <= self.last_log_in_timestamp
    }
}

/// A user account as held by the directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct UserRecord {
    /// Service-assigned identifier, never empty.
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub disabled: bool,
    pub custom_claims: Map<String, Value>,
    pub user_metadata: UserMetadata,
    /// Linked providers in the order the service returned them.
    pub provider_user_info: Vec<ProviderInfo>,
    /// Tokens issued before this instant (epoch ms) are rejected; 0 means unknown.
    pub tokens_valid_after_millis: i64,
}

impl UserRecord {
    pub(crate) fn new(uid: String) -> Self {
        Self {
            uid,
            email: None,
            email_verified: false,
            phone_number: None,
            display_name: None,
            photo_url: None,
            disabled: false,
            custom_claims: Map::new(),
            user_metadata: UserMetadata::default(),
            provider_user_info: Vec::new(),
            tokens_valid_after_millis: 0,
        }
    }

    /// Look up the linked provider entry with the given id.
    #[must_use]
    pub fn provider(&self, provider_id: &ProviderId) -> Option<&ProviderInfo> {
        self.provider_user_info
            .iter()
            .find(|p| &p.provider_id == provider_id)
    }
}

/// A user record as returned by account export, including password material.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ExportedUserRecord {
    pub user: UserRecord,
    /// Opaque, service-encoded password hash.
    pub password_hash: Option<String>,
    /// Opaque, service-encoded password salt.
    pub password_salt: Option<String>,
    /// Last password change (epoch ms); 0 means unknown.
    pub password_updated_at: i64,
}

impl ExportedUserRecord {
    pub(crate) fn new(user: UserRecord) -> Self {
        Self {
            user,
            password_hash: None,
            password_salt: None,
            password_updated_at: 0,
        }
    }

    /// Drop the password material and keep the plain record.
    #[must_use]
    pub fn into_user(self) -> UserRecord {
        self.user
    }
}

impl std::ops::Deref for ExportedUserRecord {
    type Target = UserRecord;

    fn deref(&self) -> &UserRecord {
        &self.user
    }
}

/// Continuation token for resuming a listing.
///
/// Only meaningful to the directory and listing that issued it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    /// Wrap a token, treating an empty string as "no cursor".
    #[must_use]
    pub fn from_token(token: Option<String>) -> Option<Self> {
        token.filter(|t| !t.is_empty()).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PageCursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PageCursor").field(&self.0).finish()
    }
}
