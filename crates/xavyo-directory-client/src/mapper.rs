//! Response mapper: builds canonical records from decoded response envelopes.
//!
//! Every element of a `users` sequence is mapped on its own. Failures are
//! collected per element so the caller can decide whether a partial result
//! is acceptable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{DirectoryError, DirectoryResult, ElementFailure};
use crate::model::{ExportedUserRecord, ProviderId, ProviderInfo, UserMetadata, UserRecord};
use crate::normalize::{
    decode_custom_claims, decode_flag, decode_millis, decode_seconds_as_millis, decode_text,
    encode_custom_claims, encode_flag, encode_millis, encode_millis_as_seconds, encode_text,
    unrecognized,
};
use crate::wire::{RawProviderInfo, RawUser};

/// What to do when some elements of a listing page fail to map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPolicy {
    /// Fail the whole page with [`DirectoryError::PartialMapping`].
    #[default]
    FailOnAny,
    /// Return the records that mapped, alongside the failures.
    AllowPartial,
}

/// Records mapped from one `users` sequence, plus any element failures.
#[derive(Debug)]
pub struct MappedUsers<T> {
    pub records: Vec<T>,
    pub failures: Vec<ElementFailure>,
    pub total: usize,
}

impl<T> MappedUsers<T> {
    /// Apply a [`MappingPolicy`]: under `FailOnAny` any failure fails the batch.
    pub fn with_policy(self, policy: MappingPolicy) -> DirectoryResult<Self> {
        if policy == MappingPolicy::FailOnAny && !self.failures.is_empty() {
            return Err(DirectoryError::PartialMapping {
                failures: self.failures,
                total: self.total,
            });
        }
        Ok(self)
    }
}

/// Maps between wire user objects and the canonical model.
pub struct ResponseMapper;

impl ResponseMapper {
    /// Check an envelope's `kind` discriminator when the service sent one.
    pub fn expect_kind(actual: Option<&str>, expected: &str) -> DirectoryResult<()> {
        match actual {
            Some(kind) if kind != expected => Err(DirectoryError::Decode(format!(
                "unexpected response kind `{kind}`, expected `{expected}`"
            ))),
            _ => Ok(()),
        }
    }

    /// Map the single user a point lookup must return.
    ///
    /// `identifier` names what was looked up and is used for the not-found
    /// message.
    pub fn single_user(users: &[Value], identifier: &str) -> DirectoryResult<UserRecord> {
        match users {
            [] => Err(DirectoryError::UserNotFound(identifier.to_string())),
            [only] => Self::map_user(only),
            many => Err(DirectoryError::AmbiguousResult { count: many.len() }),
        }
    }

    /// Map every element of a `users` sequence into exported records.
    #[must_use]
    pub fn map_exported_users(users: &[Value]) -> MappedUsers<ExportedUserRecord> {
        let mut records = Vec::with_capacity(users.len());
        let mut failures = Vec::new();

        for (index, value) in users.iter().enumerate() {
            match Self::map_exported(value) {
                Ok(record) => records.push(record),
                Err(error) => {
                    let uid = value
                        .get("localId")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    debug!(index, uid = ?uid, error = %error, "user element failed to map");
                    failures.push(ElementFailure {
                        index,
                        uid,
                        error: Box::new(error),
                    });
                }
            }
        }

        MappedUsers {
            records,
            failures,
            total: users.len(),
        }
    }

    /// Map one raw user element into a [`UserRecord`].
    pub fn map_user(value: &Value) -> DirectoryResult<UserRecord> {
        Self::map_exported(value).map(ExportedUserRecord::into_user)
    }

    /// Map one raw user element, keeping password material.
    pub fn map_exported(value: &Value) -> DirectoryResult<ExportedUserRecord> {
        let raw = RawUser::deserialize(value)?;
        Self::from_raw(raw)
    }

    /// Normalize a decoded wire user into the canonical model.
    pub fn from_raw(raw: RawUser) -> DirectoryResult<ExportedUserRecord> {
        let uid =
            decode_text("localId", raw.local_id.as_ref())?.ok_or_else(|| missing("localId"))?;

        let user_metadata = UserMetadata::new(
            decode_millis("createdAt", raw.created_at.as_ref())?,
            decode_millis("lastLoginAt", raw.last_login_at.as_ref())?,
        );
        if !user_metadata.is_consistent() {
            return Err(DirectoryError::FieldDecode {
                field: "lastLoginAt",
                representation: format!(
                    "{} precedes createdAt {}",
                    user_metadata.last_log_in_timestamp, user_metadata.creation_timestamp
                ),
            });
        }

        let mut user = UserRecord::new(uid);
        user.email = decode_text("email", raw.email.as_ref())?;
        user.email_verified = decode_flag("emailVerified", raw.email_verified.as_ref())?;
        user.phone_number = decode_text("phoneNumber", raw.phone_number.as_ref())?;
        user.display_name = decode_text("displayName", raw.display_name.as_ref())?;
        user.photo_url = decode_text("photoUrl", raw.photo_url.as_ref())?;
        user.disabled = decode_flag("disabled", raw.disabled.as_ref())?;
        user.custom_claims = decode_custom_claims("customAttributes", raw.custom_attributes.as_ref())?;
        user.user_metadata = user_metadata;
        user.tokens_valid_after_millis =
            decode_seconds_as_millis("validSince", raw.valid_since.as_ref())?;
        user.provider_user_info = Self::providers_from_raw(raw.provider_user_info.as_ref())?;

        let mut exported = ExportedUserRecord::new(user);
        exported.password_hash = decode_text("passwordHash", raw.password_hash.as_ref())?;
        exported.password_salt = decode_text("salt", raw.salt.as_ref())?;
        exported.password_updated_at =
            decode_millis("passwordUpdatedAt", raw.password_updated_at.as_ref())?;
        Ok(exported)
    }

    fn providers_from_raw(value: Option<&Value>) -> DirectoryResult<Vec<ProviderInfo>> {
        let entries = match value {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(entries)) => entries,
            Some(other) => return Err(unrecognized("providerUserInfo", other)),
        };
        entries
            .iter()
            .map(|entry| {
                let raw = RawProviderInfo::deserialize(entry)
                    .map_err(|_| unrecognized("providerUserInfo", entry))?;
                Self::provider_from_raw(&raw)
            })
            .collect()
    }

    fn provider_from_raw(raw: &RawProviderInfo) -> DirectoryResult<ProviderInfo> {
        let provider_id = decode_text("providerUserInfo.providerId", raw.provider_id.as_ref())?
            .ok_or_else(|| missing("providerUserInfo.providerId"))?;
        Ok(ProviderInfo {
            provider_id: ProviderId::from(provider_id.as_str()),
            display_name: decode_text("providerUserInfo.displayName", raw.display_name.as_ref())?,
            photo_url: decode_text("providerUserInfo.photoUrl", raw.photo_url.as_ref())?,
            email: decode_text("providerUserInfo.email", raw.email.as_ref())?,
            phone_number: decode_text("providerUserInfo.phoneNumber", raw.phone_number.as_ref())?,
            federated_id: decode_text("providerUserInfo.federatedId", raw.federated_id.as_ref())?,
            raw_id: decode_text("providerUserInfo.rawId", raw.raw_id.as_ref())?,
        })
    }

    /// Encode a canonical record back into its wire shape.
    pub fn to_raw(record: &ExportedUserRecord) -> DirectoryResult<RawUser> {
        let user = &record.user;
        Ok(RawUser {
            local_id: encode_text(Some(&user.uid)),
            email: encode_text(user.email.as_deref()),
            phone_number: encode_text(user.phone_number.as_deref()),
            email_verified: encode_flag(user.email_verified),
            display_name: encode_text(user.display_name.as_deref()),
            photo_url: encode_text(user.photo_url.as_deref()),
            password_hash: encode_text(record.password_hash.as_deref()),
            salt: encode_text(record.password_salt.as_deref()),
            disabled: encode_flag(user.disabled),
            created_at: encode_millis(user.user_metadata.creation_timestamp),
            last_login_at: encode_millis(user.user_metadata.last_log_in_timestamp),
            password_updated_at: encode_millis(record.password_updated_at),
            valid_since: encode_millis_as_seconds(user.tokens_valid_after_millis),
            custom_attributes: encode_custom_claims(&user.custom_claims)?.map(Value::String),
            provider_user_info: Self::providers_to_raw(&user.provider_user_info)?,
        })
    }

    /// Encode linked providers as the `providerUserInfo` array; none are omitted.
    pub(crate) fn providers_to_raw(infos: &[ProviderInfo]) -> DirectoryResult<Option<Value>> {
        if infos.is_empty() {
            return Ok(None);
        }
        let entries = infos
            .iter()
            .map(|info| {
                serde_json::to_value(RawProviderInfo {
                    provider_id: encode_text(Some(info.provider_id.as_str())),
                    display_name: encode_text(info.display_name.as_deref()),
                    photo_url: encode_text(info.photo_url.as_deref()),
                    email: encode_text(info.email.as_deref()),
                    phone_number: encode_text(info.phone_number.as_deref()),
                    federated_id: encode_text(info.federated_id.as_deref()),
                    raw_id: encode_text(info.raw_id.as_deref()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Value::Array(entries)))
    }
}

fn missing(field: &'static str) -> DirectoryError {
    DirectoryError::FieldDecode {
        field,
        representation: "missing or empty".to_string(),
    }
}
