//! Bulk account import: record builder, hash options, batching, and the
//! aggregate per-record result.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::{DirectoryError, DirectoryResult};
use crate::mapper::ResponseMapper;
use crate::model::ProviderInfo;
use crate::normalize::{encode_custom_claims, encode_flag, encode_millis, encode_text};
use crate::validate;
use crate::wire::{split_service_message, RawUser, UploadAccountError, UploadAccountRequest};

/// Largest number of records the service accepts in one upload.
pub const MAX_IMPORT_BATCH_SIZE: usize = 1000;

/// One account to import.
#[derive(Debug, Clone, Default)]
pub struct ImportUserRecord {
    uid: String,
    email: Option<String>,
    email_verified: Option<bool>,
    phone_number: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    disabled: Option<bool>,
    custom_claims: Map<String, Value>,
    providers: Vec<ProviderInfo>,
    password_hash: Option<Vec<u8>>,
    password_salt: Option<Vec<u8>>,
    creation_timestamp: i64,
    last_log_in_timestamp: i64,
}

impl ImportUserRecord {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn email_verified(mut self, verified: bool) -> Self {
        self.email_verified = Some(verified);
        self
    }

    #[must_use]
    pub fn phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    #[must_use]
    pub fn custom_claims(mut self, claims: Map<String, Value>) -> Self {
        self.custom_claims = claims;
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: ProviderInfo) -> Self {
        self.providers.push(provider);
        self
    }

    /// Raw password hash bytes, produced by the algorithm named in
    /// [`UserImportOptions::hash`].
    #[must_use]
    pub fn password_hash(mut self, hash: impl Into<Vec<u8>>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    #[must_use]
    pub fn password_salt(mut self, salt: impl Into<Vec<u8>>) -> Self {
        self.password_salt = Some(salt.into());
        self
    }

    /// Creation and last sign-in times in epoch ms (0 = unknown).
    #[must_use]
    pub fn metadata(mut self, creation_timestamp: i64, last_log_in_timestamp: i64) -> Self {
        self.creation_timestamp = creation_timestamp;
        self.last_log_in_timestamp = last_log_in_timestamp;
        self
    }

    fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    fn validate(&self) -> DirectoryResult<()> {
        validate::uid(&self.uid)?;
        if let Some(email) = &self.email {
            validate::email(email)?;
        }
        if let Some(phone) = &self.phone_number {
            validate::phone_number(phone)?;
        }
        if let Some(url) = &self.photo_url {
            validate::photo_url(url)?;
        }
        validate::custom_claims(&self.custom_claims)?;
        if self.creation_timestamp < 0 || self.last_log_in_timestamp < 0 {
            return Err(DirectoryError::InvalidArgument(
                "timestamps must be non-negative epoch milliseconds".to_string(),
            ));
        }
        if self.providers.iter().any(|p| p.provider_id.as_str().is_empty()) {
            return Err(DirectoryError::InvalidArgument(
                "provider id must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    fn to_raw(&self) -> DirectoryResult<RawUser> {
        Ok(RawUser {
            local_id: encode_text(Some(&self.uid)),
            email: encode_text(self.email.as_deref()),
            phone_number: encode_text(self.phone_number.as_deref()),
            email_verified: self.email_verified.and_then(encode_flag),
            display_name: encode_text(self.display_name.as_deref()),
            photo_url: encode_text(self.photo_url.as_deref()),
            password_hash: self
                .password_hash
                .as_ref()
                .map(|h| Value::String(URL_SAFE_NO_PAD.encode(h))),
            salt: self
                .password_salt
                .as_ref()
                .map(|s| Value::String(URL_SAFE_NO_PAD.encode(s))),
            disabled: self.disabled.and_then(encode_flag),
            created_at: encode_millis(self.creation_timestamp),
            last_login_at: encode_millis(self.last_log_in_timestamp),
            password_updated_at: None,
            valid_since: None,
            custom_attributes: encode_custom_claims(&self.custom_claims)?.map(Value::String),
            provider_user_info: ResponseMapper::providers_to_raw(&self.providers)?,
        })
    }
}

/// Password hashing scheme the imported hashes were produced with.
#[derive(Clone)]
pub enum UserImportHash {
    HmacSha256 { key: Vec<u8> },
    HmacSha512 { key: Vec<u8> },
    HmacMd5 { key: Vec<u8> },
    Sha256 { rounds: u32 },
    Sha512 { rounds: u32 },
    Md5 { rounds: u32 },
    Pbkdf2Sha256 { rounds: u32 },
    Bcrypt,
    Scrypt {
        key: Vec<u8>,
        salt_separator: Vec<u8>,
        rounds: u32,
        memory_cost: u32,
    },
}

impl std::fmt::Debug for UserImportHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Signer keys stay out of logs.
        f.debug_struct("UserImportHash")
            .field("algorithm", &self.algorithm_name())
            .finish_non_exhaustive()
    }
}

impl UserImportHash {
    fn algorithm_name(&self) -> &'static str {
        match self {
            Self::HmacSha256 { .. } => "HMAC_SHA256",
            Self::HmacSha512 { .. } => "HMAC_SHA512",
            Self::HmacMd5 { .. } => "HMAC_MD5",
            Self::Sha256 { .. } => "SHA256",
            Self::Sha512 { .. } => "SHA512",
            Self::Md5 { .. } => "MD5",
            Self::Pbkdf2Sha256 { .. } => "PBKDF2_SHA256",
            Self::Bcrypt => "BCRYPT",
            Self::Scrypt { .. } => "SCRYPT",
        }
    }

    fn apply(&self, req: &mut UploadAccountRequest) -> DirectoryResult<()> {
        req.hash_algorithm = Some(self.algorithm_name().to_string());
        match self {
            Self::HmacSha256 { key } | Self::HmacSha512 { key } | Self::HmacMd5 { key } => {
                if key.is_empty() {
                    return Err(DirectoryError::InvalidArgument(
                        "HMAC signer key must be non-empty".to_string(),
                    ));
                }
                req.signer_key = Some(URL_SAFE_NO_PAD.encode(key));
            }
            Self::Sha256 { rounds } | Self::Sha512 { rounds } | Self::Md5 { rounds } => {
                req.rounds = Some(check_range("rounds", *rounds, 0, 8192)?);
            }
            Self::Pbkdf2Sha256 { rounds } => {
                req.rounds = Some(check_range("rounds", *rounds, 0, 120_000)?);
            }
            Self::Bcrypt => {}
            Self::Scrypt {
                key,
                salt_separator,
                rounds,
                memory_cost,
            } => {
                if key.is_empty() {
                    return Err(DirectoryError::InvalidArgument(
                        "scrypt signer key must be non-empty".to_string(),
                    ));
                }
                req.signer_key = Some(URL_SAFE_NO_PAD.encode(key));
                req.salt_separator = Some(URL_SAFE_NO_PAD.encode(salt_separator));
                req.rounds = Some(check_range("rounds", *rounds, 1, 8)?);
                req.memory_cost = Some(check_range("memory_cost", *memory_cost, 1, 14)?);
            }
        }
        Ok(())
    }
}

fn check_range(name: &str, value: u32, min: u32, max: u32) -> DirectoryResult<u32> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(DirectoryError::InvalidArgument(format!(
            "{name} must be between {min} and {max}, got {value}"
        )))
    }
}

/// Options shared by every batch of an import.
#[derive(Debug, Clone, Default)]
pub struct UserImportOptions {
    /// Required when any record carries a password hash.
    pub hash: Option<UserImportHash>,
}

impl UserImportOptions {
    #[must_use]
    pub fn with_hash(hash: UserImportHash) -> Self {
        Self { hash: Some(hash) }
    }
}

/// Why a record was not imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImportFailureKind {
    UidAlreadyExists,
    EmailAlreadyExists,
    PhoneNumberAlreadyExists,
    InvalidUid,
    WeakPassword,
    /// Rejected with a code this client does not classify; see the reason.
    Rejected,
    /// The record's batch failed as a whole, or was never sent.
    NotImported,
}

impl ImportFailureKind {
    /// Classify a per-record rejection message of the form `CODE : detail`.
    #[must_use]
    pub fn from_reason(reason: &str) -> Self {
        let (code, detail) = split_service_message(reason);
        match DirectoryError::from_service_code(400, code, detail) {
            DirectoryError::UidAlreadyExists(_) => Self::UidAlreadyExists,
            DirectoryError::EmailAlreadyExists(_) => Self::EmailAlreadyExists,
            DirectoryError::PhoneNumberAlreadyExists(_) => Self::PhoneNumberAlreadyExists,
            DirectoryError::InvalidUid(_) => Self::InvalidUid,
            DirectoryError::WeakPassword(_) => Self::WeakPassword,
            _ => Self::Rejected,
        }
    }
}

/// A record that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportErrorInfo {
    /// Index into the caller's input slice.
    pub index: usize,
    pub kind: ImportFailureKind,
    /// The service's message, or the batch error for records not imported.
    pub reason: String,
}

/// Aggregate outcome of an import across all batches.
#[derive(Debug, Default)]
pub struct UserImportResult {
    pub success_count: usize,
    pub failure_count: usize,
    /// Failed records, ordered by input index.
    pub errors: Vec<ImportErrorInfo>,
    /// The batch-level error that stopped the import, if any. Records from
    /// the failed batch onward are reported as [`ImportFailureKind::NotImported`].
    pub aborted: Option<DirectoryError>,
}

impl UserImportResult {
    /// Whether the record at `index` of the input was imported.
    #[must_use]
    pub fn is_success(&self, index: usize) -> bool {
        index < self.success_count + self.failure_count
            && !self.errors.iter().any(|e| e.index == index)
    }

    /// Whether every batch was uploaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }

    /// Fold one batch's rejections into the aggregate, re-basing indices by
    /// the batch's offset into the input.
    ///
    /// Several rejections of the same record count as one failure. Nothing
    /// is recorded if any index falls outside the batch.
    pub(crate) fn record_batch(
        &mut self,
        offset: usize,
        batch_len: usize,
        rejected: Vec<UploadAccountError>,
    ) -> DirectoryResult<()> {
        let mut by_index: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for err in rejected {
            if err.index >= batch_len {
                return Err(DirectoryError::Decode(format!(
                    "upload error index {} outside batch of {batch_len}",
                    err.index
                )));
            }
            by_index.entry(err.index).or_default().push(err.message);
        }

        let failed = by_index.len();
        for (index, messages) in by_index {
            let kind = messages
                .first()
                .map_or(ImportFailureKind::Rejected, |m| ImportFailureKind::from_reason(m));
            self.errors.push(ImportErrorInfo {
                index: offset + index,
                kind,
                reason: messages.join("; "),
            });
        }
        self.failure_count += failed;
        self.success_count += batch_len - failed;
        Ok(())
    }

    /// Stop the import at `from`: records `from..total` are reported as not
    /// imported with `error` as their reason.
    pub(crate) fn abort(&mut self, from: usize, total: usize, error: DirectoryError) {
        let reason = error.to_string();
        self.errors.extend((from..total).map(|index| ImportErrorInfo {
            index,
            kind: ImportFailureKind::NotImported,
            reason: reason.clone(),
        }));
        self.failure_count += total.saturating_sub(from);
        self.aborted = Some(error);
    }
}

/// Validate every record and build one upload payload per batch.
///
/// Returns `(offset, len, payload)` for each batch in input order.
pub(crate) fn build_batches(
    records: &[ImportUserRecord],
    options: &UserImportOptions,
) -> DirectoryResult<Vec<(usize, usize, UploadAccountRequest)>> {
    if records.is_empty() {
        return Err(DirectoryError::InvalidArgument(
            "import requires at least one record".to_string(),
        ));
    }
    for (index, record) in records.iter().enumerate() {
        record.validate().map_err(|e| {
            DirectoryError::InvalidArgument(format!("record {index} ({}): {e}", record.uid))
        })?;
    }
    if options.hash.is_none() && records.iter().any(ImportUserRecord::has_password) {
        return Err(DirectoryError::InvalidArgument(
            "a hash algorithm is required when importing password hashes".to_string(),
        ));
    }

    records
        .chunks(MAX_IMPORT_BATCH_SIZE)
        .enumerate()
        .map(|(batch, chunk)| -> DirectoryResult<(usize, usize, UploadAccountRequest)> {
            let mut req = UploadAccountRequest {
                users: chunk
                    .iter()
                    .map(ImportUserRecord::to_raw)
                    .collect::<DirectoryResult<_>>()?,
                ..Default::default()
            };
            if let Some(hash) = &options.hash {
                hash.apply(&mut req)?;
            }
            Ok((batch * MAX_IMPORT_BATCH_SIZE, chunk.len(), req))
        })
        .collect()
}
