//! Request builder: typed parameters for lookups and writes, and their
//! translation into wire payloads.
//!
//! Payloads only carry fields the caller set. Partial updates use
//! [`FieldUpdate`] so that "leave alone" and "clear" stay distinct.

use serde_json::{Map, Value};

use crate::error::{DirectoryError, DirectoryResult};
use crate::normalize::encode_custom_claims;
use crate::validate;
use crate::wire::{GetAccountInfoRequest, SetAccountInfoRequest, SignupNewUserRequest};

/// The single identifier a point lookup searches by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Uid(String),
    Email(String),
    PhoneNumber(String),
}

impl UserLookup {
    /// The identifier value, used in not-found messages.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Uid(v) | Self::Email(v) | Self::PhoneNumber(v) => v,
        }
    }

    pub(crate) fn to_request(&self) -> DirectoryResult<GetAccountInfoRequest> {
        let mut req = GetAccountInfoRequest::default();
        match self {
            Self::Uid(uid) => {
                validate::uid(uid)?;
                req.local_id = Some(vec![uid.clone()]);
            }
            Self::Email(email) => {
                validate::email(email)?;
                req.email = Some(vec![email.clone()]);
            }
            Self::PhoneNumber(phone) => {
                validate::phone_number(phone)?;
                req.phone_number = Some(vec![phone.clone()]);
            }
        }
        Ok(req)
    }
}

/// Change to one attribute in a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldUpdate<T> {
    /// Not transmitted; the stored value is kept.
    #[default]
    Unchanged,
    /// Replace the stored value.
    Set(T),
    /// Remove the stored value.
    Clear,
}

impl<T> FieldUpdate<T> {
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(v) => Some(v),
            _ => None,
        }
    }
}

/// Attributes of a new account. Unset attributes are left to service defaults.
#[derive(Debug, Clone, Default)]
pub struct UserCreate {
    uid: Option<String>,
    email: Option<String>,
    email_verified: Option<bool>,
    phone_number: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    password: Option<String>,
    disabled: Option<bool>,
}

impl UserCreate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a specific uid instead of a service-assigned one.
    #[must_use]
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
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
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub(crate) fn to_request(&self) -> DirectoryResult<SignupNewUserRequest> {
        if let Some(uid) = &self.uid {
            validate::uid(uid)?;
        }
        if let Some(email) = &self.email {
            validate::email(email)?;
        }
        if let Some(phone) = &self.phone_number {
            validate::phone_number(phone)?;
        }
        if let Some(name) = &self.display_name {
            validate::display_name(name)?;
        }
        if let Some(url) = &self.photo_url {
            validate::photo_url(url)?;
        }
        if let Some(password) = &self.password {
            validate::password(password)?;
        }

        Ok(SignupNewUserRequest {
            local_id: self.uid.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            phone_number: self.phone_number.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            password: self.password.clone(),
            disabled: self.disabled,
        })
    }
}

/// A partial update of an existing account.
///
/// Only attributes touched through the builder methods are sent. Attributes
/// that can be removed have a matching `clear_*` method.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    email: FieldUpdate<String>,
    email_verified: FieldUpdate<bool>,
    phone_number: FieldUpdate<String>,
    display_name: FieldUpdate<String>,
    photo_url: FieldUpdate<String>,
    password: FieldUpdate<String>,
    disabled: FieldUpdate<bool>,
    custom_claims: FieldUpdate<Map<String, Value>>,
    valid_since_secs: FieldUpdate<i64>,
}

impl UserUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = FieldUpdate::Set(email.into());
        self
    }

    #[must_use]
    pub fn email_verified(mut self, verified: bool) -> Self {
        self.email_verified = FieldUpdate::Set(verified);
        self
    }

    #[must_use]
    pub fn phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = FieldUpdate::Set(phone.into());
        self
    }

    /// Unlink the phone provider and remove the phone number.
    #[must_use]
    pub fn clear_phone_number(mut self) -> Self {
        self.phone_number = FieldUpdate::Clear;
        self
    }

    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = FieldUpdate::Set(name.into());
        self
    }

    #[must_use]
    pub fn clear_display_name(mut self) -> Self {
        self.display_name = FieldUpdate::Clear;
        self
    }

    #[must_use]
    pub fn photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = FieldUpdate::Set(url.into());
        self
    }

    #[must_use]
    pub fn clear_photo_url(mut self) -> Self {
        self.photo_url = FieldUpdate::Clear;
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = FieldUpdate::Set(password.into());
        self
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = FieldUpdate::Set(disabled);
        self
    }

    #[must_use]
    pub fn custom_claims(mut self, claims: Map<String, Value>) -> Self {
        self.custom_claims = FieldUpdate::Set(claims);
        self
    }

    #[must_use]
    pub fn clear_custom_claims(mut self) -> Self {
        self.custom_claims = FieldUpdate::Clear;
        self
    }

    /// Reject tokens issued before `epoch_secs`.
    #[must_use]
    pub fn valid_since(mut self, epoch_secs: i64) -> Self {
        self.valid_since_secs = FieldUpdate::Set(epoch_secs);
        self
    }

    /// Whether no attribute has been touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_unchanged()
            && self.email_verified.is_unchanged()
            && self.phone_number.is_unchanged()
            && self.display_name.is_unchanged()
            && self.photo_url.is_unchanged()
            && self.password.is_unchanged()
            && self.disabled.is_unchanged()
            && self.custom_claims.is_unchanged()
            && self.valid_since_secs.is_unchanged()
    }

    pub(crate) fn to_request(&self, uid: &str) -> DirectoryResult<SetAccountInfoRequest> {
        validate::uid(uid)?;
        if self.is_empty() {
            return Err(DirectoryError::InvalidArgument(
                "update must change at least one attribute".to_string(),
            ));
        }

        let mut req = SetAccountInfoRequest {
            local_id: uid.to_string(),
            ..Default::default()
        };

        if let Some(email) = self.email.as_set() {
            validate::email(email)?;
            req.email = Some(email.clone());
        }
        req.email_verified = self.email_verified.as_set().copied();
        req.disable_user = self.disabled.as_set().copied();

        match &self.phone_number {
            FieldUpdate::Set(phone) => {
                validate::phone_number(phone)?;
                req.phone_number = Some(phone.clone());
            }
            FieldUpdate::Clear => req.delete_provider.push("phone".to_string()),
            FieldUpdate::Unchanged => {}
        }
        match &self.display_name {
            FieldUpdate::Set(name) => {
                validate::display_name(name)?;
                req.display_name = Some(name.clone());
            }
            FieldUpdate::Clear => req.delete_attribute.push("DISPLAY_NAME"),
            FieldUpdate::Unchanged => {}
        }
        match &self.photo_url {
            FieldUpdate::Set(url) => {
                validate::photo_url(url)?;
                req.photo_url = Some(url.clone());
            }
            FieldUpdate::Clear => req.delete_attribute.push("PHOTO_URL"),
            FieldUpdate::Unchanged => {}
        }
        if let Some(password) = self.password.as_set() {
            validate::password(password)?;
            req.password = Some(password.clone());
        }
        match &self.custom_claims {
            FieldUpdate::Set(claims) => {
                validate::custom_claims(claims)?;
                // An empty map on the wire means "no claims".
                req.custom_attributes =
                    Some(encode_custom_claims(claims)?.unwrap_or_else(|| "{}".to_string()));
            }
            FieldUpdate::Clear => req.custom_attributes = Some("{}".to_string()),
            FieldUpdate::Unchanged => {}
        }
        if let Some(secs) = self.valid_since_secs.as_set() {
            if *secs < 0 {
                return Err(DirectoryError::InvalidArgument(
                    "valid_since must be a non-negative epoch second".to_string(),
                ));
            }
            req.valid_since = Some(secs.to_string());
        }

        Ok(req)
    }
}
