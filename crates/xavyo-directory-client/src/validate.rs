//! Argument checks applied before any request leaves the process.

use crate::error::{DirectoryError, DirectoryResult};
use serde_json::{Map, Value};

/// Longest uid the service accepts.
pub const MAX_UID_LEN: usize = 128;

/// Longest serialized custom claims payload the service accepts.
pub const MAX_CLAIMS_PAYLOAD_LEN: usize = 1000;

/// Shortest password the service accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Claims reserved by the token format; they cannot be set as custom claims.
const RESERVED_CLAIMS: &[&str] = &[
    "acr", "amr", "at_hash", "aud", "auth_time", "azp", "cnf", "c_hash", "exp", "firebase",
    "iat", "iss", "jti", "nbf", "nonce", "sub",
];

fn invalid(msg: impl Into<String>) -> DirectoryError {
    DirectoryError::InvalidArgument(msg.into())
}

pub fn uid(uid: &str) -> DirectoryResult<()> {
    if uid.is_empty() {
        return Err(invalid("uid must be a non-empty string"));
    }
    if uid.chars().count() > MAX_UID_LEN {
        return Err(invalid(format!("uid must not exceed {MAX_UID_LEN} characters")));
    }
    Ok(())
}

pub fn email(email: &str) -> DirectoryResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(invalid(format!("malformed email address: {email:?}"))),
    }
}

/// Phone numbers must be E.164: a leading `+` followed by digits.
pub fn phone_number(phone: &str) -> DirectoryResult<()> {
    let valid = phone
        .strip_prefix('+')
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(invalid(format!("phone number must be E.164 formatted: {phone:?}")))
    }
}

pub fn display_name(name: &str) -> DirectoryResult<()> {
    if name.is_empty() {
        return Err(invalid("display name must be non-empty; clear it instead"));
    }
    Ok(())
}

pub fn photo_url(url: &str) -> DirectoryResult<()> {
    if url.is_empty() {
        return Err(invalid("photo URL must be non-empty; clear it instead"));
    }
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|e| invalid(format!("malformed photo URL {url:?}: {e}")))
}

pub fn password(password: &str) -> DirectoryResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Claims must not use reserved names and must fit the service's size limit.
pub fn custom_claims(claims: &Map<String, Value>) -> DirectoryResult<()> {
    if let Some(reserved) = claims.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
        return Err(invalid(format!("claim {reserved:?} is reserved")));
    }
    let encoded = serde_json::to_string(claims)?;
    if encoded.len() > MAX_CLAIMS_PAYLOAD_LEN {
        return Err(invalid(format!(
            "serialized custom claims must not exceed {MAX_CLAIMS_PAYLOAD_LEN} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uid_bounds() {
        assert!(uid("abc").is_ok());
        assert!(uid("").is_err());
        assert!(uid(&"a".repeat(MAX_UID_LEN)).is_ok());
        assert!(uid(&"a".repeat(MAX_UID_LEN + 1)).is_err());
    }

    #[test]
    fn test_email_shape() {
        assert!(email("user@example.com").is_ok());
        assert!(email("user").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("a@b@c").is_err());
    }

    #[test]
    fn test_phone_requires_plus() {
        assert!(phone_number("+15551234567").is_ok());
        assert!(phone_number("15551234567").is_err());
        assert!(phone_number("+").is_err());
    }

    #[test]
    fn test_photo_url_parses() {
        assert!(photo_url("https://example.com/p.png").is_ok());
        assert!(photo_url("not a url").is_err());
    }

    #[test]
    fn test_reserved_and_oversized_claims() {
        let mut claims = Map::new();
        claims.insert("sub".into(), json!("x"));
        assert!(custom_claims(&claims).is_err());

        let mut big = Map::new();
        big.insert("blob".into(), json!("x".repeat(MAX_CLAIMS_PAYLOAD_LEN)));
        assert!(custom_claims(&big).is_err());

        let mut ok = Map::new();
        ok.insert("admin".into(), json!(true));
        assert!(custom_claims(&ok).is_ok());
    }

    #[test]
    fn test_password_length() {
        assert!(password("secret").is_ok());
        assert!(password("short").is_err());
    }
}
