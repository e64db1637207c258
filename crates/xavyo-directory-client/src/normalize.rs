//! Field normalizer: one decode rule per wire field per accepted shape.
//!
//! The service is inconsistent about how it encodes some scalar fields.
//! Every accepted representation is enumerated here; anything else is a
//! [`DirectoryError::FieldDecode`] naming the field. Encoders produce the
//! exact shape the service expects on writes.

use crate::error::{DirectoryError, DirectoryResult};
use serde_json::{Map, Value};

/// Largest float that still converts to an `i64` without saturating.
const MAX_EXACT_MILLIS: f64 = 9_223_372_036_854_775_807.0;

pub(crate) fn unrecognized(field: &'static str, value: &Value) -> DirectoryError {
    let mut representation = value.to_string();
    if representation.len() > 64 {
        representation.truncate(61);
        representation.push_str("...");
    }
    DirectoryError::FieldDecode {
        field,
        representation,
    }
}

/// Decode a boolean sent either as a JSON bool or as `"true"`/`"false"`.
///
/// An absent field is `false`.
pub fn decode_flag(field: &'static str, value: Option<&Value>) -> DirectoryResult<bool> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s == "true" => Ok(true),
        Some(Value::String(s)) if s == "false" => Ok(false),
        Some(other) => Err(unrecognized(field, other)),
    }
}

/// Decode an epoch-millisecond timestamp.
///
/// Accepted: decimal strings (`"1484124142000"`), JSON integers, and
/// floating values either as numbers or strings (`1.494364393E+12`).
/// Fractional milliseconds are truncated. An absent field is 0 (unknown).
pub fn decode_millis(field: &'static str, value: Option<&Value>) -> DirectoryResult<i64> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                non_negative(field, value, i)
            } else if let Some(f) = n.as_f64() {
                truncate_float(field, value, f)
            } else {
                // u64 beyond i64::MAX
                Err(unrecognized(field, &Value::Number(n.clone())))
            }
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                non_negative(field, value, i)
            } else if let Ok(f) = trimmed.parse::<f64>() {
                truncate_float(field, value, f)
            } else {
                Err(unrecognized(field, &Value::String(s.clone())))
            }
        }
        Some(other) => Err(unrecognized(field, other)),
    }
}

/// Decode an epoch-second timestamp (same shapes as [`decode_millis`]) into
/// epoch milliseconds.
pub fn decode_seconds_as_millis(field: &'static str, value: Option<&Value>) -> DirectoryResult<i64> {
    let secs = decode_millis(field, value)?;
    secs.checked_mul(1000).ok_or_else(|| DirectoryError::FieldDecode {
        field,
        representation: format!("{secs} seconds overflows epoch milliseconds"),
    })
}

fn non_negative(field: &'static str, raw: Option<&Value>, v: i64) -> DirectoryResult<i64> {
    if v < 0 {
        return Err(unrecognized(field, raw.unwrap_or(&Value::Null)));
    }
    Ok(v)
}

#[allow(clippy::cast_possible_truncation)]
fn truncate_float(field: &'static str, raw: Option<&Value>, f: f64) -> DirectoryResult<i64> {
    if !f.is_finite() || f < 0.0 || f >= MAX_EXACT_MILLIS {
        return Err(unrecognized(field, raw.unwrap_or(&Value::Null)));
    }
    Ok(f.trunc() as i64)
}

/// Decode an optional string field; empty strings become `None`.
pub fn decode_text(field: &'static str, value: Option<&Value>) -> DirectoryResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(unrecognized(field, other)),
    }
}

/// Decode custom claims: a string whose content is a JSON object.
///
/// An absent field or empty string yields no claims. A string that is not
/// valid JSON, or JSON that is not an object, is rejected rather than
/// silently dropped.
pub fn decode_custom_claims(
    field: &'static str,
    value: Option<&Value>,
) -> DirectoryResult<Map<String, Value>> {
    let raw = match value {
        None | Some(Value::Null) => return Ok(Map::new()),
        Some(Value::String(s)) => s,
        Some(other) => return Err(unrecognized(field, other)),
    };
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(unrecognized(field, &Value::String(raw.clone()))),
    }
}

// ── Encoders ──────────────────────────────────────────────────────────

/// Encode an epoch-ms timestamp as the decimal string the service stores.
/// Unknown (0) timestamps are omitted.
#[must_use]
pub fn encode_millis(millis: i64) -> Option<Value> {
    (millis > 0).then(|| Value::String(millis.to_string()))
}

/// Encode epoch-ms as the decimal-string seconds used by `validSince`.
#[must_use]
pub fn encode_millis_as_seconds(millis: i64) -> Option<Value> {
    (millis > 0).then(|| Value::String((millis / 1000).to_string()))
}

/// Encode an optional string field; unset and empty values are omitted.
#[must_use]
pub fn encode_text(value: Option<&str>) -> Option<Value> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
}

/// Encode a flag as a JSON boolean.
#[must_use]
pub fn encode_flag(flag: bool) -> Option<Value> {
    Some(Value::Bool(flag))
}

/// Encode custom claims as a compact JSON string; no claims are omitted.
pub fn encode_custom_claims(claims: &Map<String, Value>) -> DirectoryResult<Option<String>> {
    if claims.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(claims)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_shapes() {
        assert!(decode_flag("emailVerified", Some(&json!(true))).unwrap());
        assert!(!decode_flag("emailVerified", Some(&json!(false))).unwrap());
        assert!(decode_flag("emailVerified", Some(&json!("true"))).unwrap());
        assert!(!decode_flag("emailVerified", Some(&json!("false"))).unwrap());
        assert!(!decode_flag("emailVerified", None).unwrap());
    }

    #[test]
    fn test_flag_rejects_other_shapes() {
        for bad in [json!("yes"), json!(1), json!([true])] {
            match decode_flag("disabled", Some(&bad)) {
                Err(DirectoryError::FieldDecode { field, .. }) => assert_eq!(field, "disabled"),
                other => panic!("expected FieldDecode for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_millis_from_decimal_string() {
        assert_eq!(
            decode_millis("createdAt", Some(&json!("1484124142000"))).unwrap(),
            1_484_124_142_000
        );
    }

    #[test]
    fn test_millis_from_scientific_float() {
        let value: Value = serde_json::from_str("1.494364393E+12").unwrap();
        assert_eq!(
            decode_millis("passwordUpdatedAt", Some(&value)).unwrap(),
            1_494_364_393_000
        );
    }

    #[test]
    fn test_millis_truncates_fraction() {
        assert_eq!(
            decode_millis("lastLoginAt", Some(&json!(1_484_628_946_000.9))).unwrap(),
            1_484_628_946_000
        );
        assert_eq!(
            decode_millis("lastLoginAt", Some(&json!("1484628946000.75"))).unwrap(),
            1_484_628_946_000
        );
    }

    #[test]
    fn test_millis_rejects_garbage_and_negative() {
        assert!(matches!(
            decode_millis("createdAt", Some(&json!("yesterday"))),
            Err(DirectoryError::FieldDecode { field: "createdAt", .. })
        ));
        assert!(decode_millis("createdAt", Some(&json!(-5))).is_err());
        assert!(decode_millis("createdAt", Some(&json!(true))).is_err());
        assert_eq!(decode_millis("createdAt", None).unwrap(), 0);
    }

    #[test]
    fn test_seconds_scaled_to_millis() {
        assert_eq!(
            decode_seconds_as_millis("validSince", Some(&json!("1494364393"))).unwrap(),
            1_494_364_393_000
        );
    }

    #[test]
    fn test_custom_claims_decode() {
        let claims =
            decode_custom_claims("customAttributes", Some(&json!("{\"admin\": true}"))).unwrap();
        assert_eq!(claims.get("admin"), Some(&json!(true)));
        assert!(decode_custom_claims("customAttributes", Some(&json!("")))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_custom_claims_malformed_is_error() {
        assert!(matches!(
            decode_custom_claims("customAttributes", Some(&json!("{not json"))),
            Err(DirectoryError::FieldDecode {
                field: "customAttributes",
                ..
            })
        ));
        assert!(decode_custom_claims("customAttributes", Some(&json!("[1,2]"))).is_err());
        assert!(decode_custom_claims("customAttributes", Some(&json!({"admin": true}))).is_err());
    }

    #[test]
    fn test_text_empty_is_none() {
        assert_eq!(decode_text("email", Some(&json!(""))).unwrap(), None);
        assert_eq!(
            decode_text("email", Some(&json!("a@b.c"))).unwrap().as_deref(),
            Some("a@b.c")
        );
        assert!(matches!(
            decode_text("email", Some(&json!(3))),
            Err(DirectoryError::FieldDecode { field: "email", .. })
        ));
        assert!(decode_text("email", Some(&json!(["a@b.c"]))).is_err());
        assert_eq!(decode_text("email", Some(&Value::Null)).unwrap(), None);
        assert_eq!(encode_text(Some("")), None);
        assert_eq!(encode_text(Some("a@b.c")), Some(json!("a@b.c")));
    }

    #[test]
    fn test_encoders_match_service_shapes() {
        assert_eq!(encode_millis(1_484_124_142_000), Some(json!("1484124142000")));
        assert_eq!(encode_millis(0), None);
        assert_eq!(encode_millis_as_seconds(1_494_364_393_000), Some(json!("1494364393")));
        assert_eq!(encode_flag(true), Some(json!(true)));

        let mut claims = Map::new();
        claims.insert("admin".into(), json!(true));
        assert_eq!(
            encode_custom_claims(&claims).unwrap().as_deref(),
            Some("{\"admin\":true}")
        );
        assert_eq!(encode_custom_claims(&Map::new()).unwrap(), None);
    }
}
