//! Wire-format user payloads for integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};

/// The account returned by the reference lookup sample, including a password
/// provider and string-encoded timestamps.
pub fn sample_user() -> Value {
    json!({
        "localId": "ZY1rJK0...",
        "email": "user@example.com",
        "emailVerified": true,
        "displayName": "John Doe",
        "providerUserInfo": [
            {
                "providerId": "password",
                "displayName": "John Doe",
                "photoUrl": "http://localhost:8080/img1234567890/photo.png",
                "email": "user@example.com"
            }
        ],
        "photoUrl": "https://lh5.googleusercontent.com/.../photo.jpg",
        "passwordHash": "...",
        "disabled": false,
        "lastLoginAt": "1484628946000",
        "createdAt": "1484124142000"
    })
}

/// A minimal account with the given uid.
pub fn user(uid: &str) -> Value {
    json!({
        "localId": uid,
        "email": format!("{uid}@example.com"),
        "createdAt": "1500000000000",
    })
}

/// A page of `count` minimal accounts with uids `{prefix}-{n}`.
pub fn users(prefix: &str, count: usize) -> Vec<Value> {
    (0..count).map(|i| user(&format!("{prefix}-{i}"))).collect()
}

/// An account whose `customAttributes` is not a JSON object.
pub fn user_with_malformed_claims(uid: &str) -> Value {
    json!({
        "localId": uid,
        "customAttributes": "{not json",
    })
}
