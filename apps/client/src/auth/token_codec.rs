//! Claim extraction from bearer credentials.
//!
//! Decoding here is plain data extraction for display and identity
//! fallback. It is NOT an authorization decision: the signature and expiry
//! are never checked, and the backend stays the only authority on whether a
//! credential is valid.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

use super::credential::Credential;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("credential has {0} segments, expected 3")]
    SegmentCount(usize),
    #[error("payload segment is not valid base64url: {0}")]
    Base64(String),
    #[error("payload segment is not a JSON object: {0}")]
    Payload(String),
}

impl DecodeError {
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::SegmentCount(_) => "DECODE_SEGMENT_COUNT",
            DecodeError::Base64(_) => "DECODE_BASE64",
            DecodeError::Payload(_) => "DECODE_PAYLOAD",
        }
    }
}

/// Claims read from a credential's payload segment without any verification.
///
/// Holding one of these proves nothing about the caller. Keys outside the
/// recognized set are preserved and reachable through [`UnverifiedClaims::get`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnverifiedClaims {
    raw: Map<String, Value>,
}

impl UnverifiedClaims {
    pub fn from_map(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn sub(&self) -> Option<String> {
        self.text("sub")
    }

    pub fn email(&self) -> Option<String> {
        self.text("email")
    }

    pub fn user_id(&self) -> Option<String> {
        self.text("userId")
    }

    pub fn id(&self) -> Option<String> {
        self.text("id")
    }

    pub fn first_name(&self) -> Option<String> {
        self.text("firstName")
    }

    pub fn last_name(&self) -> Option<String> {
        self.text("lastName")
    }

    pub fn roles(&self) -> Option<Vec<String>> {
        self.string_list("roles")
    }

    pub fn authorities(&self) -> Option<Vec<String>> {
        self.string_list("authorities")
    }

    /// Expiry in seconds since epoch, informational only.
    pub fn exp(&self) -> Option<i64> {
        self.raw.get("exp").and_then(Value::as_i64)
    }

    /// Issued-at in seconds since epoch, informational only.
    pub fn iat(&self) -> Option<i64> {
        self.raw.get("iat").and_then(Value::as_i64)
    }

    /// Non-empty string (or numeric) claim. Empty strings count as absent.
    fn text(&self, key: &str) -> Option<String> {
        match self.raw.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn string_list(&self, key: &str) -> Option<Vec<String>> {
        let items = self.raw.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )
    }
}

/// Decode the payload segment of a three-part dot-separated credential.
///
/// Pure and deterministic; success carries no trust.
pub fn decode(credential: &Credential) -> Result<UnverifiedClaims, DecodeError> {
    let segments: Vec<&str> = credential.as_str().split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    // Some issuers pad their segments; base64url proper does not.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(raw)) => Ok(UnverifiedClaims::from_map(raw)),
        Ok(other) => Err(DecodeError::Payload(format!(
            "expected object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(DecodeError::Payload(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
