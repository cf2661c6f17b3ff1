//! HMAC-signed opaque tokens.
//!
//! Format: `base64url(canonical-json(payload)).hex(hmac-sha256)`, where the
//! signature covers the canonical JSON (keys sorted, no whitespace) of the
//! payload. The token travels in a configurable request header.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use super::select;
use crate::error::{Exception, Result};
use crate::inputs::{InputSource, Inputs, Reference, Scope};

type HmacSha256 = Hmac<Sha256>;

/// Default header carrying the token.
pub const DEFAULT_HEADER: &str = "x-hmac-token";

/// HMAC token settings.
#[derive(Debug, Clone)]
pub struct HmacSettings {
    /// Shared secret. Tokens cannot be checked without it.
    pub secret: Option<Vec<u8>>,
    /// Header carrying the token.
    pub header: String,
}

impl Default for HmacSettings {
    fn default() -> Self {
        Self {
            secret: None,
            header: DEFAULT_HEADER.to_string(),
        }
    }
}

/// Serialize with object keys sorted at every level.
pub fn canonical_json(value: &Value) -> String {
    fn sorted(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let ordered: Map<String, Value> = keys
                    .into_iter()
                    .map(|k| (k.clone(), sorted(&map[k])))
                    .collect();
                Value::Object(ordered)
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}

fn mac(secret: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret).map_err(|e| Exception::config("invalid hmac secret").wrap(e))
}

/// Mint a token for `payload`.
///
/// # Example
///
/// ```
/// use gantry_core::inputs::sources::hmac_token;
/// use serde_json::json;
///
/// let token = hmac_token::sign(&json!({"scope": "read"}), b"secret").unwrap();
/// let (payload, signature) = token.split_once('.').unwrap();
/// assert!(!payload.is_empty());
/// assert_eq!(signature.len(), 64);
/// ```
pub fn sign(payload: &Value, secret: &[u8]) -> Result<String> {
    let canonical = canonical_json(payload);
    let mut mac = mac(secret)?;
    mac.update(canonical.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("{}.{signature}", URL_SAFE_NO_PAD.encode(canonical)))
}

/// Verify a token and return its payload.
pub fn verify(token: &str, secret: &[u8]) -> Result<Value> {
    let (encoded, signature) = token
        .trim()
        .split_once('.')
        .ok_or_else(|| Exception::forbidden("malformed hmac token"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| Exception::forbidden("invalid hmac token encoding").wrap(e))?;
    let payload: Value = serde_json::from_slice(&bytes)
        .map_err(|e| Exception::forbidden("invalid hmac token payload").wrap(e))?;
    let signature = hex::decode(signature)
        .map_err(|e| Exception::forbidden("invalid hmac token signature").wrap(e))?;

    let mut mac = mac(secret)?;
    mac.update(canonical_json(&payload).as_bytes());
    mac.verify_slice(&signature)
        .map_err(|e| Exception::forbidden("hmac signature mismatch").wrap(e))?;
    Ok(payload)
}

/// `hmac.<path>`: payload of a verified HMAC token.
pub struct HmacTokenSource {
    settings: HmacSettings,
}

impl HmacTokenSource {
    /// Create the source.
    pub fn new(settings: HmacSettings) -> Self {
        Self { settings }
    }
}

impl InputSource for HmacTokenSource {
    fn kinds(&self) -> &[&'static str] {
        &["hmac"]
    }

    fn get(&self, reference: &Reference, _: &Inputs, scope: Scope<'_>) -> Result<Option<Value>> {
        let Some(token) = scope.request.and_then(|r| r.header(&self.settings.header)) else {
            return Ok(Some(Value::Null));
        };
        let secret = self
            .settings
            .secret
            .as_deref()
            .ok_or_else(|| Exception::config("hmac token received but no secret configured"))?;
        let payload = verify(token, secret)?;
        Ok(select(&payload, &reference.path))
    }
}
