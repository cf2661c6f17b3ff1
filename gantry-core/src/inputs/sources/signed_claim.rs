//! Signed claims: Ed25519 compact tokens (`header.payload.signature`).
//!
//! The token is read from the `Authorization` header (`Bearer <t>` or
//! `token <t>`), or else from a configured cookie holding
//! `{"access_token": "<t>"}`. No token at all resolves to `null`.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use super::select;
use crate::error::{Exception, Result};
use crate::inputs::{InputSource, Inputs, Reference, Scope};
use crate::testing::ClockProvider;

const ALGORITHM: &str = "EdDSA";

/// Verification settings for signed claims.
#[derive(Debug, Clone, Default)]
pub struct ClaimSettings {
    /// Key used to verify signatures. Tokens cannot be checked without it.
    pub verifying_key: Option<VerifyingKey>,
    /// Cookie holding `{"access_token": ...}` when no header is sent.
    pub cookie: Option<String>,
    /// Accepted values of the payload's `type` field; empty accepts any.
    pub token_types: Vec<String>,
}

impl ClaimSettings {
    /// Decode a standard base64 Ed25519 public key.
    pub fn decode_key(encoded: &str) -> Result<VerifyingKey> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Exception::config("claim public key is not base64").wrap(e))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Exception::config("claim public key must be 32 bytes"))?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| Exception::config("invalid claim public key").wrap(e))
    }
}

/// `jwt.<path>`: payload of a verified signed claim.
pub struct SignedClaimSource {
    settings: ClaimSettings,
    clock: Arc<dyn ClockProvider>,
}

impl SignedClaimSource {
    /// Create the source.
    pub fn new(settings: ClaimSettings, clock: Arc<dyn ClockProvider>) -> Self {
        Self { settings, clock }
    }

    fn find_token(&self, inputs: &Inputs, scope: Scope<'_>) -> Result<Option<String>> {
        let Some(request) = scope.request else {
            return Ok(None);
        };
        if let Some(token) = request.header("authorization").and_then(bearer_token) {
            return Ok(Some(token.to_string()));
        }
        let Some(cookie) = &self.settings.cookie else {
            return Ok(None);
        };
        let reference = Reference {
            raw: format!("cookie.{cookie}"),
            kind: "cookie".to_string(),
            path: vec![cookie.clone()],
        };
        let Some(Value::String(raw)) = inputs.resolve_reference(&reference, scope)? else {
            return Ok(None);
        };
        let parsed: Value = serde_json::from_str(&raw)
            .map_err(|e| Exception::forbidden("invalid user cookie").wrap(e))?;
        Ok(parsed
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Verify a token and return its payload.
    pub fn verify(&self, token: &str) -> Result<Value> {
        let key = self
            .settings
            .verifying_key
            .as_ref()
            .ok_or_else(|| Exception::config("signed claim received but no public key configured"))?;

        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Exception::forbidden("malformed jwt token"));
        };

        let header_json = decode_segment(header)?;
        if header_json.get("alg").and_then(Value::as_str) != Some(ALGORITHM) {
            return Err(Exception::forbidden("unsupported jwt algorithm"));
        }
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| Exception::forbidden("invalid jwt signature encoding").wrap(e))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|e| Exception::forbidden("invalid jwt signature").wrap(e))?;
        key.verify(format!("{header}.{payload}").as_bytes(), &signature)
            .map_err(|e| Exception::forbidden("invalid jwt token").wrap(e))?;

        let claims = decode_segment(payload)?;
        if let Some(expires_at) = claims.get("exp").and_then(Value::as_f64) {
            if expires_at <= self.clock.unix_seconds() as f64 {
                return Err(Exception::unauthorized(format!("jwt expired at {expires_at}")));
            }
        }
        if !self.settings.token_types.is_empty() {
            let token_type = claims.get("type").and_then(Value::as_str).unwrap_or_default();
            if !self.settings.token_types.iter().any(|t| t == token_type) {
                return Err(Exception::forbidden(format!(
                    "jwt type [{token_type}] not accepted"
                )));
            }
        }
        Ok(claims)
    }
}

impl InputSource for SignedClaimSource {
    fn kinds(&self) -> &[&'static str] {
        &["jwt"]
    }

    fn get(&self, reference: &Reference, inputs: &Inputs, scope: Scope<'_>) -> Result<Option<Value>> {
        let Some(token) = self.find_token(inputs, scope)? else {
            debug!("no signed claim in request");
            return Ok(Some(Value::Null));
        };
        let claims = self.verify(&token)?;
        Ok(select(&claims, &reference.path))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let accepted = scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token");
    let token = token.trim();
    (accepted && token.split('.').count() == 3).then_some(token)
}

fn decode_segment(segment: &str) -> Result<Value> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| Exception::forbidden("invalid jwt encoding").wrap(e))?;
    serde_json::from_slice(&bytes).map_err(|e| Exception::forbidden("invalid jwt json").wrap(e))
}

/// Issues signed claims verifiable by [`SignedClaimSource`].
pub struct ClaimSigner {
    key: SigningKey,
}

impl ClaimSigner {
    /// Create a signer from a 32-byte Ed25519 secret.
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    /// The matching verification key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// The verification key, standard base64.
    pub fn verifying_key_base64(&self) -> String {
        STANDARD.encode(self.key.verifying_key().as_bytes())
    }

    /// Sign `claims` into a compact token.
    ///
    /// # Example
    ///
    /// ```
    /// use gantry_core::inputs::sources::ClaimSigner;
    /// use serde_json::json;
    ///
    /// let signer = ClaimSigner::from_bytes(&[7; 32]);
    /// let token = signer.sign(&json!({"sub": "ann"}));
    /// assert_eq!(token.split('.').count(), 3);
    /// ```
    pub fn sign(&self, claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(json!({"alg": ALGORITHM, "typ": "JWT"}).to_string());
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        let signature = self.key.sign(format!("{header}.{payload}").as_bytes());
        format!(
            "{header}.{payload}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }
}
