//! Access/refresh token pair and unverified claim inspection.
//!
//! The harness never verifies signatures; it only reads the payload segment to
//! confirm that the server issued the token for the user that logged in.

use crate::error::{HarnessError, HarnessResult};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tokens returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtPair {
    pub token: String,
    pub refresh_token: String,
}

/// Claims the harness reads from an access token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl JwtClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Decode the payload segment of `token` without checking the signature.
pub fn decode_claims(token: &str) -> HarnessResult<JwtClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| HarnessError::invalid_token("token has no payload segment"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| HarnessError::invalid_token(format!("payload is not base64url: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| HarnessError::invalid_token(format!("payload is not a claim set: {}", e)))
}

/// Check that `token` was issued to `subject`.
pub fn validate_jwt_subject(token: &str, subject: &str) -> HarnessResult<JwtClaims> {
    let claims = decode_claims(token)?;
    if claims.sub != subject {
        return Err(HarnessError::invalid_token(format!(
            "token subject '{}' does not match '{}'",
            claims.sub, subject
        )));
    }
    Ok(claims)
}

#[cfg(test)]
pub(crate) fn unsigned_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS512"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}
