use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{cookie::find_cookie, models::Role, models::User};

/// SessionClaim
///
/// Payload of the signed session token stored in the session cookie. Nothing is kept
/// server-side: a token that verifies and has not expired is the whole authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaim {
    pub name: String,
    pub user_id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

impl SessionClaim {
    /// Claim for `user`, valid for `ttl_secs` from now.
    pub fn for_user(user: &User, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            name: user.name.clone(),
            user_id: user.id,
            email: user.email.clone(),
            role: Some(user.role),
            iat: now,
            exp: now + ttl_secs,
        }
    }
}

/// sign
///
/// Encodes the claim as an HS256 JWT with the shared secret.
pub fn sign(claim: &SessionClaim, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claim,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// issue_token
///
/// Signs a fresh session for `user`.
pub fn issue_token(
    user: &User,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    sign(&SessionClaim::for_user(user, ttl_secs), secret)
}

/// verify_token
///
/// Checks signature and expiry. Any failure (tampered, expired, malformed) is `None`.
pub fn verify_token(token: &str, secret: &str) -> Option<SessionClaim> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    match decode::<SessionClaim>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "session token rejected");
            None
        }
    }
}

/// resolve_session
///
/// Extracts the named cookie from a raw `Cookie` header and verifies it. Never fails:
/// a missing header, missing cookie or invalid token all resolve to no identity.
pub fn resolve_session(
    cookie_header: Option<&str>,
    cookie_name: &str,
    secret: &str,
) -> Option<SessionClaim> {
    let token = find_cookie(cookie_header?, cookie_name)?;
    if token.is_empty() {
        return None;
    }
    verify_token(token, secret)
}
