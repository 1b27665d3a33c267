use std::convert::Infallible;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    AppState,
    config::AppConfig,
    cookie::{CookieConfig, cookie_header},
    error::AppError,
    models::{Role, User},
    session::{SessionClaim, resolve_session},
};

/// Where unauthenticated callers are sent.
pub const SIGN_IN_PATH: &str = "/auth/signin";

/// AuthContext
///
/// Identity of a caller that passed the gate, built from the live user record (not from the
/// token) so role changes apply on the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthContext {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// What the gate does with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// No identity: go to the sign-in page.
    SignIn,
    /// Signed in with a role this area does not admit: go to the caller's own dashboard.
    Dashboard(String),
}

/// Gate
///
/// Authorization rule for a group of routes: any signed-in user, or only the listed roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    allowed: Option<&'static [Role]>,
}

impl Gate {
    pub const fn authenticated() -> Self {
        Self { allowed: None }
    }

    pub const fn roles(allowed: &'static [Role]) -> Self {
        Self {
            allowed: Some(allowed),
        }
    }

    /// decide
    ///
    /// Pure decision over an optional identity.
    pub fn decide(&self, identity: Option<&AuthContext>) -> GateDecision {
        let Some(identity) = identity else {
            return GateDecision::SignIn;
        };
        match self.allowed {
            Some(roles) if !roles.contains(&identity.role) => {
                GateDecision::Dashboard(identity.role.dashboard_path())
            }
            _ => GateDecision::Allow,
        }
    }
}

/// Redirect to sign-in that also drops the session cookie.
fn sign_in_clearing(cookie: &CookieConfig) -> Response {
    let mut response = Redirect::to(SIGN_IN_PATH).into_response();
    if let Some(value) = cookie.delete_cookie_header() {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// require_gate
///
/// Middleware installed with `route_layer` on every gated router.
///
/// 1. Resolve the session claim from the cookie; none → sign-in.
/// 2. Reload the user by id. A vanished user fails closed (sign-in, cookie cleared);
///    a store error is a 500.
/// 3. Apply the gate to the live role. On success the `AuthContext` is inserted into the
///    request extensions and the handler runs; otherwise the handler is never invoked.
pub async fn require_gate(
    State((state, gate)): State<(AppState, Gate)>,
    mut request: Request,
    next: Next,
) -> Response {
    let config = &state.config;
    let claim = resolve_session(
        cookie_header(request.headers()),
        &config.cookie_name,
        &config.jwt_secret,
    );
    let Some(claim) = claim else {
        return Redirect::to(SIGN_IN_PATH).into_response();
    };

    let user = match state.repo.get_user(claim.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(user_id = claim.user_id, "session for a user that no longer exists");
            return sign_in_clearing(&config.cookie());
        }
        Err(e) => return AppError::Store(e).into_response(),
    };

    let identity = AuthContext::from(&user);
    match gate.decide(Some(&identity)) {
        GateDecision::Allow => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        GateDecision::SignIn => Redirect::to(SIGN_IN_PATH).into_response(),
        GateDecision::Dashboard(location) => {
            tracing::debug!(user_id = identity.id, role = %identity.role, "role not admitted");
            Redirect::to(&location).into_response()
        }
    }
}

/// AuthContext Extractor
///
/// Reads the identity placed by [`require_gate`]. Used on a route without the gate it
/// rejects with 401.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
    }
}

/// MaybeSession
///
/// Optional session on public routes. Only the token is checked; there is no store lookup.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<SessionClaim>);

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(MaybeSession(resolve_session(
            cookie_header(&parts.headers),
            &config.cookie_name,
            &config.jwt_secret,
        )))
    }
}

/// Hash a password using argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

/// Verify a password against a stored PHC hash. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
