use axum::{
    Form, Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::{AuthContext, MaybeSession, SIGN_IN_PATH, hash_password, verify_password},
    error::AppError,
    models::{NewUser, Role, SignInForm, SignUpForm, User},
    response::{Outcome, attempt},
    session::issue_token,
};

/// Roles a visitor may pick when creating an account.
pub const SELF_SERVICE_ROLES: &[Role] = &[Role::Tutor, Role::Student, Role::Shop];

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInPage {
    pub account_types: Vec<Role>,
}

/// sign_in_page
///
/// [Public Route] Already signed-in visitors are sent to their dashboard.
#[utoipa::path(
    get,
    path = "/auth/signin",
    responses(
        (status = 200, description = "Sign-in form data", body = SignInPage),
        (status = 303, description = "Already signed in")
    )
)]
pub async fn sign_in_page(MaybeSession(session): MaybeSession) -> Outcome<SignInPage> {
    match session {
        Some(claim) => Outcome::redirect(claim.role.unwrap_or_default().dashboard_path()),
        None => Outcome::Data(SignInPage {
            account_types: SELF_SERVICE_ROLES.to_vec(),
        }),
    }
}

/// Looks the user up by email or phone and checks the password.
async fn authenticate(state: &AppState, form: SignInForm) -> Result<User, AppError> {
    let login = form.email_or_phone.trim();
    if login.is_empty() || form.password.is_empty() {
        return Err(AppError::Validation(
            "Email/Phone and password are required.".to_string(),
        ));
    }

    let user = state
        .repo
        .find_user_by_login(login)
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("No user found with this email or phone.".to_string())
        })?;

    if !verify_password(&form.password, &user.password_hash) {
        return Err(AppError::Unauthorized("Incorrect password.".to_string()));
    }
    Ok(user)
}

/// sign_in
///
/// [Public Route] Verifies the credentials, sets the session cookie and redirects to the
/// user's dashboard.
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body(content = SignInForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in, redirect to dashboard"),
        (status = 400, description = "Missing fields", body = crate::error::ErrorBody),
        (status = 401, description = "Unknown user or wrong password", body = crate::error::ErrorBody)
    )
)]
pub async fn sign_in(State(state): State<AppState>, Form(form): Form<SignInForm>) -> Response {
    let user = match authenticate(&state, form).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    let token = match issue_token(&user, &state.config.jwt_secret, state.config.session_ttl_secs)
    {
        Ok(token) => token,
        Err(e) => return AppError::Internal(format!("failed to sign session: {e}")).into_response(),
    };

    tracing::info!(user_id = user.id, role = %user.role, "user signed in");

    let mut response = Outcome::<()>::redirect(user.role.dashboard_path()).into_response();
    if let Some(cookie) = state.config.cookie().set_cookie_header(&token) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// sign_up
///
/// [Public Route] Creates an account with a hashed password, then redirects to sign-in.
/// Duplicate email and phone are reported separately.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body(content = SignUpForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Account created"),
        (status = 400, description = "Missing fields", body = crate::error::ErrorBody),
        (status = 409, description = "Email or phone already registered", body = crate::error::ErrorBody)
    )
)]
pub async fn sign_up(State(state): State<AppState>, Form(form): Form<SignUpForm>) -> Outcome<()> {
    let name = form.name.trim();
    let email = form.email.trim();
    let phone = form.phone.trim();
    if name.is_empty() || email.is_empty() || phone.is_empty() || form.password.is_empty() {
        return AppError::Validation("All fields are required.".to_string()).into();
    }

    let role = form.account.unwrap_or_default();
    if !SELF_SERVICE_ROLES.contains(&role) {
        return AppError::Validation("Invalid account type.".to_string()).into();
    }

    if attempt!(state.repo.email_taken(email).await) {
        return AppError::Conflict("User already exists with this email.".to_string()).into();
    }
    if attempt!(state.repo.phone_taken(phone).await) {
        return AppError::Conflict("User already exists with this phone number.".to_string())
            .into();
    }

    let password_hash = attempt!(hash_password(&form.password));
    let user = attempt!(
        state
            .repo
            .create_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                phone: Some(phone.to_string()),
                password_hash,
                role,
            })
            .await
    );

    tracing::info!(user_id = user.id, role = %user.role, "account created");
    Outcome::redirect(SIGN_IN_PATH)
}

/// logout
///
/// [Public Route] Clears the session cookie.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Signed out, redirect to sign-in"))
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    let mut response = Outcome::<()>::redirect(SIGN_IN_PATH).into_response();
    if let Some(cookie) = state.config.cookie().delete_cookie_header() {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

/// get_me
///
/// [Authenticated Route] Identity of the caller as resolved by the gate.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current user", body = AuthContext))
)]
pub async fn get_me(user: AuthContext) -> Json<AuthContext> {
    Json(user)
}
