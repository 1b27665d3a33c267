use axum::{
    Form,
    extract::{Path, State},
};
use chrono::{NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::AuthContext,
    error::AppError,
    models::{ActionMessage, RoleForm, SuperadminStats, User},
    response::{Outcome, Page, attempt},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct SuperadminDashboard {
    pub stats: SuperadminStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub users: Vec<User>,
}

/// superadmin_dashboard
///
/// [Superadmin Route] Platform totals, sign-ups and postings since midnight (UTC), and
/// per-role user counts.
#[utoipa::path(
    get,
    path = "/superadmin/dashboard",
    responses((status = 200, description = "Platform statistics", body = SuperadminDashboard))
)]
pub async fn superadmin_dashboard(
    user: AuthContext,
    State(state): State<AppState>,
) -> Outcome<Page<SuperadminDashboard>> {
    let since = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let stats = attempt!(state.repo.platform_stats(since).await);
    Outcome::Data(Page::new(user, SuperadminDashboard { stats }))
}

/// list_users
///
/// [Superadmin Route] Every account, newest first.
#[utoipa::path(
    get,
    path = "/superadmin/users",
    responses((status = 200, description = "All users", body = UserList))
)]
pub async fn list_users(
    user: AuthContext,
    State(state): State<AppState>,
) -> Outcome<Page<UserList>> {
    let users = attempt!(state.repo.list_users().await);
    Outcome::Data(Page::new(user, UserList { users }))
}

/// set_user_role
///
/// [Superadmin Route] Grants any role, including admin and superadmin.
#[utoipa::path(
    post,
    path = "/superadmin/users/{id}/role",
    params(("id" = i64, Path, description = "User id")),
    request_body(content = RoleForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorBody)
    )
)]
pub async fn set_user_role(
    user: AuthContext,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Form(form): Form<RoleForm>,
) -> Outcome<User> {
    match attempt!(state.repo.set_user_role(user_id, form.role).await) {
        Some(updated) => {
            tracing::info!(
                user_id,
                role = %updated.role,
                changed_by = user.id,
                "user role changed"
            );
            Outcome::Data(updated)
        }
        None => AppError::not_found("User").into(),
    }
}

/// delete_user
///
/// [Superadmin Route] Removes an account. A superadmin cannot delete their own account.
#[utoipa::path(
    delete,
    path = "/superadmin/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = ActionMessage),
        (status = 400, description = "Self-deletion refused", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_user(
    user: AuthContext,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Outcome<ActionMessage> {
    if user_id == user.id {
        return AppError::Validation("You cannot delete your own account.".to_string()).into();
    }
    if !attempt!(state.repo.delete_user(user_id).await) {
        return AppError::not_found("User").into();
    }
    tracing::warn!(user_id, deleted_by = user.id, "user deleted");
    Outcome::Data(ActionMessage::success("User deleted successfully."))
}
