use crate::{
    AppConfig,
    auth::hash_password,
    error::AppError,
    models::{NewUser, Role},
    repository::Repository,
};

/// seed_superadmin
///
/// Creates the superadmin account named by `SUPER_ADMIN_EMAIL` / `SUPER_ADMIN_PASS` when
/// both are set. Running it again is a no-op: an existing account with that email is left
/// untouched. Returns whether an account was created.
pub async fn seed_superadmin(repo: &dyn Repository, config: &AppConfig) -> Result<bool, AppError> {
    let (Some(email), Some(password)) = (
        config.superadmin_email.as_deref().map(str::trim),
        config.superadmin_password.as_deref(),
    ) else {
        tracing::debug!("superadmin credentials not configured, skipping seed");
        return Ok(false);
    };
    if email.is_empty() || password.is_empty() {
        return Ok(false);
    }

    let created = repo
        .seed_user(NewUser {
            name: "Super Admin".to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: hash_password(password)?,
            role: Role::Superadmin,
        })
        .await?;

    if created {
        tracing::info!(email, "superadmin account created");
    } else {
        tracing::debug!(email, "superadmin account already present");
    }
    Ok(created)
}
