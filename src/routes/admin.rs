use crate::{
    AppState,
    auth::Gate,
    handlers::{admin, jobs},
    models::Role,
    routes::gated,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Nested under `/admin`. Claiming, stage changes and applicant lists additionally check
/// inside the handler that the caller manages the job.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/dashboard", get(admin::admin_dashboard))
        .route("/manage", get(admin::managed_jobs))
        // POST /jobs/{id}/claim
        // First admin wins; later claims get 409.
        .route("/jobs/{id}/claim", post(admin::claim_job))
        .route("/jobs/{id}/status", post(admin::set_job_status))
        .route("/jobs/{id}/applications", get(admin::job_applications))
        .route(
            "/applications/{id}/stage",
            post(admin::set_application_stage),
        )
        .route("/users/{id}", get(admin::user_details));
    gated(router, state, Gate::roles(&[Role::Admin]))
}

/// POST /jobs, shared by admins and superadmins. Merged at the root next to the public
/// `GET /jobs`.
pub fn publisher_routes(state: &AppState) -> Router<AppState> {
    gated(
        Router::new().route("/jobs", post(jobs::create_job)),
        state,
        Gate::roles(&[Role::Admin, Role::Superadmin]),
    )
}
