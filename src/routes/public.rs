use crate::{
    AppState,
    handlers::{account, jobs, storefront},
};
use axum::{
    Router,
    routing::{get, post},
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Accounts ---
        .route(
            "/auth/signin",
            get(account::sign_in_page).post(account::sign_in),
        )
        .route("/auth/signup", post(account::sign_up))
        .route("/logout", post(account::logout))
        // --- Job board ---
        .route("/jobs", get(jobs::list_jobs))
        // GET /jobs/{id}
        // Every hit counts as a view.
        .route("/jobs/{id}", get(jobs::job_details))
        // POST /jobs/{id}/apply
        // Needs a session but is not behind a gate: a missing session is a 401 payload,
        // not a redirect.
        .route("/jobs/{id}/apply", post(jobs::apply_to_job))
        // --- Storefronts ---
        .route("/shops/{handle}", get(storefront::storefront))
        .route("/shops/{handle}/orders", post(storefront::place_order))
        .route("/shops/{handle}/thanks", get(storefront::order_placed))
        .route(
            "/shops/{handle}/track/{order_id}",
            get(storefront::track_order),
        )
}
