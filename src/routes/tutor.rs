use crate::{
    AppState,
    auth::Gate,
    handlers::tutor,
    models::Role,
    routes::gated,
};
use axum::{
    Router,
    routing::{get, post},
};

pub fn tutor_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/dashboard", get(tutor::tutor_dashboard))
        .route("/profile", post(tutor::update_profile))
        .route("/applied-jobs", get(tutor::applied_jobs));
    gated(router, state, Gate::roles(&[Role::Tutor]))
}
