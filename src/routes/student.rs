use crate::{AppState, auth::Gate, handlers::student, models::Role, routes::gated};
use axum::{Router, routing::get};

pub fn student_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new().route("/dashboard", get(student::student_dashboard));
    gated(router, state, Gate::roles(&[Role::Student]))
}
