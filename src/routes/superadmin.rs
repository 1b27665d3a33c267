use crate::{
    AppState,
    auth::Gate,
    handlers::superadmin,
    models::Role,
    routes::gated,
};
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn superadmin_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/dashboard", get(superadmin::superadmin_dashboard))
        .route("/users", get(superadmin::list_users))
        .route("/users/{id}", delete(superadmin::delete_user))
        .route("/users/{id}/role", post(superadmin::set_user_role));
    gated(router, state, Gate::roles(&[Role::Superadmin]))
}
