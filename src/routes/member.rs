use crate::{
    AppState,
    auth::Gate,
    handlers::account,
    routes::gated,
};
use axum::{Router, routing::get};

/// Routes open to any signed-in user, whatever the role.
pub fn member_routes(state: &AppState) -> Router<AppState> {
    gated(
        Router::new().route("/me", get(account::get_me)),
        state,
        Gate::authenticated(),
    )
}
