//! Routers grouped by who may call them. Every gated group carries its own [`Gate`] through
//! `route_layer`, so the handler behind it never runs for a caller the gate turns away.

use axum::{Router, middleware};

use crate::{
    AppState,
    auth::{Gate, require_gate},
};

/// Anonymous visitors: sign-in, job board, storefronts and order tracking.
pub mod public;

/// Any signed-in user.
pub mod member;

pub mod admin;
pub mod shop;
pub mod student;
pub mod superadmin;
pub mod tutor;

/// Puts `router` behind `gate`.
pub(crate) fn gated(router: Router<AppState>, state: &AppState, gate: Gate) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        (state.clone(), gate),
        require_gate,
    ))
}
