use crate::{
    AppState,
    auth::Gate,
    handlers::shop,
    models::Role,
    routes::gated,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Shop-owner back office, nested under `/shop`. Every product and order action is scoped
/// to shops the caller owns.
pub fn shop_routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/dashboard", get(shop::shop_dashboard))
        .route("/shops", post(shop::create_shop))
        .route(
            "/products",
            get(shop::list_products).post(shop::create_product),
        )
        .route(
            "/products/{id}",
            put(shop::update_product).delete(shop::delete_product),
        )
        .route("/orders", get(shop::list_orders))
        .route("/orders/{id}", get(shop::order_detail))
        .route("/orders/{id}/status", post(shop::set_order_status));
    gated(router, state, Gate::roles(&[Role::Shop]))
}
