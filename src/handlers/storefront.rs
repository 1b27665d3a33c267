use axum::{
    Form,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    handlers::non_blank,
    lifecycle::{OrderStatus, Timeline},
    models::{NewOrder, Order, OrderItem, PlaceOrderForm, Product, Shop},
    recent_orders::RecentOrder,
    response::{Outcome, attempt},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct Storefront {
    pub shop: Shop,
    pub products: Vec<Product>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ThanksQuery {
    #[serde(alias = "orderId")]
    pub order_id: Option<String>,
}

/// OrderPlaced
///
/// Confirmation shown after checkout. `recent_order` is the entry the customer's browser
/// keeps in its recent-orders list.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderPlaced {
    pub order_id: String,
    pub tracking_url: String,
    pub recent_order: RecentOrder,
}

#[derive(Debug, Serialize)]
pub struct OrderTracking {
    pub order: Order,
    pub shop_name: String,
    pub shop_phone: Option<String>,
    pub items: Vec<OrderItem>,
    pub timeline: Timeline<OrderStatus>,
}

/// Public link to an order's tracking page.
pub fn tracking_url(base_url: &str, handle: &str, order_id: &str) -> String {
    format!("{base_url}/shops/{handle}/track/{order_id}")
}

async fn shop_by_handle(state: &AppState, handle: &str) -> Result<Shop, AppError> {
    state
        .repo
        .get_shop_by_handle(handle)
        .await?
        .ok_or_else(|| AppError::not_found("Shop"))
}

/// storefront
///
/// [Public Route] A shop and its whole catalogue.
#[utoipa::path(
    get,
    path = "/shops/{handle}",
    params(("handle" = String, Path, description = "Shop handle, e.g. @RimiCakeShop")),
    responses(
        (status = 200, description = "Shop with products", body = Storefront),
        (status = 404, description = "Shop not found", body = crate::error::ErrorBody)
    )
)]
pub async fn storefront(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Outcome<Storefront> {
    let shop = attempt!(shop_by_handle(&state, &handle).await);
    let products = attempt!(state.repo.list_products(shop.id, None).await);
    Outcome::Data(Storefront { shop, products })
}

/// place_order
///
/// [Public Route] Checkout of a single product. The order and its item are written together
/// with status `pending` and the product's current price, then the customer is sent to the
/// thank-you page.
#[utoipa::path(
    post,
    path = "/shops/{handle}/orders",
    params(("handle" = String, Path, description = "Shop handle")),
    request_body(content = PlaceOrderForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Order placed, redirect to thank-you page"),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorBody),
        (status = 404, description = "Shop or product not found", body = crate::error::ErrorBody)
    )
)]
pub async fn place_order(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Form(form): Form<PlaceOrderForm>,
) -> Outcome<()> {
    let shop = attempt!(shop_by_handle(&state, &handle).await);

    let (Some(customer_name), Some(customer_phone), Some(product_id), Some(quantity)) = (
        non_blank(form.customer_name),
        non_blank(form.customer_phone),
        form.product_id,
        form.quantity.filter(|quantity| *quantity >= 1),
    ) else {
        return AppError::Validation(
            "Name, phone, product and a quantity of at least 1 are required.".to_string(),
        )
        .into();
    };

    let product = attempt!(state.repo.get_product(product_id).await);
    let Some(product) = product.filter(|product| product.shop_id == shop.id) else {
        return AppError::not_found("Product").into();
    };

    let Some(total) = product.price.checked_mul(i64::from(quantity)) else {
        return AppError::Validation("Order total is too large.".to_string()).into();
    };

    let order = attempt!(
        state
            .repo
            .place_order(NewOrder {
                shop_id: shop.id,
                customer_name,
                customer_phone,
                customer_address: non_blank(form.customer_address),
                product_id: product.id,
                quantity,
                unit_price: product.price,
                total,
            })
            .await
    );

    tracing::info!(order_id = %order.id, shop = %shop.handle, total = order.total, "order placed");
    Outcome::redirect(format!("/shops/{}/thanks?order_id={}", shop.handle, order.id))
}

/// order_placed
///
/// [Public Route] Thank-you page data: the tracking link and the recent-orders entry.
#[utoipa::path(
    get,
    path = "/shops/{handle}/thanks",
    params(("handle" = String, Path, description = "Shop handle"), ThanksQuery),
    responses(
        (status = 200, description = "Tracking link", body = OrderPlaced),
        (status = 400, description = "Missing order id", body = crate::error::ErrorBody),
        (status = 404, description = "Shop not found", body = crate::error::ErrorBody)
    )
)]
pub async fn order_placed(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<ThanksQuery>,
) -> Outcome<OrderPlaced> {
    let Some(order_id) = non_blank(query.order_id) else {
        return AppError::Validation("Order id is required.".to_string()).into();
    };
    let shop = attempt!(shop_by_handle(&state, &handle).await);

    let tracking_url = tracking_url(&state.config.public_base_url, &shop.handle, &order_id);
    Outcome::Data(OrderPlaced {
        recent_order: RecentOrder {
            date: Utc::now(),
            order_id: order_id.clone(),
            tracking_url: tracking_url.clone(),
            shop: shop.handle,
        },
        order_id,
        tracking_url,
    })
}

/// track_order
///
/// [Public Route] Anyone holding the link can follow the order. Orders of other shops are
/// reported as missing.
#[utoipa::path(
    get,
    path = "/shops/{handle}/track/{order_id}",
    params(
        ("handle" = String, Path, description = "Shop handle"),
        ("order_id" = String, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "Order with items and timeline"),
        (status = 404, description = "Shop or order not found", body = crate::error::ErrorBody)
    )
)]
pub async fn track_order(
    State(state): State<AppState>,
    Path((handle, order_id)): Path<(String, String)>,
) -> Outcome<OrderTracking> {
    let shop = attempt!(shop_by_handle(&state, &handle).await);
    // A malformed id in a shared link is just an unknown order.
    let Ok(order_id) = order_id.parse::<Uuid>() else {
        return AppError::not_found("Order").into();
    };
    let order = attempt!(state.repo.get_order(order_id).await);
    let Some(order) = order.filter(|order| order.shop_id == shop.id) else {
        return AppError::not_found("Order").into();
    };

    let items = attempt!(state.repo.order_items(order.id).await);
    let timeline = order.status.timeline(order.created_at, order.updated_at);
    Outcome::Data(OrderTracking {
        shop_name: shop.name,
        shop_phone: shop.phone,
        items,
        timeline,
        order,
    })
}
