use axum::{
    Form,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthContext,
    error::AppError,
    handlers::{ORDERS_PER_PAGE, PRODUCTS_PER_PAGE, non_blank},
    lifecycle::{Lifecycle, OrderStatus, Timeline},
    models::{
        ActionMessage, CreateShopForm, NewProduct, Order, OrderItem, OrderStatusForm, Pagination,
        Product, ProductForm, Shop,
    },
    response::{Outcome, Page, attempt},
};

pub const SHOP_ORDERS_PATH: &str = "/shop/orders";

/// ShopQuery
///
/// `?shop_id=&page=` for the owner's product and order lists. Without `shop_id` the
/// owner's first shop is used.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ShopQuery {
    #[serde(default, deserialize_with = "crate::models::empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub shop_id: Option<Uuid>,
    pub page: Option<i64>,
}

impl ShopQuery {
    fn paginate(&self, per_page: i64, total: i64) -> Pagination {
        Pagination::new(self.page.unwrap_or(1).max(1), per_page, total)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopDashboard {
    pub shops: Vec<Shop>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopProducts {
    pub shop: Shop,
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShopOrders {
    pub shop: Shop,
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

/// Order detail with its progress timeline.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub timeline: Timeline<OrderStatus>,
}

/// Resolves the shop a request acts on, which must belong to `owner_id`.
async fn owned_shop(
    state: &AppState,
    shop_id: Option<Uuid>,
    owner_id: i64,
) -> Result<Shop, AppError> {
    let shop = match shop_id {
        Some(id) => state.repo.get_shop(id).await?,
        None => state.repo.shops_by_owner(owner_id).await?.into_iter().next(),
    };
    shop.filter(|shop| shop.owner_id == owner_id)
        .ok_or_else(|| AppError::Validation("Invalid shop".to_string()))
}

/// Checks the product form and pins it to one of the caller's shops.
async fn validated_product(
    state: &AppState,
    form: ProductForm,
    owner_id: i64,
) -> Result<NewProduct, AppError> {
    let shop_id = form
        .shop_id
        .ok_or_else(|| AppError::Validation("Invalid shop".to_string()))?;
    let shop = owned_shop(state, Some(shop_id), owner_id).await?;

    let name = form.name.trim();
    let price = form.price.filter(|price| *price >= 0);
    let Some(price) = price.filter(|_| !name.is_empty()) else {
        return Err(AppError::Validation(
            "Product name and a valid price are required.".to_string(),
        ));
    };

    Ok(NewProduct {
        shop_id: shop.id,
        name: name.to_string(),
        description: form.description.trim().to_string(),
        price,
        image_url: non_blank(form.image_url),
    })
}

/// Loads a product whose shop belongs to `owner_id`.
async fn owned_product(state: &AppState, id: Uuid, owner_id: i64) -> Result<Product, AppError> {
    let product = state
        .repo
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    owned_shop(state, Some(product.shop_id), owner_id).await?;
    Ok(product)
}

/// shop_dashboard
///
/// [Shop Route] The caller's shops.
#[utoipa::path(
    get,
    path = "/shop/dashboard",
    responses((status = 200, description = "Owned shops", body = ShopDashboard))
)]
pub async fn shop_dashboard(
    user: AuthContext,
    State(state): State<AppState>,
) -> Outcome<Page<ShopDashboard>> {
    let shops = attempt!(state.repo.shops_by_owner(user.id).await);
    Outcome::Data(Page::new(user, ShopDashboard { shops }))
}

/// create_shop
///
/// [Shop Route] Opens a shop. The public handle is derived from the name and must be unique.
#[utoipa::path(
    post,
    path = "/shop/shops",
    request_body(content = CreateShopForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Shop created", body = Shop),
        (status = 400, description = "Missing name", body = crate::error::ErrorBody),
        (status = 409, description = "Handle taken", body = crate::error::ErrorBody)
    )
)]
pub async fn create_shop(
    user: AuthContext,
    State(state): State<AppState>,
    Form(mut form): Form<CreateShopForm>,
) -> Outcome<Shop> {
    form.name = form.name.trim().to_string();
    if form.name.is_empty() {
        return AppError::Validation("Shop name is required.".to_string()).into();
    }
    form.phone = non_blank(form.phone);
    form.location = non_blank(form.location);

    let handle = Shop::handle_for(&form.name);
    let shop = attempt!(state.repo.create_shop(user.id, handle, form).await);
    tracing::info!(shop_id = %shop.id, handle = %shop.handle, owner_id = user.id, "shop created");
    Outcome::Data(shop)
}

/// list_products
///
/// [Shop Route] Products of one of the caller's shops, newest first.
#[utoipa::path(
    get,
    path = "/shop/products",
    params(ShopQuery),
    responses(
        (status = 200, description = "Products", body = ShopProducts),
        (status = 400, description = "Invalid shop", body = crate::error::ErrorBody)
    )
)]
pub async fn list_products(
    user: AuthContext,
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Outcome<Page<ShopProducts>> {
    let shop = attempt!(owned_shop(&state, query.shop_id, user.id).await);
    let total = attempt!(state.repo.count_products(shop.id).await);
    let pagination = query.paginate(PRODUCTS_PER_PAGE, total);
    let products = attempt!(state.repo.list_products(shop.id, Some(&pagination)).await);

    Outcome::Data(Page::new(
        user,
        ShopProducts {
            shop,
            products,
            pagination,
        },
    ))
}

/// create_product
#[utoipa::path(
    post,
    path = "/shop/products",
    request_body(content = ProductForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Product created", body = Product),
        (status = 400, description = "Invalid shop or fields", body = crate::error::ErrorBody)
    )
)]
pub async fn create_product(
    user: AuthContext,
    State(state): State<AppState>,
    Form(form): Form<ProductForm>,
) -> Outcome<Product> {
    let product = attempt!(validated_product(&state, form, user.id).await);
    let product = attempt!(state.repo.create_product(product).await);
    tracing::info!(product_id = %product.id, shop_id = %product.shop_id, "product created");
    Outcome::Data(product)
}

/// update_product
///
/// [Shop Route] Replaces a product's fields. Both the current and the target shop must
/// belong to the caller.
#[utoipa::path(
    put,
    path = "/shop/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body(content = ProductForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Invalid shop or fields", body = crate::error::ErrorBody),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_product(
    user: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(mut form): Form<ProductForm>,
) -> Outcome<Product> {
    let existing = attempt!(owned_product(&state, id, user.id).await);
    form.shop_id = form.shop_id.or(Some(existing.shop_id));
    let product = attempt!(validated_product(&state, form, user.id).await);

    match attempt!(state.repo.update_product(id, product).await) {
        Some(updated) => Outcome::Data(updated),
        None => AppError::not_found("Product").into(),
    }
}

/// delete_product
#[utoipa::path(
    delete,
    path = "/shop/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = ActionMessage),
        (status = 400, description = "Invalid shop", body = crate::error::ErrorBody),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_product(
    user: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Outcome<ActionMessage> {
    attempt!(owned_product(&state, id, user.id).await);
    if !attempt!(state.repo.delete_product(id).await) {
        return AppError::not_found("Product").into();
    }
    tracing::info!(product_id = %id, "product deleted");
    Outcome::Data(ActionMessage::success("Product deleted successfully."))
}

/// list_orders
///
/// [Shop Route] Orders of one of the caller's shops, newest first.
#[utoipa::path(
    get,
    path = "/shop/orders",
    params(ShopQuery),
    responses(
        (status = 200, description = "Orders", body = ShopOrders),
        (status = 400, description = "Invalid shop", body = crate::error::ErrorBody)
    )
)]
pub async fn list_orders(
    user: AuthContext,
    State(state): State<AppState>,
    Query(query): Query<ShopQuery>,
) -> Outcome<Page<ShopOrders>> {
    let shop = attempt!(owned_shop(&state, query.shop_id, user.id).await);
    let total = attempt!(state.repo.count_orders(shop.id).await);
    let pagination = query.paginate(ORDERS_PER_PAGE, total);
    let orders = attempt!(state.repo.list_orders(shop.id, &pagination).await);

    Outcome::Data(Page::new(
        user,
        ShopOrders {
            shop,
            orders,
            pagination,
        },
    ))
}

/// order_detail
///
/// [Shop Route] One order with its items and timeline. Orders of shops the caller does not
/// own redirect back to the order list.
#[utoipa::path(
    get,
    path = "/shop/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with items and timeline"),
        (status = 303, description = "Order belongs to another shop"),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody)
    )
)]
pub async fn order_detail(
    user: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Outcome<Page<OrderDetail>> {
    let Some(order) = attempt!(state.repo.get_order(id).await) else {
        return AppError::not_found("Order").into();
    };
    match owned_shop(&state, Some(order.shop_id), user.id).await {
        Ok(_) => {}
        Err(AppError::Validation(_)) => return Outcome::redirect(SHOP_ORDERS_PATH),
        Err(e) => return e.into(),
    }

    let items = attempt!(state.repo.order_items(id).await);
    let timeline = order.status.timeline(order.created_at, order.updated_at);
    Outcome::Data(Page::new(
        user,
        OrderDetail {
            order,
            items,
            timeline,
        },
    ))
}

/// set_order_status
///
/// [Shop Route] Moves an order to any status; no transition rules apply.
#[utoipa::path(
    post,
    path = "/shop/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body(content = OrderStatusForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Status updated", body = Order),
        (status = 404, description = "Order not found", body = crate::error::ErrorBody)
    )
)]
pub async fn set_order_status(
    user: AuthContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<OrderStatusForm>,
) -> Outcome<Order> {
    let Some(order) = attempt!(state.repo.get_order(id).await) else {
        return AppError::not_found("Order").into();
    };
    // Foreign orders are reported as missing.
    match owned_shop(&state, Some(order.shop_id), user.id).await {
        Ok(_) => {}
        Err(AppError::Validation(_)) => return AppError::not_found("Order").into(),
        Err(e) => return e.into(),
    }

    match attempt!(state.repo.set_order_status(id, form.status).await) {
        Some(updated) => {
            tracing::info!(order_id = %id, status = updated.status.as_str(), "order status updated");
            Outcome::Data(updated)
        }
        None => AppError::not_found("Order").into(),
    }
}
