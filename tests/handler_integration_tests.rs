use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::Response,
};
use chrono::{Duration, Utc};
use jobify_portal::{
    AppConfig, AppState, InMemoryRepository,
    auth::{AuthContext, MaybeSession},
    error::AppError,
    handlers::{
        PageQuery, account, admin,
        jobs::{self, JobBoardQuery},
        shop, storefront, student, superadmin, tutor,
    },
    lifecycle::{ApplicationStage, JobStatus, OrderStatus},
    models::{
        CreateJobForm, CreateShopForm, Job, JobFilter, JobStatusForm, Order, OrderStatusForm,
        PlaceOrderForm, ProductForm, ProfileForm, Role, RoleForm, SignInForm, SignUpForm,
        StageForm, User,
    },
    repository::{Repository, RepositoryState},
    response::Outcome,
    seed::seed_superadmin,
    session::SessionClaim,
};
use uuid::Uuid;

// --- Fixtures ---

struct TestCtx {
    repo: Arc<InMemoryRepository>,
    state: AppState,
}

fn test_ctx() -> TestCtx {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: AppConfig::default(),
    };
    TestCtx { repo, state }
}

fn user(id: i64, role: Role) -> User {
    User {
        id,
        name: format!("User {id}"),
        email: format!("user{id}@example.com"),
        phone: Some(format!("0170000000{id}")),
        role,
        password_hash: String::new(),
        created_at: Utc::now(),
    }
}

fn ctx_of(id: i64, role: Role) -> AuthContext {
    AuthContext::from(&user(id, role))
}

fn job(id: i64) -> Job {
    Job {
        id,
        title: format!("Physics tutor #{id}"),
        location: "Dhanmondi".to_string(),
        publisher: "Jobify".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        ..Job::default()
    }
}

fn session_for(u: &User) -> MaybeSession {
    MaybeSession(Some(SessionClaim::for_user(u, 3600)))
}

/// Unwraps `Outcome::Data`, failing the test on anything else.
fn data<T: std::fmt::Debug>(outcome: Outcome<T>) -> T {
    match outcome {
        Outcome::Data(data) => data,
        other => panic!("expected data, got {other:?}"),
    }
}

fn error<T: std::fmt::Debug>(outcome: Outcome<T>) -> (StatusCode, String) {
    match outcome {
        Outcome::Error(err) => (err.status(), err.public_message()),
        other => panic!("expected an error, got {other:?}"),
    }
}

fn redirect<T: std::fmt::Debug>(outcome: Outcome<T>) -> String {
    match outcome {
        Outcome::Redirect(location) => location,
        other => panic!("expected a redirect, got {other:?}"),
    }
}

fn header_of<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// --- Applying to jobs ---

#[tokio::test]
async fn test_apply_twice_is_rejected_and_stores_one_application() {
    let ctx = test_ctx();
    let tutor = ctx.repo.insert_user(user(7, Role::Tutor)).await;
    ctx.repo.insert_job(job(42)).await;

    let first = jobs::apply_to_job(
        State(ctx.state.clone()),
        Path(42),
        session_for(&tutor),
    )
    .await;
    assert_eq!(data(first).message, "Applied successfully");

    let second = jobs::apply_to_job(
        State(ctx.state.clone()),
        Path(42),
        session_for(&tutor),
    )
    .await;
    assert_eq!(
        error(second),
        (StatusCode::CONFLICT, "Already applied".to_string())
    );

    assert_eq!(ctx.repo.application_count(7, 42).await, 1);
}

#[tokio::test]
async fn test_apply_without_session_is_unauthorized() {
    let ctx = test_ctx();
    ctx.repo.insert_job(job(42)).await;

    let outcome = jobs::apply_to_job(State(ctx.state), Path(42), MaybeSession(None)).await;

    assert_eq!(
        error(outcome),
        (StatusCode::UNAUTHORIZED, "User not authenticated".to_string())
    );
}

#[tokio::test]
async fn test_apply_to_unknown_job_is_not_found() {
    let ctx = test_ctx();
    let tutor = ctx.repo.insert_user(user(7, Role::Tutor)).await;

    let outcome = jobs::apply_to_job(State(ctx.state), Path(404), session_for(&tutor)).await;

    assert_eq!(error(outcome).0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_job_details_counts_views_and_reports_application() {
    let ctx = test_ctx();
    let tutor = ctx.repo.insert_user(user(7, Role::Tutor)).await;
    ctx.repo.insert_job(job(42)).await;
    data(jobs::apply_to_job(State(ctx.state.clone()), Path(42), session_for(&tutor)).await);

    let anonymous = data(jobs::job_details(State(ctx.state.clone()), Path(42), MaybeSession(None)).await);
    assert_eq!(anonymous.job.views, 1);
    assert!(!anonymous.has_applied);

    let details = data(jobs::job_details(State(ctx.state), Path(42), session_for(&tutor)).await);
    assert_eq!(details.job.views, 2);
    assert!(details.has_applied);
    assert_eq!(details.application_count, 1);
}

// --- Job board ---

#[tokio::test]
async fn test_today_filter_hides_older_jobs() {
    let ctx = test_ctx();
    ctx.repo.insert_job(job(1)).await;
    ctx.repo
        .insert_job(Job {
            created_at: Utc::now() - Duration::days(3),
            ..job(2)
        })
        .await;

    let board = data(
        jobs::list_jobs(
            State(ctx.state),
            Query(JobBoardQuery {
                search: None,
                filter: Some(JobFilter::Today),
            }),
        )
        .await,
    );

    assert_eq!(board.total, 1);
    assert_eq!(board.jobs[0].id, 1);
}

#[tokio::test]
async fn test_create_job_requires_title_location_and_publisher() {
    let ctx = test_ctx();

    let outcome = jobs::create_job(
        ctx_of(1, Role::Admin),
        State(ctx.state.clone()),
        Form(CreateJobForm {
            title: "  ".to_string(),
            location: "Mirpur".to_string(),
            publisher: "Jobify".to_string(),
            ..CreateJobForm::default()
        }),
    )
    .await;
    assert_eq!(error(outcome).0, StatusCode::BAD_REQUEST);

    let created = data(
        jobs::create_job(
            ctx_of(1, Role::Admin),
            State(ctx.state),
            Form(CreateJobForm {
                title: "Chemistry tutor".to_string(),
                location: "Mirpur".to_string(),
                publisher: "Jobify".to_string(),
                ..CreateJobForm::default()
            }),
        )
        .await,
    );
    assert_eq!(created.data.job.posted_by_id, Some(1));
    assert_eq!(created.user.role, Role::Admin);
}

// --- Admin ---

#[tokio::test]
async fn test_second_admin_cannot_claim_a_managed_job() {
    let ctx = test_ctx();
    ctx.repo.insert_job(job(42)).await;

    let claimed = admin::claim_job(ctx_of(1, Role::Admin), State(ctx.state.clone()), Path(42)).await;
    assert!(data(claimed).success);

    let lost = admin::claim_job(ctx_of(2, Role::Admin), State(ctx.state.clone()), Path(42)).await;
    assert_eq!(error(lost).0, StatusCode::CONFLICT);

    let stored = ctx.state.repo.get_job(42).await.unwrap().unwrap();
    assert_eq!(stored.managed_by_id, Some(1));
}

#[tokio::test]
async fn test_claim_unknown_job_is_not_found() {
    let ctx = test_ctx();
    let outcome = admin::claim_job(ctx_of(1, Role::Admin), State(ctx.state), Path(9)).await;
    assert_eq!(error(outcome).0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_the_manager_sees_applications() {
    let ctx = test_ctx();
    ctx.repo.insert_job(job(42)).await;
    data(admin::claim_job(ctx_of(1, Role::Admin), State(ctx.state.clone()), Path(42)).await);

    let outcome = admin::job_applications(
        ctx_of(2, Role::Admin),
        State(ctx.state.clone()),
        Path(42),
        Query(PageQuery::default()),
    )
    .await;
    assert_eq!(
        error(outcome),
        (
            StatusCode::FORBIDDEN,
            "Forbidden: You are not the manager of this job".to_string()
        )
    );

    let page = data(
        admin::job_applications(
            ctx_of(1, Role::Admin),
            State(ctx.state),
            Path(42),
            Query(PageQuery::default()),
        )
        .await,
    );
    assert_eq!(page.data.pagination.total_items, 0);
}

#[tokio::test]
async fn test_manager_moves_application_to_any_stage() {
    let ctx = test_ctx();
    let tutor = ctx.repo.insert_user(user(7, Role::Tutor)).await;
    ctx.repo.insert_job(job(42)).await;
    data(jobs::apply_to_job(State(ctx.state.clone()), Path(42), session_for(&tutor)).await);
    data(admin::claim_job(ctx_of(1, Role::Admin), State(ctx.state.clone()), Path(42)).await);
    let application = ctx.state.repo.find_application(7, 42).await.unwrap().unwrap();

    let outsider = admin::set_application_stage(
        ctx_of(2, Role::Admin),
        State(ctx.state.clone()),
        Path(application.id),
        Form(StageForm {
            stage: ApplicationStage::Hired,
        }),
    )
    .await;
    assert_eq!(error(outsider).0, StatusCode::FORBIDDEN);

    // No transition rules: straight from APPLIED to ON_TRIAL.
    let updated = data(
        admin::set_application_stage(
            ctx_of(1, Role::Admin),
            State(ctx.state),
            Path(application.id),
            Form(StageForm {
                stage: ApplicationStage::OnTrial,
            }),
        )
        .await,
    );
    assert_eq!(updated.stage, ApplicationStage::OnTrial);
}

// --- Accounts ---

#[tokio::test]
async fn test_sign_up_then_sign_in_sets_cookie_and_redirects() {
    let ctx = test_ctx();
    let form = SignUpForm {
        name: "Nadia".to_string(),
        email: "nadia@example.com".to_string(),
        phone: "01811111111".to_string(),
        password: "correct horse".to_string(),
        account: Some(Role::Tutor),
    };

    let created = account::sign_up(State(ctx.state.clone()), Form(form.clone())).await;
    assert_eq!(redirect(created), "/auth/signin");

    let duplicate = account::sign_up(State(ctx.state.clone()), Form(form.clone())).await;
    assert_eq!(
        error(duplicate),
        (
            StatusCode::CONFLICT,
            "User already exists with this email.".to_string()
        )
    );

    let wrong = account::sign_in(
        State(ctx.state.clone()),
        Form(SignInForm {
            email_or_phone: "nadia@example.com".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    // Phone works as a login as well.
    let response = account::sign_in(
        State(ctx.state),
        Form(SignInForm {
            email_or_phone: "01811111111".to_string(),
            password: "correct horse".to_string(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_of(&response, header::LOCATION), "/tutor/dashboard");
    assert!(header_of(&response, header::SET_COOKIE).starts_with("token="));
}

#[tokio::test]
async fn test_sign_up_rejects_duplicate_phone_and_admin_accounts() {
    let ctx = test_ctx();
    ctx.repo.insert_user(user(1, Role::Tutor)).await;

    let duplicate_phone = account::sign_up(
        State(ctx.state.clone()),
        Form(SignUpForm {
            name: "Other".to_string(),
            email: "other@example.com".to_string(),
            phone: "01700000001".to_string(),
            password: "pw".to_string(),
            account: None,
        }),
    )
    .await;
    assert_eq!(
        error(duplicate_phone),
        (
            StatusCode::CONFLICT,
            "User already exists with this phone number.".to_string()
        )
    );

    let admin = account::sign_up(
        State(ctx.state),
        Form(SignUpForm {
            name: "Sneaky".to_string(),
            email: "sneaky@example.com".to_string(),
            phone: "01900000000".to_string(),
            password: "pw".to_string(),
            account: Some(Role::Admin),
        }),
    )
    .await;
    assert_eq!(error(admin).0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_in_unknown_user() {
    let ctx = test_ctx();
    let response = account::sign_in(
        State(ctx.state),
        Form(SignInForm {
            email_or_phone: "ghost@example.com".to_string(),
            password: "pw".to_string(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_in_visitor_skips_sign_in_page() {
    let outcome = account::sign_in_page(session_for(&user(3, Role::Shop))).await;
    assert_eq!(redirect(outcome), "/shop/dashboard");

    let page = data(account::sign_in_page(MaybeSession(None)).await);
    assert_eq!(page.account_types, vec![Role::Tutor, Role::Student, Role::Shop]);
}

// --- Superadmin ---

#[tokio::test]
async fn test_superadmin_cannot_delete_self() {
    let ctx = test_ctx();
    ctx.repo.insert_user(user(1, Role::Superadmin)).await;

    let outcome =
        superadmin::delete_user(ctx_of(1, Role::Superadmin), State(ctx.state.clone()), Path(1)).await;
    assert_eq!(error(outcome).0, StatusCode::BAD_REQUEST);

    let missing =
        superadmin::delete_user(ctx_of(1, Role::Superadmin), State(ctx.state), Path(2)).await;
    assert_eq!(error(missing).0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_superadmin_dashboard_counts_roles() {
    let ctx = test_ctx();
    ctx.repo.insert_user(user(1, Role::Superadmin)).await;
    ctx.repo.insert_user(user(2, Role::Admin)).await;
    ctx.repo.insert_user(user(3, Role::Tutor)).await;
    ctx.repo.insert_job(job(1)).await;

    let page = data(superadmin::superadmin_dashboard(ctx_of(1, Role::Superadmin), State(ctx.state)).await);
    let stats = page.data.stats;

    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.new_users_today, 3);
    assert_eq!(stats.admin_count, 1);
    assert_eq!(stats.tutor_count, 1);
    assert_eq!(stats.superadmin_count, 1);
    assert_eq!(stats.total_jobs, 1);
}

// --- Shops, storefront and orders ---

async fn open_shop(ctx: &TestCtx, owner: i64, name: &str) -> jobify_portal::models::Shop {
    data(
        shop::create_shop(
            ctx_of(owner, Role::Shop),
            State(ctx.state.clone()),
            Form(CreateShopForm {
                name: name.to_string(),
                phone: Some("01555555555".to_string()),
                location: None,
            }),
        )
        .await,
    )
}

async fn add_product(
    ctx: &TestCtx,
    owner: i64,
    shop_id: Uuid,
    price: i64,
) -> jobify_portal::models::Product {
    data(
        shop::create_product(
            ctx_of(owner, Role::Shop),
            State(ctx.state.clone()),
            Form(ProductForm {
                shop_id: Some(shop_id),
                name: "Chocolate cake".to_string(),
                description: "Two pounds".to_string(),
                price: Some(price),
                image_url: None,
            }),
        )
        .await,
    )
}

fn order_form(product_id: Uuid, quantity: i32) -> PlaceOrderForm {
    PlaceOrderForm {
        customer_name: Some("Karim".to_string()),
        customer_phone: Some("01612345678".to_string()),
        customer_address: Some("House 4, Road 2".to_string()),
        product_id: Some(product_id),
        quantity: Some(quantity),
    }
}

#[tokio::test]
async fn test_shop_handle_is_derived_and_unique() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;
    assert_eq!(shop.handle, "@RimiCakes");

    let clash = shop::create_shop(
        ctx_of(6, Role::Shop),
        State(ctx.state.clone()),
        Form(CreateShopForm {
            name: "Rimi-Cakes".to_string(),
            ..CreateShopForm::default()
        }),
    )
    .await;
    assert_eq!(error(clash).0, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_products_are_scoped_to_owned_shops() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;

    let foreign = shop::create_product(
        ctx_of(6, Role::Shop),
        State(ctx.state.clone()),
        Form(ProductForm {
            shop_id: Some(shop.id),
            name: "Stolen cake".to_string(),
            price: Some(10),
            ..ProductForm::default()
        }),
    )
    .await;
    assert_eq!(
        error(foreign),
        (StatusCode::BAD_REQUEST, "Invalid shop".to_string())
    );

    let product = add_product(&ctx, 5, shop.id, 1200).await;
    let removal =
        shop::delete_product(ctx_of(6, Role::Shop), State(ctx.state.clone()), Path(product.id)).await;
    assert_eq!(error(removal).0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_list_pages_by_three() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;
    for price in [100, 200, 300, 400] {
        add_product(&ctx, 5, shop.id, price).await;
    }

    let page = data(
        shop::list_products(
            ctx_of(5, Role::Shop),
            State(ctx.state),
            Query(shop::ShopQuery {
                shop_id: None,
                page: Some(2),
            }),
        )
        .await,
    );

    assert_eq!(page.data.pagination.total_pages, 2);
    assert_eq!(page.data.products.len(), 1);
}

#[tokio::test]
async fn test_order_is_placed_priced_and_trackable() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;
    let product = add_product(&ctx, 5, shop.id, 1200).await;

    let location = redirect(
        storefront::place_order(
            State(ctx.state.clone()),
            Path(shop.handle.clone()),
            Form(order_form(product.id, 2)),
        )
        .await,
    );
    let order_id = location
        .split_once("order_id=")
        .map(|(_, id)| id.to_string())
        .unwrap();
    assert!(location.starts_with("/shops/@RimiCakes/thanks"));

    let order = ctx
        .state
        .repo
        .get_order(order_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.total, 2400);
    assert_eq!(order.status, OrderStatus::Pending);

    let thanks = data(
        storefront::order_placed(
            State(ctx.state.clone()),
            Path(shop.handle.clone()),
            Query(storefront::ThanksQuery {
                order_id: Some(order_id.clone()),
            }),
        )
        .await,
    );
    assert_eq!(
        thanks.tracking_url,
        format!("http://localhost:3000/shops/@RimiCakes/track/{order_id}")
    );
    assert_eq!(thanks.recent_order.shop, "@RimiCakes");

    let tracking = data(
        storefront::track_order(
            State(ctx.state.clone()),
            Path((shop.handle.clone(), order_id.clone())),
        )
        .await,
    );
    assert_eq!(tracking.shop_name, "rimi cakes");
    assert_eq!(tracking.items[0].product_name.as_deref(), Some("Chocolate cake"));
    assert_eq!(tracking.items[0].price, 1200);
    assert!(tracking.timeline.steps[0].is_current);

    // The price at purchase survives later product edits.
    data(
        shop::update_product(
            ctx_of(5, Role::Shop),
            State(ctx.state.clone()),
            Path(product.id),
            Form(ProductForm {
                shop_id: None,
                name: "Chocolate cake".to_string(),
                description: String::new(),
                price: Some(1500),
                image_url: None,
            }),
        )
        .await,
    );
    let items = ctx.state.repo.order_items(order.id).await.unwrap();
    assert_eq!(items[0].price, 1200);
}

#[tokio::test]
async fn test_order_validation_and_foreign_products() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;
    let other = open_shop(&ctx, 6, "gadget hub").await;
    let foreign_product = add_product(&ctx, 6, other.id, 50).await;
    let product = add_product(&ctx, 5, shop.id, 1200).await;

    let zero = storefront::place_order(
        State(ctx.state.clone()),
        Path(shop.handle.clone()),
        Form(order_form(product.id, 0)),
    )
    .await;
    assert_eq!(error(zero).0, StatusCode::BAD_REQUEST);

    let missing_name = storefront::place_order(
        State(ctx.state.clone()),
        Path(shop.handle.clone()),
        Form(PlaceOrderForm {
            customer_name: Some(" ".to_string()),
            ..order_form(product.id, 1)
        }),
    )
    .await;
    assert_eq!(error(missing_name).0, StatusCode::BAD_REQUEST);

    let wrong_shop = storefront::place_order(
        State(ctx.state.clone()),
        Path(shop.handle.clone()),
        Form(order_form(foreign_product.id, 1)),
    )
    .await;
    assert_eq!(error(wrong_shop).0, StatusCode::NOT_FOUND);

    let unknown_shop = storefront::storefront(State(ctx.state), Path("@Nobody".to_string())).await;
    assert_eq!(error(unknown_shop).0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_thanks_without_order_id_is_rejected() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;

    let outcome = storefront::order_placed(
        State(ctx.state),
        Path(shop.handle),
        Query(storefront::ThanksQuery { order_id: None }),
    )
    .await;
    assert_eq!(error(outcome).0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_detail_and_status_are_owner_only() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;
    let product = add_product(&ctx, 5, shop.id, 300).await;
    let location = redirect(
        storefront::place_order(
            State(ctx.state.clone()),
            Path(shop.handle.clone()),
            Form(order_form(product.id, 1)),
        )
        .await,
    );
    let order_id: Uuid = location.split_once("order_id=").unwrap().1.parse().unwrap();

    let foreign = shop::order_detail(ctx_of(6, Role::Shop), State(ctx.state.clone()), Path(order_id)).await;
    assert_eq!(redirect(foreign), shop::SHOP_ORDERS_PATH);

    let cancelled = data(
        shop::set_order_status(
            ctx_of(5, Role::Shop),
            State(ctx.state.clone()),
            Path(order_id),
            Form(OrderStatusForm {
                status: OrderStatus::Cancelled,
            }),
        )
        .await,
    );
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let detail = data(shop::order_detail(ctx_of(5, Role::Shop), State(ctx.state), Path(order_id)).await);
    let terminal = detail.data.timeline.terminal.unwrap();
    assert_eq!(terminal.label, "Cancelled");
    assert_eq!(detail.data.timeline.steps.len(), 2);
}

#[tokio::test]
async fn test_store_conflict_renders_as_conflict() {
    let err = AppError::from(jobify_portal::repository::RepositoryError::Conflict(
        "Shop handle already taken".to_string(),
    ));
    assert_eq!(err.status(), StatusCode::CONFLICT);
    assert_eq!(err.public_message(), "Shop handle already taken");
}

// --- Superadmin seed ---

#[tokio::test]
async fn test_superadmin_seed_runs_once() {
    let ctx = test_ctx();
    let config = AppConfig {
        superadmin_email: Some("root@jobify.test".to_string()),
        superadmin_password: Some("s3cret".to_string()),
        ..AppConfig::default()
    };

    assert!(seed_superadmin(&*ctx.repo, &config).await.unwrap());
    assert!(!seed_superadmin(&*ctx.repo, &config).await.unwrap());

    let seeded = ctx
        .state
        .repo
        .find_user_by_login("root@jobify.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seeded.role, Role::Superadmin);
}

#[tokio::test]
async fn test_superadmin_seed_skipped_without_credentials() {
    let ctx = test_ctx();
    assert!(!seed_superadmin(&*ctx.repo, &AppConfig::default()).await.unwrap());
    assert!(ctx.state.repo.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_orders_are_tracked_only_under_their_shop() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;
    let other = open_shop(&ctx, 6, "gadget hub").await;
    let placed_at = Utc::now() - Duration::days(4);
    let order = ctx
        .repo
        .insert_order(
            Order {
                id: Uuid::new_v4(),
                shop_id: shop.id,
                customer_name: "Karim".to_string(),
                customer_phone: "01612345678".to_string(),
                customer_address: None,
                total: 500,
                status: OrderStatus::Shipped,
                created_at: placed_at,
                updated_at: Utc::now(),
            },
            Vec::new(),
        )
        .await;

    let foreign = storefront::track_order(
        State(ctx.state.clone()),
        Path((other.handle, order.id.to_string())),
    )
    .await;
    assert_eq!(
        error(foreign),
        (StatusCode::NOT_FOUND, "Order not found".to_string())
    );

    let tracking = data(
        storefront::track_order(
            State(ctx.state),
            Path((shop.handle, order.id.to_string())),
        )
        .await,
    );
    let current = tracking.timeline.current().unwrap();
    assert_eq!(current.status, OrderStatus::Shipped);
    assert_eq!(
        tracking.timeline.steps[0].date.as_deref(),
        Some(placed_at.format("%b %-d, %Y").to_string().as_str())
    );
    assert_eq!(tracking.timeline.steps[1].date.as_deref(), Some("--"));
    assert!(tracking.timeline.steps[4].date.is_none());
}

fn page(number: i64) -> Query<PageQuery> {
    Query(PageQuery {
        page: Some(number),
        search: None,
    })
}

fn order_at(shop_id: Uuid, placed_at: chrono::DateTime<Utc>) -> Order {
    Order {
        id: Uuid::new_v4(),
        shop_id,
        customer_name: "Karim".to_string(),
        customer_phone: "01612345678".to_string(),
        customer_address: None,
        total: 100,
        status: OrderStatus::Pending,
        created_at: placed_at,
        updated_at: placed_at,
    }
}

#[tokio::test]
async fn test_checkout_total_overflow_is_rejected() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;
    let product = add_product(&ctx, 5, shop.id, i64::MAX / 2 + 1).await;

    let outcome = storefront::place_order(
        State(ctx.state.clone()),
        Path(shop.handle.clone()),
        Form(order_form(product.id, 2)),
    )
    .await;

    assert_eq!(
        error(outcome),
        (
            StatusCode::BAD_REQUEST,
            "Order total is too large.".to_string()
        )
    );
    assert_eq!(ctx.state.repo.count_orders(shop.id).await.unwrap(), 0);
}

// --- Tutor ---

#[tokio::test]
async fn test_tutor_profile_is_saved_and_shown() {
    let ctx = test_ctx();
    let tutor = ctx_of(7, Role::Tutor);

    let saved = data(
        tutor::update_profile(
            tutor.clone(),
            State(ctx.state.clone()),
            Form(ProfileForm {
                living_location: Some("Mohammadpur".to_string()),
                current_university: Some("BUET".to_string()),
                hsc_result: Some(5.0),
                ..ProfileForm::default()
            }),
        )
        .await,
    );
    assert_eq!(saved.data.profile.unwrap().user_id, 7);

    let dashboard = data(tutor::tutor_dashboard(tutor, State(ctx.state)).await);
    let profile = dashboard.data.profile.unwrap();
    assert_eq!(profile.current_university.as_deref(), Some("BUET"));
    assert_eq!(profile.hsc_result, Some(5.0));
}

#[tokio::test]
async fn test_applied_jobs_page_by_ten_newest_first() {
    let ctx = test_ctx();
    let tutor = ctx.repo.insert_user(user(7, Role::Tutor)).await;
    for id in 1..=12 {
        ctx.repo.insert_job(job(id)).await;
        data(jobs::apply_to_job(State(ctx.state.clone()), Path(id), session_for(&tutor)).await);
    }

    let first = data(tutor::applied_jobs(ctx_of(7, Role::Tutor), State(ctx.state.clone()), page(1)).await);
    assert_eq!(first.data.applications.len(), 10);
    assert_eq!(first.data.pagination.total_pages, 2);
    let newest = first.data.applications.first().unwrap();
    let oldest = first.data.applications.last().unwrap();
    assert!(newest.application.applied_at >= oldest.application.applied_at);

    let second = data(tutor::applied_jobs(ctx_of(7, Role::Tutor), State(ctx.state), page(2)).await);
    assert_eq!(second.data.applications.len(), 2);
}

// --- Student ---

#[tokio::test]
async fn test_student_dashboard_lists_the_week_jobs() {
    let ctx = test_ctx();
    ctx.repo.insert_job(job(1)).await;
    ctx.repo
        .insert_job(Job {
            created_at: Utc::now() - Duration::days(10),
            ..job(2)
        })
        .await;

    let dashboard = data(student::student_dashboard(ctx_of(8, Role::Student), State(ctx.state)).await);

    assert!(dashboard.data.profile.is_none());
    assert_eq!(dashboard.data.recent_jobs.len(), 1);
    assert_eq!(dashboard.data.recent_jobs[0].id, 1);
    assert_eq!(dashboard.user.role, Role::Student);
}

// --- Admin listings ---

#[tokio::test]
async fn test_admin_dashboard_shows_managers_and_clamps_page() {
    let ctx = test_ctx();
    ctx.repo.insert_user(user(1, Role::Admin)).await;
    for id in 1..=3 {
        ctx.repo.insert_job(job(id)).await;
    }
    data(admin::claim_job(ctx_of(1, Role::Admin), State(ctx.state.clone()), Path(2)).await);

    let dashboard = data(
        admin::admin_dashboard(ctx_of(1, Role::Admin), State(ctx.state), page(i64::MAX)).await,
    );

    assert_eq!(dashboard.data.pagination.current_page, 1);
    assert_eq!(dashboard.data.jobs.len(), 3);
    let managed = dashboard.data.jobs.iter().find(|row| row.job.id == 2).unwrap();
    assert_eq!(managed.managed_by.as_ref().map(|u| u.id), Some(1));
}

#[tokio::test]
async fn test_managed_jobs_include_applicants() {
    let ctx = test_ctx();
    let tutor = ctx.repo.insert_user(user(7, Role::Tutor)).await;
    ctx.repo.insert_job(job(42)).await;
    ctx.repo.insert_job(job(43)).await;
    data(jobs::apply_to_job(State(ctx.state.clone()), Path(42), session_for(&tutor)).await);
    data(admin::claim_job(ctx_of(1, Role::Admin), State(ctx.state.clone()), Path(42)).await);

    let managed = data(
        admin::managed_jobs(ctx_of(1, Role::Admin), State(ctx.state), Query(PageQuery::default()))
            .await,
    );

    assert_eq!(managed.data.managed_jobs.len(), 1);
    let row = &managed.data.managed_jobs[0];
    assert_eq!(row.job.id, 42);
    assert_eq!(row.applications.len(), 1);
    assert_eq!(row.applications[0].user.id, 7);
}

#[tokio::test]
async fn test_only_the_manager_changes_job_status() {
    let ctx = test_ctx();
    ctx.repo.insert_job(job(42)).await;
    data(admin::claim_job(ctx_of(1, Role::Admin), State(ctx.state.clone()), Path(42)).await);

    let outsider = admin::set_job_status(
        ctx_of(2, Role::Admin),
        State(ctx.state.clone()),
        Path(42),
        Form(JobStatusForm {
            status: JobStatus::Inactive,
        }),
    )
    .await;
    assert_eq!(error(outsider).0, StatusCode::FORBIDDEN);

    let updated = data(
        admin::set_job_status(
            ctx_of(1, Role::Admin),
            State(ctx.state.clone()),
            Path(42),
            Form(JobStatusForm {
                status: JobStatus::Inactive,
            }),
        )
        .await,
    );
    assert!(updated.success);
    let stored = ctx.state.repo.get_job(42).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Inactive);
}

#[tokio::test]
async fn test_user_details_with_profile() {
    let ctx = test_ctx();
    ctx.repo.insert_user(user(7, Role::Tutor)).await;
    data(
        tutor::update_profile(
            ctx_of(7, Role::Tutor),
            State(ctx.state.clone()),
            Form(ProfileForm {
                gender: Some("Female".to_string()),
                ..ProfileForm::default()
            }),
        )
        .await,
    );

    let details = data(admin::user_details(ctx_of(1, Role::Admin), State(ctx.state.clone()), Path(7)).await);
    assert_eq!(details.data.profile_user.id, 7);
    assert_eq!(
        details.data.profile.and_then(|p| p.gender).as_deref(),
        Some("Female")
    );

    let missing = admin::user_details(ctx_of(1, Role::Admin), State(ctx.state), Path(99)).await;
    assert_eq!(
        error(missing),
        (StatusCode::NOT_FOUND, "User not found".to_string())
    );
}

// --- Superadmin users ---

#[tokio::test]
async fn test_superadmin_lists_users_and_changes_roles() {
    let ctx = test_ctx();
    ctx.repo.insert_user(user(1, Role::Superadmin)).await;
    ctx.repo.insert_user(user(2, Role::Tutor)).await;
    ctx.repo.insert_user(user(3, Role::Student)).await;

    let listed = data(superadmin::list_users(ctx_of(1, Role::Superadmin), State(ctx.state.clone())).await);
    assert_eq!(listed.data.users.len(), 3);

    let promoted = data(
        superadmin::set_user_role(
            ctx_of(1, Role::Superadmin),
            State(ctx.state.clone()),
            Path(2),
            Form(RoleForm { role: Role::Admin }),
        )
        .await,
    );
    assert_eq!(promoted.role, Role::Admin);

    let missing = superadmin::set_user_role(
        ctx_of(1, Role::Superadmin),
        State(ctx.state),
        Path(99),
        Form(RoleForm { role: Role::Admin }),
    )
    .await;
    assert_eq!(error(missing).0, StatusCode::NOT_FOUND);
}

// --- Shop order list ---

#[tokio::test]
async fn test_order_list_pages_by_ten_newest_first() {
    let ctx = test_ctx();
    let shop = open_shop(&ctx, 5, "rimi cakes").await;
    let now = Utc::now();
    for days_ago in 0..11 {
        ctx.repo
            .insert_order(order_at(shop.id, now - Duration::days(days_ago)), Vec::new())
            .await;
    }

    let first = data(
        shop::list_orders(
            ctx_of(5, Role::Shop),
            State(ctx.state.clone()),
            Query(shop::ShopQuery {
                shop_id: Some(shop.id),
                page: None,
            }),
        )
        .await,
    );
    assert_eq!(first.data.orders.len(), 10);
    assert_eq!(first.data.orders[0].created_at, now);
    assert_eq!(first.data.pagination.total_pages, 2);

    let last = data(
        shop::list_orders(
            ctx_of(5, Role::Shop),
            State(ctx.state),
            Query(shop::ShopQuery {
                shop_id: None,
                page: Some(i64::MAX),
            }),
        )
        .await,
    );
    assert_eq!(last.data.pagination.current_page, 2);
    assert_eq!(last.data.orders.len(), 1);
    assert_eq!(last.data.orders[0].created_at, now - Duration::days(10));
}
