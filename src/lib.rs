use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity: sessions, cookies and the authorization gate.
pub mod auth;
pub mod cookie;
pub mod session;

pub mod config;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod memory;
pub mod models;
pub mod recent_orders;
pub mod repository;
pub mod response;
pub mod seed;

// Routers grouped by gate (public, member, per role).
pub mod routes;
use routes::{admin, member, public, shop, student, superadmin, tutor};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use memory::InMemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every `#[utoipa::path]` handler, served at `/api-docs/openapi.json`.
/// Loaders whose payload embeds a rendered timeline are listed without a body schema.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::account::sign_in_page, handlers::account::sign_in, handlers::account::sign_up,
        handlers::account::logout, handlers::account::get_me,
        handlers::jobs::list_jobs, handlers::jobs::job_details, handlers::jobs::apply_to_job,
        handlers::jobs::create_job,
        handlers::tutor::tutor_dashboard, handlers::tutor::update_profile,
        handlers::tutor::applied_jobs,
        handlers::student::student_dashboard,
        handlers::admin::admin_dashboard, handlers::admin::claim_job,
        handlers::admin::managed_jobs, handlers::admin::set_job_status,
        handlers::admin::job_applications, handlers::admin::set_application_stage,
        handlers::admin::user_details,
        handlers::superadmin::superadmin_dashboard, handlers::superadmin::list_users,
        handlers::superadmin::set_user_role, handlers::superadmin::delete_user,
        handlers::shop::shop_dashboard, handlers::shop::create_shop,
        handlers::shop::list_products, handlers::shop::create_product,
        handlers::shop::update_product, handlers::shop::delete_product,
        handlers::shop::list_orders, handlers::shop::order_detail,
        handlers::shop::set_order_status,
        handlers::storefront::storefront, handlers::storefront::place_order,
        handlers::storefront::order_placed, handlers::storefront::track_order
    ),
    components(
        schemas(
            models::Role, models::User, models::Profile, models::Job, models::JobApplication,
            models::ApplicationWithUser, models::ApplicationWithJob, models::JobWithManager,
            models::ManagedJob, models::JobFilter, models::Shop, models::Product, models::Order,
            models::OrderItem, models::Pagination, models::SuperadminStats, models::ActionMessage,
            models::SignInForm, models::SignUpForm, models::CreateJobForm, models::ProfileForm,
            models::JobStatusForm, models::StageForm, models::OrderStatusForm, models::RoleForm,
            models::CreateShopForm, models::ProductForm, models::PlaceOrderForm,
            lifecycle::OrderStatus, lifecycle::ApplicationStage, lifecycle::JobStatus,
            auth::AuthContext, error::ErrorBody, recent_orders::RecentOrder,
            handlers::account::SignInPage, handlers::jobs::JobBoard, handlers::jobs::JobDetails,
            handlers::jobs::CreatedJob, handlers::tutor::TutorDashboard,
            handlers::tutor::AppliedJobs, handlers::student::StudentDashboard,
            handlers::admin::AdminDashboard,
            handlers::admin::ManagedJobs, handlers::admin::JobApplications,
            handlers::admin::UserDetails, handlers::superadmin::SuperadminDashboard,
            handlers::superadmin::UserList, handlers::shop::ShopDashboard,
            handlers::shop::ShopProducts, handlers::shop::ShopOrders,
            handlers::storefront::Storefront, handlers::storefront::OrderPlaced,
        )
    ),
    tags(
        (name = "jobify-portal", description = "Tutoring job board and shop builder API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request: the store handle and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the public and gated routers, the Swagger UI, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(member::member_routes(&state))
        // POST /jobs shares its path with the public GET /jobs; only the POST is gated.
        .merge(admin::publisher_routes(&state))
        .nest("/tutor", tutor::tutor_routes(&state))
        .nest("/admin", admin::admin_routes(&state))
        .nest("/superadmin", superadmin::superadmin_routes(&state))
        .nest("/shop", shop::shop_routes(&state))
        .nest("/student", student::student_routes(&state))
        .fallback(|| async { error::AppError::not_found("Page") })
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with the `x-request-id` set by `SetRequestIdLayer` so every
/// log line of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
