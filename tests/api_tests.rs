use jobify_portal::{
    AppConfig, AppState, InMemoryRepository, create_router,
    models::{CreateShopForm, NewProduct},
    repository::{Repository, RepositoryState},
};
use reqwest::{StatusCode, header, redirect::Policy};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: RepositoryState,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let state = AppState {
        repo: repo.clone(),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Redirects are part of the contract, so they are asserted instead of followed.
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        repo,
        client,
    }
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Signs up a self-service account, signs in, and returns the post-sign-in location
/// together with the `name=value` pair of the session cookie.
async fn sign_in_as(app: &TestApp, account: &str, email: &str, phone: &str) -> (String, String) {
    let signup = app
        .client
        .post(format!("{}/auth/signup", app.address))
        .form(&[
            ("name", "Rafi"),
            ("email", email),
            ("phone", phone),
            ("password", "hunter22"),
            ("account", account),
        ])
        .send()
        .await
        .expect("req fail");
    assert_eq!(signup.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&signup), "/auth/signin");

    let signin = app
        .client
        .post(format!("{}/auth/signin", app.address))
        .form(&[("emailOrPhone", email), ("password", "hunter22")])
        .send()
        .await
        .expect("req fail");
    assert_eq!(signin.status(), StatusCode::SEE_OTHER);

    let set_cookie = signin
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie");
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    (location(&signin).to_string(), cookie)
}

/// Signs up a tutor and returns the `name=value` pair of the session cookie.
async fn signed_in_tutor(app: &TestApp) -> String {
    let (landing, cookie) = sign_in_as(app, "tutor", "rafi@example.com", "01722222222").await;
    assert_eq!(landing, "/tutor/dashboard");
    cookie
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_gated_area_redirects_anonymous_callers() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/tutor/dashboard", app.address))
        .send()
        .await
        .expect("req fail");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/signin");
}

#[tokio::test]
async fn test_session_cookie_opens_own_dashboard_only() {
    let app = spawn_app().await;
    let cookie = signed_in_tutor(&app).await;

    let dashboard = app
        .client
        .get(format!("{}/tutor/dashboard", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .expect("req fail");
    assert_eq!(dashboard.status(), StatusCode::OK);
    let body: Value = dashboard.json().await.unwrap();
    assert_eq!(body["user"]["role"], "tutor");
    assert_eq!(body["user"]["email"], "rafi@example.com");

    let admin = app
        .client
        .get(format!("{}/admin/dashboard", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .expect("req fail");
    assert_eq!(admin.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&admin), "/tutor/dashboard");

    let me = app
        .client
        .get(format!("{}/me", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .expect("req fail");
    assert_eq!(me.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_job_posting_is_gated_but_board_is_public() {
    let app = spawn_app().await;
    let cookie = signed_in_tutor(&app).await;

    let board = app
        .client
        .get(format!("{}/jobs?filter=recent-jobs", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(board.status(), StatusCode::OK);
    let body: Value = board.json().await.unwrap();
    assert_eq!(body["total"], 0);
    assert_eq!(body["filter"], "recent-jobs");

    let post = app
        .client
        .post(format!("{}/jobs", app.address))
        .header(header::COOKIE, &cookie)
        .form(&[
            ("title", "Math tutor"),
            ("location", "Uttara"),
            ("publisher", "Rafi"),
        ])
        .send()
        .await
        .expect("req fail");
    assert_eq!(post.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&post), "/tutor/dashboard");
}

#[tokio::test]
async fn test_apply_without_session_is_json_401() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(format!("{}/jobs/1/apply", app.address))
        .send()
        .await
        .expect("req fail");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User not authenticated");
}

#[tokio::test]
async fn test_storefront_checkout_and_tracking() {
    let app = spawn_app().await;
    let shop = app
        .repo
        .create_shop(
            9,
            "@RimiCakes".to_string(),
            CreateShopForm {
                name: "Rimi Cakes".to_string(),
                ..CreateShopForm::default()
            },
        )
        .await
        .unwrap();
    let product = app
        .repo
        .create_product(NewProduct {
            shop_id: shop.id,
            name: "Red velvet".to_string(),
            description: String::new(),
            price: 950,
            image_url: None,
        })
        .await
        .unwrap();

    let storefront: Value = app
        .client
        .get(format!("{}/shops/@RimiCakes", app.address))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(storefront["products"][0]["name"], "Red velvet");

    let product_id = product.id.to_string();
    let order = app
        .client
        .post(format!("{}/shops/@RimiCakes/orders", app.address))
        .form(&[
            ("customer_name", "Karim"),
            ("customer_phone", "01612345678"),
            ("product_id", product_id.as_str()),
            ("quantity", "3"),
        ])
        .send()
        .await
        .expect("req fail");
    assert_eq!(order.status(), StatusCode::SEE_OTHER);
    let thanks_path = location(&order).to_string();
    assert!(thanks_path.starts_with("/shops/@RimiCakes/thanks?order_id="));

    let thanks: Value = app
        .client
        .get(format!("{}{}", app.address, thanks_path))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    let order_id = thanks["order_id"].as_str().unwrap().to_string();
    assert_eq!(
        thanks["tracking_url"],
        format!("http://localhost:3000/shops/@RimiCakes/track/{order_id}")
    );
    assert_eq!(thanks["recent_order"]["orderId"], order_id.as_str());

    let tracking: Value = app
        .client
        .get(format!(
            "{}/shops/@RimiCakes/track/{order_id}",
            app.address
        ))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(tracking["order"]["total"], 2850);
    assert_eq!(tracking["order"]["status"], "pending");
    assert_eq!(tracking["timeline"]["steps"][0]["is_current"], true);

    let unknown = app
        .client
        .get(format!("{}/shops/@RimiCakes/track/not-an-id", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_student_signs_in_to_own_dashboard() {
    let app = spawn_app().await;
    let (landing, cookie) = sign_in_as(&app, "student", "mim@example.com", "01733333333").await;
    assert_eq!(landing, "/student/dashboard");

    let dashboard = app
        .client
        .get(format!("{}/student/dashboard", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .expect("req fail");
    assert_eq!(dashboard.status(), StatusCode::OK);
    let body: Value = dashboard.json().await.unwrap();
    assert_eq!(body["user"]["role"], "student");
    assert!(body["recent_jobs"].is_array());

    let tutor_area = app
        .client
        .get(format!("{}/tutor/dashboard", app.address))
        .header(header::COOKIE, &cookie)
        .send()
        .await
        .expect("req fail");
    assert_eq!(tutor_area.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&tutor_area), "/student/dashboard");
}

#[tokio::test]
async fn test_unknown_path_is_json_404() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/nowhere/at/all", app.address))
        .send()
        .await
        .expect("req fail");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Page not found");
}
