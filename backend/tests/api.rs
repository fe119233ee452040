use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use backend::{app, AppConfig, AppState, Store, StoreOptions};

fn setup_test_app() -> Router {
    let mut store = Store::open_in_memory().unwrap();
    store
        .initialize(&StoreOptions {
            bcrypt_cost: 4,
            admin_password: "admin".to_string(),
        })
        .unwrap();
    let config = AppConfig {
        database_path: ":memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        dev_mode: false,
        port: 0,
        bcrypt_cost: 4,
        admin_password: "admin".to_string(),
    };
    app(AppState::new(store, config))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = setup_test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_a_token() {
    let app = setup_test_app();
    let (status, body) = send(&app, "GET", "/api/repairs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn login_sets_cookie_and_rejects_bad_password() {
    let app = setup_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": "admin", "password": "admin" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_me_reports_mechanic() {
    let app = setup_test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "full_name": "Sam Spanner",
            "username": "sam",
            "password": "wrench",
            "confirm_password": "wrench"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let token = login(&app, "sam", "wrench").await;
    let (status, me) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "sam");
    assert_eq!(me["full_name"], "Sam Spanner");
    assert_eq!(me["role"], "mechanic");
}

#[tokio::test]
async fn duplicate_vin_is_a_conflict() {
    let app = setup_test_app();
    let token = login(&app, "admin", "admin").await;
    let customer = json!({
        "name": "Jo Driver",
        "car_model": "Civic",
        "vin": "VIN123",
        "issue": "Brakes squeal"
    });

    let (status, body) = send(&app, "POST", "/api/customers", Some(&token), Some(customer.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["vin"], "VIN123");

    let (status, body) = send(&app, "POST", "/api/customers", Some(&token), Some(customer)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "VIN already exists in system");

    let (_, repairs) = send(&app, "GET", "/api/repairs", Some(&token), None).await;
    assert_eq!(repairs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn mechanic_is_forbidden_from_admin_routes() {
    let app = setup_test_app();
    let admin = login(&app, "admin", "admin").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/mechanics",
        Some(&admin),
        Some(json!({ "full_name": "Sam Spanner", "username": "sam", "password": "wrench" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let sam = login(&app, "sam", "wrench").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/inventory",
        Some(&sam),
        Some(json!({ "part_name": "Gasket", "quantity": 2, "price": 3.5, "supplier": "NAPA" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = send(&app, "GET", "/api/login-logs", Some(&sam), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", "/api/mechanics/sam", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn inventory_order_and_overship() {
    let app = setup_test_app();
    let token = login(&app, "admin", "admin").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/inventory",
        Some(&token),
        Some(json!({ "part_name": "Gasket", "quantity": 2, "price": 3.5, "supplier": "NAPA" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, part) = send(
        &app,
        "POST",
        "/api/inventory/Gasket/order",
        Some(&token),
        Some(json!({ "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(part["quantity"], 5);

    let (status, body) = send(
        &app,
        "POST",
        "/api/inventory/Gasket/ship",
        Some(&token),
        Some(json!({ "quantity": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        "POST",
        "/api/inventory/restock",
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["restocked"], json!(["Gasket"]));
}

#[tokio::test]
async fn calendar_shows_a_booked_task() {
    let app = setup_test_app();
    let admin = login(&app, "admin", "admin").await;
    send(
        &app,
        "POST",
        "/api/mechanics",
        Some(&admin),
        Some(json!({ "full_name": "Sam Spanner", "username": "sam", "password": "wrench" })),
    )
    .await;
    let sam = login(&app, "sam", "wrench").await;

    let (status, entry) = send(
        &app,
        "POST",
        "/api/schedules",
        Some(&sam),
        Some(json!({
            "mechanic": "",
            "task": "Oil change",
            "start": "2025-03-14 09:00",
            "end": "2025-03-14 10:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/schedules/{}/status", entry["id"]),
        Some(&sam),
        Some(json!({ "status": "done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, calendar) = send(
        &app,
        "GET",
        "/api/calendar?year=2025&month=3",
        Some(&sam),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let day = &calendar["days"][13];
    assert_eq!(day.as_array().unwrap().len(), 1);
    assert_eq!(day[0]["kind"], "schedule");
    assert_eq!(day[0]["done"], true);

    let (status, _) = send(
        &app,
        "GET",
        "/api/calendar?year=2025&month=3",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn removed_mechanic_token_is_rejected() {
    let app = setup_test_app();
    let admin = login(&app, "admin", "admin").await;
    send(
        &app,
        "POST",
        "/api/mechanics",
        Some(&admin),
        Some(json!({ "full_name": "Sam Spanner", "username": "sam", "password": "wrench" })),
    )
    .await;
    let sam = login(&app, "sam", "wrench").await;
    let (status, _) = send(&app, "GET", "/api/repairs", Some(&sam), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", "/api/mechanics/sam", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/api/repairs", Some(&sam), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Account no longer exists");

    // Re-registering the name does not revive the old token.
    send(
        &app,
        "POST",
        "/api/mechanics",
        Some(&admin),
        Some(json!({ "full_name": "Sam Spanner", "username": "sam", "password": "other" })),
    )
    .await;
    let (status, _) = send(&app, "GET", "/auth/me", Some(&sam), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "current_thread")]
async fn store_work_runs_off_the_runtime_thread() {
    let app = setup_test_app();
    let (first, second, health) = tokio::join!(
        login(&app, "admin", "admin"),
        login(&app, "admin", "admin"),
        send(&app, "GET", "/health", None, None),
    );
    assert!(!first.is_empty());
    assert!(!second.is_empty());
    assert_eq!(health.0, StatusCode::OK);

    let (status, me) = send(&app, "GET", "/auth/me", Some(&first), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "admin");
}
