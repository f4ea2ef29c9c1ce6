use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
};
use http_body_util::BodyExt;
use playslot_collab::{
    Collab, ExternalIdentity, IdentityError, IdentityProvider, MemoryDatabase, SharedDatabase,
};
use playslot_server::ServerContext;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Stands in for the external identity endpoint
struct StubProvider(Option<ExternalIdentity>);

#[async_trait::async_trait]
impl IdentityProvider for StubProvider {
    async fn resolve(&self, _session_id: &str) -> Result<ExternalIdentity, IdentityError> {
        self.0
            .clone()
            .ok_or_else(|| IdentityError("unknown session".to_string()))
    }
}

fn app_with(provider: StubProvider) -> axum::Router {
    let database: SharedDatabase = Arc::new(MemoryDatabase::new());
    let collab = Arc::new(Collab::new(database, Arc::new(provider)));

    playslot_server::router(ServerContext { collab })
}

fn app() -> axum::Router {
    app_with(StubProvider(None))
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, HeaderMap) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value, headers)
}

async fn register(app: &axum::Router, email: &str, role: &str) -> (String, String) {
    let (status, body, _) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "correct horse",
            "name": "Test User",
            "role": role,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);

    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn create_venue(app: &axum::Router, token: &str, price_per_hour: f64) -> String {
    let (status, body, _) = send(
        app,
        "POST",
        "/venues",
        Some(token),
        Some(json!({
            "name": "Northside Turf",
            "description": "5-a-side pitch",
            "location": "Northside",
            "address": "1 Pitch Lane",
            "categories": ["football"],
            "price_per_hour": price_per_hour,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);

    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_issues_a_session_cookie() {
    let app = app();

    let (status, body, headers) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "email": "new@example.com",
            "password": "correct horse",
            "name": "New User",
            "role": "customer",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().unwrap().len() >= 32);
    assert_eq!(body["user"]["email"], "new@example.com");

    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|x| x.to_str().ok())
        .unwrap();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn registering_a_taken_email_is_a_bad_request() {
    let app = app();

    register(&app, "taken@example.com", "customer").await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "email": "taken@example.com",
            "password": "another pass",
            "name": "Imposter",
            "role": "customer",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = app();

    register(&app, "user@example.com", "customer").await;

    let (status, _, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "user@example.com", "password": "wrong pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "user@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "user@example.com");
}

#[tokio::test]
async fn me_accepts_cookie_or_bearer_token() {
    let app = app();

    let (token, _) = register(&app, "user@example.com", "customer").await;

    let (status, body, _) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "user@example.com");

    let request = Request::builder()
        .method("GET")
        .uri("/auth/me")
        .header(header::COOKIE, format!("session_token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _, _) = send(&app, "GET", "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = app();

    let (token, _) = register(&app, "user@example.com", "customer").await;

    let (status, _, headers) = send(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|x| x.to_str().ok())
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));

    let (status, _, _) = send(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Logging out again is fine
    let (status, _, _) = send(&app, "POST", "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn external_login_creates_a_session() {
    let app = app_with(StubProvider(Some(ExternalIdentity {
        email: "google@example.com".to_string(),
        name: "Google User".to_string(),
    })));

    let (status, body, _) = send(
        &app,
        "POST",
        "/auth/google/callback",
        None,
        Some(json!({ "session_id": "provider-session" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "google@example.com");
    assert_eq!(body["user"]["role"], "customer");

    let token = body["token"].as_str().unwrap();
    let (status, _, _) = send(&app, "GET", "/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn external_login_rejection_is_unauthorized() {
    let app = app();

    let (status, _, _) = send(
        &app,
        "POST",
        "/auth/google/callback",
        None,
        Some(json!({ "session_id": "bogus" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn booking_flow_prices_and_confirms() {
    let app = app();

    let (owner_token, owner_id) = register(&app, "owner@example.com", "owner").await;
    let (customer_token, customer_id) = register(&app, "customer@example.com", "customer").await;

    let venue_id = create_venue(&app, &owner_token, 800.0).await;

    let (status, body, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(&customer_token),
        Some(json!({
            "venue_id": venue_id,
            "date": "2026-09-01",
            "start_time": "09:00",
            "end_time": "10:30",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["payment_status"], "pending");
    assert_eq!(body["total_price"], 1200.0);
    assert_eq!(body["user_id"], customer_id);

    let booking_id = body["id"].as_str().unwrap().to_string();

    let (status, body, _) = send(
        &app,
        "PUT",
        &format!("/bookings/{booking_id}/payment?payment_status=completed&payment_id=pay_1"),
        Some(&customer_token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["payment_status"], "completed");
    assert_eq!(body["payment_id"], "pay_1");

    let (status, body, _) = send(
        &app,
        "GET",
        &format!("/bookings/user/{customer_id}?status=upcoming"),
        Some(&customer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body, _) = send(
        &app,
        "GET",
        &format!("/bookings/venue/{venue_id}"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // The owner's listing reflects the venue the booking was made at
    let (status, body, _) = send(
        &app,
        "GET",
        &format!("/venues/owner/{owner_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn overlapping_booking_is_a_conflict() {
    let app = app();

    let (owner_token, _) = register(&app, "owner@example.com", "owner").await;
    let (customer_token, _) = register(&app, "customer@example.com", "customer").await;

    let venue_id = create_venue(&app, &owner_token, 800.0).await;

    let booking = json!({
        "venue_id": venue_id,
        "date": "2026-09-01",
        "start_time": "09:00",
        "end_time": "10:00",
    });

    let (status, _, _) = send(&app, "POST", "/bookings", Some(&customer_token), Some(booking.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = send(&app, "POST", "/bookings", Some(&customer_token), Some(booking)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn illegal_status_transition_is_a_conflict() {
    let app = app();

    let (owner_token, _) = register(&app, "owner@example.com", "owner").await;
    let (customer_token, _) = register(&app, "customer@example.com", "customer").await;

    let venue_id = create_venue(&app, &owner_token, 500.0).await;

    let (_, body, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(&customer_token),
        Some(json!({
            "venue_id": venue_id,
            "date": "2026-09-01",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    let booking_id = body["id"].as_str().unwrap().to_string();

    // A pending booking cannot jump straight to completed
    let (status, _, _) = send(
        &app,
        "PUT",
        &format!("/bookings/{booking_id}/status?status=completed"),
        Some(&customer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body, _) = send(
        &app,
        "PUT",
        &format!("/bookings/{booking_id}/status?status=cancelled"),
        Some(&customer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn slots_are_filtered_by_availability() {
    let app = app();

    let (owner_token, _) = register(&app, "owner@example.com", "owner").await;
    let venue_id = create_venue(&app, &owner_token, 500.0).await;

    let slot = |start: &str, end: &str| {
        json!({
            "venue_id": venue_id,
            "date": "2026-09-01",
            "start_time": start,
            "end_time": end,
        })
    };

    let (status, body, _) = send(&app, "POST", "/slots", Some(&owner_token), Some(slot("09:00", "10:00"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let first_id = body["id"].as_str().unwrap().to_string();

    let (status, _, _) = send(&app, "POST", "/slots", Some(&owner_token), Some(slot("10:00", "11:00"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = send(
        &app,
        "PUT",
        &format!("/slots/{first_id}/status?status=blocked"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = send(
        &app,
        "GET",
        &format!("/slots/available/{venue_id}?date=2026-09-01"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let available = body.as_array().unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0]["start_time"], "10:00");
}

#[tokio::test]
async fn reviews_update_the_venue_rating() {
    let app = app();

    let (owner_token, _) = register(&app, "owner@example.com", "owner").await;
    let (customer_token, _) = register(&app, "customer@example.com", "customer").await;

    let venue_id = create_venue(&app, &owner_token, 500.0).await;

    for rating in [5.0, 4.0] {
        let (status, _, _) = send(
            &app,
            "POST",
            "/reviews",
            Some(&customer_token),
            Some(json!({
                "venue_id": venue_id,
                "rating": rating,
                "comment": "nice pitch",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body, _) = send(&app, "GET", &format!("/venues/{venue_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 4.5);
    assert_eq!(body["total_reviews"], 2);

    let (status, body, _) = send(
        &app,
        "GET",
        &format!("/reviews/venue/{venue_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let app = app();

    let (token, _) = register(&app, "user@example.com", "customer").await;

    let (status, _, _) = send(&app, "GET", "/venues/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &app,
        "POST",
        "/bookings",
        Some(&token),
        Some(json!({
            "venue_id": "missing",
            "date": "2026-09-01",
            "start_time": "09:00",
            "end_time": "10:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_is_open_to_the_public() {
    let app = app();

    let (owner_token, _) = register(&app, "owner@example.com", "owner").await;
    create_venue(&app, &owner_token, 500.0).await;

    let (status, body, _) = send(&app, "GET", "/venues/search?category=football", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body, _) = send(&app, "GET", "/venues/search?category=cricket", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn root_greets_callers() {
    let app = app();

    let (status, body, _) = send(&app, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Playslot API - Ready to serve!");
}
