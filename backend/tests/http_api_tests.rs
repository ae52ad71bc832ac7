//! HTTP surface tests
//!
//! Sends requests through the full router (identity middleware, handlers,
//! error mapping) backed by the in-memory store.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::Fixture;
use serde_json::{json, Value};
use surveillance_backend::config::{Config, DatabaseConfig, ServerConfig};
use surveillance_backend::{create_app, AppState};
use tower::ServiceExt;
use uuid::Uuid;

fn app(fx: &Fixture) -> Router {
    let config = Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
            min_connections: 1,
        },
        surveillance: fx.settings.clone(),
    };
    create_app(AppState::new(fx.store.clone(), fx.clock.clone(), config))
}

async fn send(app: &Router, method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("X-User-Id", user.to_string());
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let fx = Fixture::new().await;

    let (status, body) = send(&app(&fx), "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["storage"], "connected");
}

#[tokio::test]
async fn test_protected_routes_require_identity() {
    let fx = Fixture::new().await;
    let uri = format!("/api/v1/farms/{}/sessions", fx.farm.id);

    let (status, body) = send(&app(&fx), "POST", &uri, None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_calculator_preview() {
    let fx = Fixture::new().await;
    let app = app(&fx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/calculator/preview",
        None,
        Some(json!({ "population": 1000, "confidence_level": 95, "prevalence": "0.1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["required_plants"], 122);
    assert_eq!(body["survey_frequency"], 8);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/calculator/preview",
        None,
        Some(json!({ "confidence_level": 95, "prevalence": 0.1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error_code"], "POPULATION_REQUIRED");
    assert!(body["required_plants"].is_null());
}

#[tokio::test]
async fn test_season_lookup() {
    let fx = Fixture::new().await;
    let app = app(&fx);

    let (status, body) = send(&app, "GET", "/api/v1/season?month=9", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage_name"], "Fruit Development");
    assert_eq!(body["month_used"], 9);

    let (status, _) = send(&app, "GET", "/api/v1/season?month=13", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_round_trip() {
    let fx = Fixture::without_stages().await;
    let small = fx.add_farm(Some("0.2"), Some(10)).await; // 2 plants, target 1
    let app = app(&fx);
    let user = Some(fx.surveyor);

    let (status, started) = send(
        &app,
        "POST",
        &format!("/api/v1/farms/{}/sessions", small.id),
        user,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["target_plants"], 1);
    assert_eq!(started["target_source"], "population_heuristic");
    let session_id = started["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", &format!("/api/v1/sessions/{}/finish", session_id), user, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, observation) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/observations", session_id),
        user,
        Some(json!({ "notes": "clean" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(observation["plant_sequence_number"], 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/observations", session_id),
        user,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "TARGET_REACHED");

    let (status, summary) = send(&app, "POST", &format!("/api/v1/sessions/{}/finish", session_id), user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["status"], "completed");
    assert_eq!(summary["progress_percentage"], 100);

    let (status, listed) = send(&app, "GET", &format!("/api/v1/farms/{}/sessions", small.id), user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(|a| a.len()), Some(1));

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/sessions/{}", session_id), user, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/v1/sessions/{}", session_id), user, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calculation_endpoints() {
    let fx = Fixture::new().await;
    let app = app(&fx);
    let user = Some(fx.surveyor);
    let uri = format!("/api/v1/farms/{}/calculations", fx.farm.id);

    let (status, _) = send(&app, "GET", &format!("{}/current", uri), user, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, created) = send(&app, "POST", &uri, user, Some(json!({ "confidence_level": 95 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["required_plants"], 122);
    assert_eq!(created["is_current"], true);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        user,
        Some(json!({ "notes": "x".repeat(2001) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, current) = send(&app, "GET", &format!("{}/current", uri), user, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["id"], created["id"]);
}

#[tokio::test]
async fn test_admin_sweep_validates_hours() {
    let fx = Fixture::new().await;
    let app = app(&fx);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/admin/sessions/sweep?hours=0",
        Some(fx.surveyor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "hours");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/admin/sessions/sweep?dry_run=true",
        Some(fx.surveyor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dry_run"], true);
    assert_eq!(body["deleted"], 0);
}
