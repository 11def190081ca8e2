//! HTTP API tests against the in-memory store

mod common;

use std::str::FromStr;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{dec, invoice, item_input, line, stores};
use farm_ledger_backend::{
    config::{DatabaseConfig, JwtConfig, ServerConfig},
    create_app,
    middleware::Claims,
    AppState, Config,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shared::InvoiceStatus;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";

fn config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/unused".to_string(),
            max_connections: 1,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
        ledger: common::ledger_config(),
    }
}

fn token(user_id: Uuid, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {other}"),
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let (_, store) = stores();
    let app = create_app(AppState::new(store, config()));

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_api_requires_valid_token() {
    let (_, store) = stores();
    let app = create_app(AppState::new(store, config()));

    let (status, body) = send(&app, Method::GET, "/api/v1/inventory/items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/inventory/items",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_item_movement_flow_over_http() {
    let (_, store) = stores();
    let app = create_app(AppState::new(store, config()));
    let user = token(Uuid::new_v4(), "member");

    let (status, item) = send(
        &app,
        Method::POST,
        "/api/v1/inventory/items",
        Some(&user),
        Some(json!({
            "name": "Layer feed",
            "code": "FEED-01",
            "unit": "kg",
            "initial_quantity": "50",
            "reorder_level": "10",
            "unit_cost": "1.20"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item["id"].as_str().unwrap().to_string();

    let (status, moved) = send(
        &app,
        Method::POST,
        &format!("/api/v1/inventory/items/{}/movements", item_id),
        Some(&user),
        Some(json!({ "movement_type": "SALE", "quantity": "45" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(decimal(&moved["item"]["current_quantity"]), dec("5"));
    assert_eq!(moved["movement"]["direction"], "out");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/inventory/items/{}/movements", item_id),
        Some(&user),
        Some(json!({ "movement_type": "SALE", "quantity": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/inventory/items/{}/adjustments", item_id),
        Some(&user),
        Some(json!({ "quantity": "0" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, low) = send(&app, Method::GET, "/api/v1/inventory/low-stock", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(low.as_array().unwrap().len(), 1);

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/v1/inventory/items/{}/movements", item_id),
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    // Another member cannot see it
    let stranger = token(Uuid::new_v4(), "member");
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/inventory/items/{}", item_id),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_issue_invoice_over_http() {
    let (memory, store) = stores();
    let app = create_app(AppState::new(store.clone(), config()));
    let user_id = Uuid::new_v4();
    let user = token(user_id, "member");

    let item = farm_ledger_backend::services::InventoryLedger::new(store)
        .create_item(item_input("EGGS", "100", "0"), &shared::Actor::member(user_id))
        .await
        .unwrap();
    let inv = invoice(
        user_id,
        InvoiceStatus::Draft,
        "1000",
        "0.08",
        vec![line(1, Some(item.id), "200", "5")],
    );
    memory.insert_invoice(inv.clone()).unwrap();

    let (status, outcome) = send(
        &app,
        Method::POST,
        &format!("/api/v1/documents/invoices/{}/issue", inv.id),
        Some(&user),
        None,
    )
    .await;

    // The transition lands even though the only stock line is short
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["document"]["status"], "sent");
    assert_eq!(outcome["inventory"]["status"], "failed");
    assert_eq!(outcome["financial"]["status"], "committed");
    assert_eq!(decimal(&outcome["financial_record"]["amount"]), dec("1080.00"));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/v1/documents/invoices/{}/issue", inv.id),
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn test_depreciation_schedule_over_http() {
    let (_, store) = stores();
    let app = create_app(AppState::new(store, config()));
    let user = token(Uuid::new_v4(), "manager");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/operations/assets/depreciation-schedule",
        Some(&user),
        Some(json!({
            "name": "Tractor",
            "purchase_cost": "50000",
            "salvage_value": "5000",
            "useful_life_years": 10,
            "purchase_date": "2024-01-01"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["annual_depreciation"]), dec("4500"));
    let schedule = body["schedule"].as_array().unwrap();
    assert_eq!(schedule.len(), 10);
    assert_eq!(decimal(&schedule[9]["book_value"]), dec("5000"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/operations/assets/depreciation-schedule",
        Some(&user),
        Some(json!({
            "name": "Tractor",
            "purchase_cost": "1000",
            "salvage_value": "2000",
            "useful_life_years": 0,
            "purchase_date": "2024-01-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/operations/assets/depreciation-schedule",
        Some(&user),
        Some(json!({
            "name": "Barn",
            "purchase_cost": "1000",
            "salvage_value": "0",
            "useful_life_years": i32::MAX,
            "purchase_date": "2024-01-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
