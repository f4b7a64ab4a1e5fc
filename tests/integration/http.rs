//! The HTTP API wired to local auth and the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use banca::backend::memory::{LocalAuth, MemoryStore};
use banca::clock::ManualClock;
use banca::config::BankrollDefaults;
use banca::dashboard::{build_router, DashboardState};
use banca::engine::snapshot_feed;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::common::at;

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn app() -> Router {
    let (feed, _rx) = snapshot_feed();
    build_router(Arc::new(DashboardState::new(
        Arc::new(LocalAuth::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(at(10, 9))),
        BankrollDefaults::default(),
        feed,
    )))
}

#[tokio::test]
async fn test_sign_up_then_full_cycle() {
    let app = app();

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/sign-up",
        Some(json!({"email": "bia@example.com", "password": "curta"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("6"));

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/sign-up",
        Some(json!({"email": "bia@example.com", "password": "segredo1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["confirmation_required"], false);
    assert_eq!(body["view"]["bankroll"]["initial_amount"].as_f64(), Some(100.0));

    // Two chips on 12 numbers plus 1 on zero; a number hits.
    let (status, bet) = call(
        &app,
        "POST",
        "/api/bets",
        Some(json!({
            "outcome": "win_on_number",
            "chip_value": 2,
            "numbers_covered": 12,
            "zero_stake": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bet["amount_staked"].as_f64(), Some(25.0));
    assert_eq!(bet["amount_returned"].as_f64(), Some(72.0));

    let (_, metrics) = call(&app, "GET", "/api/metrics", None).await;
    assert_eq!(metrics["cycle_profit"].as_f64(), Some(47.0));
    assert_eq!(metrics["win_rate"].as_f64(), Some(100.0));

    let (status, view) = call(&app, "POST", "/api/cycle/close", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["cycle"]["label"], "CICLO FECHADO");

    let (_, history) = call(&app, "GET", "/api/history", None).await;
    assert_eq!(history[0]["final_bankroll"].as_f64(), Some(147.0));

    let (status, view) = call(&app, "POST", "/api/cycle/new", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["current_bankroll_display"], "R$ 147,00");

    let (_, projection) = call(&app, "GET", "/api/projection", None).await;
    let rows = projection.as_array().unwrap();
    assert_eq!(rows.len(), 15);
    assert_eq!(rows[0]["date"], "2026-03-11");
    assert_eq!(rows[0]["starting_bankroll"].as_f64(), Some(147.0));

    let (status, _) = call(&app, "POST", "/api/auth/sign-out", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", "/api/bets", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_bet_is_rejected() {
    let app = app();
    call(
        &app,
        "POST",
        "/api/auth/sign-up",
        Some(json!({"email": "caio@example.com", "password": "segredo1"})),
    )
    .await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/bets",
        Some(json!({"outcome": "jackpot", "chip_value": 1})),
    )
    .await;
    assert!(status.is_client_error());

    let (status, body) = call(
        &app,
        "POST",
        "/api/bets",
        Some(json!({"outcome": "loss", "chip_value": -1, "numbers_covered": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Os valores não podem ser negativos.");
}
