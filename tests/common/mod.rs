//! Shared test scaffolding: a mock open-banking provider on an ephemeral
//! port, plus a throwaway sqlite store.
#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

use budgetlink::db::Storage;

pub const VALID_ACCESS: &str = "acc-fresh";
pub const REFRESHED_ACCESS: &str = "acc-refreshed";
pub const VALID_REFRESH: &str = "ref-fresh";

#[derive(Default)]
pub struct MockProvider {
    pub new_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// Accounts `GET /requisitions/{id}/` reports as resolved.
    pub resolved_accounts: Mutex<Vec<String>>,
    /// Requisition ids the mock refuses to delete.
    pub undeletable: Mutex<Vec<String>>,
}

type Shared = Arc<MockProvider>;

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {VALID_ACCESS}") || v == format!("Bearer {REFRESHED_ACCESS}"))
        == Some(true)
}

async fn token_new(State(state): State<Shared>) -> Json<Value> {
    state.new_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "access": VALID_ACCESS,
        "access_expires": 86_400,
        "refresh": VALID_REFRESH,
        "refresh_expires": 2_592_000,
    }))
}

async fn token_refresh(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if body.get("refresh").and_then(Value::as_str) != Some(VALID_REFRESH) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    Ok(Json(json!({
        "access": REFRESHED_ACCESS,
        "access_expires": 86_400,
    })))
}

async fn institutions(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if !bearer_ok(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let country = params.get("country").cloned().unwrap_or_default();
    Ok(Json(json!([
        { "id": "TESTBANK_XX", "name": "Test Bank", "bic": "TESTXX00", "countries": [country] }
    ])))
}

async fn requisition_create(
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if !bearer_ok(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if body.get("institution_id").and_then(Value::as_str).is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!({
        "id": "req-0001",
        "created": Utc::now().to_rfc3339(),
        "link": "https://consent.example/start/req-0001",
        "accounts": [],
    })))
}

async fn requisition_get(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    if !bearer_ok(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let accounts = state.resolved_accounts.lock().unwrap().clone();
    Ok(Json(json!({
        "id": id,
        "created": Utc::now().to_rfc3339(),
        "accounts": accounts,
    })))
}

async fn requisition_delete(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> StatusCode {
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if state.undeletable.lock().unwrap().contains(&id) {
        return StatusCode::NOT_FOUND;
    }
    StatusCode::NO_CONTENT
}

async fn account_transactions(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !bearer_ok(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "transactions": {
            "pending": [{
                "transactionAmount": { "amount": "-3.20", "currency": "EUR" },
                "valueDate": "2024-03-02",
                "remittanceInformationUnstructured": "COFFEE CORNER CAFE"
            }],
            "booked": [{
                "transactionAmount": { "amount": "1500.00", "currency": "EUR" },
                "bookingDate": "2024-03-01",
                "valueDate": "2024-03-01",
                "debtorName": "ACME PAYROLL",
                "remittanceInformationUnstructured": "SALARY MARCH"
            }]
        }
    })))
}

async fn account_balances(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    if !bearer_ok(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "balances": [
            {
                "balanceAmount": { "amount": "1250.30", "currency": "EUR" },
                "balanceType": "interimAvailable",
                "referenceDate": "2024-03-02"
            },
            {
                "balanceAmount": { "amount": "1244.00", "currency": "EUR" },
                "balanceType": "closingBooked",
                "referenceDate": "2024-03-02"
            }
        ]
    })))
}

/// Bind the mock provider on an ephemeral port and return its base URL.
pub async fn spawn_mock_provider(state: Shared) -> Url {
    let app = Router::new()
        .route("/token/new/", post(token_new))
        .route("/token/refresh/", post(token_refresh))
        .route("/institutions", get(institutions))
        .route("/requisitions/", post(requisition_create))
        .route(
            "/requisitions/{id}/",
            get(requisition_get).delete(requisition_delete),
        )
        .route("/accounts/{id}/transactions", get(account_transactions))
        .route("/accounts/{id}/balances", get(account_balances))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock provider");
    let addr = listener.local_addr().expect("mock provider has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock provider died");
    });
    Url::parse(&format!("http://{addr}/")).expect("mock provider URL is valid")
}

/// A throwaway on-disk sqlite store with the schema applied.
pub async fn temp_storage(tag: &str) -> (Storage, std::path::PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "budgetlink-{tag}-{}-{nanos}.sqlite",
        std::process::id()
    ));
    let database_url = format!("sqlite:{}", path.display());
    let pool = budgetlink::config::connect_pool(&database_url)
        .await
        .expect("failed to open temp sqlite");
    let storage = Storage::new(pool);
    storage.init_schema().await.expect("schema init failed");
    (storage, path)
}
