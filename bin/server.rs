// ATM Simulator - Web Server
// JSON API over the ledger plus the single-page browser front end

use anyhow::Context;
use atm_simulator::{
    balance_message, format_currency, format_timestamp, logging, outcome_message, parse_amount,
    Action, Config, KeyValueStore, Ledger, LedgerError, ResetOutcome, SqliteStore, Transaction,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state. One ledger, requests take turns.
struct AppState<S: KeyValueStore> {
    ledger: Mutex<Ledger<S>>,
}

type SharedState<S> = Arc<AppState<S>>;

impl<S: KeyValueStore> AppState<S> {
    fn ledger(&self) -> MutexGuard<'_, Ledger<S>> {
        // A panic mid-request cannot leave the ledger half-updated, so a poisoned lock is still usable
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn err(data: T, message: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(message),
        }
    }
}

/// Transaction as shown to the browser
#[derive(Serialize)]
struct TransactionResponse {
    id: String,
    kind: String,
    amount: f64,
    formatted_amount: String,
    timestamp: String,
    when: String,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            kind: tx.kind.as_str().to_string(),
            amount: tx.amount,
            formatted_amount: format_currency(tx.amount),
            timestamp: tx.timestamp.to_rfc3339(),
            when: format_timestamp(&tx.timestamp),
        }
    }
}

/// Everything the page needs to re-render after a call
#[derive(Serialize)]
struct AccountView {
    balance: f64,
    formatted_balance: String,
    /// Newest first
    history: Vec<TransactionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl AccountView {
    fn of<S: KeyValueStore>(ledger: &Ledger<S>, message: Option<String>) -> Self {
        Self {
            balance: ledger.balance(),
            formatted_balance: format_currency(ledger.balance()),
            history: ledger.history().iter().rev().map(Into::into).collect(),
            message,
        }
    }
}

/// Body of deposit/withdraw calls. `input` is raw field text and wins over `amount`.
#[derive(Deserialize)]
struct AmountRequest {
    amount: Option<f64>,
    input: Option<String>,
}

impl AmountRequest {
    fn resolve(&self) -> f64 {
        match &self.input {
            Some(text) => parse_amount(text),
            None => self.amount.unwrap_or(0.0),
        }
    }
}

#[derive(Deserialize)]
struct ResetRequest {
    #[serde(default)]
    confirm: bool,
}

fn error_status(err: &LedgerError) -> StatusCode {
    if err.is_user_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/balance - Current balance
async fn get_balance<S: KeyValueStore>(State(state): State<SharedState<S>>) -> impl IntoResponse {
    let ledger = state.ledger();
    let message = balance_message(ledger.balance());
    Json(ApiResponse::ok(AccountView::of(&ledger, Some(message))))
}

/// GET /api/history - Transactions, newest first
async fn get_history<S: KeyValueStore>(State(state): State<SharedState<S>>) -> impl IntoResponse {
    let ledger = state.ledger();
    let history: Vec<TransactionResponse> = ledger.history().iter().rev().map(Into::into).collect();
    Json(ApiResponse::ok(history))
}

/// POST /api/deposit
async fn deposit<S: KeyValueStore>(
    State(state): State<SharedState<S>>,
    Json(request): Json<AmountRequest>,
) -> Response {
    apply(&state, Action::Deposit, request.resolve())
}

/// POST /api/withdraw
async fn withdraw<S: KeyValueStore>(
    State(state): State<SharedState<S>>,
    Json(request): Json<AmountRequest>,
) -> Response {
    apply(&state, Action::Withdraw, request.resolve())
}

fn apply<S: KeyValueStore>(state: &AppState<S>, action: Action, amount: f64) -> Response {
    let mut ledger = state.ledger();
    let result = match action {
        Action::Deposit => ledger.deposit(amount),
        Action::Withdraw => ledger.withdraw(amount),
    };
    let (message, _) = outcome_message(action, &result);

    match result {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::ok(AccountView::of(&ledger, Some(message)))),
        )
            .into_response(),
        Err(e) => {
            if !e.is_user_error() {
                error!(error = %format!("{e:#}"), "operation failed");
            }
            (
                error_status(&e),
                Json(ApiResponse::err(AccountView::of(&ledger, None), message)),
            )
                .into_response()
        }
    }
}

/// POST /api/reset - requires {"confirm": true}
async fn reset<S: KeyValueStore>(
    State(state): State<SharedState<S>>,
    Json(request): Json<ResetRequest>,
) -> Response {
    let mut ledger = state.ledger();

    match ledger.reset(|| request.confirm) {
        Ok(ResetOutcome::Reset) => (
            StatusCode::OK,
            Json(ApiResponse::ok(AccountView::of(
                &ledger,
                Some("Account reset.".to_string()),
            ))),
        )
            .into_response(),
        Ok(ResetOutcome::Cancelled) => (
            StatusCode::OK,
            Json(ApiResponse::ok(AccountView::of(
                &ledger,
                Some("Reset cancelled.".to_string()),
            ))),
        )
            .into_response(),
        Err(e) => {
            error!(error = %format!("{e:#}"), "reset failed");
            (
                error_status(&e),
                Json(ApiResponse::err(
                    AccountView::of(&ledger, None),
                    "Could not reset the account. Try again.".to_string(),
                )),
            )
                .into_response()
        }
    }
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn app<S: KeyValueStore + Send + 'static>(ledger: Ledger<S>) -> Router {
    let state = Arc::new(AppState {
        ledger: Mutex::new(ledger),
    });

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/balance", get(get_balance::<S>))
        .route("/history", get(get_history::<S>))
        .route("/deposit", post(deposit::<S>))
        .route("/withdraw", post(withdraw::<S>))
        .route("/reset", post(reset::<S>))
        .with_state(state);

    // Build main router
    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let config = Config::from_env()?;

    println!("🏧 ATM Simulator - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = SqliteStore::open(&config.db_path)?;
    let ledger = Ledger::open(store);
    if let Some(failure) = ledger.load_failure() {
        eprintln!("⚠️  Stored data was unreadable and has been reset: {}", failure);
    }
    println!("✓ Database opened: {:?}", config.db_path);

    let listener = tokio::net::TcpListener::bind(config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    info!(addr = %config.server_addr, "server listening");
    println!("\n🚀 Server running on http://{}", config.server_addr);
    println!("   API: http://{}/api/balance", config.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(ledger))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_simulator::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(Ledger::open(MemoryStore::new()))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, json) = call(&app, "GET", "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], "OK");
    }

    #[tokio::test]
    async fn test_deposit_withdraw_flow() {
        let app = test_app();

        let (status, json) = call(&app, "POST", "/api/deposit", Some(r#"{"amount":100}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["balance"], 100.0);
        assert_eq!(json["data"]["message"], "Deposit completed successfully.");

        let (status, json) = call(&app, "POST", "/api/withdraw", Some(r#"{"amount":150}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Insufficient balance for this withdrawal.");
        assert_eq!(json["data"]["balance"], 100.0);

        let (status, json) = call(&app, "POST", "/api/withdraw", Some(r#"{"input":"40,00"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["balance"], 60.0);
        assert_eq!(json["data"]["formatted_balance"], "R$ 60,00");

        let (_, json) = call(&app, "GET", "/api/history", None).await;
        let history = json["data"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["kind"], "Withdrawal");
        assert_eq!(history[1]["kind"], "Deposit");
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let app = test_app();

        let (status, json) = call(&app, "POST", "/api/deposit", Some(r#"{"input":"abc"}"#)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "Enter a positive amount to deposit.");
        assert_eq!(json["data"]["balance"], 0.0);
    }

    #[tokio::test]
    async fn test_reset_needs_confirm() {
        let app = test_app();
        call(&app, "POST", "/api/deposit", Some(r#"{"amount":10}"#)).await;

        let (_, json) = call(&app, "POST", "/api/reset", Some("{}")).await;
        assert_eq!(json["data"]["balance"], 10.0);
        assert_eq!(json["data"]["message"], "Reset cancelled.");

        let (status, json) = call(&app, "POST", "/api/reset", Some(r#"{"confirm":true}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["balance"], 0.0);
        assert!(json["data"]["history"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_balance_message() {
        let app = test_app();
        call(&app, "POST", "/api/deposit", Some(r#"{"amount":1234.5}"#)).await;

        let (_, json) = call(&app, "GET", "/api/balance", None).await;

        assert_eq!(json["data"]["message"], "Your balance is R$ 1.234,50.");
    }

    #[tokio::test]
    async fn test_save_failure_is_server_error() {
        let mut store = MemoryStore::new();
        store.set_fail_writes(true);
        let app = app(Ledger::open(store));

        let (status, json) = call(&app, "POST", "/api/deposit", Some(r#"{"amount":5}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["data"]["balance"], 0.0);
    }
}
