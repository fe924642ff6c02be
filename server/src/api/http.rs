use axum::{
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use colorclock_types::{Bet, Error, ManualOverride, RoundState, SettlementResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::task;

use crate::Coordinator;

type ApiResult = Result<Response, ApiError>;

/// Run a store-backed coordinator call on the blocking pool.
async fn blocking<T, F>(coordinator: &Arc<Coordinator>, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Coordinator) -> colorclock_types::Result<T> + Send + 'static,
{
    let coordinator = coordinator.clone();
    task::spawn_blocking(move || call(&coordinator))
        .await
        .map_err(|err| ApiError(Error::StoreUnavailable(format!("store task failed: {err}"))))?
        .map_err(ApiError)
}

/// Error envelope returned by every endpoint.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub(super) struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::DuplicateRound(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
        };
        if status.is_server_error() {
            tracing::error!(err = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

fn message(status: StatusCode, message: &'static str) -> Response {
    (status, Json(MessageResponse { message })).into_response()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthzResponse {
    ok: bool,
    clock_running: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClockToggleResponse {
    message: &'static str,
    changed: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RoundNumberBody {
    #[serde(alias = "currentBetNumber")]
    current_round_number: u64,
}

#[derive(Deserialize)]
pub(super) struct ResultSubmission {
    #[serde(alias = "resultEntry")]
    result: SettlementResult,
}

#[derive(Deserialize)]
pub(super) struct RegisterAccountBody {
    username: String,
    #[serde(default)]
    balance: Decimal,
}

#[derive(Deserialize)]
pub(super) struct BalanceUpdate {
    username: String,
    balance: Decimal,
}

#[derive(Serialize)]
struct BalanceResponse {
    balance: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HistoryAppend {
    username: String,
    history_entry: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HistoryReplace {
    username: String,
    history_entries: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    player_history: Vec<Value>,
}

pub(super) async fn healthz(AxumState(coordinator): AxumState<Arc<Coordinator>>) -> Response {
    Json(HealthzResponse {
        ok: true,
        clock_running: coordinator.clock_running().await,
    })
    .into_response()
}

pub(super) async fn clock_metrics(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
) -> Response {
    Json(coordinator.clock_metrics()).into_response()
}

pub(super) async fn timer_state(AxumState(coordinator): AxumState<Arc<Coordinator>>) -> Response {
    Json(coordinator.timer_state()).into_response()
}

pub(super) async fn update_timer_state(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(payload): Json<RoundState>,
) -> ApiResult {
    blocking(&coordinator, move |coordinator| {
        coordinator.force_set_timer(
            payload.countdown_seconds_remaining,
            payload.current_round_number,
        )
    })
    .await?;
    Ok(message(StatusCode::OK, "Timer state updated."))
}

pub(super) async fn reset_timer(AxumState(coordinator): AxumState<Arc<Coordinator>>) -> ApiResult {
    blocking(&coordinator, |coordinator| coordinator.reset_round()).await?;
    Ok(message(StatusCode::OK, "Timer reset."))
}

pub(super) async fn start_timer(AxumState(coordinator): AxumState<Arc<Coordinator>>) -> Response {
    let changed = coordinator.start_clock().await;
    let message = if changed {
        "Timer started."
    } else {
        "Timer already running."
    };
    Json(ClockToggleResponse { message, changed }).into_response()
}

pub(super) async fn stop_timer(AxumState(coordinator): AxumState<Arc<Coordinator>>) -> Response {
    let changed = coordinator.stop_clock().await;
    let message = if changed {
        "Timer stopped."
    } else {
        "Timer not running."
    };
    Json(ClockToggleResponse { message, changed }).into_response()
}

pub(super) async fn current_bet_number(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
) -> Response {
    Json(RoundNumberBody {
        current_round_number: coordinator.current_round_number(),
    })
    .into_response()
}

pub(super) async fn update_bet_number(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(payload): Json<RoundNumberBody>,
) -> ApiResult {
    blocking(&coordinator, move |coordinator| {
        coordinator.set_round_number(payload.current_round_number)
    })
    .await?;
    Ok(message(StatusCode::OK, "Current bet number updated."))
}

pub(super) async fn submit_bet(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(bet): Json<Bet>,
) -> ApiResult {
    blocking(&coordinator, move |coordinator| coordinator.submit_bet(bet)).await?;
    Ok(message(StatusCode::CREATED, "Bet saved."))
}

pub(super) async fn bets_for_round(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Path(round): Path<u64>,
) -> ApiResult {
    let bets = blocking(&coordinator, move |coordinator| coordinator.bets_for_round(round)).await?;
    Ok(Json(bets).into_response())
}

pub(super) async fn result_history(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
) -> ApiResult {
    let results = blocking(&coordinator, |coordinator| coordinator.result_history()).await?;
    Ok(Json(results).into_response())
}

pub(super) async fn submit_result(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(payload): Json<ResultSubmission>,
) -> ApiResult {
    blocking(&coordinator, move |coordinator| {
        coordinator.submit_result(payload.result)
    })
    .await?;
    Ok(message(StatusCode::OK, "Result history updated."))
}

pub(super) async fn manual_result_state(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
) -> Response {
    Json(coordinator.manual_override()).into_response()
}

pub(super) async fn update_manual_result_state(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(payload): Json<ManualOverride>,
) -> Response {
    coordinator.set_manual_override(payload);
    message(StatusCode::OK, "Manual result state updated successfully.")
}

pub(super) async fn register_account(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(payload): Json<RegisterAccountBody>,
) -> ApiResult {
    let account = blocking(&coordinator, move |coordinator| {
        coordinator.register_account(payload.username, payload.balance)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(account)).into_response())
}

pub(super) async fn get_balance(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Path(username): Path<String>,
) -> ApiResult {
    let balance = blocking(&coordinator, move |coordinator| coordinator.balance(&username)).await?;
    Ok(Json(BalanceResponse { balance }).into_response())
}

pub(super) async fn set_balance(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(payload): Json<BalanceUpdate>,
) -> ApiResult {
    blocking(&coordinator, move |coordinator| {
        coordinator.set_balance(&payload.username, payload.balance)
    })
    .await?;
    Ok(message(StatusCode::OK, "Balance updated."))
}

pub(super) async fn get_player_history(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Path(username): Path<String>,
) -> ApiResult {
    let player_history = blocking(&coordinator, move |coordinator| {
        coordinator.player_history(&username)
    })
    .await?;
    Ok(Json(HistoryResponse { player_history }).into_response())
}

pub(super) async fn append_player_history(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(payload): Json<HistoryAppend>,
) -> ApiResult {
    blocking(&coordinator, move |coordinator| {
        coordinator.append_player_history(&payload.username, payload.history_entry)
    })
    .await?;
    Ok(message(StatusCode::OK, "Player history updated."))
}

pub(super) async fn replace_player_history(
    AxumState(coordinator): AxumState<Arc<Coordinator>>,
    Json(payload): Json<HistoryReplace>,
) -> ApiResult {
    blocking(&coordinator, move |coordinator| {
        coordinator.replace_player_history(&payload.username, payload.history_entries)
    })
    .await?;
    Ok(message(
        StatusCode::OK,
        "Player history replaced with updated entries.",
    ))
}

#[cfg(test)]
mod tests {
    use crate::store::MemoryStore;
    use crate::{Api, Coordinator, ServerConfig};
    use colorclock_types::MAX_ROUND;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<Coordinator>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let coordinator =
            Arc::new(Coordinator::new(store.clone(), ServerConfig::default()).unwrap());
        (Api::new(coordinator.clone()).router(), coordinator, store)
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_timer_state_defaults() {
        let (router, _, _) = app();
        let (status, body) = send(&router, Method::GET, "/timer-state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"countdownSecondsRemaining": 35, "currentRoundNumber": 1})
        );

        let (_, body) = send(&router, Method::GET, "/current-bet-number", None).await;
        assert_eq!(body, json!({"currentRoundNumber": 1}));
    }

    #[tokio::test]
    async fn test_update_and_reset_timer() {
        let (router, _, _) = app();
        let (status, _) = send(
            &router,
            Method::POST,
            "/update-timer-state",
            Some(json!({"timeLeft": 10, "currentBetNumber": 7})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&router, Method::POST, "/reset-timer", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&router, Method::GET, "/timer-state", None).await;
        assert_eq!(
            body,
            json!({"countdownSecondsRemaining": 35, "currentRoundNumber": 8})
        );

        let (status, body) = send(
            &router,
            Method::POST,
            "/update-timer-state",
            Some(json!({"countdownSecondsRemaining": 99, "currentRoundNumber": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");

        let (status, _) = send(
            &router,
            Method::POST,
            "/update-bet-number",
            Some(json!({"currentRoundNumber": 42})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&router, Method::GET, "/current-bet-number", None).await;
        assert_eq!(body, json!({"currentRoundNumber": 42}));
    }

    #[tokio::test]
    async fn test_start_timer_is_idempotent() {
        let (router, coordinator, _) = app();
        let (status, body) = send(&router, Method::POST, "/start-timer", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);

        let (status, body) = send(&router, Method::POST, "/start-timer", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], false);
        assert!(coordinator.clock_running().await);

        let (_, body) = send(&router, Method::GET, "/healthz", None).await;
        assert_eq!(body["clockRunning"], true);

        let (_, body) = send(&router, Method::POST, "/stop-timer", None).await;
        assert_eq!(body["changed"], true);
        assert!(!coordinator.clock_running().await);
    }

    #[tokio::test]
    async fn test_active_bets() {
        let (router, _, _) = app();
        let (status, _) = send(
            &router,
            Method::POST,
            "/active-bets",
            Some(json!({"roundNumber": 3, "blockIdentifier": "red", "amount": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &router,
            Method::POST,
            "/active-bets",
            Some(json!({"betNo": 3, "betBlock": 4, "betAmount": 2.5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&router, Method::GET, "/active-bets/3", None).await;
        assert_eq!(status, StatusCode::OK);
        let bets = body.as_array().unwrap();
        assert_eq!(bets.len(), 2);
        assert_eq!(bets[0]["blockIdentifier"], "red");
        assert_eq!(bets[1]["blockIdentifier"], 4);

        let (status, body) = send(&router, Method::GET, "/active-bets/4", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) = send(
            &router,
            Method::POST,
            "/active-bets",
            Some(json!({"roundNumber": 3, "blockIdentifier": "red", "amount": -1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_duplicate_result_is_bad_request() {
        let (router, _, _) = app();
        let entry = json!({"resultEntry": {"betNumber": 5, "color": "red", "number": 3}});
        let (status, _) = send(&router, Method::POST, "/result-history", Some(entry.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, Method::POST, "/result-history", Some(entry)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "DUPLICATE_ROUND");

        let (_, body) = send(&router, Method::GET, "/result-history", None).await;
        assert_eq!(
            body,
            json!([{"roundNumber": 5, "settlementPayload": {"color": "red", "number": 3}}])
        );

        let (status, _) = send(
            &router,
            Method::POST,
            "/result-history",
            Some(json!({"result": {"roundNumber": 6, "settlementPayload": 1, "color": "red"}})),
        )
        .await;
        assert!(status.is_client_error());
        let (_, body) = send(&router, Method::GET, "/result-history", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sqlite_backed_routes() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = crate::store::SqliteStore::open(&dir.path().join("api.db")).unwrap();
        let coordinator =
            Arc::new(Coordinator::new(Arc::new(store), ServerConfig::default()).unwrap());
        let router = Api::new(coordinator).router();

        let (status, _) = send(
            &router,
            Method::POST,
            "/active-bets",
            Some(json!({"betNo": 2, "betBlock": "red", "betAmount": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, body) = send(&router, Method::GET, "/active-bets/2", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = send(
            &router,
            Method::POST,
            "/update-timer-state",
            Some(json!({"countdownSecondsRemaining": 3, "currentRoundNumber": u64::MAX})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");

        let (status, body) = send(
            &router,
            Method::POST,
            "/result-history",
            Some(json!({"resultEntry": {"betNumber": MAX_ROUND + 1, "color": "red"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_INPUT");

        let (_, body) = send(&router, Method::GET, "/timer-state", None).await;
        assert_eq!(body["currentRoundNumber"], 1);
    }

    #[tokio::test]
    async fn test_manual_result_state() {
        let (router, _, _) = app();
        let (_, body) = send(&router, Method::GET, "/manual-result-state", None).await;
        assert_eq!(body, json!({"enabled": false, "chosenValue": null}));

        let (status, _) = send(
            &router,
            Method::POST,
            "/manual-result-state",
            Some(json!({"isManualResultEnabled": true, "selectedColor": "green"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&router, Method::GET, "/manual-result-state", None).await;
        assert_eq!(body, json!({"enabled": true, "chosenValue": "green"}));
    }

    #[tokio::test]
    async fn test_store_unavailable_is_server_error() {
        let (router, _, store) = app();
        store.set_unavailable(true);

        let (status, body) = send(&router, Method::GET, "/result-history", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "STORE_UNAVAILABLE");

        let (status, _) = send(
            &router,
            Method::POST,
            "/active-bets",
            Some(json!({"roundNumber": 1, "blockIdentifier": "red", "amount": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // Round state is served from memory and stays readable.
        let (status, _) = send(&router, Method::GET, "/timer-state", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_accounts() {
        let (router, _, _) = app();
        let (status, _) = send(&router, Method::GET, "/balance/alice", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &router,
            Method::POST,
            "/accounts",
            Some(json!({"username": "alice", "balance": 100})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &router,
            Method::POST,
            "/balance",
            Some(json!({"username": "alice", "balance": 75.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&router, Method::GET, "/balance/alice", None).await;
        assert_eq!(body, json!({"balance": 75.5}));

        let (status, _) = send(
            &router,
            Method::POST,
            "/player-history",
            Some(json!({"username": "alice", "historyEntry": {"round": 3}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &router,
            Method::PUT,
            "/update-player-history",
            Some(json!({"username": "alice", "historyEntries": [{"round": 4}, {"round": 5}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&router, Method::GET, "/player-history/alice", None).await;
        assert_eq!(body, json!({"playerHistory": [{"round": 4}, {"round": 5}]}));

        let (status, body) = send(
            &router,
            Method::POST,
            "/player-history",
            Some(json!({"username": "bob", "historyEntry": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }
}
