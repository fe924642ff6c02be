use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method, Request},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{warn, Level};

use crate::Coordinator;

mod http;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub struct Api {
    coordinator: Arc<Coordinator>,
}

impl Api {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    pub fn router(&self) -> Router {
        let router = Router::new()
            .route("/healthz", get(http::healthz))
            .route("/metrics/clock", get(http::clock_metrics))
            .route("/timer-state", get(http::timer_state))
            .route("/update-timer-state", post(http::update_timer_state))
            .route("/reset-timer", post(http::reset_timer))
            .route("/start-timer", post(http::start_timer))
            .route("/stop-timer", post(http::stop_timer))
            .route("/current-bet-number", get(http::current_bet_number))
            .route("/update-bet-number", post(http::update_bet_number))
            .route("/active-bets", post(http::submit_bet))
            .route("/active-bets/:round", get(http::bets_for_round))
            .route(
                "/result-history",
                get(http::result_history).post(http::submit_result),
            )
            .route(
                "/manual-result-state",
                get(http::manual_result_state).post(http::update_manual_result_state),
            )
            .route("/accounts", post(http::register_account))
            .route("/balance/:username", get(http::get_balance))
            .route("/balance", post(http::set_balance))
            .route("/player-history/:username", get(http::get_player_history))
            .route("/player-history", post(http::append_player_history))
            .route("/update-player-history", put(http::replace_player_history));

        let router = router.layer(cors_layer());
        let router = match self.coordinator.config.http_body_limit_bytes {
            Some(limit) if limit > 0 => router.layer(DefaultBodyLimit::max(limit)),
            _ => router,
        };
        let router = router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &Request<Body>| {
                            let request_id = request
                                .headers()
                                .get(&REQUEST_ID_HEADER)
                                .and_then(|value| value.to_str().ok())
                                .unwrap_or_default();
                            tracing::info_span!(
                                "http.request",
                                request_id,
                                method = %request.method(),
                                path = request.uri().path(),
                            )
                        })
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

        router.with_state(self.coordinator.clone())
    }
}

/// CORS for the dashboard, from the comma separated `ALLOWED_HTTP_ORIGINS`.
///
/// `*` allows any origin; an empty list sends no CORS headers.
fn cors_layer() -> CorsLayer {
    let configured = std::env::var("ALLOWED_HTTP_ORIGINS").unwrap_or_default();
    let origins: Vec<&str> = configured
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .collect();

    let allow_origin = if origins.contains(&"*") {
        AllowOrigin::any()
    } else {
        if origins.is_empty() {
            warn!("ALLOWED_HTTP_ORIGINS is empty; dashboard origins get no CORS headers");
        }
        AllowOrigin::list(origins.into_iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| warn!(origin, "ignoring invalid CORS origin"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, REQUEST_ID_HEADER])
        .expose_headers([REQUEST_ID_HEADER])
}
