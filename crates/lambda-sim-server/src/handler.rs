//! Request handlers for the gateway.
//!
//! Every request outside the `/_sim` prefix is forwarded through the
//! simulator; the `/_sim` endpoints report on the gateway itself.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, instrument, warn};

use lambda_sim_common::SimulatorError;

use crate::state::GatewayState;

/// Forward an inbound request to a simulated instance.
#[instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
pub async fn forward(State(state): State<GatewayState>, request: Request) -> Response {
    match state.client().send(request).await {
        Ok(response) => {
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                debug!("Request throttled");
            }
            response
        }
        Err(e) => {
            if e.is_disposed() {
                error!(error = %e, "Request received after simulator disposal");
            } else {
                warn!(error = %e, "Request failed");
            }
            error_to_response(&e)
        }
    }
}

/// Convert a `SimulatorError` to an HTTP response.
fn error_to_response(error: &SimulatorError) -> Response {
    let status = match error {
        SimulatorError::Disposed => StatusCode::SERVICE_UNAVAILABLE,
        SimulatorError::Cancelled { .. } => StatusCode::GATEWAY_TIMEOUT,
        SimulatorError::Invocation { .. } => StatusCode::BAD_GATEWAY,
        SimulatorError::RequestBody { .. } => StatusCode::BAD_REQUEST,
        SimulatorError::InvalidConfig { .. } | SimulatorError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let body = serde_json::json!({
        "error": error.to_string(),
    });

    (status, Json(body)).into_response()
}

/// Health check handler.
///
/// Returns 200 OK while the simulator accepts requests.
pub async fn health_check(State(state): State<GatewayState>) -> impl IntoResponse {
    if state.simulator().is_disposed() {
        (StatusCode::SERVICE_UNAVAILABLE, "DISPOSED")
    } else {
        (StatusCode::OK, "OK")
    }
}

/// Report pool statistics.
pub async fn pool_stats(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(state.simulator().stats())
}
