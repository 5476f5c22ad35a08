//! HTTP router configuration.

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{forward, health_check, pool_stats};
use crate::state::GatewayState;

/// Build the gateway router.
///
/// Routes:
/// - `GET /_sim/health` - Health check
/// - `GET /_sim/stats` - Pool statistics
/// - anything else - Forwarded through the simulator
pub fn build_router(state: GatewayState, request_timeout: Duration) -> Router {
    let sim_routes = Router::new()
        .route("/_sim/health", get(health_check))
        .route("/_sim/stats", get(pool_stats));

    Router::new()
        .merge(sim_routes)
        .fallback(forward)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use lambda_sim_common::SimulatorConfig;
    use lambda_sim_core::{LambdaSimulator, SERVER_INSTANCE_ID};
    use tokio::task::JoinSet;
    use tower::util::ServiceExt;

    use crate::demo::hello_world_app;

    fn setup_router(max_concurrency: usize) -> (Router, GatewayState) {
        let config = SimulatorConfig::default()
            .with_max_concurrency(max_concurrency)
            .with_cold_start_delay(Duration::from_millis(50))
            .with_execution_duration(Duration::from_millis(1));
        let simulator = LambdaSimulator::new(hello_world_app, config).unwrap();
        let state = GatewayState::new(simulator);
        (build_router(state.clone(), Duration::from_secs(30)), state)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = setup_router(1);

        let response = app.oneshot(get_request("/_sim/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_check_after_dispose() {
        let (app, state) = setup_router(1);
        state.simulator().dispose();

        let response = app.oneshot(get_request("/_sim/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_tags_response() {
        let (app, _) = setup_router(1);

        let response = app.oneshot(get_request("/hello")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(SERVER_INSTANCE_ID));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_after_dispose_is_unavailable() {
        let (app, state) = setup_router(1);
        state.simulator().dispose();

        let response = app.oneshot(get_request("/hello")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_throttles_burst() {
        let (app, state) = setup_router(2);

        let mut tasks = JoinSet::new();
        for _ in 0..6 {
            let app = app.clone();
            tasks.spawn(async move { app.oneshot(get_request("/")).await.unwrap() });
        }

        let mut statuses = Vec::new();
        let mut ids = HashSet::new();
        while let Some(response) = tasks.join_next().await {
            let response = response.unwrap();
            statuses.push(response.status());
            if let Some(id) = response.headers().get(SERVER_INSTANCE_ID) {
                ids.insert(id.to_str().unwrap().to_string());
            }
        }

        let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
        let throttled = statuses
            .iter()
            .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
            .count();
        assert_eq!(ok, 2);
        assert_eq!(throttled, 4);
        assert_eq!(ids.len(), 2);
        assert_eq!(state.simulator().stats().throttled, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_endpoint() {
        let (app, _) = setup_router(3);

        app.clone().oneshot(get_request("/")).await.unwrap();
        let response = app.oneshot(get_request("/_sim/stats")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats["max_concurrency"], 3);
        assert_eq!(stats["admitted"], 1);
        assert_eq!(stats["idle"], 1);
        assert_eq!(stats["in_flight"], 0);
        assert_eq!(stats["disposed"], false);
    }
}
