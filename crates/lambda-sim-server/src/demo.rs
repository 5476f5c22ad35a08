//! Demo hosted application.
//!
//! Answers "Hello World!" on any path after a short handler delay, and echoes
//! the body back on `POST /echo`.

use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::routing::post;

use lambda_sim_core::Application;

const HANDLER_DELAY: Duration = Duration::from_millis(5);

/// Build the demo router.
pub fn hello_world_router() -> Router {
    Router::new()
        .route("/echo", post(echo))
        .fallback(hello_world)
}

/// Application factory for the demo router.
pub fn hello_world_app() -> Application {
    Application::from_router(hello_world_router())
}

async fn hello_world() -> &'static str {
    tokio::time::sleep(HANDLER_DELAY).await;
    "Hello World!"
}

async fn echo(body: Bytes) -> Bytes {
    body
}
