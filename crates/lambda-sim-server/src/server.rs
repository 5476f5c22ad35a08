//! HTTP gateway implementation.
//!
//! This module provides the main [`GatewayServer`] struct, which puts a real
//! TCP listener in front of a simulator.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use lambda_sim_common::{ServerConfigFile, SimulatorConfig, SimulatorError};
use lambda_sim_core::{ApplicationFactory, LambdaSimulator};

use crate::router::build_router;
use crate::state::GatewayState;

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server.
    pub bind_addr: SocketAddr,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Enable graceful shutdown on SIGTERM/SIGINT.
    pub graceful_shutdown: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout_secs: 30,
            graceful_shutdown: true,
        }
    }
}

impl ServerConfig {
    /// Get the request timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TryFrom<&ServerConfigFile> for ServerConfig {
    type Error = SimulatorError;

    fn try_from(file: &ServerConfigFile) -> Result<Self, Self::Error> {
        let bind_addr = file.bind_addr.parse().map_err(|e| {
            SimulatorError::invalid_config(format!(
                "Invalid bind_addr '{}': {e}",
                file.bind_addr
            ))
        })?;

        Ok(Self {
            bind_addr,
            request_timeout_secs: file.request_timeout_secs,
            graceful_shutdown: file.graceful_shutdown,
        })
    }
}

/// Simulator HTTP gateway.
///
/// # Example
///
/// ```ignore
/// use lambda_sim_common::SimulatorConfig;
/// use lambda_sim_server::{GatewayServer, ServerConfig, demo};
///
/// let server = GatewayServer::new(
///     demo::hello_world_app,
///     SimulatorConfig::default(),
///     ServerConfig::default(),
/// )?;
/// server.run().await?;
/// ```
pub struct GatewayServer {
    state: GatewayState,
    config: ServerConfig,
}

impl GatewayServer {
    /// Create a new gateway around a fresh simulator.
    ///
    /// # Errors
    ///
    /// Returns an error if the simulator configuration is invalid.
    pub fn new(
        factory: impl ApplicationFactory,
        simulator_config: SimulatorConfig,
        server_config: ServerConfig,
    ) -> Result<Self, SimulatorError> {
        let simulator = LambdaSimulator::new(factory, simulator_config)?;

        Ok(Self {
            state: GatewayState::new(simulator),
            config: server_config,
        })
    }

    /// Get a reference to the gateway state.
    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the gateway until shutdown, then dispose the simulator.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the address.
    pub async fn run(self) -> Result<(), SimulatorError> {
        let app = build_router(self.state.clone(), self.config.request_timeout());

        let listener = TcpListener::bind(&self.config.bind_addr).await?;

        info!(addr = %self.config.bind_addr, "Starting HTTP gateway");

        if self.config.graceful_shutdown {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        } else {
            axum::serve(listener, app).await?;
        }

        self.state.simulator().dispose();
        info!(stats = ?self.state.simulator().stats(), "Gateway shutdown complete");
        Ok(())
    }

    /// Start a gateway on an ephemeral port and return a handle for testing.
    pub async fn start_test(
        factory: impl ApplicationFactory,
        simulator_config: SimulatorConfig,
    ) -> Result<TestHandle, SimulatorError> {
        let simulator = LambdaSimulator::new(factory, simulator_config)?;
        let state = GatewayState::new(simulator);
        let app = build_router(state.clone(), Duration::from_secs(30));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Ok(TestHandle {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }
}

/// Handle for a test gateway instance.
pub struct TestHandle {
    addr: SocketAddr,
    state: GatewayState,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl TestHandle {
    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server URL.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the gateway state.
    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Shutdown the server gracefully and dispose the simulator.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
        self.state.simulator().dispose();
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
