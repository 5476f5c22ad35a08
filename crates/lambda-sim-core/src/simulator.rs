//! The public simulator facade.

use std::sync::Arc;

use tracing::info;

use crate::application::ApplicationFactory;
use crate::forwarder::SimulatorClient;
use crate::pool::{InstancePool, PoolStats};
use lambda_sim_common::{SimulatorConfig, SimulatorError};

/// A simulated serverless deployment of one hosted application.
///
/// Dropping the simulator disposes it, after which every client created from
/// it fails with [`SimulatorError::Disposed`].
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use axum::routing::get;
/// use lambda_sim_common::SimulatorConfig;
/// use lambda_sim_core::{Application, LambdaSimulator};
///
/// let simulator = LambdaSimulator::new(
///     || Application::from_router(Router::new().route("/", get(|| async { "Hello" }))),
///     SimulatorConfig::default().with_max_concurrency(10),
/// )?;
///
/// let client = simulator.client();
/// let response = client.send(request).await?;
/// ```
pub struct LambdaSimulator {
    pool: Arc<InstancePool>,
    config: SimulatorConfig,
}

impl LambdaSimulator {
    /// Create a simulator for the application built by `factory`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::InvalidConfig`] if the configuration is
    /// invalid.
    pub fn new(
        factory: impl ApplicationFactory,
        config: SimulatorConfig,
    ) -> Result<Self, SimulatorError> {
        let pool = InstancePool::new(Arc::new(factory), &config)?;

        Ok(Self {
            pool: Arc::new(pool),
            config,
        })
    }

    /// Create a client whose requests are served by this simulator.
    pub fn client(&self) -> SimulatorClient {
        SimulatorClient::new(Arc::clone(&self.pool), self.config.execution_duration())
    }

    /// Get the simulator configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Get the underlying instance pool.
    pub fn pool(&self) -> &Arc<InstancePool> {
        &self.pool
    }

    /// Take a snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Dispose the simulator, destroying idle instances and rejecting
    /// further requests.
    pub fn dispose(&self) {
        if !self.pool.is_disposed() {
            info!("Disposing simulator");
        }
        self.pool.dispose();
    }

    /// Returns `true` once the simulator has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.pool.is_disposed()
    }
}

impl Drop for LambdaSimulator {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for LambdaSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LambdaSimulator")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish()
    }
}
