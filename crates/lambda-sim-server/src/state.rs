//! Shared gateway state.

use std::sync::Arc;

use lambda_sim_core::{LambdaSimulator, SimulatorClient};

/// Shared state across all request handlers.
///
/// Cloned for each request, so the simulator sits behind an `Arc`.
#[derive(Clone)]
pub struct GatewayState {
    simulator: Arc<LambdaSimulator>,
    client: SimulatorClient,
}

impl GatewayState {
    /// Create gateway state around a simulator.
    pub fn new(simulator: LambdaSimulator) -> Self {
        let client = simulator.client();
        Self {
            simulator: Arc::new(simulator),
            client,
        }
    }

    /// Get the simulator.
    pub fn simulator(&self) -> &LambdaSimulator {
        &self.simulator
    }

    /// Get the client used to forward inbound requests.
    pub fn client(&self) -> &SimulatorClient {
        &self.client
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("simulator", &self.simulator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_sim_common::SimulatorConfig;

    use crate::demo::hello_world_app;

    #[test]
    fn test_state_shares_simulator() {
        let simulator =
            LambdaSimulator::new(hello_world_app, SimulatorConfig::default()).unwrap();
        let state = GatewayState::new(simulator);
        let cloned = state.clone();

        cloned.simulator().dispose();

        assert!(state.simulator().is_disposed());
        assert!(state.client().pool().is_disposed());
    }
}
