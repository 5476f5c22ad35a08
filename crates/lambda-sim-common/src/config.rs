//! Configuration structures for the simulator.
//!
//! [`SimulatorConfig`] carries every knob the instance pool and request
//! forwarder need: the concurrency ceiling, instance lifetime, and the two
//! simulated delays (cold start and per-request execution).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SimulatorError;

/// Simulated platform configuration.
///
/// All fields have defaults so that partial TOML or JSON documents
/// deserialize cleanly. The defaults mirror a small function deployment with
/// aggressive recycling, which is handy for load tests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorConfig {
    /// Maximum number of concurrent in-flight requests.
    ///
    /// Each in-flight request is served by its own instance, so this is also
    /// the upper bound on checked-out instances. Must be greater than zero.
    #[serde(default = "defaults::max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum lifetime of an instance in milliseconds.
    ///
    /// An idle instance older than this is discarded the next time it is
    /// dequeued, and a fresh (cold) instance takes its place.
    #[serde(default = "defaults::max_instance_lifetime_ms")]
    pub max_instance_lifetime_ms: u64,

    /// Delay paid once per instance on first use, in milliseconds.
    #[serde(default = "defaults::cold_start_delay_ms")]
    pub cold_start_delay_ms: u64,

    /// Simulated execution time added to every admitted request, in milliseconds.
    #[serde(default = "defaults::execution_duration_ms")]
    pub execution_duration_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: defaults::max_concurrency(),
            max_instance_lifetime_ms: defaults::max_instance_lifetime_ms(),
            cold_start_delay_ms: defaults::cold_start_delay_ms(),
            execution_duration_ms: defaults::execution_duration_ms(),
        }
    }
}

impl SimulatorConfig {
    /// Set the concurrency ceiling.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the maximum instance lifetime.
    pub fn with_max_instance_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_instance_lifetime_ms = duration_to_ms(lifetime);
        self
    }

    /// Set the cold start delay.
    pub fn with_cold_start_delay(mut self, delay: Duration) -> Self {
        self.cold_start_delay_ms = duration_to_ms(delay);
        self
    }

    /// Set the per-request execution duration.
    pub fn with_execution_duration(mut self, duration: Duration) -> Self {
        self.execution_duration_ms = duration_to_ms(duration);
        self
    }

    /// Get the maximum instance lifetime as a `Duration`.
    pub fn max_instance_lifetime(&self) -> Duration {
        Duration::from_millis(self.max_instance_lifetime_ms)
    }

    /// Get the cold start delay as a `Duration`.
    pub fn cold_start_delay(&self) -> Duration {
        Duration::from_millis(self.cold_start_delay_ms)
    }

    /// Get the execution duration as a `Duration`.
    pub fn execution_duration(&self) -> Duration {
        Duration::from_millis(self.execution_duration_ms)
    }

    /// Check the configuration for values the pool cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::InvalidConfig`] if `max_concurrency` is zero.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.max_concurrency == 0 {
            return Err(SimulatorError::invalid_config(
                "max_concurrency must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Default value functions for serde.
mod defaults {
    pub const fn max_concurrency() -> usize {
        10
    }

    pub const fn max_instance_lifetime_ms() -> u64 {
        750
    }

    pub const fn cold_start_delay_ms() -> u64 {
        300
    }

    pub const fn execution_duration_ms() -> u64 {
        9
    }
}
