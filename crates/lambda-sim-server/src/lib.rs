//! HTTP gateway for lambda-sim.
//!
//! This crate puts a real listener in front of a [`LambdaSimulator`] so any
//! HTTP load generator can be pointed at the simulated platform:
//!
//! - Every request is forwarded through the simulator client
//! - Throttled requests come back as `429 Too Many Requests`
//! - `/_sim/health` and `/_sim/stats` report on the gateway itself
//!
//! # Quick Start
//!
//! ```ignore
//! use lambda_sim_common::SimulatorConfig;
//! use lambda_sim_server::{GatewayServer, ServerConfig, demo};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = GatewayServer::new(
//!         demo::hello_world_app,
//!         SimulatorConfig::default(),
//!         ServerConfig::default(),
//!     )?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! [`LambdaSimulator`]: lambda_sim_core::LambdaSimulator

pub mod demo;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use server::{GatewayServer, ServerConfig, TestHandle};
pub use state::GatewayState;
