//! Serverless platform simulation core.
//!
//! This crate simulates the concurrency and lifecycle behavior of a function
//! platform so client code can be load tested against realistic admission
//! control:
//! - [`InstancePool`]: Concurrency ceiling, instance reuse and recycling
//! - [`Instance`]: One simulated container with a one-time cold start
//! - [`SimulatorClient`]: Routes requests to pooled instances
//! - [`LambdaSimulator`]: Public facade tying the pieces together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   SimulatorClient                       │
//! │  - 429 when no slot is free                             │
//! │  - Request duplication, instance id header              │
//! │  - Simulated execution latency                          │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                     InstancePool                        │
//! │  (Shared across all clients, thread-safe)               │
//! │  - Atomic in-flight counter                             │
//! │  - Idle queue with lifetime-based recycling             │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Instance                          │
//! │  (Owned by one request at a time)                       │
//! │  - Hosted application from the factory                  │
//! │  - Lazily created invocation handle (cold start)        │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod application;
pub mod forwarder;
pub mod instance;
pub mod pool;
pub mod simulator;

pub use application::{Application, ApplicationFactory, InvocationHandle};
pub use forwarder::{BufferedRequest, SERVER_INSTANCE_ID, SimulatorClient};
pub use instance::Instance;
pub use pool::{InstancePool, PoolStats};
pub use simulator::LambdaSimulator;
