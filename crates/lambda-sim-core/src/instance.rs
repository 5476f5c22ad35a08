//! Simulated execution instances.
//!
//! An [`Instance`] is the analogue of one function container. It builds its
//! hosted application eagerly, but only produces an invocation handle on first
//! use, paying the configured cold-start delay exactly once:
//!
//! 1. Construct: new identity, activation timestamp, hosted application
//! 2. First invocation: cold start delay, then the handle is cached
//! 3. Later invocations: cached handle, no delay
//! 4. Destroy: handle and application released

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::application::{Application, ApplicationFactory, InvocationHandle};
use lambda_sim_common::SimulatorError;

/// A single simulated execution unit.
///
/// An instance is owned either by the pool's idle queue or by exactly one
/// in-flight request. Ownership moves between the two, so it is never shared
/// between concurrent requests.
pub struct Instance {
    id: String,
    activated_at: Instant,
    cold_start_delay: Duration,
    application: Option<Application>,
    handle: OnceCell<Mutex<InvocationHandle>>,
}

impl Instance {
    /// Create a cold instance backed by a fresh application from `factory`.
    pub(crate) fn new(factory: &dyn ApplicationFactory, cold_start_delay: Duration) -> Self {
        let id = Uuid::new_v4().to_string();
        let application = factory.create_application();

        trace!(instance_id = %id, "Instance constructed");

        Self {
            id,
            activated_at: Instant::now(),
            cold_start_delay,
            application: Some(application),
            handle: OnceCell::new(),
        }
    }

    /// Unique identifier of this instance.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When this instance was activated.
    pub fn activated_at(&self) -> Instant {
        self.activated_at
    }

    /// Time elapsed since activation.
    pub fn age(&self) -> Duration {
        self.activated_at.elapsed()
    }

    /// Returns `true` if the instance has outlived `max_lifetime`.
    pub fn is_expired(&self, max_lifetime: Duration) -> bool {
        self.age() > max_lifetime
    }

    /// Returns `true` once the cold start has completed.
    pub fn is_warm(&self) -> bool {
        self.handle.initialized()
    }

    /// Returns `true` once [`Instance::destroy`] has been called.
    pub fn is_destroyed(&self) -> bool {
        self.application.is_none()
    }

    /// Get the invocation handle, cold starting the instance on first use.
    ///
    /// Concurrent first callers share a single initialization; only one of
    /// them pays the cold-start delay. If `cancel` fires during the cold start
    /// the instance stays cold and the next caller starts over.
    pub async fn invocation_handle(
        &self,
        cancel: &CancellationToken,
    ) -> Result<InvocationHandle, SimulatorError> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let Some(application) = self.application.as_ref() else {
                    return Err(SimulatorError::Disposed);
                };

                debug!(
                    instance_id = %self.id,
                    delay_ms = self.cold_start_delay.as_millis(),
                    "Cold starting instance"
                );

                tokio::select! {
                    () = cancel.cancelled() => Err(SimulatorError::Cancelled { stage: "cold start" }),
                    () = tokio::time::sleep(self.cold_start_delay) => {
                        Ok(Mutex::new(application.invocation_handle()))
                    }
                }
            })
            .await?;

        Ok(handle.lock().clone())
    }

    /// Send a request to the hosted application and receive its full response.
    ///
    /// The response body is read to the end before this returns, so the
    /// application is done with the request once the caller gets the response
    /// back. Status and headers are kept as the application set them.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Invocation`] if the application or its
    /// response body fails and [`SimulatorError::Cancelled`] if `cancel` fires
    /// first.
    pub async fn invoke(
        &self,
        request: Request<Body>,
        cancel: &CancellationToken,
    ) -> Result<Response<Body>, SimulatorError> {
        let handle = self.invocation_handle(cancel).await?;

        let exchange = async {
            let response = handle
                .oneshot(request)
                .await
                .map_err(|e| SimulatorError::invocation(self.id.clone(), e))?;

            let (parts, body) = response.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX)
                .await
                .map_err(|e| SimulatorError::invocation(self.id.clone(), e))?;

            Ok::<_, SimulatorError>(Response::from_parts(parts, Body::from(body)))
        };

        tokio::select! {
            () = cancel.cancelled() => Err(SimulatorError::Cancelled { stage: "invocation" }),
            result = exchange => result,
        }
    }

    /// Release the invocation handle and hosted application.
    ///
    /// Calling this more than once is harmless.
    pub fn destroy(&mut self) {
        let was_warm = self.handle.take().is_some();
        if self.application.take().is_some() {
            debug!(
                instance_id = %self.id,
                age_ms = self.age().as_millis(),
                was_warm,
                "Instance destroyed"
            );
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("warm", &self.is_warm())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}
