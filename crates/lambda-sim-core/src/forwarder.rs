//! Request forwarding through the instance pool.
//!
//! [`SimulatorClient`] is the boundary-facing side of the simulator. Every
//! request it sends is routed to a pooled instance instead of a network:
//!
//! 1. Acquire an instance, or answer `429 Too Many Requests`
//! 2. Buffer and duplicate the request
//! 3. Invoke the instance (cold starting it on first use) and read the
//!    whole response
//! 4. Stamp the response with the serving instance id
//! 5. Hold the instance for the simulated execution duration
//! 6. Release the instance, whatever the outcome

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{
    Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri,
    Version,
};
use axum::response::IntoResponse;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, instrument, warn};

use crate::instance::Instance;
use crate::pool::InstancePool;
use lambda_sim_common::SimulatorError;

/// Response header carrying the id of the instance that served a request.
pub const SERVER_INSTANCE_ID: &str = "server-instance-id";

/// A fully buffered request that can be turned into independent copies.
///
/// Header values are copied as they are, without being revalidated.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
}

impl BufferedRequest {
    /// Consume a request, reading its body to the end.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::RequestBody`] if the body stream fails.
    pub async fn from_request(request: Request<Body>) -> Result<Self, SimulatorError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(SimulatorError::request_body)?;

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
        })
    }

    /// Build a new request carrying a copy of everything that was buffered.
    pub fn to_request(&self) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers.clone();
        *request.extensions_mut() = self.extensions.clone();
        request
    }

    /// The buffered body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Client whose transport is the simulated platform.
///
/// Cheap to clone; all clones share the same pool. Also usable as a
/// [`tower::Service`].
#[derive(Clone)]
pub struct SimulatorClient {
    pool: Arc<InstancePool>,
    execution_duration: Duration,
}

impl SimulatorClient {
    pub(crate) fn new(pool: Arc<InstancePool>, execution_duration: Duration) -> Self {
        Self {
            pool,
            execution_duration,
        }
    }

    /// Send a request without a cancellation signal.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>, SimulatorError> {
        self.send_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Send a request through the simulated platform.
    ///
    /// A throttled request is answered with `429` and is not an error.
    ///
    /// # Errors
    ///
    /// - [`SimulatorError::Disposed`] if the simulator has been disposed
    /// - [`SimulatorError::Cancelled`] if `cancel` fires before completion
    /// - [`SimulatorError::Invocation`] if the hosted application fails
    /// - [`SimulatorError::RequestBody`] if the request body cannot be read
    #[instrument(skip_all, fields(method = %request.method(), uri = %request.uri()))]
    pub async fn send_with_cancel(
        &self,
        request: Request<Body>,
        cancel: &CancellationToken,
    ) -> Result<Response<Body>, SimulatorError> {
        let Some(instance) = self.pool.try_acquire()? else {
            return Ok(StatusCode::TOO_MANY_REQUESTS.into_response());
        };
        let checkout = Checkout::new(&self.pool, instance);
        let instance = checkout.instance();

        let request = BufferedRequest::from_request(request).await?;

        let mut response = match instance.invoke(request.to_request(), cancel).await {
            Ok(response) => response,
            Err(e) => {
                warn!(instance_id = %instance.id(), error = %e, "Request failed");
                return Err(e);
            }
        };

        if let Ok(value) = HeaderValue::from_str(instance.id()) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(SERVER_INSTANCE_ID), value);
        }

        tokio::select! {
            () = cancel.cancelled() => {
                return Err(SimulatorError::Cancelled { stage: "execution" });
            }
            () = tokio::time::sleep(self.execution_duration) => {}
        }

        debug!(
            instance_id = %instance.id(),
            status = response.status().as_u16(),
            "Request completed"
        );

        Ok(response)
    }

    /// The pool this client draws instances from.
    pub fn pool(&self) -> &Arc<InstancePool> {
        &self.pool
    }
}

impl std::fmt::Debug for SimulatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatorClient")
            .field("execution_duration", &self.execution_duration)
            .finish_non_exhaustive()
    }
}

impl Service<Request<Body>> for SimulatorClient {
    type Response = Response<Body>;
    type Error = SimulatorError;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, SimulatorError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.send(request).await })
    }
}

/// Returns the checked-out instance to the pool when dropped.
///
/// Covers every exit: success, invocation errors, cancellation, and the
/// request future being dropped mid-flight.
struct Checkout<'a> {
    pool: &'a InstancePool,
    instance: Option<Instance>,
}

impl<'a> Checkout<'a> {
    fn new(pool: &'a InstancePool, instance: Instance) -> Self {
        Self {
            pool,
            instance: Some(instance),
        }
    }

    fn instance(&self) -> &Instance {
        self.instance
            .as_ref()
            .unwrap_or_else(|| unreachable!("instance is only taken on drop"))
    }
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.pool.release(instance);
        }
    }
}
