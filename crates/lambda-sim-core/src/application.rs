//! Hosted application abstraction.
//!
//! The simulator never depends on a concrete web framework type. A hosted
//! application is any cloneable [`tower::Service`] that turns a
//! `Request<Body>` into a `Response<Body>`; an [`axum::Router`] is the usual
//! choice. Each simulated instance gets its own [`Application`], produced by
//! an [`ApplicationFactory`].

use std::fmt;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use parking_lot::Mutex;
use tower::util::BoxCloneService;
use tower::{Service, ServiceExt};

use lambda_sim_common::BoxError;

/// The handle used to execute a request against a hosted application.
pub type InvocationHandle = BoxCloneService<Request<Body>, Response<Body>, BoxError>;

/// A hosted application owned by a single instance.
///
/// The boxed service is `Send` but not `Sync`, so it is kept behind a mutex
/// and cloned out whenever an invocation handle is needed.
pub struct Application {
    service: Mutex<InvocationHandle>,
}

impl Application {
    /// Wrap an arbitrary service as a hosted application.
    pub fn new<S>(service: S) -> Self
    where
        S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
        S::Error: Into<BoxError>,
        S::Future: Send + 'static,
    {
        let service = service.map_err(|e: S::Error| -> BoxError { e.into() });
        Self {
            service: Mutex::new(BoxCloneService::new(service)),
        }
    }

    /// Wrap an axum router as a hosted application.
    pub fn from_router(router: Router) -> Self {
        Self::new(router)
    }

    /// Build a fresh invocation handle for this application.
    pub(crate) fn invocation_handle(&self) -> InvocationHandle {
        self.service.lock().clone()
    }
}

impl From<Router> for Application {
    fn from(router: Router) -> Self {
        Self::from_router(router)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application").finish_non_exhaustive()
    }
}

/// Creates a fresh, independently configured hosted application.
///
/// Called once for every instance the pool constructs. Any
/// `Fn() -> Application` closure is a factory.
pub trait ApplicationFactory: Send + Sync + 'static {
    /// Build a new application for a new instance.
    fn create_application(&self) -> Application;
}

impl<F> ApplicationFactory for F
where
    F: Fn() -> Application + Send + Sync + 'static,
{
    fn create_application(&self) -> Application {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;

    #[tokio::test]
    async fn test_router_application_serves_requests() {
        let app = Application::from_router(Router::new().route("/", get(|| async { "hi" })));

        let response = app
            .invocation_handle()
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_service_errors_are_boxed() {
        let service = tower::service_fn(|_req: Request<Body>| async {
            Err::<Response<Body>, _>(std::io::Error::other("boom"))
        });
        let app = Application::new(service);

        let err = app
            .invocation_handle()
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_closure_is_factory() {
        let factory = || Application::from_router(Router::new());
        let app = factory.create_application();
        assert!(format!("{app:?}").contains("Application"));
    }
}
