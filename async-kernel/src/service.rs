//! Tower integration.
//!
//! [`KernelService`] exposes a [`Kernel`] as a `tower::Service`, so it can sit
//! behind any tower-compatible transport and be wrapped in tower middleware.
//!
//! # Example
//!
//! ```rust,ignore
//! use tower::ServiceExt;
//!
//! let service = kernel.into_service();
//! let response = service.oneshot(http::Request::new(Bytes::new())).await?;
//! ```

use crate::kernel::Kernel;
use async_kernel_core::{Deferred, EventDispatcher, KernelError, Request, RequestKind, Response};
use bytes::Bytes;
use std::task::{Context, Poll};
use tower::Service;

/// A [`Kernel`] as a `tower::Service` handling main requests.
///
/// Errors are always caught, so only errors no exception listener answered
/// reach the caller.
pub struct KernelService<D> {
    kernel: Kernel<D>,
}

impl<D: EventDispatcher> KernelService<D> {
    /// Wrap a kernel.
    pub fn new(kernel: Kernel<D>) -> Self {
        Self { kernel }
    }

    /// Get a reference to the inner kernel.
    pub fn kernel(&self) -> &Kernel<D> {
        &self.kernel
    }
}

impl<D> Clone for KernelService<D> {
    fn clone(&self) -> Self {
        Self {
            kernel: self.kernel.clone(),
        }
    }
}

impl<D: EventDispatcher> Service<http::Request<Bytes>> for KernelService<D> {
    type Response = Response;
    type Error = KernelError;
    type Future = Deferred<Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The kernel is always ready
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Bytes>) -> Self::Future {
        self.kernel
            .handle_async(Request::from(request), RequestKind::Main, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_kernel_core::ResponseExt;
    use async_kernel_std::testing::StaticController;
    use async_kernel_std::routing::RouteTable;
    use tower::ServiceExt;

    #[tokio::test]
    async fn serves_http_requests() {
        let routes = RouteTable::builder()
            .route("/ping", StaticController::text("pong"))
            .unwrap()
            .build();
        let service = Kernel::builder().resolver(routes).build().into_service();

        let request = http::Request::builder()
            .uri("/ping")
            .body(Bytes::new())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.body_text(), "pong");
    }

    #[tokio::test]
    async fn unanswered_errors_reach_the_caller() {
        let service = Kernel::builder().build().into_service();

        let request = http::Request::builder()
            .uri("/missing")
            .body(Bytes::new())
            .unwrap();
        let error = service.oneshot(request).await.unwrap_err();

        assert!(matches!(error, KernelError::ControllerNotFound { .. }));
    }
}
