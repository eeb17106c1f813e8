//! Timeout listener for time-limited execution.

use async_kernel_core::{AsyncStage, BoxError, HttpError, Listener};
use http::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Error returned when a listener times out.
#[derive(Error, Debug, Clone)]
#[error("listener execution timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// A listener that wraps another listener with a timeout.
///
/// The timeout surfaces as a `504 Gateway Timeout` [`HttpError`], so an
/// exception listener that answers it keeps that status.
pub struct TimeoutListener<L> {
    inner: L,
    duration: Duration,
}

impl<L> TimeoutListener<L> {
    /// Create a new timeout listener.
    pub fn new(inner: L, duration: Duration) -> Self {
        Self { inner, duration }
    }
}

impl<E: AsyncStage, L: Listener<E>> Listener<E> for TimeoutListener<L> {
    async fn on_event(&self, event: &mut E) -> Result<(), BoxError> {
        match timeout(self.duration, self.inner.on_event(event)).await {
            Ok(result) => result,
            Err(_) => Err(Box::new(
                HttpError::new(StatusCode::GATEWAY_TIMEOUT, "listener timed out")
                    .with_source(TimeoutError(self.duration)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NullKernel;
    use async_kernel_core::{KernelError, Request, RequestEvent, RequestKind};
    use std::sync::Arc;

    struct Sleeper(u64);

    impl Listener<RequestEvent> for Sleeper {
        async fn on_event(&self, _event: &mut RequestEvent) -> Result<(), BoxError> {
            tokio::time::sleep(Duration::from_millis(self.0)).await;
            Ok(())
        }
    }

    fn request_event() -> RequestEvent {
        RequestEvent::new(
            NullKernel::shared(),
            Arc::new(Request::get("/")),
            RequestKind::Main,
        )
    }

    #[tokio::test]
    async fn passes_fast_listeners_through() {
        let listener = TimeoutListener::new(Sleeper(1), Duration::from_secs(5));
        listener.on_event(&mut request_event()).await.unwrap();
    }

    #[tokio::test]
    async fn slow_listener_becomes_gateway_timeout() {
        let listener = TimeoutListener::new(Sleeper(500), Duration::from_millis(10));

        let error = listener.on_event(&mut request_event()).await.unwrap_err();

        let error = KernelError::from_boxed(error);
        assert_eq!(error.status_code(), Some(StatusCode::GATEWAY_TIMEOUT));
    }
}
