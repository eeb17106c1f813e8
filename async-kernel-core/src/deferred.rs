//! Deferred values.
//!
//! A [`Deferred<T>`] is a value that is not available yet: a boxed, `Send`
//! future resolving to `Result<T, KernelError>`. It is fulfilled or rejected
//! exactly once, and it composes through continuations:
//!
//! - [`Deferred::then`] runs on fulfillment; rejections skip it untouched.
//! - [`Deferred::otherwise`] runs on rejection; fulfillments skip it.
//! - [`Deferred::then_or_else`] attaches both at one link.
//!
//! Nothing runs until the deferred is polled, so building a chain never
//! blocks. The executor is always supplied by the caller.

use crate::error::KernelError;
use futures::{
    FutureExt,
    future::{self, BoxFuture},
};
use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// A single-resolution value resolving to `T` or a [`KernelError`].
#[must_use = "a deferred value does nothing unless polled"]
pub struct Deferred<T> {
    inner: BoxFuture<'static, Result<T, KernelError>>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Wrap a future.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, KernelError>> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
        }
    }

    /// An already-fulfilled deferred.
    pub fn fulfilled(value: T) -> Self {
        Self {
            inner: future::ready(Ok(value)).boxed(),
        }
    }

    /// An already-rejected deferred.
    pub fn rejected(error: impl Into<KernelError>) -> Self {
        Self {
            inner: future::ready(Err(error.into())).boxed(),
        }
    }

    /// Lift a synchronous result.
    pub fn from_result(result: Result<T, KernelError>) -> Self {
        Self {
            inner: future::ready(result).boxed(),
        }
    }

    /// Attach a success continuation.
    pub fn then<U, F>(self, on_fulfilled: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        Deferred::new(async move {
            let value = self.inner.await?;
            on_fulfilled(value).await
        })
    }

    /// Attach a failure continuation.
    pub fn otherwise<F>(self, on_rejected: F) -> Deferred<T>
    where
        F: FnOnce(KernelError) -> Deferred<T> + Send + 'static,
    {
        Deferred::new(async move {
            match self.inner.await {
                Ok(value) => Ok(value),
                Err(err) => on_rejected(err).await,
            }
        })
    }

    /// Attach both continuations at the same link.
    ///
    /// An error raised by `on_fulfilled` is not seen by `on_rejected`.
    pub fn then_or_else<U, F, R>(self, on_fulfilled: F, on_rejected: R) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
        R: FnOnce(KernelError) -> Deferred<U> + Send + 'static,
    {
        Deferred::new(async move {
            match self.inner.await {
                Ok(value) => on_fulfilled(value).await,
                Err(err) => on_rejected(err).await,
            }
        })
    }

    /// Transform the fulfilled value synchronously.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Deferred::new(async move { self.inner.await.map(f) })
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T, KernelError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> From<Result<T, KernelError>> for Deferred<T> {
    fn from(result: Result<T, KernelError>) -> Self {
        Deferred::from_result(result)
    }
}
