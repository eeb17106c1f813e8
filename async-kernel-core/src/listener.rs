//! # Listeners
//!
//! A listener is registered on one topic and receives that topic's stage
//! event mutably. It may inspect the request, set an outcome, or stop
//! propagation.
//!
//! Two flavours exist:
//!
//! - [`Listener`] returns a future. The dispatcher awaits it before the next
//!   listener starts, so listeners of one topic never overlap even when they
//!   suspend. Only [`AsyncStage`] events accept them.
//! - [`SyncListener`] returns immediately and works on every stage.
//!
//! Closures work for both:
//!
//! ```rust,ignore
//! // asynchronous
//! |event: &mut RequestEvent| Box::pin(async move { Ok(()) })
//! // synchronous
//! |event: &mut ControllerEvent| Ok(())
//! ```

use crate::{
    error::BoxError,
    event::{AsyncStage, StageEvent},
};
use futures::future::BoxFuture;
use std::future::Future;

/// An asynchronous listener.
///
/// This trait uses native `async fn` for static dispatch. Registries store
/// listeners as [`DynListener`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Listener` for `{E}`",
    label = "missing `Listener` implementation",
    note = "Asynchronous listeners are only accepted on the request, view, response and exception stages."
)]
pub trait Listener<E: AsyncStage>: Send + Sync + 'static {
    /// Called when the event is dispatched.
    fn on_event(&self, event: &mut E) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Dynamic object-safe version of [`Listener`].
pub trait DynListener<E>: Send + Sync + 'static {
    /// Called when the event is dispatched (dynamic dispatch version).
    fn on_event_dyn<'a>(&'a self, event: &'a mut E) -> BoxFuture<'a, Result<(), BoxError>>;
}

// Every `Listener` can be stored behind a `DynListener`.
impl<E: AsyncStage, T: Listener<E>> DynListener<E> for T {
    fn on_event_dyn<'a>(&'a self, event: &'a mut E) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.on_event(event))
    }
}

impl<E, F> Listener<E> for F
where
    E: AsyncStage,
    F: for<'a> Fn(&'a mut E) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
{
    fn on_event(&self, event: &mut E) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self)(event)
    }
}

/// A synchronous listener.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `SyncListener` for `{E}`",
    label = "missing `SyncListener` implementation",
    note = "Closures of type `Fn(&mut {E}) -> Result<(), BoxError>` are synchronous listeners."
)]
pub trait SyncListener<E: StageEvent>: Send + Sync + 'static {
    /// Called when the event is dispatched.
    fn on_event_sync(&self, event: &mut E) -> Result<(), BoxError>;
}

impl<E, F> SyncListener<E> for F
where
    E: StageEvent,
    F: Fn(&mut E) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn on_event_sync(&self, event: &mut E) -> Result<(), BoxError> {
        (self)(event)
    }
}
