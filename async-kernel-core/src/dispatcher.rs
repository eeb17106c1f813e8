//! Dispatcher core trait.

use crate::{
    deferred::Deferred,
    error::KernelError,
    event::{StageEvent, Topic},
};

/// Runs the listeners registered for a stage event.
///
/// Every dispatcher can dispatch synchronously. Asynchronous dispatch is a
/// capability: the default [`dispatch_async`](Self::dispatch_async) rejects
/// with [`KernelError::AsyncDispatcherNeeded`] and
/// [`supports_async`](Self::supports_async) reports `false`. The kernel checks
/// the capability before a request enters the pipeline.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `EventDispatcher`",
    label = "missing `EventDispatcher` implementation",
    note = "Implement `EventDispatcher` to drive the kernel stages."
)]
pub trait EventDispatcher: Send + Sync + 'static {
    /// Run the listeners of `E::TOPIC` in priority order, synchronously.
    ///
    /// Stops early once the event's propagation is stopped.
    fn dispatch<E: StageEvent>(&self, event: &mut E) -> Result<(), KernelError>;

    /// Run the listeners of `E::TOPIC` one after the other, awaiting each.
    ///
    /// Resolves to the event once every listener ran; rejects with the first
    /// listener error, after which no listener runs.
    fn dispatch_async<E: StageEvent>(&self, event: E) -> Deferred<E> {
        drop(event);
        Deferred::rejected(KernelError::AsyncDispatcherNeeded)
    }

    /// Whether [`dispatch_async`](Self::dispatch_async) is supported.
    fn supports_async(&self) -> bool {
        false
    }

    /// Number of listeners registered for a topic.
    fn listener_count(&self, topic: Topic) -> usize;

    /// Whether a topic has listeners.
    fn has_listeners(&self, topic: Topic) -> bool {
        self.listener_count(topic) > 0
    }
}
