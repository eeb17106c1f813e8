//! Event buses.
//!
//! - [`EventBus`]: dispatches both synchronously and asynchronously.
//! - [`SyncEventBus`]: synchronous only; the kernel refuses to run on it.
//!
//! Both are frozen once built. Listeners are registered on an
//! [`EventBusBuilder`]:
//!
//! ```rust,ignore
//! let bus = EventBus::builder()
//!     .listen_fn(10, |event: &mut RequestEvent| {
//!         Box::pin(async move {
//!             event.set_response(response::text("cached"));
//!             Ok(())
//!         })
//!     })
//!     .listen_sync(0, LoggingListener)
//!     .build();
//! ```

mod registry;

pub use registry::{ListenerEntry, Registry};

use async_kernel_core::{
    AsyncStage, BoxError, Deferred, EventDispatcher, KernelError, Listener, StageEvent,
    SyncListener, Topic,
};
use futures::future::BoxFuture;
use registry::{ListenerKind, Listeners};
use std::{fmt, sync::Arc};
use tracing::debug;

// ============================================================================
// Builder
// ============================================================================

/// Collects listeners before freezing them into a bus.
#[derive(Default)]
pub struct EventBusBuilder {
    listeners: Listeners,
}

impl EventBusBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asynchronous listener.
    pub fn listen<E, L>(mut self, priority: i32, listener: L) -> Self
    where
        E: AsyncStage,
        L: Listener<E>,
    {
        let name = std::any::type_name::<L>();
        self.listeners.insert(ListenerEntry::new(
            ListenerKind::Async(Box::new(listener)),
            priority,
            name,
        ));
        self
    }

    /// Register an asynchronous closure listener.
    ///
    /// The closure borrows the event for as long as its future runs.
    pub fn listen_fn<E, F>(self, priority: i32, listener: F) -> Self
    where
        E: AsyncStage,
        F: for<'a> Fn(&'a mut E) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
    {
        self.listen(priority, listener)
    }

    /// Register a synchronous listener. Works on every stage.
    pub fn listen_sync<E, L>(mut self, priority: i32, listener: L) -> Self
    where
        E: StageEvent,
        L: SyncListener<E>,
    {
        let name = std::any::type_name::<L>();
        self.listeners.insert(ListenerEntry::new(
            ListenerKind::Sync(Box::new(listener)),
            priority,
            name,
        ));
        self
    }

    /// Register a synchronous closure listener.
    pub fn listen_sync_fn<E, F>(self, priority: i32, listener: F) -> Self
    where
        E: StageEvent,
        F: Fn(&mut E) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.listen_sync(priority, listener)
    }

    /// Freeze into a bus capable of asynchronous dispatch.
    pub fn build(self) -> EventBus {
        EventBus {
            listeners: Arc::new(self.listeners),
        }
    }

    /// Freeze into a synchronous-only bus.
    pub fn build_sync(self) -> SyncEventBus {
        SyncEventBus {
            listeners: Arc::new(self.listeners),
        }
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// The default dispatcher: priority ordered, propagation aware, asynchronous.
///
/// Cloning is cheap; clones share the same listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<Listeners>,
}

impl EventBus {
    /// Start registering listeners.
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// The listeners registered for `E`, in execution order.
    pub fn registry<E: StageEvent>(&self) -> Option<&Registry<E>> {
        self.listeners.registry::<E>()
    }
}

impl EventDispatcher for EventBus {
    fn dispatch<E: StageEvent>(&self, event: &mut E) -> Result<(), KernelError> {
        dispatch_sync(&self.listeners, event)
    }

    fn dispatch_async<E: StageEvent>(&self, mut event: E) -> Deferred<E> {
        let count = self.listeners.count(E::TOPIC);
        if count == 0 {
            return Deferred::fulfilled(event);
        }
        debug!(topic = %E::TOPIC, listeners = count, "dispatching");
        let listeners = Arc::clone(&self.listeners);
        Deferred::new(async move {
            if let Some(registry) = listeners.registry::<E>() {
                registry.run_async(&mut event).await?;
            }
            Ok(event)
        })
    }

    fn supports_async(&self) -> bool {
        true
    }

    fn listener_count(&self, topic: Topic) -> usize {
        self.listeners.count(topic)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_listeners(f, "EventBus", &self.listeners)
    }
}

// ============================================================================
// SyncEventBus
// ============================================================================

/// A dispatcher without the asynchronous capability.
///
/// Asynchronous dispatch rejects with [`KernelError::AsyncDispatcherNeeded`].
#[derive(Clone, Default)]
pub struct SyncEventBus {
    listeners: Arc<Listeners>,
}

impl SyncEventBus {
    /// Start registering listeners.
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }
}

impl EventDispatcher for SyncEventBus {
    fn dispatch<E: StageEvent>(&self, event: &mut E) -> Result<(), KernelError> {
        dispatch_sync(&self.listeners, event)
    }

    fn listener_count(&self, topic: Topic) -> usize {
        self.listeners.count(topic)
    }
}

impl fmt::Debug for SyncEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_listeners(f, "SyncEventBus", &self.listeners)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn dispatch_sync<E: StageEvent>(listeners: &Listeners, event: &mut E) -> Result<(), KernelError> {
    match listeners.registry::<E>() {
        Some(registry) => {
            debug!(topic = %E::TOPIC, listeners = registry.len(), "dispatching");
            registry.run_sync(event)
        }
        None => Ok(()),
    }
}

fn debug_listeners(f: &mut fmt::Formatter<'_>, name: &str, listeners: &Listeners) -> fmt::Result {
    let counts: Vec<(&str, usize)> = Topic::ALL
        .iter()
        .map(|topic| (topic.as_str(), listeners.count(*topic)))
        .filter(|(_, count)| *count > 0)
        .collect();
    f.debug_struct(name).field("listeners", &counts).finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NullKernel, RecordingListener};
    use async_kernel_core::{
        ControllerEvent, FinishRequestEvent, Request, RequestEvent, RequestKind, ResponseEvent,
        response,
    };

    fn request_event() -> RequestEvent {
        RequestEvent::new(
            NullKernel::shared(),
            Arc::new(Request::get("/")),
            RequestKind::Main,
        )
    }

    #[tokio::test]
    async fn runs_listeners_by_priority() {
        let recorder = RecordingListener::new();
        let bus = EventBus::builder()
            .listen_sync::<RequestEvent, _>(0, recorder.labelled("low"))
            .listen_sync::<RequestEvent, _>(10, recorder.labelled("high"))
            .listen_sync::<RequestEvent, _>(0, recorder.labelled("low-second"))
            .build();

        bus.dispatch_async(request_event()).await.unwrap();

        assert_eq!(recorder.labels(), vec!["high", "low", "low-second"]);
    }

    #[tokio::test]
    async fn stops_after_a_listener_answers() {
        let recorder = RecordingListener::new();
        let bus = EventBus::builder()
            .listen_fn(10, |event: &mut RequestEvent| {
                Box::pin(async move {
                    event.set_response(response::text("A"));
                    Ok(())
                })
            })
            .listen_sync::<RequestEvent, _>(0, recorder.labelled("never"))
            .build();

        let mut event = bus.dispatch_async(request_event()).await.unwrap();

        assert!(event.is_propagation_stopped());
        assert!(recorder.labels().is_empty());
        assert!(event.take_outcome().is_some());
    }

    #[tokio::test]
    async fn awaits_each_listener_before_the_next() {
        let recorder = RecordingListener::new();
        let first = recorder.clone();
        let bus = EventBus::builder()
            .listen_fn(10, move |_event: &mut RequestEvent| {
                let first = first.clone();
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    first.record("slow");
                    Ok(())
                })
            })
            .listen_sync::<RequestEvent, _>(0, recorder.labelled("fast"))
            .build();

        bus.dispatch_async(request_event()).await.unwrap();

        assert_eq!(recorder.labels(), vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn zero_listeners_resolve_immediately() {
        let bus = EventBus::default();
        let event = bus.dispatch_async(request_event()).await.unwrap();
        assert!(!event.has_response());
        assert!(!bus.has_listeners(Topic::Request));
    }

    #[tokio::test]
    async fn listener_error_rejects_and_skips_the_rest() {
        let recorder = RecordingListener::new();
        let bus = EventBus::builder()
            .listen_sync_fn(10, |_event: &mut RequestEvent| Err("boom".into()))
            .listen_sync::<RequestEvent, _>(0, recorder.labelled("never"))
            .build();

        let error = bus.dispatch_async(request_event()).await.unwrap_err();

        assert_eq!(error.to_string(), "boom");
        assert!(recorder.labels().is_empty());
    }

    #[test]
    fn sync_dispatch_refuses_async_listeners() {
        let bus = EventBus::builder()
            .listen_fn(0, |_event: &mut ResponseEvent| Box::pin(async { Ok(()) }))
            .build();
        let mut event = ResponseEvent::new(
            NullKernel::shared(),
            Arc::new(Request::get("/")),
            RequestKind::Main,
            response::text("ok"),
        );

        let error = bus.dispatch(&mut event).unwrap_err();

        assert!(matches!(
            error,
            KernelError::AsyncListenerInSyncDispatch(Topic::Response)
        ));
    }

    #[test]
    fn sync_dispatch_runs_sync_listeners() {
        let recorder = RecordingListener::new();
        let bus = EventBus::builder()
            .listen_sync::<ControllerEvent, _>(0, recorder.labelled("controller"))
            .listen_sync::<FinishRequestEvent, _>(0, recorder.labelled("finish"))
            .build();
        let mut event = FinishRequestEvent::new(
            NullKernel::shared(),
            Arc::new(Request::get("/")),
            RequestKind::Sub,
        );

        bus.dispatch(&mut event).unwrap();

        assert_eq!(recorder.labels(), vec!["finish"]);
        assert_eq!(bus.listener_count(Topic::Controller), 1);
        assert_eq!(bus.listener_count(Topic::Finish), 1);
    }

    #[tokio::test]
    async fn sync_bus_lacks_the_async_capability() {
        let bus = SyncEventBus::builder().build_sync();
        assert!(!bus.supports_async());

        let error = bus.dispatch_async(request_event()).await.unwrap_err();

        assert!(matches!(error, KernelError::AsyncDispatcherNeeded));
    }
}
