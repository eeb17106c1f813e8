//! Per-topic listener registry.
//!
//! Entries are kept sorted by priority (higher runs first). Entries with the
//! same priority keep their registration order.

use async_kernel_core::{DynListener, KernelError, StageEvent, SyncListener, Topic};
use std::{any::Any, cmp::Reverse, collections::HashMap};
use tracing::trace;

/// How a registered listener runs.
pub(crate) enum ListenerKind<E> {
    Async(Box<dyn DynListener<E>>),
    Sync(Box<dyn SyncListener<E>>),
}

/// A listener with its registration metadata.
pub struct ListenerEntry<E> {
    kind: ListenerKind<E>,
    priority: i32,
    name: &'static str,
}

impl<E: StageEvent> ListenerEntry<E> {
    pub(crate) fn new(kind: ListenerKind<E>, priority: i32, name: &'static str) -> Self {
        Self {
            kind,
            priority,
            name,
        }
    }

    /// Priority (higher = executed first).
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Type name of the listener, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the listener may suspend.
    pub fn is_async(&self) -> bool {
        matches!(self.kind, ListenerKind::Async(_))
    }
}

/// The listeners of one topic.
pub struct Registry<E> {
    entries: Vec<ListenerEntry<E>>,
}

impl<E: StageEvent> Registry<E> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, entry: ListenerEntry<E>) {
        self.entries.push(entry);
        // Stable sort: equal priorities keep registration order.
        self.entries.sort_by_key(|e| Reverse(e.priority));
    }

    /// Registered entries in execution order.
    pub fn entries(&self) -> &[ListenerEntry<E>] {
        &self.entries
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every listener without suspending.
    pub(crate) fn run_sync(&self, event: &mut E) -> Result<(), KernelError> {
        for entry in &self.entries {
            if event.is_propagation_stopped() {
                trace!(topic = %E::TOPIC, listener = entry.name, "propagation stopped");
                break;
            }
            trace!(topic = %E::TOPIC, listener = entry.name, "calling listener");
            match &entry.kind {
                ListenerKind::Sync(listener) => listener
                    .on_event_sync(event)
                    .map_err(KernelError::from_boxed)?,
                ListenerKind::Async(_) => {
                    return Err(KernelError::AsyncListenerInSyncDispatch(E::TOPIC));
                }
            }
        }
        Ok(())
    }

    /// Run every listener in order, awaiting each before the next.
    pub(crate) async fn run_async(&self, event: &mut E) -> Result<(), KernelError> {
        for entry in &self.entries {
            if event.is_propagation_stopped() {
                trace!(topic = %E::TOPIC, listener = entry.name, "propagation stopped");
                break;
            }
            trace!(topic = %E::TOPIC, listener = entry.name, "calling listener");
            match &entry.kind {
                ListenerKind::Sync(listener) => listener
                    .on_event_sync(event)
                    .map_err(KernelError::from_boxed)?,
                ListenerKind::Async(listener) => listener
                    .on_event_dyn(event)
                    .await
                    .map_err(KernelError::from_boxed)?,
            }
        }
        Ok(())
    }
}

/// Registries for every topic, keyed by the topic of their event type.
#[derive(Default)]
pub(crate) struct Listeners {
    registries: HashMap<Topic, Box<dyn Any + Send + Sync>>,
    // Counts are queried by topic alone, without the event type.
    counts: HashMap<Topic, usize>,
}

impl Listeners {
    pub(crate) fn registry<E: StageEvent>(&self) -> Option<&Registry<E>> {
        self.registries
            .get(&E::TOPIC)
            .and_then(|registry| registry.downcast_ref::<Registry<E>>())
    }

    pub(crate) fn insert<E: StageEvent>(&mut self, entry: ListenerEntry<E>) {
        let registry = self
            .registries
            .entry(E::TOPIC)
            .or_insert_with(|| Box::new(Registry::<E>::new()));
        if let Some(registry) = registry.downcast_mut::<Registry<E>>() {
            registry.insert(entry);
            *self.counts.entry(E::TOPIC).or_default() += 1;
        }
    }

    pub(crate) fn count(&self, topic: Topic) -> usize {
        self.counts.get(&topic).copied().unwrap_or(0)
    }
}
