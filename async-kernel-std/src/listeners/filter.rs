//! Restrict a listener to main requests.

use async_kernel_core::{AsyncStage, BoxError, Listener, StageEvent, SyncListener};

/// Runs the wrapped listener for main requests only; sub-requests pass through.
pub struct MainRequestOnly<L> {
    inner: L,
}

impl<L> MainRequestOnly<L> {
    /// Wrap a listener.
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<E: AsyncStage, L: Listener<E>> Listener<E> for MainRequestOnly<L> {
    async fn on_event(&self, event: &mut E) -> Result<(), BoxError> {
        if !event.kind().is_main() {
            return Ok(());
        }
        self.inner.on_event(event).await
    }
}

impl<E: StageEvent, L: SyncListener<E>> SyncListener<E> for MainRequestOnly<L> {
    fn on_event_sync(&self, event: &mut E) -> Result<(), BoxError> {
        if !event.kind().is_main() {
            return Ok(());
        }
        self.inner.on_event_sync(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NullKernel, RecordingListener};
    use async_kernel_core::{FinishRequestEvent, Request, RequestKind};
    use std::sync::Arc;

    fn finish(kind: RequestKind) -> FinishRequestEvent {
        FinishRequestEvent::new(NullKernel::shared(), Arc::new(Request::get("/")), kind)
    }

    #[test]
    fn skips_sub_requests() {
        let recorder = RecordingListener::new();
        let listener = MainRequestOnly::new(recorder.labelled("finish"));

        listener.on_event_sync(&mut finish(RequestKind::Sub)).unwrap();
        assert!(recorder.labels().is_empty());

        listener.on_event_sync(&mut finish(RequestKind::Main)).unwrap();
        assert_eq!(recorder.labels(), vec!["finish"]);
    }
}
