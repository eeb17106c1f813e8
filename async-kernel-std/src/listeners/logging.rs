//! Logging listener for stage observation.

use async_kernel_core::{BoxError, StageEvent, SyncListener};
use tracing::info;

/// A listener that logs every stage it is registered on.
pub struct LoggingListener;

impl<E: StageEvent> SyncListener<E> for LoggingListener {
    fn on_event_sync(&self, event: &mut E) -> Result<(), BoxError> {
        let request = event.request();
        info!(
            topic = %E::TOPIC,
            method = %request.method(),
            path = request.path(),
            kind = ?event.kind(),
            "stage reached"
        );
        Ok(())
    }
}
