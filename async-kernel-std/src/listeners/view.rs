//! View listener rendering raw controller results as JSON.

use async_kernel_core::{BoxError, SyncListener, ViewEvent, response};

/// Turns whatever the controller returned into a JSON response.
///
/// Register it with a low priority so more specific view listeners run first.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonViewListener;

impl SyncListener<ViewEvent> for JsonViewListener {
    fn on_event_sync(&self, event: &mut ViewEvent) -> Result<(), BoxError> {
        let response = response::json(event.controller_result());
        event.set_response(response);
        Ok(())
    }
}
