//! The kernel seen from inside the pipeline.

use crate::{
    deferred::Deferred,
    request::{Request, RequestKind, RequestStack, Response},
};

/// An object that turns requests into responses.
///
/// Stage events hand listeners an `Arc<dyn HttpKernel>` so they can dispatch
/// sub-requests through the kernel that is handling the current request, and
/// inspect its request stack.
pub trait HttpKernel: Send + Sync + 'static {
    /// Handle a request, resolving to its response.
    ///
    /// With `catch_errors` set, failures go through the exception stage and
    /// may be rescued into a response.
    fn handle_async(
        &self,
        request: Request,
        kind: RequestKind,
        catch_errors: bool,
    ) -> Deferred<Response>;

    /// The requests currently in flight on this kernel.
    fn request_stack(&self) -> &RequestStack;
}
