//! Stage topics and the event base shared by every stage.
//!
//! Each interception point of the pipeline is a [`Topic`]. The payload
//! threaded through a topic's listeners is a [`StageEvent`]; the concrete
//! events live in [`crate::events`].

use crate::{
    kernel::HttpKernel,
    request::{Request, RequestKind},
};
use std::{fmt, sync::Arc};

/// A named interception point of the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// Very beginning of dispatch; listeners may answer the request.
    Request,
    /// A controller was resolved; listeners may swap it.
    Controller,
    /// Arguments were bound; listeners may swap controller or arguments.
    ControllerArguments,
    /// The controller returned a raw value that needs a response.
    View,
    /// A response exists; listeners may filter or replace it.
    Response,
    /// Something failed; listeners may answer with a response.
    Exception,
    /// The request is done, right before it leaves the request stack.
    Finish,
}

impl Topic {
    /// Every topic, in lifecycle order.
    pub const ALL: [Topic; 7] = [
        Topic::Request,
        Topic::Controller,
        Topic::ControllerArguments,
        Topic::View,
        Topic::Response,
        Topic::Exception,
        Topic::Finish,
    ];

    /// The canonical event name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::Request => "kernel.request",
            Topic::Controller => "kernel.controller",
            Topic::ControllerArguments => "kernel.controller_arguments",
            Topic::View => "kernel.view",
            Topic::Response => "kernel.response",
            Topic::Exception => "kernel.exception",
            Topic::Finish => "kernel.finish_request",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every stage event carries.
pub struct KernelEvent {
    kernel: Arc<dyn HttpKernel>,
    request: Arc<Request>,
    kind: RequestKind,
    propagation_stopped: bool,
}

impl KernelEvent {
    /// Create the base for a new stage event.
    pub fn new(kernel: Arc<dyn HttpKernel>, request: Arc<Request>, kind: RequestKind) -> Self {
        Self {
            kernel,
            request,
            kind,
            propagation_stopped: false,
        }
    }
}

impl fmt::Debug for KernelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelEvent")
            .field("request", &self.request)
            .field("kind", &self.kind)
            .field("propagation_stopped", &self.propagation_stopped)
            .finish_non_exhaustive()
    }
}

/// A payload dispatched to the listeners of one [`Topic`].
///
/// Propagation is one-way: once stopped it cannot be resumed.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a stage event",
    label = "missing `StageEvent` implementation",
    note = "Only the events in `async_kernel_core::events` travel through the kernel."
)]
pub trait StageEvent: Send + 'static {
    /// The topic this event is dispatched on.
    const TOPIC: Topic;

    /// The shared fields.
    fn base(&self) -> &KernelEvent;

    /// The shared fields, mutably.
    fn base_mut(&mut self) -> &mut KernelEvent;

    /// The kernel handling the request.
    fn kernel(&self) -> &Arc<dyn HttpKernel> {
        &self.base().kernel
    }

    /// The request being handled.
    fn request(&self) -> &Arc<Request> {
        &self.base().request
    }

    /// Whether the request is the main one or a sub-request.
    fn kind(&self) -> RequestKind {
        self.base().kind
    }

    /// Whether later listeners are skipped.
    fn is_propagation_stopped(&self) -> bool {
        self.base().propagation_stopped
    }

    /// Skip every listener that has not run yet.
    fn stop_propagation(&mut self) {
        self.base_mut().propagation_stopped = true;
    }
}

/// Marker for stages whose listeners may suspend.
///
/// Only these events accept asynchronous [`Listener`]s; the remaining stages
/// run synchronously inside the controller call.
///
/// [`Listener`]: crate::Listener
pub trait AsyncStage: StageEvent {}
