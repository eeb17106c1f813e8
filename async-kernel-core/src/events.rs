//! The concrete stage events.
//!
//! | event | topic | listeners may |
//! |---|---|---|
//! | [`RequestEvent`] | `kernel.request` | answer with a response or a deferred response |
//! | [`ControllerEvent`] | `kernel.controller` | swap the controller |
//! | [`ControllerArgumentsEvent`] | `kernel.controller_arguments` | swap controller or arguments |
//! | [`ViewEvent`] | `kernel.view` | turn the raw controller result into a response |
//! | [`ResponseEvent`] | `kernel.response` | filter or replace the response |
//! | [`ExceptionEvent`] | `kernel.exception` | answer the error, or replace it |
//! | [`FinishRequestEvent`] | `kernel.finish_request` | observe the end of the request |
//!
//! Setting a resolved outcome (a response, or a deferred one) stops
//! propagation. Filtering a response on [`ResponseEvent`] does not: every
//! response listener sees the latest response.

use crate::{
    controller::{Arguments, ControllerRef},
    deferred::Deferred,
    error::KernelError,
    event::{AsyncStage, KernelEvent, StageEvent, Topic},
    kernel::HttpKernel,
    request::{Request, RequestKind, Response},
};
use serde_json::Value;
use std::{fmt, sync::Arc};

macro_rules! stage_event {
    ($event:ty, $topic:expr, async) => {
        stage_event!($event, $topic);

        impl AsyncStage for $event {}
    };
    ($event:ty, $topic:expr) => {
        impl StageEvent for $event {
            const TOPIC: Topic = $topic;

            fn base(&self) -> &KernelEvent {
                &self.base
            }

            fn base_mut(&mut self) -> &mut KernelEvent {
                &mut self.base
            }
        }
    };
}

// ============================================================================
// Request stage
// ============================================================================

/// What a request listener answered with.
pub enum RequestOutcome {
    /// A finished response.
    Response(Response),
    /// A response that is not available yet.
    Deferred(Deferred<Response>),
}

impl fmt::Debug for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestOutcome::Response(response) => {
                f.debug_tuple("Response").field(&response.status()).finish()
            }
            RequestOutcome::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Dispatched before anything else happens to the request.
///
/// A listener answering the request skips controller resolution entirely.
#[derive(Debug)]
pub struct RequestEvent {
    base: KernelEvent,
    outcome: Option<RequestOutcome>,
}

impl RequestEvent {
    /// Create the event.
    pub fn new(kernel: Arc<dyn HttpKernel>, request: Arc<Request>, kind: RequestKind) -> Self {
        Self {
            base: KernelEvent::new(kernel, request, kind),
            outcome: None,
        }
    }

    /// Answer with a response and stop propagation.
    pub fn set_response(&mut self, response: Response) {
        self.outcome = Some(RequestOutcome::Response(response));
        self.stop_propagation();
    }

    /// Answer with a deferred response and stop propagation.
    pub fn set_deferred_response(&mut self, response: Deferred<Response>) {
        self.outcome = Some(RequestOutcome::Deferred(response));
        self.stop_propagation();
    }

    /// Whether a listener answered.
    pub fn has_response(&self) -> bool {
        self.outcome.is_some()
    }

    /// The response, when a listener answered with a finished one.
    pub fn response(&self) -> Option<&Response> {
        match &self.outcome {
            Some(RequestOutcome::Response(response)) => Some(response),
            _ => None,
        }
    }

    /// Take whatever a listener answered with.
    pub fn take_outcome(&mut self) -> Option<RequestOutcome> {
        self.outcome.take()
    }
}

stage_event!(RequestEvent, Topic::Request, async);

// ============================================================================
// Controller stages
// ============================================================================

/// Dispatched once a controller has been resolved.
pub struct ControllerEvent {
    base: KernelEvent,
    controller: ControllerRef,
}

impl ControllerEvent {
    /// Create the event.
    pub fn new(
        kernel: Arc<dyn HttpKernel>,
        controller: ControllerRef,
        request: Arc<Request>,
        kind: RequestKind,
    ) -> Self {
        Self {
            base: KernelEvent::new(kernel, request, kind),
            controller,
        }
    }

    /// The controller about to be called.
    pub fn controller(&self) -> &ControllerRef {
        &self.controller
    }

    /// Replace the controller.
    pub fn set_controller(&mut self, controller: ControllerRef) {
        self.controller = controller;
    }

    /// Consume the event, keeping the controller.
    pub fn into_controller(self) -> ControllerRef {
        self.controller
    }
}

impl fmt::Debug for ControllerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerEvent")
            .field("base", &self.base)
            .field("controller", &self.controller.name())
            .finish()
    }
}

stage_event!(ControllerEvent, Topic::Controller);

/// Dispatched once the controller arguments have been bound.
pub struct ControllerArgumentsEvent {
    base: KernelEvent,
    controller: ControllerRef,
    arguments: Arguments,
}

impl ControllerArgumentsEvent {
    /// Create the event.
    pub fn new(
        kernel: Arc<dyn HttpKernel>,
        controller: ControllerRef,
        arguments: Arguments,
        request: Arc<Request>,
        kind: RequestKind,
    ) -> Self {
        Self {
            base: KernelEvent::new(kernel, request, kind),
            controller,
            arguments,
        }
    }

    /// The controller about to be called.
    pub fn controller(&self) -> &ControllerRef {
        &self.controller
    }

    /// Replace the controller.
    pub fn set_controller(&mut self, controller: ControllerRef) {
        self.controller = controller;
    }

    /// The bound arguments.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Replace the arguments.
    pub fn set_arguments(&mut self, arguments: Arguments) {
        self.arguments = arguments;
    }

    /// Consume the event.
    pub fn into_parts(self) -> (ControllerRef, Arguments) {
        (self.controller, self.arguments)
    }
}

impl fmt::Debug for ControllerArgumentsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerArgumentsEvent")
            .field("base", &self.base)
            .field("controller", &self.controller.name())
            .field("arguments", &self.arguments)
            .finish()
    }
}

stage_event!(ControllerArgumentsEvent, Topic::ControllerArguments);

// ============================================================================
// View stage
// ============================================================================

/// Dispatched when the controller returned raw data instead of a response.
#[derive(Debug)]
pub struct ViewEvent {
    base: KernelEvent,
    controller_result: Value,
    response: Option<Response>,
}

impl ViewEvent {
    /// Create the event.
    pub fn new(
        kernel: Arc<dyn HttpKernel>,
        request: Arc<Request>,
        kind: RequestKind,
        controller_result: Value,
    ) -> Self {
        Self {
            base: KernelEvent::new(kernel, request, kind),
            controller_result,
            response: None,
        }
    }

    /// What the controller returned.
    pub fn controller_result(&self) -> &Value {
        &self.controller_result
    }

    /// Replace the controller result seen by later listeners.
    pub fn set_controller_result(&mut self, controller_result: Value) {
        self.controller_result = controller_result;
    }

    /// Answer with a response and stop propagation.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
        self.stop_propagation();
    }

    /// Whether a listener answered.
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Consume the event, returning the response and the (possibly replaced) result.
    pub fn into_parts(self) -> (Option<Response>, Value) {
        (self.response, self.controller_result)
    }
}

stage_event!(ViewEvent, Topic::View, async);

// ============================================================================
// Response stage
// ============================================================================

/// Dispatched with the response that is about to be returned.
#[derive(Debug)]
pub struct ResponseEvent {
    base: KernelEvent,
    response: Response,
}

impl ResponseEvent {
    /// Create the event.
    pub fn new(
        kernel: Arc<dyn HttpKernel>,
        request: Arc<Request>,
        kind: RequestKind,
        response: Response,
    ) -> Self {
        Self {
            base: KernelEvent::new(kernel, request, kind),
            response,
        }
    }

    /// The current response.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// The current response, mutably.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Replace the response.
    pub fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    /// Consume the event.
    pub fn into_response(self) -> Response {
        self.response
    }
}

stage_event!(ResponseEvent, Topic::Response, async);

// ============================================================================
// Exception stage
// ============================================================================

/// Dispatched when handling the request failed.
///
/// Without a response the (possibly replaced) error is returned to the
/// caller. With one, the kernel forces an error status on it unless a
/// listener called [`allow_custom_response_code`](Self::allow_custom_response_code).
#[derive(Debug)]
pub struct ExceptionEvent {
    base: KernelEvent,
    error: KernelError,
    response: Option<Response>,
    allow_custom_response_code: bool,
}

impl ExceptionEvent {
    /// Create the event.
    pub fn new(
        kernel: Arc<dyn HttpKernel>,
        request: Arc<Request>,
        kind: RequestKind,
        error: KernelError,
    ) -> Self {
        Self {
            base: KernelEvent::new(kernel, request, kind),
            error,
            response: None,
            allow_custom_response_code: false,
        }
    }

    /// The error being handled.
    pub fn error(&self) -> &KernelError {
        &self.error
    }

    /// Replace the error; it is returned if no listener answers.
    pub fn set_error(&mut self, error: KernelError) {
        self.error = error;
    }

    /// Answer with a response and stop propagation.
    pub fn set_response(&mut self, response: Response) {
        self.response = Some(response);
        self.stop_propagation();
    }

    /// Whether a listener answered.
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// The response, if a listener answered.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Keep the status code of the listener's response as is.
    pub fn allow_custom_response_code(&mut self) {
        self.allow_custom_response_code = true;
    }

    /// Whether the status code of the listener's response is kept as is.
    pub fn is_allowing_custom_response_code(&self) -> bool {
        self.allow_custom_response_code
    }

    /// Consume the event.
    pub fn into_parts(self) -> ExceptionParts {
        ExceptionParts {
            request: Arc::clone(self.request()),
            kind: self.kind(),
            error: self.error,
            response: self.response,
            allow_custom_response_code: self.allow_custom_response_code,
        }
    }
}

/// The pieces of a handled [`ExceptionEvent`].
#[derive(Debug)]
pub struct ExceptionParts {
    /// The request that failed.
    pub request: Arc<Request>,
    /// Its kind.
    pub kind: RequestKind,
    /// The final error.
    pub error: KernelError,
    /// The rescue response, if any.
    pub response: Option<Response>,
    /// Whether the response status must be kept.
    pub allow_custom_response_code: bool,
}

stage_event!(ExceptionEvent, Topic::Exception, async);

// ============================================================================
// Finish stage
// ============================================================================

/// Dispatched when a request is done, before it leaves the request stack.
#[derive(Debug)]
pub struct FinishRequestEvent {
    base: KernelEvent,
}

impl FinishRequestEvent {
    /// Create the event.
    pub fn new(kernel: Arc<dyn HttpKernel>, request: Arc<Request>, kind: RequestKind) -> Self {
        Self {
            base: KernelEvent::new(kernel, request, kind),
        }
    }
}

stage_event!(FinishRequestEvent, Topic::Finish);
