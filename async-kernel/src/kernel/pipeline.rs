//! The stage pipeline.
//!
//! ```text
//! request ─┬─ answered ──────────────────────────────┐
//!          └─ controller ─ arguments ─ call ─┬───────┤
//!                                            └─ view ┤
//!                                                    ▼
//!                                       response ─ finish
//!
//! any failure ─ exception ─┬─ answered ─ response ─ finish
//!                          └─ finish ─ error
//! ```
//!
//! Every request leaves the request stack exactly once, whichever way it
//! ends, including when its future is dropped midway.

use super::{Kernel, REQUEST_DEPTH_HEADER, describe::describe};
use async_kernel_core::{
    ControllerArgumentsEvent, ControllerEvent, ControllerOutput, ControllerRef, Deferred,
    EventDispatcher, ExceptionEvent, ExceptionParts, FinishRequestEvent, HttpError, KernelError,
    Request, RequestEvent, RequestKind, RequestOutcome, RequestStack, Response, ResponseEvent,
    ResponseExt, ViewEvent,
};
use http::{HeaderValue, StatusCode};
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{Instrument, debug, error, info_span, warn};

pub(super) fn handle<D: EventDispatcher>(
    kernel: Kernel<D>,
    request: Request,
    kind: RequestKind,
    catch_errors: bool,
) -> Deferred<Response> {
    if !kernel.inner.dispatcher.supports_async() {
        warn!("dispatcher cannot dispatch asynchronously");
        return Deferred::rejected(KernelError::AsyncDispatcherNeeded);
    }

    let span = info_span!(
        "kernel.handle",
        method = %request.method(),
        uri = %request.uri(),
        kind = ?kind,
    );
    let request = Arc::new(request);
    let entry = Arc::new(StackEntry::new(kernel.inner.request_stack.clone()));

    let chain = Deferred::new(handle_raw(
        kernel.clone(),
        Arc::clone(&entry),
        Arc::clone(&request),
        kind,
    ))
    .otherwise(move |error| {
        let error = into_client_error(error);
        if !catch_errors {
            debug!(%error, "not catching error");
            finish_request(&kernel, &entry, &request, kind);
            return Deferred::rejected(error);
        }
        Deferred::new(async move {
            handle_exception(&kernel, &entry, error, request, kind).await
        })
    });
    Deferred::new(chain.instrument(span))
}

/// A request's place on the request stack.
///
/// Popped by [`finish_request`], or on drop when the handling future is
/// dropped before the request finished.
struct StackEntry {
    stack: RequestStack,
    pushed: AtomicBool,
}

impl StackEntry {
    fn new(stack: RequestStack) -> Self {
        Self {
            stack,
            pushed: AtomicBool::new(false),
        }
    }

    /// Stamp the depth the request is about to join, then push it.
    fn push(&self, request: &Arc<Request>) {
        let depth = self.stack.len();
        request
            .headers_mut()
            .insert(REQUEST_DEPTH_HEADER, HeaderValue::from(depth));
        self.stack.push(Arc::clone(request));
        self.pushed.store(true, Ordering::SeqCst);
    }

    fn pop(&self) {
        if self.pushed.swap(false, Ordering::SeqCst) {
            self.stack.pop();
        }
    }
}

impl Drop for StackEntry {
    fn drop(&mut self) {
        if self.pushed.swap(false, Ordering::SeqCst) {
            debug!("request dropped before it finished");
            self.stack.pop();
        }
    }
}

async fn handle_raw<D: EventDispatcher>(
    kernel: Kernel<D>,
    entry: Arc<StackEntry>,
    request: Arc<Request>,
    kind: RequestKind,
) -> Result<Response, KernelError> {
    entry.push(&request);

    let event = RequestEvent::new(kernel.shared(), Arc::clone(&request), kind);
    let mut event = kernel.inner.dispatcher.dispatch_async(event).await?;
    let response = match event.take_outcome() {
        Some(RequestOutcome::Deferred(response)) => response.await?,
        Some(RequestOutcome::Response(response)) => response,
        None => call_controller(&kernel, &request, kind).await?,
    };

    filter_response(&kernel, &entry, response, &request, kind).await
}

async fn call_controller<D: EventDispatcher>(
    kernel: &Kernel<D>,
    request: &Arc<Request>,
    kind: RequestKind,
) -> Result<Response, KernelError> {
    let controller = kernel
        .resolve_controller(request)
        .ok_or_else(|| KernelError::ControllerNotFound {
            path: request.path().to_string(),
        })?;

    let mut event = ControllerEvent::new(kernel.shared(), controller, Arc::clone(request), kind);
    kernel.inner.dispatcher.dispatch(&mut event)?;
    let controller = event.into_controller();

    let arguments = kernel.inner.argument_resolver.resolve(request, &controller)?;
    let mut event = ControllerArgumentsEvent::new(
        kernel.shared(),
        controller,
        arguments,
        Arc::clone(request),
        kind,
    );
    kernel.inner.dispatcher.dispatch(&mut event)?;
    let (controller, arguments) = event.into_parts();

    debug!(controller = %controller.name(), "calling controller");
    let mut output = controller
        .call(Arc::clone(request), arguments)
        .map_err(KernelError::from_boxed)?;
    loop {
        output = match output {
            ControllerOutput::Response(response) => return Ok(response),
            ControllerOutput::Deferred(deferred) => deferred.await?,
            ControllerOutput::Value(value) => {
                return call_view(kernel, request, kind, value, &controller).await;
            }
        };
    }
}

async fn call_view<D: EventDispatcher>(
    kernel: &Kernel<D>,
    request: &Arc<Request>,
    kind: RequestKind,
    value: Value,
    controller: &ControllerRef,
) -> Result<Response, KernelError> {
    let event = ViewEvent::new(kernel.shared(), Arc::clone(request), kind, value);
    let event = kernel.inner.dispatcher.dispatch_async(event).await?;
    match event.into_parts() {
        (Some(response), _) => Ok(response),
        (None, value) => {
            let mut message = format!(
                "The controller must return a \"Response\" object but it returned {}.",
                describe(&value)
            );
            if value.is_null() {
                message.push_str(
                    " Did you forget to add a return statement somewhere in your controller?",
                );
            }
            Err(KernelError::ControllerDoesNotReturnResponse {
                controller: controller.name(),
                message,
            })
        }
    }
}

async fn filter_response<D: EventDispatcher>(
    kernel: &Kernel<D>,
    entry: &StackEntry,
    response: Response,
    request: &Arc<Request>,
    kind: RequestKind,
) -> Result<Response, KernelError> {
    let event = ResponseEvent::new(kernel.shared(), Arc::clone(request), kind, response);
    let event = kernel.inner.dispatcher.dispatch_async(event).await?;
    finish_request(kernel, entry, request, kind);
    Ok(event.into_response())
}

fn finish_request<D: EventDispatcher>(
    kernel: &Kernel<D>,
    entry: &StackEntry,
    request: &Arc<Request>,
    kind: RequestKind,
) {
    let mut event = FinishRequestEvent::new(kernel.shared(), Arc::clone(request), kind);
    if let Err(err) = kernel.inner.dispatcher.dispatch(&mut event) {
        error!(error = %err, "finish listener failed");
    }
    entry.pop();
}

async fn handle_exception<D: EventDispatcher>(
    kernel: &Kernel<D>,
    entry: &StackEntry,
    error: KernelError,
    request: Arc<Request>,
    kind: RequestKind,
) -> Result<Response, KernelError> {
    debug!(%error, "handling error");
    let event = ExceptionEvent::new(kernel.shared(), Arc::clone(&request), kind, error);
    let event = match kernel.inner.dispatcher.dispatch_async(event).await {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "exception listener failed");
            finish_request(kernel, entry, &request, kind);
            return Err(err);
        }
    };

    let ExceptionParts {
        error,
        response,
        allow_custom_response_code,
        ..
    } = event.into_parts();
    let Some(mut response) = response else {
        warn!(%error, "unhandled error");
        finish_request(kernel, entry, &request, kind);
        return Err(error);
    };

    if !allow_custom_response_code
        && !response.is_client_error()
        && !response.is_server_error()
        && !response.is_redirect()
    {
        match error.status_code() {
            Some(status) => {
                *response.status_mut() = status;
                if let Some(headers) = error.headers() {
                    response.merge_headers(headers);
                }
            }
            None => *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // The response stage finishes the request only once it succeeds.
    match filter_response(kernel, entry, response, &request, kind).await {
        Ok(response) => Ok(response),
        Err(err) => {
            warn!(error = %err, "response listener failed while handling an error");
            finish_request(kernel, entry, &request, kind);
            Err(err)
        }
    }
}

fn into_client_error(error: KernelError) -> KernelError {
    match error {
        KernelError::RequestValidation(message) => KernelError::Http(
            HttpError::bad_request(message.clone())
                .with_source(KernelError::RequestValidation(message)),
        ),
        other => other,
    }
}
