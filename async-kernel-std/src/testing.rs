//! Testing utilities for the kernel.
//!
//! This module provides stand-ins that make testing listeners, controllers
//! and whole kernels easier.
//!
//! # Features
//!
//! - [`NullKernel`]: A kernel handle for building stage events by hand
//! - [`RecordingListener`]: A listener that records which stages it saw
//! - [`Accumulator`]: A shared buffer that listeners append to, in order
//! - [`StaticController`]: A controller with a fixed answer that counts calls

use async_kernel_core::{
    Arguments, AsyncStage, BoxError, Controller, ControllerOutput, Deferred, HttpKernel,
    KernelError, Listener, Request, RequestKind, RequestStack, Response, StageEvent,
    SyncListener, response,
};
use futures::future;
use serde_json::Value;
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    task::Poll,
};

// ============================================================================
// Null Kernel
// ============================================================================

/// A kernel that refuses every request.
///
/// Stage events need a kernel handle; this one lets listeners be unit tested
/// without a pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let mut event = FinishRequestEvent::new(
///     NullKernel::shared(),
///     Arc::new(Request::get("/")),
///     RequestKind::Main,
/// );
/// listener.on_event_sync(&mut event)?;
/// ```
#[derive(Debug, Default)]
pub struct NullKernel {
    request_stack: RequestStack,
}

impl NullKernel {
    /// Create a null kernel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a null kernel behind the handle stage events expect.
    pub fn shared() -> Arc<dyn HttpKernel> {
        Arc::new(Self::new())
    }
}

impl HttpKernel for NullKernel {
    fn handle_async(
        &self,
        request: Request,
        _kind: RequestKind,
        _catch_errors: bool,
    ) -> Deferred<Response> {
        Deferred::rejected(KernelError::msg(format!(
            "null kernel cannot handle {}",
            request.path()
        )))
    }

    fn request_stack(&self) -> &RequestStack {
        &self.request_stack
    }
}

// ============================================================================
// Recording Listener
// ============================================================================

/// A listener that records what it saw.
///
/// Registered as is, it records the topic of every stage it is dispatched
/// on. [`labelled`](Self::labelled) gives a listener recording a fixed label
/// into the same log instead.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingListener::new();
/// let bus = EventBus::builder()
///     .listen_sync::<RequestEvent, _>(0, recorder.clone())
///     .listen_sync::<FinishRequestEvent, _>(0, recorder.labelled("done"))
///     .build();
///
/// // ... handle a request ...
///
/// assert_eq!(recorder.labels(), vec!["kernel.request", "done"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingListener {
    /// Create a new recording listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener recording `label` into this log.
    pub fn labelled(&self, label: impl Into<String>) -> Labelled {
        Labelled {
            log: self.log.clone(),
            label: label.into(),
        }
    }

    /// Append an entry by hand.
    pub fn record(&self, label: impl Into<String>) {
        self.log.lock().unwrap().push(label.into());
    }

    /// Get a clone of the recorded entries.
    pub fn labels(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Get the number of recorded entries.
    pub fn count(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    /// Clear all recorded entries.
    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }
}

impl<E: StageEvent> SyncListener<E> for RecordingListener {
    fn on_event_sync(&self, _event: &mut E) -> Result<(), BoxError> {
        self.record(E::TOPIC.as_str());
        Ok(())
    }
}

/// A listener recording a fixed label. See [`RecordingListener::labelled`].
#[derive(Debug, Clone)]
pub struct Labelled {
    log: Arc<Mutex<Vec<String>>>,
    label: String,
}

impl<E: StageEvent> SyncListener<E> for Labelled {
    fn on_event_sync(&self, _event: &mut E) -> Result<(), BoxError> {
        self.log.lock().unwrap().push(self.label.clone());
        Ok(())
    }
}

// ============================================================================
// Accumulator
// ============================================================================

/// A shared buffer that listeners append to.
///
/// The final content shows which listeners ran and in which order.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    buffer: Arc<Mutex<String>>,
}

impl Accumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the buffer.
    pub fn push(&self, piece: &str) {
        self.buffer.lock().unwrap().push_str(piece);
    }

    /// The buffer content.
    pub fn value(&self) -> String {
        self.buffer.lock().unwrap().clone()
    }

    /// A listener appending `piece` when it runs.
    ///
    /// As an asynchronous listener it yields once before appending, so a
    /// dispatcher that did not wait for it would let later listeners append
    /// first.
    pub fn appending(&self, piece: impl Into<String>) -> Append {
        Append {
            accumulator: self.clone(),
            piece: piece.into(),
        }
    }
}

/// A listener appending to an [`Accumulator`]. See [`Accumulator::appending`].
#[derive(Debug, Clone)]
pub struct Append {
    accumulator: Accumulator,
    piece: String,
}

impl<E: AsyncStage> Listener<E> for Append {
    async fn on_event(&self, _event: &mut E) -> Result<(), BoxError> {
        yield_once().await;
        self.accumulator.push(&self.piece);
        Ok(())
    }
}

impl<E: StageEvent> SyncListener<E> for Append {
    fn on_event_sync(&self, _event: &mut E) -> Result<(), BoxError> {
        self.accumulator.push(&self.piece);
        Ok(())
    }
}

async fn yield_once() {
    let mut yielded = false;
    future::poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await
}

// ============================================================================
// Static Controller
// ============================================================================

#[derive(Debug, Clone)]
enum Answer {
    Text(String),
    Value(Value),
    Fail(String),
}

/// A controller with a fixed answer that counts its invocations.
///
/// Clones share the counter.
#[derive(Debug, Clone)]
pub struct StaticController {
    name: String,
    answer: Answer,
    calls: Arc<AtomicUsize>,
}

impl StaticController {
    fn with_answer(name: String, answer: Answer) -> Self {
        Self {
            name,
            answer,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answers with a `200` text response.
    pub fn text(body: impl Into<String>) -> Self {
        let body = body.into();
        Self::with_answer(format!("static:{body}"), Answer::Text(body))
    }

    /// Answers with raw data for the view stage.
    pub fn value(value: Value) -> Self {
        Self::with_answer("static:value".to_string(), Answer::Value(value))
    }

    /// Fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::with_answer(format!("static:fail:{message}"), Answer::Fail(message))
    }

    /// Get the number of invocations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Controller for StaticController {
    fn call(
        &self,
        _request: Arc<Request>,
        _arguments: Arguments,
    ) -> Result<ControllerOutput, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Answer::Text(body) => Ok(ControllerOutput::Response(response::text(body.clone()))),
            Answer::Value(value) => Ok(ControllerOutput::Value(value.clone())),
            Answer::Fail(message) => Err(message.clone().into()),
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
