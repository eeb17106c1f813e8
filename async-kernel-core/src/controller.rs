//! Controllers and the resolvers that find them.
//!
//! A [`Controller`] is the terminal point of the pipeline: it receives the
//! request and its bound [`Arguments`] and returns a [`ControllerOutput`]. The
//! output may already be a response, a [`Deferred`] that will produce one, or
//! a raw value that the view stage has to turn into a response.
//!
//! Failing synchronously (returning `Err`) and returning a rejected deferred
//! are handled identically by the kernel.

use crate::{
    deferred::Deferred,
    error::{BoxError, KernelError},
    request::{Request, Response},
};
use serde_json::Value;
use std::{fmt, sync::Arc};

/// The ordered arguments a controller is invoked with.
pub type Arguments = Vec<Value>;

/// A shared controller handle.
pub type ControllerRef = Arc<dyn Controller>;

/// What a controller produced.
pub enum ControllerOutput {
    /// A finished response.
    Response(Response),
    /// A value that is not available yet.
    Deferred(Deferred<ControllerOutput>),
    /// Raw data for the view stage.
    Value(Value),
}

impl ControllerOutput {
    /// Wrap a deferred response.
    pub fn deferred(response: Deferred<Response>) -> Self {
        ControllerOutput::Deferred(response.map(ControllerOutput::Response))
    }
}

impl From<Response> for ControllerOutput {
    fn from(response: Response) -> Self {
        ControllerOutput::Response(response)
    }
}

impl From<Value> for ControllerOutput {
    fn from(value: Value) -> Self {
        ControllerOutput::Value(value)
    }
}

impl From<Deferred<Response>> for ControllerOutput {
    fn from(response: Deferred<Response>) -> Self {
        ControllerOutput::deferred(response)
    }
}

impl fmt::Debug for ControllerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerOutput::Response(response) => {
                f.debug_tuple("Response").field(&response.status()).finish()
            }
            ControllerOutput::Deferred(_) => f.write_str("Deferred(..)"),
            ControllerOutput::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// The endpoint that handles a request.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Controller`",
    label = "missing `Controller` implementation",
    note = "Closures of type `Fn(Arc<Request>, Arguments) -> Result<ControllerOutput, BoxError>` are controllers."
)]
pub trait Controller: Send + Sync + 'static {
    /// Invoke the controller.
    fn call(&self, request: Arc<Request>, arguments: Arguments)
    -> Result<ControllerOutput, BoxError>;

    /// A name used in diagnostics.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<F> Controller for F
where
    F: Fn(Arc<Request>, Arguments) -> Result<ControllerOutput, BoxError> + Send + Sync + 'static,
{
    fn call(
        &self,
        request: Arc<Request>,
        arguments: Arguments,
    ) -> Result<ControllerOutput, BoxError> {
        (self)(request, arguments)
    }
}

/// A controller with an explicit diagnostic name.
pub struct NamedController<C> {
    name: String,
    inner: C,
}

impl<C: Controller> NamedController<C> {
    /// Name a controller.
    pub fn new(name: impl Into<String>, inner: C) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    /// Name a controller and share it.
    pub fn shared(name: impl Into<String>, inner: C) -> ControllerRef {
        Arc::new(Self::new(name, inner))
    }
}

impl<C: Controller> Controller for NamedController<C> {
    fn call(
        &self,
        request: Arc<Request>,
        arguments: Arguments,
    ) -> Result<ControllerOutput, BoxError> {
        self.inner.call(request, arguments)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Finds the controller for a request.
pub trait ControllerResolver: Send + Sync + 'static {
    /// `None` when no controller matches.
    fn resolve(&self, request: &Request) -> Option<ControllerRef>;
}

impl<F> ControllerResolver for F
where
    F: Fn(&Request) -> Option<ControllerRef> + Send + Sync + 'static,
{
    fn resolve(&self, request: &Request) -> Option<ControllerRef> {
        (self)(request)
    }
}

/// Binds the arguments a controller is invoked with.
pub trait ArgumentResolver: Send + Sync + 'static {
    /// The ordered argument list for `controller`.
    fn resolve(&self, request: &Request, controller: &ControllerRef)
    -> Result<Arguments, KernelError>;
}
