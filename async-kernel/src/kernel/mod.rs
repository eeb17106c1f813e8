//! The request-handling kernel.
//!
//! A [`Kernel`] owns an [`EventDispatcher`], a [`ControllerResolver`] and an
//! [`ArgumentResolver`], and drives every request through the stage pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_kernel::prelude::*;
//!
//! let routes = RouteTable::builder()
//!     .route("/hello/{name}", |_req: Arc<Request>, args: Arguments| -> Result<ControllerOutput, BoxError> {
//!         Ok(ControllerOutput::Value(args[0].clone()))
//!     })?
//!     .build();
//!
//! let kernel = Kernel::builder()
//!     .dispatcher(EventBus::builder().listen_sync(0, JsonViewListener).build())
//!     .resolver(routes)
//!     .build();
//!
//! let response = kernel
//!     .handle_async(Request::get("/hello/world"), RequestKind::Main, true)
//!     .await?;
//! ```

mod describe;
mod pipeline;

use async_kernel_core::{
    ArgumentResolver, ControllerRef, ControllerResolver, Deferred, EventDispatcher, HttpKernel,
    KernelError, Request, RequestKind, RequestStack, Response,
};
use async_kernel_std::{bus::EventBus, routing::RouteArgumentResolver};
use std::{fmt, sync::Arc};

/// Header stamped on every handled request with the request stack depth at entry.
pub const REQUEST_DEPTH_HEADER: &str = "x-kernel-request-depth";

/// The request-handling kernel.
///
/// Cloning is cheap; clones share dispatcher, resolvers and request stack.
pub struct Kernel<D = EventBus> {
    inner: Arc<KernelInner<D>>,
}

struct KernelInner<D> {
    dispatcher: D,
    resolver: Arc<dyn ControllerResolver>,
    argument_resolver: Arc<dyn ArgumentResolver>,
    request_stack: RequestStack,
}

impl<D> Clone for Kernel<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Kernel {
    /// Start building a kernel on the default [`EventBus`].
    pub fn builder() -> KernelBuilder<EventBus> {
        KernelBuilder::new()
    }
}

impl<D: EventDispatcher> Kernel<D> {
    /// Handle a request, resolving to its response.
    ///
    /// With `catch_errors`, failures go through the exception stage, whose
    /// listeners may answer them. Without it they are returned as is, after
    /// the request has been finished.
    ///
    /// Rejects with [`KernelError::AsyncDispatcherNeeded`] before any stage
    /// runs when the dispatcher cannot dispatch asynchronously.
    pub fn handle_async(
        &self,
        request: Request,
        kind: RequestKind,
        catch_errors: bool,
    ) -> Deferred<Response> {
        pipeline::handle(self.clone(), request, kind, catch_errors)
    }

    /// Handle a request to completion on the current thread.
    ///
    /// Listeners and controllers must not rely on a runtime-provided reactor
    /// (timers, sockets) when called this way.
    pub fn handle(
        &self,
        request: Request,
        kind: RequestKind,
        catch_errors: bool,
    ) -> Result<Response, KernelError> {
        futures::executor::block_on(self.handle_async(request, kind, catch_errors))
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.inner.dispatcher
    }

    /// The request stack.
    pub fn request_stack(&self) -> &RequestStack {
        &self.inner.request_stack
    }

    /// Wrap as a `tower::Service`.
    #[cfg(feature = "tower")]
    pub fn into_service(self) -> crate::service::KernelService<D> {
        crate::service::KernelService::new(self)
    }

    fn shared(&self) -> Arc<dyn HttpKernel> {
        Arc::new(self.clone())
    }

    fn resolve_controller(&self, request: &Request) -> Option<ControllerRef> {
        self.inner.resolver.resolve(request)
    }
}

impl<D: EventDispatcher> HttpKernel for Kernel<D> {
    fn handle_async(
        &self,
        request: Request,
        kind: RequestKind,
        catch_errors: bool,
    ) -> Deferred<Response> {
        Kernel::handle_async(self, request, kind, catch_errors)
    }

    fn request_stack(&self) -> &RequestStack {
        &self.inner.request_stack
    }
}

impl<D: fmt::Debug> fmt::Debug for Kernel<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("dispatcher", &self.inner.dispatcher)
            .field("request_stack", &self.inner.request_stack.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Kernel`].
///
/// Without a resolver every request fails with
/// [`KernelError::ControllerNotFound`]. The argument resolver defaults to
/// [`RouteArgumentResolver`].
pub struct KernelBuilder<D> {
    dispatcher: D,
    resolver: Option<Arc<dyn ControllerResolver>>,
    argument_resolver: Option<Arc<dyn ArgumentResolver>>,
    request_stack: Option<RequestStack>,
}

impl KernelBuilder<EventBus> {
    /// Create a builder on an empty [`EventBus`].
    pub fn new() -> Self {
        Self {
            dispatcher: EventBus::default(),
            resolver: None,
            argument_resolver: None,
            request_stack: None,
        }
    }
}

impl Default for KernelBuilder<EventBus> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: EventDispatcher> KernelBuilder<D> {
    /// Use another dispatcher.
    pub fn dispatcher<D2: EventDispatcher>(self, dispatcher: D2) -> KernelBuilder<D2> {
        KernelBuilder {
            dispatcher,
            resolver: self.resolver,
            argument_resolver: self.argument_resolver,
            request_stack: self.request_stack,
        }
    }

    /// Set the controller resolver.
    pub fn resolver(mut self, resolver: impl ControllerResolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Set the argument resolver.
    pub fn argument_resolver(mut self, resolver: impl ArgumentResolver) -> Self {
        self.argument_resolver = Some(Arc::new(resolver));
        self
    }

    /// Share a request stack with other kernels.
    pub fn request_stack(mut self, request_stack: RequestStack) -> Self {
        self.request_stack = Some(request_stack);
        self
    }

    /// Build the kernel.
    pub fn build(self) -> Kernel<D> {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(|_: &Request| -> Option<ControllerRef> { None }));
        let argument_resolver = self
            .argument_resolver
            .unwrap_or_else(|| Arc::new(RouteArgumentResolver));
        Kernel {
            inner: Arc::new(KernelInner {
                dispatcher: self.dispatcher,
                resolver,
                argument_resolver,
                request_stack: self.request_stack.unwrap_or_default(),
            }),
        }
    }
}
