//! # async-kernel - Promise-Based Request Kernel
//!
//! `async-kernel` handles HTTP requests through a fixed pipeline of
//! interceptable stages. Every stage is an event dispatched on an event bus;
//! listeners may answer, filter or replace what flows through it, and may
//! suspend while doing so. The whole pipeline is a [`Deferred`] value that
//! resolves to the response.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use async_kernel::prelude::*;
//!
//! let bus = EventBus::builder()
//!     .listen_fn(0, |event: &mut RequestEvent| {
//!         Box::pin(async move {
//!             if event.request().path() == "/health" {
//!                 event.set_response(response::text("ok"));
//!             }
//!             Ok(())
//!         })
//!     })
//!     .listen_sync(0, ErrorResponseListener::new())
//!     .build();
//!
//! let kernel = Kernel::builder().dispatcher(bus).resolver(routes).build();
//! let response = kernel
//!     .handle_async(Request::get("/health"), RequestKind::Main, true)
//!     .await?;
//! ```
//!
//! ## Crates
//!
//! - `async-kernel-core`: the types and traits ([`Deferred`], the stage
//!   events, [`EventDispatcher`], [`Controller`], ...)
//! - `async-kernel-std`: [`EventBus`], [`RouteTable`], stock listeners and
//!   testing utilities
//! - `async-kernel`: the [`Kernel`] itself

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod kernel;
#[cfg(feature = "tower")]
pub mod service;

pub use kernel::{Kernel, KernelBuilder, REQUEST_DEPTH_HEADER};
#[cfg(feature = "tower")]
pub use service::KernelService;

pub use async_kernel_core::{
    ArgumentResolver, Arguments, AsyncStage, BoxError, Controller, ControllerOutput,
    ControllerRef, ControllerResolver, Deferred, DynListener, EventDispatcher, HttpError,
    HttpKernel, KernelError, KernelEvent, Listener, NamedController, Request, RequestBuilder,
    RequestKind, RequestStack, Response, ResponseExt, StageEvent, SyncListener, Topic, response,
};

/// The stage events.
pub mod events {
    pub use async_kernel_core::events::{
        ControllerArgumentsEvent, ControllerEvent, ExceptionEvent, ExceptionParts,
        FinishRequestEvent, RequestEvent, RequestOutcome, ResponseEvent, ViewEvent,
    };
}

pub use async_kernel_std::bus::{EventBus, EventBusBuilder, SyncEventBus};
pub use async_kernel_std::routing::{RouteArgumentResolver, RouteTable, RoutingError};

/// Event buses.
pub mod bus {
    pub use async_kernel_std::bus::{
        EventBus, EventBusBuilder, ListenerEntry, Registry, SyncEventBus,
    };
}

/// Path routing.
pub mod routing {
    pub use async_kernel_std::routing::{
        CONTROLLER_ATTRIBUTE, ROUTE_ATTRIBUTE, ROUTE_PARAMS_ATTRIBUTE, RouteArgumentResolver,
        RouteTable, RouteTableBuilder, RoutingError,
    };
}

/// Stock listener implementations.
pub mod listeners {
    #![allow(clippy::wildcard_imports)]
    pub use async_kernel_std::listeners::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use async_kernel_std::testing::*;
}

/// Prelude module - common imports for the kernel.
///
/// # Usage
///
/// ```rust,ignore
/// use async_kernel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Controllers
        Arguments,
        BoxError,
        Controller,
        ControllerOutput,
        ControllerRef,
        // Values
        Deferred,
        // Dispatch
        EventBus,
        EventDispatcher,
        HttpError,
        // Kernel
        HttpKernel,
        Kernel,
        KernelError,
        Listener,
        Request,
        RequestKind,
        RequestStack,
        Response,
        ResponseExt,
        RouteTable,
        StageEvent,
        SyncListener,
        response,
    };
    pub use crate::events::{
        ControllerArgumentsEvent, ControllerEvent, ExceptionEvent, FinishRequestEvent,
        RequestEvent, ResponseEvent, ViewEvent,
    };
    pub use crate::listeners::{ErrorResponseListener, JsonViewListener, LoggingListener};
    pub use std::sync::Arc;
}
