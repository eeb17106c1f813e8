//! # async-kernel-core
//!
//! Core types and traits for the async request-handling kernel.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! listeners, controllers and resolvers that don't need the standard
//! implementations in `async-kernel-std`.
//!
//! # Stage Pipeline
//!
//! A request travels through a fixed sequence of interceptable stages, each
//! identified by a [`Topic`]:
//!
//! ## 1. Request ([`RequestEvent`])
//!
//! Runs before anything else. A listener may answer the request with a
//! response or a [`Deferred`] response, skipping the controller entirely.
//!
//! ## 2. Controller ([`ControllerEvent`], [`ControllerArgumentsEvent`])
//!
//! Synchronous stages around controller resolution and argument binding.
//! Listeners may swap the controller or its arguments.
//!
//! ## 3. View ([`ViewEvent`])
//!
//! Only runs when the [`Controller`] returned raw data. Listeners turn it into
//! a response.
//!
//! ## 4. Response ([`ResponseEvent`])
//!
//! Listeners filter or replace the response about to be returned.
//!
//! ## 5. Exception ([`ExceptionEvent`])
//!
//! Runs once when any earlier stage failed. Listeners may rescue the request
//! with a response; otherwise the error surfaces to the caller.
//!
//! ## 6. Finish ([`FinishRequestEvent`])
//!
//! Synchronous bookkeeping right before the request leaves the
//! [`RequestStack`].
//!
//! # Error Types
//!
//! - [`KernelError`] - Top-level error type
//! - [`HttpError`] - Errors mapped onto an HTTP status
//! - [`BoxError`] - What listeners and controllers return

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod controller;
mod deferred;
mod dispatcher;
mod error;
mod event;
pub mod events;
mod kernel;
mod listener;
mod request;

// Re-exports
pub use controller::{
    ArgumentResolver, Arguments, Controller, ControllerOutput, ControllerRef, ControllerResolver,
    NamedController,
};
pub use deferred::Deferred;
pub use dispatcher::EventDispatcher;
pub use error::{BoxError, HttpError, KernelError};
pub use event::{AsyncStage, KernelEvent, StageEvent, Topic};
pub use events::{
    ControllerArgumentsEvent, ControllerEvent, ExceptionEvent, ExceptionParts, FinishRequestEvent,
    RequestEvent, RequestOutcome, ResponseEvent, ViewEvent,
};
pub use kernel::HttpKernel;
pub use listener::{DynListener, Listener, SyncListener};
pub use request::{Request, RequestBuilder, RequestKind, RequestStack, Response, ResponseExt, response};
