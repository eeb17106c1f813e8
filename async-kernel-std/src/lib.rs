//! # async-kernel-std
//!
//! Standard implementations for the async request-handling kernel.
//!
//! This crate provides:
//! - **Event buses**: [`bus::EventBus`], [`bus::SyncEventBus`]
//! - **Routing**: [`routing::RouteTable`], [`routing::RouteArgumentResolver`]
//! - **Stock listeners**: Logging, JSON view, error responses, main-request filter, timeout
//! - **Testing utilities**: [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use async_kernel_core;

// Modules
pub mod bus;
pub mod listeners;
pub mod routing;
pub mod testing;
