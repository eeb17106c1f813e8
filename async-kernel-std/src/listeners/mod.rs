//! Stock listeners.

pub mod error;
pub mod filter;
pub mod logging;
#[cfg(feature = "timeout")]
pub mod timeout;
pub mod view;

pub use error::ErrorResponseListener;
pub use filter::MainRequestOnly;
pub use logging::LoggingListener;
#[cfg(feature = "timeout")]
pub use timeout::{TimeoutError, TimeoutListener};
pub use view::JsonViewListener;
