//! Result handler chain
//!
//! After every tick the [`ResultRecord`] is passed through an ordered list of
//! [`ResultHandler`]s. Each one may save the image, forward it somewhere, or
//! add metadata for the handlers after it.
//!
//! ## Key Components
//!
//! - [`ResultHandler`] - Trait implemented by every handler
//! - [`SaveImageHandler`] - Built-in default that writes images to disk
//! - [`LogResultHandler`] - Built-in handler that logs each result
//! - [`CallbackHandler`] - Wraps a closure as a handler
//! - [`HandlerRegistry`] - Name → handler lookup used by settings files
//! - [`run_chain`] - Runs a handler list over a record
//!
//! ## Example
//!
//! ```rust,ignore
//! use camgrab::handlers::{run_chain, HandlerRegistry};
//!
//! let registry = HandlerRegistry::with_defaults();
//! let handlers = registry.resolve(&["save", "log"])?;
//! let record = run_chain(&handlers, record, &config).await?;
//! ```

mod callback;
mod chain;
mod log;
mod registry;
mod save;
mod traits;
mod types;

pub use callback::CallbackHandler;
pub use chain::{ChainError, run_chain};
pub use log::LogResultHandler;
pub use registry::{HandlerRegistry, RegistryError};
pub use save::SaveImageHandler;
pub use traits::{HandlerError, ResultHandler};
pub use types::{GrabRequest, ResultRecord};
