//! # Optimistic Rust Runtime
//!
//! Runtime implementation for optimistic state updates.
//!
//! This crate provides the Store that drives a
//! [`Reconciler`](optimistic_core::Reconciler) from an ordered action channel,
//! and the lifecycle dispatcher that turns commands into started / succeeded /
//! failed actions around an external call.
//!
//! ## Core Components
//!
//! - **Store**: Owns visible state and the reconciler; applies actions one at a time
//! - **Dispatcher**: Issues lifecycle actions and performs the external call
//! - **Registry**: Routes command kinds to endpoints (URL template + method)
//! - **Transport**: Performs the call (`HttpTransport` for HTTP via `reqwest`)
//!
//! ## Example
//!
//! ```ignore
//! use optimistic_runtime::{HttpTransport, Method, Registry, Store};
//!
//! let store = Store::new(AppState::default(), app_reducer());
//! let registry = Registry::new()
//!     .with_prefix("http://localhost:4000")
//!     .route("INSERT_TODO", Method::Post, "/todos/");
//! let dispatcher = store.dispatcher(registry, HttpTransport::new());
//!
//! // Optimistic insert: visible once the started action is applied
//! dispatcher.dispatch(TodoCommand::InsertTodo { text: "milk".into() })?;
//!
//! // Read state
//! let count = store.state(|s| s.todos.len()).await;
//! ```

/// Runtime configuration
pub mod config;

/// Action lifecycle dispatcher
pub mod dispatch;

/// Prometheus metrics for observability
pub mod metrics;

/// Command kind → endpoint routing
pub mod registry;

/// The Store runtime
pub mod store;

/// URL template binding
pub mod template;

/// External call transports
pub mod transport;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    ///
    /// Operation failures are never reported here: they travel as `failed`
    /// actions. These errors only describe the runtime itself.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// The store loop has stopped and no longer accepts actions
        #[error("Store action channel closed")]
        ChannelClosed,

        /// Timeout waiting for the store to settle
        #[error("Timeout waiting for store to settle")]
        Timeout,
    }
}

pub use config::{DispatcherConfig, StoreConfig};
pub use dispatch::{DispatchHandle, Dispatcher};
pub use error::StoreError;
pub use registry::{Endpoint, Method, Registry, Request};
pub use store::{ActionSender, Store};
pub use transport::{HttpTransport, Remote, Transport};
