//! # Optimistic Rust Core
//!
//! Core traits and types for optimistic state updates.
//!
//! This crate lets a client apply the effect of an operation immediately, before
//! its authoritative outcome is known, and then reconcile once the outcome
//! arrives, rolling back cleanly when the operation fails.
//!
//! ## Core Concepts
//!
//! - **Command**: The caller's closed set of operations
//! - **Action**: A command tagged with its lifecycle phase (started, succeeded, failed)
//! - **Reducer**: Pure function `(State, Action) → State`, unaware of transactions
//! - **Reconciler**: Wraps a reducer, owns the committed state and the pending
//!   transaction log, and replays pending transactions whenever one resolves
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - No I/O in the core: transports live in the runtime crate
//! - Replay order is start order, never resolution order
//!
//! ## Example
//!
//! ```
//! use optimistic_core::action::{Action, Command, TransactionId};
//! use optimistic_core::error::DispatchError;
//! use optimistic_core::reconcile::Reconciler;
//! use optimistic_core::reducer::Reducer;
//!
//! #[derive(Clone, Debug)]
//! struct Add(&'static str);
//!
//! impl Command for Add {
//!     type Response = u64;
//!     fn kind(&self) -> &'static str {
//!         "ADD"
//!     }
//! }
//!
//! struct ListReducer;
//!
//! impl Reducer for ListReducer {
//!     type State = Vec<&'static str>;
//!     type Command = Add;
//!
//!     fn reduce(&self, state: &mut Self::State, action: &Action<Add>) {
//!         if action.is_started() {
//!             state.push(action.command().0);
//!         }
//!     }
//! }
//!
//! let mut reconciler = Reconciler::new(ListReducer);
//! let txn = TransactionId::new(1);
//!
//! let state = reconciler.apply(&vec![], Action::started(Add("foo"), txn))?;
//! assert_eq!(state, vec!["foo"]);
//!
//! let state = reconciler.apply(&state, Action::failed(Add("foo"), txn, DispatchError::Timeout(10)))?;
//! assert!(state.is_empty());
//! # Ok::<(), optimistic_core::error::ReconcileError>(())
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};

/// Lifecycle-tagged actions, commands and transaction ids
pub mod action;

/// Reducer composition utilities
pub mod composition;

/// Error types
pub mod error;

/// The reconciliation reducer
pub mod reconcile;

pub use action::{Action, Command, Meta, Phase, TransactionId, TransactionIdGenerator};
pub use error::{DispatchError, ReconcileError};
pub use reconcile::{Reconciler, ViolationPolicy};
pub use reducer::Reducer;

/// Reducer module - The trait for domain state transitions
///
/// Reducers are pure functions: `(State, Action) → State`.
///
/// They are deterministic, never perform I/O, and know nothing about
/// transactions: a reducer only reacts to the lifecycle-tagged actions it
/// recognizes and leaves state untouched for everything else.
pub mod reducer {
    use super::action::{Action, Command};

    /// The Reducer trait - core abstraction for domain logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Command`: The commands whose lifecycle actions this reducer handles
    ///
    /// # Contract
    ///
    /// - Pure: the same state and action always produce the same result
    /// - Total: must not panic for any well-formed action
    /// - Unrecognized actions leave state unchanged
    ///
    /// The reconciler calls `reduce` on an owned copy of whichever base state it
    /// has chosen, so mutating `state` in place never leaks into committed state.
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for TodosReducer {
    ///     type State = Vec<Todo>;
    ///     type Command = TodoCommand;
    ///
    ///     fn reduce(&self, state: &mut Vec<Todo>, action: &Action<TodoCommand>) {
    ///         match (action.command(), action.phase()) {
    ///             (TodoCommand::InsertTodo { text }, Phase::Started) => {
    ///                 state.push(Todo::placeholder(text));
    ///             }
    ///             _ => {}
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The command type whose actions this reducer processes
        type Command: Command;

        /// Apply an action to state in place
        fn reduce(&self, state: &mut Self::State, action: &Action<Self::Command>);
    }

    impl<R: Reducer + ?Sized> Reducer for Box<R> {
        type State = R::State;
        type Command = R::Command;

        fn reduce(&self, state: &mut Self::State, action: &Action<Self::Command>) {
            (**self).reduce(state, action);
        }
    }
}
