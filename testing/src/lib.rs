//! # Optimistic Rust Testing
//!
//! Testing utilities and helpers for optimistic state updates.
//!
//! This crate provides:
//! - A mock transport whose calls tests resolve in any order
//! - Given-When-Then harnesses for domain reducers and the reconciler
//! - Property-based testing strategies for transaction interleavings
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use optimistic_testing::mocks::MockTransport;
//! use optimistic_runtime::Store;
//!
//! #[tokio::test]
//! async fn insert_resolves_out_of_order() {
//!     let transport = MockTransport::manual();
//!     let store = Store::new(AppState::default(), app_reducer());
//!     let dispatcher = store.dispatcher(registry(), transport.clone());
//!
//!     dispatcher.dispatch(insert("a"))?;
//!     dispatcher.dispatch(insert("b"))?;
//!     transport.wait_for_calls(2).await;
//!
//!     transport.resolve(1, Ok(json!("3")));
//!     transport.resolve(0, Ok(json!("2")));
//! }
//! ```

/// Mock implementations of the runtime's collaborators
pub mod mocks;

/// Given-When-Then harness for domain reducers
pub mod reducer_test;

/// Given-When-Then harness for the reconciler
pub mod reconciler_test;

/// Test helpers and utilities.
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber
    ///
    /// Honors `RUST_LOG` and defaults to `warn`. Safe to call from every test:
    /// only the first call installs anything.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Interleavings of up to `max` transactions
    ///
    /// Yields `(events, outcomes)`: `events` holds every transaction index
    /// exactly twice in shuffled order, where the first occurrence is the
    /// transaction's start and the second its resolution; `outcomes[i]` says
    /// whether transaction `i` succeeds.
    pub fn interleavings(max: usize) -> impl Strategy<Value = (Vec<usize>, Vec<bool>)> {
        (1..=max.max(1)).prop_flat_map(|n| {
            let pairs: Vec<usize> = (0..n).flat_map(|i| [i, i]).collect();
            (Just(pairs).prop_shuffle(), prop::collection::vec(any::<bool>(), n))
        })
    }
}

// Re-export commonly used items
pub use mocks::MockTransport;
pub use reconciler_test::ReconcilerTest;
pub use reducer_test::ReducerTest;
