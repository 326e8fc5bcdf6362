//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use optimistic_core::{Action, Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Fluent API for testing domain reducers with Given-When-Then syntax
///
/// Actions are applied directly to the reducer, in order, with no
/// reconciliation: this tests what the reducer does with each lifecycle
/// phase on its own.
///
/// # Example
///
/// ```ignore
/// use optimistic_testing::ReducerTest;
///
/// ReducerTest::new(TodosReducer)
///     .given_state(vec![])
///     .when_action(Action::started(insert("milk"), TransactionId::new(1)))
///     .then_state(|todos| {
///         assert_eq!(todos[0].id, PLACEHOLDER_ID);
///     })
///     .run();
/// ```
pub struct ReducerTest<R: Reducer> {
    reducer: R,
    initial_state: Option<R::State>,
    actions: Vec<Action<R::Command>>,
    state_assertions: Vec<StateAssertion<R::State>>,
}

impl<R: Reducer> ReducerTest<R> {
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
        }
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to apply (When)
    ///
    /// May be called repeatedly; actions are applied in call order.
    #[must_use]
    pub fn when_action(mut self, action: Action<R::Command>) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state or action is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        for action in &self.actions {
            self.reducer.reduce(&mut state, action);
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

/// Helper assertions for lifecycle action sequences
pub mod assertions {
    use optimistic_core::{Action, Command};

    /// Assert that a sequence is one well-formed async transaction:
    /// `started`, then exactly one of `succeeded` / `failed`, all sharing a
    /// transaction id.
    ///
    /// # Panics
    ///
    /// Panics if the sequence is malformed.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_transaction<C: Command>(actions: &[Action<C>]) {
        assert_eq!(
            actions.len(),
            2,
            "Expected started + terminal action, found {}: {actions:?}",
            actions.len()
        );
        let (started, terminal) = (&actions[0], &actions[1]);

        assert!(
            started.is_started() && started.is_async(),
            "First action must be an async started action: {started}"
        );
        assert!(
            terminal.is_succeeded() || terminal.is_failed(),
            "Second action must be terminal: {terminal}"
        );
        assert_eq!(
            started.transaction_id(),
            terminal.transaction_id(),
            "Started and terminal actions must share a transaction id"
        );
        assert_eq!(started.kind(), terminal.kind(), "Kinds must match");
    }

    /// Assert that a sequence is a single sync action
    ///
    /// # Panics
    ///
    /// Panics if the sequence is not exactly one sync started action.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_sync<C: Command>(actions: &[Action<C>]) {
        assert!(
            matches!(actions, [action] if action.is_started() && !action.is_async()),
            "Expected exactly one sync action, found {actions:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimistic_core::{Command, DispatchError, TransactionId};

    #[derive(Clone, Debug)]
    enum CounterCommand {
        Increment,
        Decrement,
    }

    impl Command for CounterCommand {
        type Response = i32;

        fn kind(&self) -> &'static str {
            match self {
                Self::Increment => "INCREMENT",
                Self::Decrement => "DECREMENT",
            }
        }
    }

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Command = CounterCommand;

        fn reduce(&self, state: &mut Self::State, action: &Action<CounterCommand>) {
            match (action.command(), action.response()) {
                (CounterCommand::Increment, None) if action.is_started() => state.count += 1,
                (CounterCommand::Decrement, None) if action.is_started() => state.count -= 1,
                (_, Some(confirmed)) => state.count = *confirmed,
                _ => {}
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 0 })
            .when_action(Action::sync(CounterCommand::Increment))
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_applies_actions_in_order() {
        let txn = TransactionId::new(1);

        ReducerTest::new(TestReducer)
            .given_state(TestState { count: 5 })
            .when_action(Action::started(CounterCommand::Decrement, txn))
            .when_action(Action::succeeded(CounterCommand::Decrement, txn, 10))
            .then_state(|state| {
                assert_eq!(state.count, 10);
            })
            .run();
    }

    #[test]
    fn test_assertions_transaction() {
        let txn = TransactionId::new(3);
        assertions::assert_transaction(&[
            Action::started(CounterCommand::Increment, txn),
            Action::failed(CounterCommand::Increment, txn, DispatchError::Timeout(1)),
        ]);
        assertions::assert_sync(&[Action::sync(CounterCommand::Increment)]);
    }

    #[test]
    #[should_panic(expected = "share a transaction id")]
    fn test_assertions_transaction_rejects_mismatched_ids() {
        assertions::assert_transaction(&[
            Action::started(CounterCommand::Increment, TransactionId::new(1)),
            Action::succeeded(CounterCommand::Increment, TransactionId::new(2), 1),
        ]);
    }
}
