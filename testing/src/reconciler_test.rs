//! Scripted action sequences through a [`Reconciler`]

#![allow(clippy::module_name_repetitions)]

use optimistic_core::{Action, Reconciler, Reducer, TransactionId, ViolationPolicy};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Given-When-Then harness for the full reconciliation path
///
/// Feeds each action through a strict [`Reconciler`], threading the visible
/// state from one call to the next the way a store does, then checks the
/// final visible state, committed state and pending log.
///
/// # Example
///
/// ```ignore
/// ReconcilerTest::new(app_reducer())
///     .given_state(AppState::default())
///     .when_action(Action::started(insert("milk"), txn(1)))
///     .when_action(Action::failed(insert("milk"), txn(1), error))
///     .then_state(|state| assert!(state.todos.is_empty()))
///     .then_pending(&[])
///     .run();
/// ```
pub struct ReconcilerTest<R: Reducer> {
    reducer: R,
    initial_state: Option<R::State>,
    actions: Vec<Action<R::Command>>,
    state_assertions: Vec<StateAssertion<R::State>>,
    committed_assertions: Vec<StateAssertion<R::State>>,
    expected_pending: Option<Vec<TransactionId>>,
}

impl<R> ReconcilerTest<R>
where
    R: Reducer,
    R::State: Clone,
{
    /// Create a new test around a domain reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            committed_assertions: Vec::new(),
            expected_pending: None,
        }
    }

    /// Set the initial visible and committed state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to reconcile (When)
    #[must_use]
    pub fn when_action(mut self, action: Action<R::Command>) -> Self {
        self.actions.push(action);
        self
    }

    /// Add several actions to reconcile, in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = Action<R::Command>>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Assert on the final visible state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Assert on the final committed state (Then)
    #[must_use]
    pub fn then_committed<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.committed_assertions.push(Box::new(assertion));
        self
    }

    /// Expect exactly these transactions to be pending, in start order (Then)
    #[must_use]
    pub fn then_pending(mut self, pending: &[TransactionId]) -> Self {
        self.expected_pending = Some(pending.to_vec());
        self
    }

    /// Run the script and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if the initial state is not set, if any action is a protocol
    /// violation, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let initial = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let mut reconciler = Reconciler::with_committed(self.reducer, initial.clone())
            .with_policy(ViolationPolicy::Strict);
        let mut state = initial;

        for action in self.actions {
            let label = action.to_string();
            state = reconciler
                .apply(&state, action)
                .unwrap_or_else(|error| panic!("Reconciling {label} failed: {error}"));
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        let committed = reconciler
            .committed()
            .expect("Committed state is seeded by given_state()");
        for assertion in self.committed_assertions {
            assertion(committed);
        }

        if let Some(expected) = self.expected_pending {
            assert_eq!(
                reconciler.pending_transactions(),
                expected,
                "Pending transactions differ"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimistic_core::{Command, DispatchError};

    #[derive(Clone, Debug)]
    struct Add(&'static str);

    impl Command for Add {
        type Response = ();

        fn kind(&self) -> &'static str {
            "ADD"
        }
    }

    struct ListReducer;

    impl Reducer for ListReducer {
        type State = Vec<&'static str>;
        type Command = Add;

        fn reduce(&self, state: &mut Self::State, action: &Action<Add>) {
            if action.is_started() {
                state.push(action.command().0);
            }
        }
    }

    #[test]
    fn scripted_rollback_keeps_later_transactions() {
        let (one, two) = (TransactionId::new(1), TransactionId::new(2));

        ReconcilerTest::new(ListReducer)
            .given_state(vec![])
            .when_actions([
                Action::started(Add("foo"), one),
                Action::started(Add("bar"), two),
                Action::failed(Add("foo"), one, DispatchError::Timeout(5)),
            ])
            .then_state(|state| assert_eq!(state, &vec!["bar"]))
            .then_committed(|committed| assert!(committed.is_empty()))
            .then_pending(&[two])
            .run();
    }

    #[test]
    #[should_panic(expected = "No pending transaction")]
    fn unmatched_resolution_fails_the_test() {
        ReconcilerTest::new(ListReducer)
            .given_state(vec![])
            .when_action(Action::succeeded(Add("x"), TransactionId::new(7), ()))
            .run();
    }
}
