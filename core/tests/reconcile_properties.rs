//! Property tests for optimistic reconciliation
//!
//! Schedules are shuffled pairs of transaction indices: the first occurrence of
//! an index is that transaction's start, the second its resolution.

#![allow(clippy::unwrap_used)]

use optimistic_core::{
    Action, Command, DispatchError, Reconciler, Reducer, TransactionId, ViolationPolicy,
};
use optimistic_testing::properties::interleavings;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
struct Insert(u32);

impl Command for Insert {
    /// Server-assigned id
    type Response = u64;

    fn kind(&self) -> &'static str {
        "INSERT"
    }
}

/// Rows keyed by label; `None` until the server assigns an id
///
/// Inserts of distinct labels commute on a map, so the final state does not
/// depend on which transaction resolved first.
type Rows = BTreeMap<u32, Option<u64>>;

/// Inserts a placeholder row on start; fills in the server id on success.
struct RowsReducer;

impl Reducer for RowsReducer {
    type State = Rows;
    type Command = Insert;

    fn reduce(&self, state: &mut Rows, action: &Action<Insert>) {
        let label = action.command().0;
        if action.is_started() {
            state.insert(label, None);
        } else if let Some(id) = action.response() {
            state.insert(label, Some(*id));
        }
    }
}

fn server_id(label: u32) -> u64 {
    u64::from(label) + 1000
}

/// Expected committed state: only the successful inserts, each applied once.
fn committed_in_start_order(start_order: &[u32], outcomes: &[bool]) -> Rows {
    let reducer = RowsReducer;
    let mut state = Rows::new();
    for label in start_order {
        if outcomes[*label as usize] {
            let txn = TransactionId::new(u64::from(*label) + 1);
            reducer.reduce(&mut state, &Action::started(Insert(*label), txn));
            reducer.reduce(&mut state, &Action::succeeded(Insert(*label), txn, server_id(*label)));
        }
    }
    state
}

proptest! {
    #[test]
    fn resolving_every_transaction_commits_only_successes((events, outcomes) in interleavings(8)) {
        let mut reconciler = Reconciler::with_committed(RowsReducer, Rows::new())
            .with_policy(ViolationPolicy::Strict);
        let mut state = Rows::new();
        let mut started = vec![false; outcomes.len()];
        let mut start_order = Vec::new();

        for index in events {
            let label = u32::try_from(index).unwrap();
            let txn = TransactionId::new(index as u64 + 1);

            if started[index] {
                let action = if outcomes[index] {
                    Action::succeeded(Insert(label), txn, server_id(label))
                } else {
                    Action::failed(Insert(label), txn, DispatchError::Timeout(1))
                };
                state = reconciler.apply(&state, action).unwrap();

                // A resolved id never reappears in the log
                prop_assert!(!reconciler.is_pending(txn));
            } else {
                started[index] = true;
                start_order.push(label);

                // Started builds on the visible state, whatever committed is
                let mut expected = state.clone();
                expected.insert(label, None);
                state = reconciler.apply(&state, Action::started(Insert(label), txn)).unwrap();
                prop_assert_eq!(&state, &expected);
            }
        }

        // Once everything resolved, only successes remain
        let expected = committed_in_start_order(&start_order, &outcomes);
        prop_assert_eq!(reconciler.pending_len(), 0);
        prop_assert_eq!(&state, &expected);
        prop_assert_eq!(reconciler.committed().unwrap(), &expected);
    }

    #[test]
    fn sync_actions_commit_immediately(labels in prop::collection::vec(0u32..100, 0..16)) {
        let mut reconciler = Reconciler::with_committed(RowsReducer, Rows::new());
        let mut state = Rows::new();

        for label in labels {
            let before = reconciler.committed().unwrap().clone();
            state = reconciler.apply(&state, Action::sync(Insert(label))).unwrap();

            // committed == reducer(previous committed, action)
            let mut expected = before;
            expected.insert(label, None);
            prop_assert_eq!(reconciler.committed().unwrap(), &expected);
            prop_assert_eq!(&state, &expected);
            prop_assert_eq!(reconciler.pending_len(), 0);
        }
    }

    #[test]
    fn failure_leaves_committed_as_if_never_started(
        before in prop::collection::vec(0u32..50, 0..6),
        failing in 100u32..200,
    ) {
        let mut reconciler = Reconciler::with_committed(RowsReducer, Rows::new());
        let mut state = Rows::new();
        for label in &before {
            state = reconciler.apply(&state, Action::sync(Insert(*label))).unwrap();
        }
        let committed_before = reconciler.committed().unwrap().clone();

        let txn = TransactionId::new(1);
        state = reconciler.apply(&state, Action::started(Insert(failing), txn)).unwrap();
        state = reconciler
            .apply(&state, Action::failed(Insert(failing), txn, DispatchError::Transport("down".into())))
            .unwrap();

        prop_assert_eq!(reconciler.committed().unwrap(), &committed_before);
        prop_assert_eq!(&state, &committed_before);
    }
}

/// Minimal list reducer used by the worked scenarios
#[derive(Clone, Debug)]
struct Add(&'static str);

impl Command for Add {
    type Response = u64;

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
fn scenario_a_failed_start_rolls_back() {
    let mut reconciler = Reconciler::new(ListReducer);
    let txn = TransactionId::new(1);

    let state = reconciler.apply(&vec![], Action::started(Add("foo"), txn)).unwrap();
    assert_eq!(state, vec!["foo"]);

    let state = reconciler
        .apply(&state, Action::failed(Add("foo"), txn, DispatchError::Timeout(10)))
        .unwrap();
    assert!(state.is_empty());
}

#[test]
fn scenario_b_success_commits_and_failure_drops_only_its_own_change() {
    let mut reconciler = Reconciler::new(ListReducer);

    let state = reconciler
        .apply(&vec![], Action::started(Add("foo"), TransactionId::new(1)))
        .unwrap();
    assert_eq!(state, vec!["foo"]);

    let state = reconciler
        .apply(&state, Action::started(Add("bar"), TransactionId::new(2)))
        .unwrap();
    assert_eq!(state, vec!["foo", "bar"]);

    let state = reconciler
        .apply(&state, Action::succeeded(Add("bar"), TransactionId::new(2), 1))
        .unwrap();
    assert_eq!(state.len(), 2);
    assert!(state.contains(&"foo") && state.contains(&"bar"));
    assert_eq!(reconciler.committed(), Some(&vec!["bar"]));

    let state = reconciler
        .apply(
            &state,
            Action::failed(Add("foo"), TransactionId::new(1), DispatchError::Timeout(10)),
        )
        .unwrap();
    assert_eq!(state, vec!["bar"]);
}

#[test]
fn scenario_c_sync_actions_create_no_transactions() {
    let mut reconciler = Reconciler::new(ListReducer);

    let state = reconciler.apply(&vec![], Action::sync(Add("foo"))).unwrap();
    let state = reconciler.apply(&state, Action::sync(Add("bar"))).unwrap();

    assert_eq!(state, vec!["foo", "bar"]);
    assert_eq!(reconciler.pending_len(), 0);
    assert!(reconciler.pending_transactions().is_empty());
}

#[test]
fn commit_order_follows_resolution_order() {
    let mut reconciler = Reconciler::new(ListReducer);
    let foo = TransactionId::new(1);
    let bar = TransactionId::new(2);

    let state = reconciler.apply(&vec![], Action::started(Add("foo"), foo)).unwrap();
    let state = reconciler.apply(&state, Action::started(Add("bar"), bar)).unwrap();
    assert_eq!(state, vec!["foo", "bar"]);

    // Each success lands on the committed list when it resolves; pending
    // transactions replay after it in start order
    let state = reconciler.apply(&state, Action::succeeded(Add("bar"), bar, 2)).unwrap();
    assert_eq!(state, vec!["bar", "foo"]);

    let state = reconciler.apply(&state, Action::succeeded(Add("foo"), foo, 1)).unwrap();
    assert_eq!(state, vec!["bar", "foo"]);
    assert_eq!(reconciler.committed(), Some(&vec!["bar", "foo"]));
}

#[test]
fn replay_of_pending_transactions_keeps_start_order() {
    let mut reconciler = Reconciler::new(ListReducer);
    let mut state = Vec::new();
    for (id, label) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
        state = reconciler
            .apply(&state, Action::started(Add(label), TransactionId::new(id)))
            .unwrap();
    }

    let state = reconciler
        .apply(&state, Action::succeeded(Add("c"), TransactionId::new(3), 3))
        .unwrap();
    assert_eq!(state, vec!["c", "a", "b", "d"]);

    let state = reconciler
        .apply(
            &state,
            Action::failed(Add("a"), TransactionId::new(1), DispatchError::Timeout(10)),
        )
        .unwrap();
    assert_eq!(state, vec!["c", "b", "d"]);
}
