//! Optimistic reconciliation
//!
//! [`Reconciler`] wraps a domain [`Reducer`] and decides, for every incoming
//! action, which base state the reducer runs against:
//!
//! | Action            | Base state        | Effect on committed state / log                  |
//! |-------------------|-------------------|--------------------------------------------------|
//! | sync              | committed         | result becomes the new committed state           |
//! | async started     | current (visible) | action appended to the pending log               |
//! | async succeeded   | committed         | started + succeeded committed, pending replayed  |
//! | async failed      | committed         | transaction dropped, pending replayed            |
//!
//! A sync action returns the committed state itself. Optimistic changes still in
//! the log are not replayed onto it; they show again at the next resolution.
//!
//! Pending transactions are always replayed in the order they started, never in
//! the order they resolved, so any interleaving of resolutions ends in the same
//! state as committing the successful operations in start order.

use crate::action::{Action, Phase, TransactionId};
use crate::error::ReconcileError;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// What to do when a resolution has no matching pending transaction
/// (or a start reuses a pending id)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationPolicy {
    /// Return [`ReconcileError`] and leave the reconciler untouched
    Strict,
    /// Log, count, and keep the current state
    Lenient,
}

impl Default for ViolationPolicy {
    /// `Strict` in debug builds, `Lenient` in release builds
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Pending log storage; most applications have only a handful of calls in flight
type PendingLog<C> = SmallVec<[Action<C>; 4]>;

/// The reconciliation reducer
///
/// Owns the committed state (the state derived only from confirmed actions) and
/// the pending transaction log (started async actions not yet resolved, in start
/// order). Construct one per independent state tree; nothing is process-global.
///
/// # Example
///
/// ```ignore
/// let mut reconciler = Reconciler::new(TodosReducer);
///
/// // Optimistic insert shows up immediately
/// let state = reconciler.apply(&state, Action::started(insert.clone(), txn))?;
///
/// // The server assigns the real id; committed state now has it
/// let state = reconciler.apply(&state, Action::succeeded(insert, txn, response))?;
/// ```
pub struct Reconciler<R: Reducer> {
    reducer: R,
    committed: Option<R::State>,
    pending: PendingLog<R::Command>,
    policy: ViolationPolicy,
    violations: u64,
}

impl<R> Reconciler<R>
where
    R: Reducer,
    R::State: Clone,
{
    /// Create a reconciler whose committed state is seeded from the first
    /// state passed to [`apply`](Self::apply)
    #[must_use]
    pub fn new(reducer: R) -> Self {
        Self {
            reducer,
            committed: None,
            pending: SmallVec::new(),
            policy: ViolationPolicy::default(),
            violations: 0,
        }
    }

    /// Create a reconciler with an explicit committed state
    #[must_use]
    pub fn with_committed(reducer: R, committed: R::State) -> Self {
        Self {
            committed: Some(committed),
            ..Self::new(reducer)
        }
    }

    /// Set the protocol violation policy
    #[must_use]
    pub const fn with_policy(mut self, policy: ViolationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reconcile one action and return the new visible state
    ///
    /// `current` is the state the caller is currently showing (which may already
    /// include optimistic changes). The first well-formed action after
    /// construction or [`reset`](Self::reset) seeds the committed state from it,
    /// before that action is applied.
    ///
    /// # Errors
    ///
    /// Under [`ViolationPolicy::Strict`], returns
    /// [`ReconcileError::UnknownTransaction`] when a succeeded or failed action
    /// has no pending started action, and
    /// [`ReconcileError::DuplicateTransaction`] when a started action reuses a
    /// pending transaction id. The reconciler is left unchanged in both cases.
    /// Under [`ViolationPolicy::Lenient`] this never fails.
    pub fn apply(
        &mut self,
        current: &R::State,
        action: Action<R::Command>,
    ) -> Result<R::State, ReconcileError> {
        let Some(transaction_id) = action.transaction_id() else {
            return Ok(self.commit_sync(current, &action));
        };

        let position = self.position(transaction_id);

        match (action.phase(), position) {
            (Phase::Started, Some(_)) => {
                let error = ReconcileError::DuplicateTransaction {
                    transaction_id,
                    kind: action.kind(),
                };
                self.violation(current, error)
            }
            (Phase::Started, None) => {
                // Committed state must predate the optimistic change
                self.committed.get_or_insert_with(|| current.clone());

                let mut next = current.clone();
                self.reducer.reduce(&mut next, &action);
                self.pending.push(action);

                tracing::debug!(
                    transaction_id = %transaction_id,
                    pending = self.pending.len(),
                    "Transaction started"
                );
                Ok(next)
            }
            (Phase::Succeeded(_) | Phase::Failed(_), None) => {
                let error = ReconcileError::UnknownTransaction {
                    transaction_id,
                    kind: action.kind(),
                    phase: action.phase().name(),
                };
                self.violation(current, error)
            }
            (Phase::Succeeded(_), Some(index)) => {
                let started = self.pending.remove(index);
                let committed = self.committed.get_or_insert_with(|| current.clone());

                // Replay the operation onto the confirmed timeline
                self.reducer.reduce(committed, &started);
                self.reducer.reduce(committed, &action);

                let base = committed.clone();

                tracing::debug!(
                    transaction_id = %transaction_id,
                    kind = action.kind(),
                    pending = self.pending.len(),
                    "Transaction committed"
                );
                Ok(self.replay_pending(base))
            }
            (Phase::Failed(error), Some(index)) => {
                self.pending.remove(index);
                let committed = self.committed.get_or_insert_with(|| current.clone());

                tracing::debug!(
                    transaction_id = %transaction_id,
                    kind = action.kind(),
                    error = %error,
                    pending = self.pending.len(),
                    "Transaction rolled back"
                );

                let mut next = committed.clone();
                self.reducer.reduce(&mut next, &action);
                Ok(self.replay_pending(next))
            }
        }
    }

    /// Clear the committed state and the pending log together
    ///
    /// The committed state is re-seeded from the next state passed to
    /// [`apply`](Self::apply).
    pub fn reset(&mut self) {
        self.committed = None;
        self.pending.clear();
    }

    /// Replace the committed state and clear the pending log together
    pub fn reset_to(&mut self, committed: R::State) {
        self.committed = Some(committed);
        self.pending.clear();
    }

    fn commit_sync(&mut self, current: &R::State, action: &Action<R::Command>) -> R::State {
        let committed = self.committed.get_or_insert_with(|| current.clone());
        self.reducer.reduce(committed, action);

        tracing::debug!(kind = action.kind(), "Committed sync action");
        committed.clone()
    }

    fn replay_pending(&self, mut state: R::State) -> R::State {
        for started in &self.pending {
            self.reducer.reduce(&mut state, started);
        }
        state
    }

    fn violation(
        &mut self,
        current: &R::State,
        error: ReconcileError,
    ) -> Result<R::State, ReconcileError> {
        self.violations += 1;
        match self.policy {
            ViolationPolicy::Strict => {
                tracing::error!(error = %error, "Reconciliation protocol violation");
                Err(error)
            }
            ViolationPolicy::Lenient => {
                tracing::warn!(error = %error, "Ignoring reconciliation protocol violation");
                Ok(current.clone())
            }
        }
    }
}

impl<R: Reducer> Reconciler<R> {
    /// The committed state, once seeded
    #[must_use]
    pub const fn committed(&self) -> Option<&R::State> {
        self.committed.as_ref()
    }

    /// Pending started actions, in start order
    pub fn pending(&self) -> impl Iterator<Item = &Action<R::Command>> {
        self.pending.iter()
    }

    /// Ids of pending transactions, in start order
    #[must_use]
    pub fn pending_transactions(&self) -> Vec<TransactionId> {
        self.pending
            .iter()
            .filter_map(Action::transaction_id)
            .collect()
    }

    /// Whether a transaction is waiting for resolution
    #[must_use]
    pub fn is_pending(&self, transaction_id: TransactionId) -> bool {
        self.position(transaction_id).is_some()
    }

    /// Number of transactions waiting for resolution
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The active violation policy
    #[must_use]
    pub const fn policy(&self) -> ViolationPolicy {
        self.policy
    }

    /// Number of protocol violations detected so far
    #[must_use]
    pub const fn violations(&self) -> u64 {
        self.violations
    }

    /// The wrapped domain reducer
    #[must_use]
    pub const fn reducer(&self) -> &R {
        &self.reducer
    }

    fn position(&self, transaction_id: TransactionId) -> Option<usize> {
        self.pending
            .iter()
            .position(|started| started.transaction_id() == Some(transaction_id))
    }
}

impl<R> std::fmt::Debug for Reconciler<R>
where
    R: Reducer,
    R::State: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("committed", &self.committed)
            .field("pending", &self.pending_transactions())
            .field("policy", &self.policy)
            .field("violations", &self.violations)
            .finish_non_exhaustive()
    }
}
