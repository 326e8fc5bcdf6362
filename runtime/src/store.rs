//! The Store - ordered runtime around a [`Reconciler`]
//!
//! Actions reach the reconciler through a single unbounded channel drained by
//! one consumer task, so they are applied strictly one at a time in arrival
//! order. Dispatcher tasks only ever enqueue; nothing else mutates state.

use crate::config::{DispatcherConfig, StoreConfig};
use crate::dispatch::Dispatcher;
use crate::error::StoreError;
use crate::metrics::ReconcileMetrics;
use crate::registry::Registry;
use crate::transport::Transport;
use optimistic_core::{Action, Command, Reconciler, Reducer, TransactionId, TransactionIdGenerator};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};

/// Messages processed by the store loop
enum Message<C: Command> {
    /// Reconcile an action
    Apply(Action<C>),
    /// Barrier: answered once every earlier message is processed
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle for posting actions onto a store's ordered channel
///
/// Dispatchers hold one of these; the store loop keeps running while any
/// sender (or the store itself) is alive.
pub struct ActionSender<C: Command> {
    sender: mpsc::UnboundedSender<Message<C>>,
}

impl<C: Command> ActionSender<C> {
    /// Enqueue an action
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] if the store loop has stopped.
    pub fn send(&self, action: Action<C>) -> Result<(), StoreError> {
        self.sender
            .send(Message::Apply(action))
            .map_err(|_| StoreError::ChannelClosed)
    }

    /// Wait until every action enqueued before this call has been applied
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] if the store loop has stopped.
    pub async fn settle(&self) -> Result<(), StoreError> {
        let (done, wait) = oneshot::channel();
        self.sender
            .send(Message::Flush(done))
            .map_err(|_| StoreError::ChannelClosed)?;
        wait.await.map_err(|_| StoreError::ChannelClosed)
    }

    /// Whether the store loop has stopped
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<C: Command> Clone for ActionSender<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<C: Command> fmt::Debug for ActionSender<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSender")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Visible state and reconciler, always locked together
struct Shared<R: Reducer> {
    current: R::State,
    reconciler: Reconciler<R>,
}

/// The Store - runtime coordinator for a reconciled reducer
///
/// The Store manages:
/// 1. Visible state and the [`Reconciler`] (behind one `RwLock`)
/// 2. The ordered action channel and its consumer task
/// 3. A broadcast of every applied action, for observers
/// 4. The transaction id source shared by its dispatchers
///
/// # Example
///
/// ```ignore
/// let store = Store::new(AppState::default(), app_reducer());
/// let dispatcher = store.dispatcher(registry, HttpTransport::new());
///
/// dispatcher.dispatch(TodoCommand::InsertTodo { text: "milk".into() })?;
///
/// // The optimistic todo is visible as soon as the started action is applied
/// store.settle().await?;
/// let count = store.state(|s| s.todos.len()).await;
/// ```
pub struct Store<R: Reducer> {
    shared: Arc<RwLock<Shared<R>>>,
    sender: ActionSender<R::Command>,
    action_broadcast: broadcast::Sender<Action<R::Command>>,
    ids: Arc<TransactionIdGenerator>,
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Clone + Send + Sync + 'static,
{
    /// Create a store with default configuration
    ///
    /// `initial_state` is both the visible state and the committed state.
    /// Must be called from within a Tokio runtime, which runs the store loop.
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R) -> Self {
        Self::with_config(initial_state, reducer, StoreConfig::default())
    }

    /// Create a store with custom configuration
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = StoreConfig::default()
    ///     .with_policy(ViolationPolicy::Lenient)
    ///     .with_broadcast_capacity(256);
    ///
    /// let store = Store::with_config(AppState::default(), app_reducer(), config);
    /// ```
    #[must_use]
    pub fn with_config(initial_state: R::State, reducer: R, config: StoreConfig) -> Self {
        let reconciler =
            Reconciler::with_committed(reducer, initial_state.clone()).with_policy(config.policy);
        let shared = Arc::new(RwLock::new(Shared {
            current: initial_state,
            reconciler,
        }));

        let (sender, receiver) = mpsc::unbounded_channel();
        let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

        tokio::spawn(run_loop(
            Arc::clone(&shared),
            receiver,
            action_broadcast.clone(),
        ));

        Self {
            shared,
            sender: ActionSender { sender },
            action_broadcast,
            ids: Arc::new(TransactionIdGenerator::new()),
        }
    }

    /// Enqueue an already-formed action
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] if the store loop has stopped.
    pub fn send(&self, action: Action<R::Command>) -> Result<(), StoreError> {
        self.sender.send(action)
    }

    /// A handle for enqueuing actions from other tasks
    #[must_use]
    pub fn sender(&self) -> ActionSender<R::Command> {
        self.sender.clone()
    }

    /// The transaction id source shared by this store's dispatchers
    #[must_use]
    pub fn transaction_ids(&self) -> Arc<TransactionIdGenerator> {
        Arc::clone(&self.ids)
    }

    /// Build a dispatcher that posts onto this store
    #[must_use]
    pub fn dispatcher<T: Transport>(
        &self,
        registry: Registry,
        transport: T,
    ) -> Dispatcher<R::Command, T> {
        self.dispatcher_with_config(registry, transport, DispatcherConfig::default())
    }

    /// Build a dispatcher with custom configuration
    #[must_use]
    pub fn dispatcher_with_config<T: Transport>(
        &self,
        registry: Registry,
        transport: T,
        config: DispatcherConfig,
    ) -> Dispatcher<R::Command, T> {
        Dispatcher::new(
            self.sender(),
            self.transaction_ids(),
            registry,
            transport,
            config,
        )
    }

    /// Read the visible state via a closure
    ///
    /// ```ignore
    /// let todo_count = store.state(|s| s.todos.len()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        let shared = self.shared.read().await;
        f(&shared.current)
    }

    /// Read the committed state via a closure
    pub async fn committed<F, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&R::State) -> T,
    {
        let shared = self.shared.read().await;
        shared.reconciler.committed().map(f)
    }

    /// Ids of transactions awaiting resolution, in start order
    pub async fn pending_transactions(&self) -> Vec<TransactionId> {
        self.shared.read().await.reconciler.pending_transactions()
    }

    /// Number of protocol violations seen so far
    pub async fn violations(&self) -> u64 {
        self.shared.read().await.reconciler.violations()
    }

    /// Wait until every action enqueued so far has been applied
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] if the store loop has stopped.
    pub async fn settle(&self) -> Result<(), StoreError> {
        self.sender.settle().await
    }

    /// [`settle`](Self::settle) with an upper bound on the wait
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the barrier is not reached in time,
    /// or [`StoreError::ChannelClosed`] if the store loop has stopped.
    pub async fn settle_with_timeout(&self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.settle())
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Replace visible state, committed state and the pending log together
    ///
    /// Actions enqueued before the reset are applied first. Resolutions that
    /// arrive afterwards for transactions started before the reset no longer
    /// match the log and are handled as protocol violations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] if the store loop has stopped.
    pub async fn reset(&self, state: R::State) -> Result<(), StoreError> {
        self.settle().await?;

        let mut shared = self.shared.write().await;
        shared.reconciler.reset_to(state.clone());
        shared.current = state;

        tracing::info!("Store reset");
        Ok(())
    }

    /// Subscribe to every action the store applies
    ///
    /// Each action is broadcast after it has been reconciled, so a subscriber
    /// that reads state on receipt sees its effect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Action<R::Command>> {
        self.action_broadcast.subscribe()
    }
}

impl<R: Reducer> fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("sender", &self.sender)
            .field("subscribers", &self.action_broadcast.receiver_count())
            .finish_non_exhaustive()
    }
}

async fn run_loop<R>(
    shared: Arc<RwLock<Shared<R>>>,
    mut receiver: mpsc::UnboundedReceiver<Message<R::Command>>,
    action_broadcast: broadcast::Sender<Action<R::Command>>,
) where
    R: Reducer + Send + Sync + 'static,
    R::State: Clone + Send + Sync + 'static,
{
    tracing::debug!("Store loop started");

    while let Some(message) = receiver.recv().await {
        match message {
            Message::Apply(action) => {
                let observed = (action_broadcast.receiver_count() > 0).then(|| action.clone());
                apply(&shared, action).await;
                if let Some(action) = observed {
                    // No receivers left is fine
                    let _ = action_broadcast.send(action);
                }
            }
            Message::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::debug!("Store loop stopped: all senders dropped");
}

async fn apply<R>(shared: &RwLock<Shared<R>>, action: Action<R::Command>)
where
    R: Reducer,
    R::State: Clone,
{
    let mut guard = shared.write().await;
    let Shared {
        current,
        reconciler,
    } = &mut *guard;

    let kind = action.kind();
    let phase = action.phase().name();
    let violations = reconciler.violations();
    let start = Instant::now();

    match reconciler.apply(current, action) {
        Ok(next) => *current = next,
        Err(error) => {
            tracing::debug!(kind, phase, %error, "Visible state left unchanged");
        }
    }

    ReconcileMetrics::record_action(start.elapsed(), reconciler.pending_len());
    if reconciler.violations() > violations {
        ReconcileMetrics::record_violation();
    }
}
