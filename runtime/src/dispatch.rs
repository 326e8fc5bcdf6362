//! Action lifecycle dispatcher
//!
//! Turns caller commands into lifecycle actions on a store's ordered channel:
//!
//! - Kinds without a registered endpoint become one sync action.
//! - Kinds with an endpoint get a fresh transaction id and a `started` action
//!   enqueued before anything else happens, then exactly one external call,
//!   then exactly one `succeeded` or `failed` action with the same id.
//!
//! Errors while preparing the call (payload encoding, unbound path variables)
//! take the same `failed` path; they never surface as `Err` from
//! [`Dispatcher::dispatch`].

use crate::config::DispatcherConfig;
use crate::error::StoreError;
use crate::metrics::DispatchMetrics;
use crate::registry::Registry;
use crate::store::ActionSender;
use crate::transport::{Remote, Transport};
use optimistic_core::{Action, Command, DispatchError, TransactionId, TransactionIdGenerator};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// What a dispatch started
#[derive(Debug)]
pub enum DispatchHandle {
    /// A single sync action was enqueued
    Sync,
    /// An async transaction was started
    Async {
        /// Id shared by the started and terminal actions
        transaction_id: TransactionId,
        /// The call in flight; `None` when the request could not be built and
        /// the failed action was enqueued immediately
        task: Option<JoinHandle<()>>,
    },
}

impl DispatchHandle {
    /// The transaction id, for async dispatches
    #[must_use]
    pub const fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Self::Sync => None,
            Self::Async { transaction_id, .. } => Some(*transaction_id),
        }
    }

    /// Whether the dispatch started a transaction
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(self, Self::Async { .. })
    }

    /// Wait until the terminal action has been enqueued
    ///
    /// Returns immediately for sync dispatches. The terminal action may still
    /// be waiting in the store's channel; use [`Dispatcher::dispatch_and_settle`]
    /// to wait for it to be applied.
    pub async fn resolved(self) {
        if let Self::Async {
            transaction_id,
            task: Some(task),
        } = self
        {
            if let Err(error) = task.await {
                tracing::error!(%transaction_id, %error, "Dispatch task failed");
            }
        }
    }
}

/// Issues lifecycle actions for commands
///
/// Cheap to clone; clones share the transport, registry and id source.
///
/// # Example
///
/// ```ignore
/// let registry = Registry::new()
///     .with_prefix("http://localhost:4000")
///     .route("INSERT_TODO", Method::Post, "/todos/");
/// let dispatcher = store.dispatcher(registry, HttpTransport::new());
///
/// // Enqueues INSERT_TODO started, then calls POST /todos/ in the background
/// let handle = dispatcher.dispatch(TodoCommand::InsertTodo { text: "milk".into() })?;
/// ```
pub struct Dispatcher<C: Command, T> {
    sender: ActionSender<C>,
    ids: Arc<TransactionIdGenerator>,
    registry: Arc<Registry>,
    transport: Arc<T>,
    config: DispatcherConfig,
}

impl<C: Command, T: Transport> Dispatcher<C, T> {
    /// Create a dispatcher posting onto `sender`
    ///
    /// Every dispatcher feeding the same store must share `ids`.
    #[must_use]
    pub fn new(
        sender: ActionSender<C>,
        ids: Arc<TransactionIdGenerator>,
        registry: Registry,
        transport: T,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            sender,
            ids,
            registry: Arc::new(registry),
            transport: Arc::new(transport),
            config,
        }
    }

    /// The endpoint table this dispatcher routes by
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The channel this dispatcher posts onto
    #[must_use]
    pub const fn sender(&self) -> &ActionSender<C> {
        &self.sender
    }
}

impl<C, T> Dispatcher<C, T>
where
    C: Remote,
    T: Transport,
{
    /// Dispatch a command
    ///
    /// For async kinds the `started` action is enqueued before this returns and
    /// the call runs on a spawned task, so this must be called from within a
    /// Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] if the store loop has stopped.
    /// Operation failures never surface here; they become `failed` actions.
    pub fn dispatch(&self, command: C) -> Result<DispatchHandle, StoreError> {
        let kind = command.kind();

        let Some(endpoint) = self.registry.endpoint(kind) else {
            tracing::debug!(kind, "Dispatching sync action");
            self.sender.send(Action::sync(command))?;
            DispatchMetrics::record_sync();
            return Ok(DispatchHandle::Sync);
        };

        let transaction_id = self.ids.next_id();
        tracing::debug!(kind, %transaction_id, "Dispatching started action");
        self.sender
            .send(Action::started(command.clone(), transaction_id))?;
        DispatchMetrics::record_async();

        let request = match command.payload().and_then(|payload| endpoint.request(&payload)) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(kind, %transaction_id, %error, "Could not build request");
                DispatchMetrics::record_failure();
                self.sender
                    .send(Action::failed(command, transaction_id, error))?;
                return Ok(DispatchHandle::Async {
                    transaction_id,
                    task: None,
                });
            }
        };

        let call = self.transport.call(request);
        let call_timeout = self.config.call_timeout;
        let sender = self.sender.clone();

        let task = tokio::spawn(async move {
            let started_at = Instant::now();
            let outcome = match call_timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or_else(|_| Err(DispatchError::Timeout(millis(limit)))),
                None => call.await,
            };
            DispatchMetrics::record_call(started_at.elapsed());

            let action = match outcome.and_then(|body| command.decode_response(body)) {
                Ok(response) => {
                    tracing::debug!(kind, %transaction_id, "Transaction succeeded");
                    Action::succeeded(command, transaction_id, response)
                }
                Err(error) => {
                    tracing::warn!(kind, %transaction_id, %error, "Transaction failed");
                    DispatchMetrics::record_failure();
                    Action::failed(command, transaction_id, error)
                }
            };

            if sender.send(action).is_err() {
                tracing::warn!(kind, %transaction_id, "Store stopped before transaction resolved");
            }
        });

        Ok(DispatchHandle::Async {
            transaction_id,
            task: Some(task),
        })
    }

    /// Dispatch a command and wait until its last action has been applied
    ///
    /// Returns the transaction id for async kinds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ChannelClosed`] if the store loop has stopped.
    pub async fn dispatch_and_settle(&self, command: C) -> Result<Option<TransactionId>, StoreError> {
        let handle = self.dispatch(command)?;
        let transaction_id = handle.transaction_id();
        handle.resolved().await;
        self.sender.settle().await?;
        Ok(transaction_id)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl<C: Command, T> Clone for Dispatcher<C, T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            ids: Arc::clone(&self.ids),
            registry: Arc::clone(&self.registry),
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl<C: Command, T> fmt::Debug for Dispatcher<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
