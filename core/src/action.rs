//! Lifecycle-tagged actions
//!
//! Every state transition flows through the system as an [`Action`]: the caller's
//! [`Command`] (what to do) tagged with a [`Phase`] (where in its lifecycle it is)
//! and [`Meta`] (whether it belongs to an async transaction, and which one).
//!
//! Synchronous commands produce a single `Started` action without a transaction id.
//! Commands that need an external call produce `Started`, then exactly one of
//! `Succeeded` or `Failed`, all three sharing one [`TransactionId`].

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A request to change state, supplied by the application
///
/// Implement this for a closed enum of the operations your domain supports.
/// `kind` is the stable tag used for logging and for routing commands to
/// endpoints; it must be identical for every value of the same variant.
///
/// # Example
///
/// ```
/// use optimistic_core::action::Command;
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum ListCommand {
///     Add(String),
///     Clear,
/// }
///
/// impl Command for ListCommand {
///     type Response = u64;
///
///     fn kind(&self) -> &'static str {
///         match self {
///             Self::Add(_) => "ADD",
///             Self::Clear => "CLEAR",
///         }
///     }
/// }
///
/// assert_eq!(ListCommand::Add("foo".into()).kind(), "ADD");
/// ```
pub trait Command: Clone + fmt::Debug + Send + Sync + 'static {
    /// The authoritative result an external call produces for this command
    type Response: Clone + fmt::Debug + Send + Sync + 'static;

    /// Stable identifier of the operation
    fn kind(&self) -> &'static str;
}

/// Identifier shared by the started and terminal actions of one async operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw identifier
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Source of fresh transaction ids
///
/// Ids start at 1 and increase monotonically, so a generator never hands out
/// the same id twice. Share one generator (behind an `Arc`) between every
/// dispatcher feeding the same reconciler.
#[derive(Debug)]
pub struct TransactionIdGenerator {
    next: AtomicU64,
}

impl TransactionIdGenerator {
    /// Create a generator whose first id is `txn-1`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next id
    pub fn next_id(&self) -> TransactionId {
        TransactionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TransactionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle stage of an action, carrying the stage-specific payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase<R> {
    /// The operation began; the command itself is the payload
    Started,
    /// The external call completed with an authoritative result
    Succeeded(R),
    /// The external call (or its preparation) failed
    Failed(DispatchError),
}

impl<R> Phase<R> {
    /// Lowercase name of the stage, for logs and error messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

/// Transaction metadata attached to every action
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    transaction_id: Option<TransactionId>,
}

impl Meta {
    /// Whether the action belongs to a multi-phase operation
    #[must_use]
    pub const fn is_async(&self) -> bool {
        self.transaction_id.is_some()
    }

    /// The transaction this action belongs to, if async
    #[must_use]
    pub const fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }
}

/// A command tagged with its lifecycle stage
///
/// Actions are immutable messages: they are built by the dispatcher (or by tests),
/// flow once through the reconciler, and are dropped. The constructors only allow
/// well-formed combinations: synchronous actions are always `Started`, and async
/// actions always carry a transaction id.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize, C::Response: Serialize",
    deserialize = "C: Deserialize<'de>, C::Response: Deserialize<'de>"
))]
pub struct Action<C: Command> {
    command: C,
    phase: Phase<C::Response>,
    meta: Meta,
}

impl<C: Command> Action<C> {
    /// A synchronous action, committed as soon as it is applied
    #[must_use]
    pub const fn sync(command: C) -> Self {
        Self {
            command,
            phase: Phase::Started,
            meta: Meta {
                transaction_id: None,
            },
        }
    }

    /// The optimistic start of an async operation
    #[must_use]
    pub const fn started(command: C, transaction_id: TransactionId) -> Self {
        Self {
            command,
            phase: Phase::Started,
            meta: Meta {
                transaction_id: Some(transaction_id),
            },
        }
    }

    /// Successful resolution of an async operation
    #[must_use]
    pub const fn succeeded(command: C, transaction_id: TransactionId, response: C::Response) -> Self {
        Self {
            command,
            phase: Phase::Succeeded(response),
            meta: Meta {
                transaction_id: Some(transaction_id),
            },
        }
    }

    /// Failed resolution of an async operation
    ///
    /// `command` is the base command that caused the failure and is reported back
    /// through [`Action::cause_action`].
    #[must_use]
    pub const fn failed(command: C, transaction_id: TransactionId, error: DispatchError) -> Self {
        Self {
            command,
            phase: Phase::Failed(error),
            meta: Meta {
                transaction_id: Some(transaction_id),
            },
        }
    }

    /// The command this action is about
    #[must_use]
    pub const fn command(&self) -> &C {
        &self.command
    }

    /// Stable kind of the underlying command
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.command.kind()
    }

    /// Lifecycle stage and its payload
    #[must_use]
    pub const fn phase(&self) -> &Phase<C::Response> {
        &self.phase
    }

    /// Transaction metadata
    #[must_use]
    pub const fn meta(&self) -> &Meta {
        &self.meta
    }

    /// The transaction this action belongs to, if async
    #[must_use]
    pub const fn transaction_id(&self) -> Option<TransactionId> {
        self.meta.transaction_id
    }

    /// Whether the action belongs to a multi-phase operation
    #[must_use]
    pub const fn is_async(&self) -> bool {
        self.meta.is_async()
    }

    /// Whether this is a start (sync or async)
    #[must_use]
    pub const fn is_started(&self) -> bool {
        matches!(self.phase, Phase::Started)
    }

    /// Whether this is a successful resolution
    #[must_use]
    pub const fn is_succeeded(&self) -> bool {
        matches!(self.phase, Phase::Succeeded(_))
    }

    /// Whether this is a failed resolution
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.phase, Phase::Failed(_))
    }

    /// The authoritative result, for succeeded actions
    #[must_use]
    pub const fn response(&self) -> Option<&C::Response> {
        match &self.phase {
            Phase::Succeeded(response) => Some(response),
            _ => None,
        }
    }

    /// The failure, for failed actions
    #[must_use]
    pub const fn error(&self) -> Option<&DispatchError> {
        match &self.phase {
            Phase::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// The base command that triggered a failure
    ///
    /// Only failed actions have a cause.
    #[must_use]
    pub const fn cause_action(&self) -> Option<&C> {
        match self.phase {
            Phase::Failed(_) => Some(&self.command),
            _ => None,
        }
    }

    /// Started action of the given kind
    #[must_use]
    pub fn is_start_of(&self, kind: &str) -> bool {
        self.is_started() && self.kind() == kind
    }

    /// Succeeded action of the given kind
    #[must_use]
    pub fn is_success_of(&self, kind: &str) -> bool {
        self.is_succeeded() && self.kind() == kind
    }

    /// Failed action of the given kind
    #[must_use]
    pub fn is_failure_of(&self, kind: &str) -> bool {
        self.is_failed() && self.kind() == kind
    }

    /// Split into command, phase and metadata
    #[must_use]
    pub fn into_parts(self) -> (C, Phase<C::Response>, Meta) {
        (self.command, self.phase, self.meta)
    }
}

impl<C> PartialEq for Action<C>
where
    C: Command + PartialEq,
    C::Response: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.command == other.command && self.phase == other.phase && self.meta == other.meta
    }
}

impl<C: Command> fmt::Display for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.phase.name())?;
        if let Some(id) = self.meta.transaction_id {
            write!(f, " ({id})")?;
        }
        Ok(())
    }
}
