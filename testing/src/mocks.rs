//! Mock transports
//!
//! [`MockTransport`] records every request. In auto mode it answers
//! immediately from a script; in manual mode every call stays in flight until
//! the test resolves it, so tests choose the order in which transactions
//! resolve.

use futures::future::BoxFuture;
use optimistic_core::DispatchError;
use optimistic_runtime::{Request, Transport};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, oneshot};

type Reply = Result<Value, DispatchError>;

#[derive(Default)]
struct Inner {
    manual: bool,
    script: VecDeque<Reply>,
    fallback: Option<Reply>,
    requests: Vec<Request>,
    parked: Vec<Option<oneshot::Sender<Reply>>>,
}

/// Transport double with scripted or manually resolved replies
///
/// Clones share state, so a test keeps one clone and hands another to the
/// dispatcher.
///
/// # Example
///
/// ```
/// use optimistic_testing::mocks::MockTransport;
/// use serde_json::json;
///
/// let transport = MockTransport::new();
/// transport.push_response(Ok(json!("2")));
/// assert_eq!(transport.call_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
    calls: Arc<Notify>,
}

impl MockTransport {
    /// Auto mode: replies come from the script, then the fallback
    /// (`Ok(null)` unless set)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manual mode: every call waits for [`resolve`](Self::resolve)
    #[must_use]
    pub fn manual() -> Self {
        let transport = Self::default();
        transport.lock().manual = true;
        transport
    }

    /// Queue the reply for the next unanswered call (auto mode)
    pub fn push_response(&self, reply: Result<Value, DispatchError>) {
        self.lock().script.push_back(reply);
    }

    /// Reply used once the script is exhausted (auto mode)
    pub fn set_fallback(&self, reply: Result<Value, DispatchError>) {
        self.lock().fallback = Some(reply);
    }

    /// Resolve the `index`-th call (0-based, in call order) in manual mode
    ///
    /// Returns `false` if there is no such call, it was already resolved, or
    /// its dispatcher task is gone.
    pub fn resolve(&self, index: usize, reply: Result<Value, DispatchError>) -> bool {
        let sender = self
            .lock()
            .parked
            .get_mut(index)
            .and_then(Option::take);

        sender.is_some_and(|sender| sender.send(reply).is_ok())
    }

    /// Every request received so far, in call order
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    /// Number of calls received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Number of manual-mode calls still waiting for resolution
    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.lock().parked.iter().filter(|slot| slot.is_some()).count()
    }

    /// Wait until at least `count` calls have been received
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.calls.notified();
            if self.call_count() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Pending {
    Ready(Reply),
    Parked(oneshot::Receiver<Reply>),
}

impl Transport for MockTransport {
    fn call(&self, request: Request) -> BoxFuture<'static, Result<Value, DispatchError>> {
        let pending = {
            let mut inner = self.lock();
            inner.requests.push(request);

            if inner.manual {
                let (sender, receiver) = oneshot::channel();
                inner.parked.push(Some(sender));
                Pending::Parked(receiver)
            } else {
                let reply = match inner.script.pop_front() {
                    Some(reply) => reply,
                    None => inner.fallback.clone().unwrap_or(Ok(Value::Null)),
                };
                Pending::Ready(reply)
            }
        };
        self.calls.notify_waiters();

        Box::pin(async move {
            match pending {
                Pending::Ready(reply) => reply,
                Pending::Parked(receiver) => receiver.await.unwrap_or_else(|_| {
                    Err(DispatchError::Transport("mock call dropped".to_string()))
                }),
            }
        })
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("MockTransport")
            .field("manual", &inner.manual)
            .field("requests", &inner.requests.len())
            .field("scripted", &inner.script.len())
            .finish_non_exhaustive()
    }
}
