//! In-memory todo backend
//!
//! [`RecordStore`] answers the same routes as the demo HTTP backend, so the
//! demo and its tests run without a server. It implements
//! [`Transport`] directly: requests never leave the process.
//!
//! | Route                | Answer                                 |
//! |----------------------|----------------------------------------|
//! | `GET /todos`         | the todo list                          |
//! | `POST /todos`        | new id, as text                        |
//! | `DELETE /todos/{id}` | `null`                                 |
//! | `PUT /todos/{id}`    | `null`, after toggling `completed`     |
//! | `PUT /errormode`     | the new error mode                     |
//!
//! While error mode is on, every `/todos` route answers with status 500.

use crate::types::Todo;
use futures::future::BoxFuture;
use optimistic_core::DispatchError;
use optimistic_runtime::{Method, Request, Transport};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const ERROR_MODE_BODY: &str = r#"{"error":"Throwing because errormode is on!"}"#;

#[derive(Debug)]
struct Records {
    todos: Vec<Todo>,
    last_id: i64,
    error_mode: bool,
}

/// In-memory backend implementing [`Transport`]
///
/// Clones share the same records.
#[derive(Clone, Debug)]
pub struct RecordStore {
    records: Arc<Mutex<Records>>,
    latency: Duration,
}

impl RecordStore {
    /// A backend seeded with one todo, "learn react"
    #[must_use]
    pub fn new() -> Self {
        Self::with_todos(vec![Todo {
            id: 1,
            text: "learn react".to_string(),
            completed: false,
        }])
    }

    /// A backend holding exactly `todos`; new ids continue after the largest
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let last_id = todos.iter().map(|todo| todo.id).max().unwrap_or(0);
        Self {
            records: Arc::new(Mutex::new(Records {
                todos,
                last_id,
                error_mode: false,
            })),
            latency: Duration::ZERO,
        }
    }

    /// Delay every answer by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Start with error mode switched on or off
    #[must_use]
    pub fn with_error_mode(self, on: bool) -> Self {
        self.lock().error_mode = on;
        self
    }

    /// Snapshot of the stored todos
    #[must_use]
    pub fn todos(&self) -> Vec<Todo> {
        self.lock().todos.clone()
    }

    /// Whether todo routes currently fail
    #[must_use]
    pub fn error_mode(&self) -> bool {
        self.lock().error_mode
    }

    fn lock(&self) -> MutexGuard<'_, Records> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, request: &Request) -> Result<Value, DispatchError> {
        let path = path_of(&request.url);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut records = self.lock();

        if segments.first() == Some(&"todos") && records.error_mode {
            tracing::debug!(method = %request.method, path, "Error mode on, failing request");
            return Err(DispatchError::Status {
                status: 500,
                body: ERROR_MODE_BODY.to_string(),
            });
        }

        match (request.method, segments.as_slice()) {
            (Method::Get, ["todos"]) => serde_json::to_value(&records.todos)
                .map_err(|e| DispatchError::Serialization(e.to_string())),
            (Method::Post, ["todos"]) => {
                let text = match &request.body {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                records.last_id += 1;
                let id = records.last_id;
                records.todos.push(Todo {
                    id,
                    text,
                    completed: false,
                });
                tracing::debug!(id, "Todo added");
                Ok(Value::String(id.to_string()))
            }
            (Method::Delete, ["todos", id]) => {
                let id = parse_id(id)?;
                records.todos.retain(|todo| todo.id != id);
                tracing::debug!(id, "Todo deleted");
                Ok(Value::Null)
            }
            (Method::Put, ["todos", id]) => {
                let id = parse_id(id)?;
                let todo = records
                    .todos
                    .iter_mut()
                    .find(|todo| todo.id == id)
                    .ok_or_else(|| not_found(path))?;
                todo.completed = !todo.completed;
                tracing::debug!(id, completed = todo.completed, "Todo updated");
                Ok(Value::Null)
            }
            (Method::Put, ["errormode"]) => {
                records.error_mode = !records.error_mode;
                tracing::info!(error_mode = records.error_mode, "Error mode toggled");
                Ok(Value::Bool(records.error_mode))
            }
            _ => Err(not_found(path)),
        }
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RecordStore {
    fn call(&self, request: Request) -> BoxFuture<'static, Result<Value, DispatchError>> {
        let backend = self.clone();
        Box::pin(async move {
            if !backend.latency.is_zero() {
                tokio::time::sleep(backend.latency).await;
            }
            backend.handle(&request)
        })
    }
}

/// `http://host:port/todos/1` -> `/todos/1`
fn path_of(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |index| &rest[index..]),
        None => url,
    }
}

fn parse_id(segment: &str) -> Result<i64, DispatchError> {
    segment.parse().map_err(|_| DispatchError::Status {
        status: 400,
        body: format!("invalid todo id {segment:?}"),
    })
}

fn not_found(path: &str) -> DispatchError {
    DispatchError::Status {
        status: 404,
        body: format!("no route or record for {path}"),
    }
}
