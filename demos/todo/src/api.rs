//! Backend routing and wire encoding for [`TodoCommand`]

use crate::types::{Todo, TodoCommand, TodoResponse};
use optimistic_core::DispatchError;
use optimistic_runtime::transport::{from_body, to_payload};
use optimistic_runtime::{Method, Registry, Remote};
use serde_json::{Value, json};

/// Where the demo backend listens unless configured otherwise
pub const DEFAULT_API_URL: &str = "http://localhost:4000";

/// Endpoints for every async todo command
///
/// `SET_FILTER` and `CLEAR_ERROR` are deliberately absent, which makes them
/// sync.
#[must_use]
pub fn registry(api_url: &str) -> Registry {
    Registry::new()
        .with_prefix(api_url)
        .route("LOAD_TODOS", Method::Get, "/todos")
        .route("INSERT_TODO", Method::Post, "/todos/")
        .route("DELETE_TODO", Method::Delete, "/todos/{id}")
        .route("TOGGLE_COMPLETED", Method::Put, "/todos/{id}")
        .route("TOGGLE_ERROR_MODE", Method::Put, "/errormode")
}

impl Remote for TodoCommand {
    fn payload(&self) -> Result<Value, DispatchError> {
        match self {
            Self::LoadTodos | Self::ClearError | Self::ToggleErrorMode => Ok(Value::Null),
            Self::InsertTodo { text } => Ok(json!({ "text": text })),
            Self::DeleteTodo { id } | Self::ToggleCompleted { id } => Ok(json!({ "id": id })),
            Self::SetFilter { filter } => to_payload(filter),
        }
    }

    fn decode_response(&self, body: Value) -> Result<TodoResponse, DispatchError> {
        match self {
            Self::LoadTodos => from_body::<Vec<Todo>>(body).map(TodoResponse::Todos),
            Self::InsertTodo { .. } => created_id(&body).map(TodoResponse::Created),
            Self::ToggleErrorMode => from_body::<bool>(body).map(TodoResponse::ErrorMode),
            Self::DeleteTodo { .. }
            | Self::ToggleCompleted { .. }
            | Self::SetFilter { .. }
            | Self::ClearError => Ok(TodoResponse::Done),
        }
    }
}

/// The backend answers an insert with the new id as text
fn created_id(body: &Value) -> Result<i64, DispatchError> {
    match body {
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| DispatchError::Decode(format!("expected a todo id, got {text:?}"))),
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| DispatchError::Decode(format!("todo id out of range: {number}"))),
        other => Err(DispatchError::Decode(format!("expected a todo id, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use optimistic_core::Command;

    #[test]
    fn every_route_is_a_command_kind() {
        let registry = registry(DEFAULT_API_URL);
        assert_eq!(registry.len(), 5);

        for kind in TodoCommand::KINDS {
            let routed = registry.is_async(kind);
            let sync = matches!(*kind, "SET_FILTER" | "CLEAR_ERROR");
            assert_eq!(routed, !sync, "{kind}");
        }
    }

    #[test]
    fn insert_posts_bare_text() {
        let command = TodoCommand::InsertTodo {
            text: "milk".to_string(),
        };
        let endpoint = registry(DEFAULT_API_URL).endpoint(command.kind()).cloned().unwrap();
        let request = endpoint.request(&command.payload().unwrap()).unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "http://localhost:4000/todos/");
        assert_eq!(request.body, json!("milk"));
    }

    #[test]
    fn toggle_binds_id_into_url() {
        let command = TodoCommand::ToggleCompleted { id: 3 };
        let endpoint = registry(DEFAULT_API_URL).endpoint(command.kind()).cloned().unwrap();
        let request = endpoint.request(&command.payload().unwrap()).unwrap();

        assert_eq!(request.method, Method::Put);
        assert_eq!(request.url, "http://localhost:4000/todos/3");
    }

    #[test]
    fn decodes_backend_answers() {
        let insert = TodoCommand::InsertTodo {
            text: "milk".to_string(),
        };
        assert_eq!(
            insert.decode_response(json!("2")),
            Ok(TodoResponse::Created(2))
        );
        assert_eq!(insert.decode_response(json!(7)), Ok(TodoResponse::Created(7)));
        assert!(matches!(
            insert.decode_response(json!("two")),
            Err(DispatchError::Decode(_))
        ));

        assert_eq!(
            TodoCommand::LoadTodos.decode_response(json!([{ "id": 1, "text": "learn react", "completed": false }])),
            Ok(TodoResponse::Todos(vec![Todo {
                id: 1,
                text: "learn react".to_string(),
                completed: false,
            }]))
        );
        assert_eq!(
            TodoCommand::ToggleErrorMode.decode_response(json!(true)),
            Ok(TodoResponse::ErrorMode(true))
        );
        assert_eq!(
            TodoCommand::DeleteTodo { id: 1 }.decode_response(Value::Null),
            Ok(TodoResponse::Done)
        );
    }
}
