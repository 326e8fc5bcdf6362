//! Domain types for the Todo demo.
//!
//! The application state has three slices, each owned by one reducer: the todo
//! list, UI flags, and the visibility filter.

use optimistic_core::DispatchError;
use optimistic_macros::Command;
use serde::{Deserialize, Serialize};

/// Id given to an optimistically inserted todo until the server assigns one
pub const PLACEHOLDER_ID: i64 = -1;

/// A single todo item, as stored by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Server-assigned id, or [`PLACEHOLDER_ID`] while the insert is in flight
    pub id: i64,
    /// What needs to be done
    pub text: String,
    /// Whether the todo is done
    #[serde(default)]
    pub completed: bool,
}

impl Todo {
    /// A todo that has not been confirmed by the server yet
    #[must_use]
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self {
            id: PLACEHOLDER_ID,
            text: text.into(),
            completed: false,
        }
    }

    /// Whether this todo is still waiting for its server id
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }
}

/// Which todos the list shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Every todo
    #[default]
    All,
    /// Todos not yet completed
    Active,
    /// Completed todos
    Completed,
}

impl Filter {
    /// Whether `todo` passes this filter
    #[must_use]
    pub const fn shows(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }
}

/// The last failed operation, kept for display
#[derive(Clone, Debug, PartialEq)]
pub struct UiError {
    /// Why the operation failed
    pub error: DispatchError,
    /// The command whose transaction failed
    pub cause: TodoCommand,
}

/// UI flags derived from the action stream
#[derive(Clone, Debug, PartialEq)]
pub struct UiState {
    /// True until the first todo list has loaded
    pub initial_load: bool,
    /// True while any async operation is in flight
    pub is_loading: bool,
    /// Kinds of in-flight operations, one entry per transaction
    pub in_flight: Vec<&'static str>,
    /// Last failure, until cleared
    pub error: Option<UiError>,
    /// Whether the backend has been asked to fail every todo call
    pub error_mode: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            initial_load: true,
            is_loading: false,
            in_flight: Vec::new(),
            error: None,
            error_mode: false,
        }
    }
}

/// Root application state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TodoState {
    /// The todo list, in insertion order
    pub todos: Vec<Todo>,
    /// UI flags
    pub ui: UiState,
    /// Current visibility filter
    pub filter: Filter,
}

impl TodoState {
    /// Todos passing the current filter
    pub fn visible_todos(&self) -> impl Iterator<Item = &Todo> {
        self.todos.iter().filter(|todo| self.filter.shows(todo))
    }

    /// Returns a todo by id
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    /// Number of completed todos
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|todo| todo.completed).count()
    }
}

/// Everything the user can ask the application to do
///
/// Kinds with a registered endpoint (see [`crate::api::registry`]) run as async
/// transactions; `SetFilter` and `ClearError` are sync.
#[derive(Command, Clone, Debug, PartialEq)]
#[command(response = TodoResponse)]
pub enum TodoCommand {
    /// Fetch the full todo list
    LoadTodos,
    /// Create a todo
    InsertTodo {
        /// Text of the new todo
        text: String,
    },
    /// Remove a todo
    DeleteTodo {
        /// Todo to remove
        id: i64,
    },
    /// Flip a todo's `completed` flag
    ToggleCompleted {
        /// Todo to toggle
        id: i64,
    },
    /// Change the visibility filter
    SetFilter {
        /// New filter
        filter: Filter,
    },
    /// Dismiss the error panel
    ClearError,
    /// Ask the backend to start or stop failing todo calls
    ToggleErrorMode,
}

/// Decoded backend answers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoResponse {
    /// The full todo list
    Todos(Vec<Todo>),
    /// Id assigned to an inserted todo
    Created(i64),
    /// Backend error mode after toggling
    ErrorMode(bool),
    /// No content
    Done,
}
