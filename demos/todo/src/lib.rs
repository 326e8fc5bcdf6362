//! Todo demo for optimistic state updates.
//!
//! A todo list whose inserts, deletes and toggles show up immediately and are
//! rolled back if the backend rejects them. It demonstrates:
//!
//! - A command enum with `#[derive(Command)]` and a [`Remote`](optimistic_runtime::Remote) encoding
//! - Slice reducers composed with `scope_reducer` / `combine_reducers`
//! - Sync commands (filter, clear error) next to async ones
//! - An in-memory backend ([`RecordStore`]) with an error mode for trying rollbacks
//! - Testing with `ReducerTest`
//!
//! # Quick Start
//!
//! ```no_run
//! use optimistic_runtime::Store;
//! use todo::{RecordStore, TodoCommand, TodoState, api, app_reducer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::new(TodoState::default(), app_reducer());
//! let dispatcher = store.dispatcher(api::registry(api::DEFAULT_API_URL), RecordStore::new());
//!
//! dispatcher.dispatch_and_settle(TodoCommand::LoadTodos).await?;
//!
//! // Visible before the backend answers
//! dispatcher.dispatch(TodoCommand::InsertTodo { text: "Buy milk".to_string() })?;
//!
//! store.settle().await?;
//! println!("Todos: {}", store.state(|s| s.todos.len()).await);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod record_store;
pub mod reducer;
pub mod types;

// Re-export commonly used types
pub use config::TodoConfig;
pub use record_store::RecordStore;
pub use reducer::{FilterReducer, TodosReducer, UiReducer, app_reducer};
pub use types::{Filter, PLACEHOLDER_ID, Todo, TodoCommand, TodoResponse, TodoState, UiError, UiState};
