//! Reducers for the Todo demo.
//!
//! Each slice reducer reacts only to the lifecycle phases it cares about and
//! knows nothing about transactions; rollback and replay are the reconciler's
//! job. [`app_reducer`] scopes the slices onto [`TodoState`] and combines them.

use crate::types::{Filter, Todo, TodoCommand, TodoResponse, TodoState, UiError, UiState};
use optimistic_core::composition::{CombinedReducer, combine_reducers, scope_reducer};
use optimistic_core::{Action, Phase, Reducer};

/// The todo list slice
#[derive(Clone, Copy, Debug, Default)]
pub struct TodosReducer;

impl Reducer for TodosReducer {
    type State = Vec<Todo>;
    type Command = TodoCommand;

    fn reduce(&self, todos: &mut Vec<Todo>, action: &Action<TodoCommand>) {
        match (action.command(), action.phase()) {
            (TodoCommand::LoadTodos, Phase::Succeeded(TodoResponse::Todos(loaded))) => {
                todos.clone_from(loaded);
            }
            (TodoCommand::InsertTodo { text }, Phase::Started) => {
                todos.push(Todo::placeholder(text.as_str()));
            }
            (TodoCommand::InsertTodo { .. }, Phase::Succeeded(TodoResponse::Created(id))) => {
                // Oldest placeholder first: replay keeps inserts in start order
                if let Some(todo) = todos.iter_mut().find(|todo| todo.is_placeholder()) {
                    todo.id = *id;
                }
            }
            (TodoCommand::DeleteTodo { id }, Phase::Started) => {
                todos.retain(|todo| todo.id != *id);
            }
            (TodoCommand::ToggleCompleted { id }, Phase::Started) => {
                if let Some(todo) = todos.iter_mut().find(|todo| todo.id == *id) {
                    todo.completed = !todo.completed;
                }
            }
            _ => {}
        }
    }
}

/// The UI flags slice
#[derive(Clone, Copy, Debug, Default)]
pub struct UiReducer;

impl Reducer for UiReducer {
    type State = UiState;
    type Command = TodoCommand;

    fn reduce(&self, ui: &mut UiState, action: &Action<TodoCommand>) {
        if action.is_async() {
            if action.is_started() {
                ui.in_flight.push(action.kind());
            } else if let Some(index) = ui.in_flight.iter().position(|kind| *kind == action.kind())
            {
                ui.in_flight.remove(index);
            }
        }

        if let (Some(error), Some(cause)) = (action.error(), action.cause_action()) {
            ui.error = Some(UiError {
                error: error.clone(),
                cause: cause.clone(),
            });
        }

        match (action.command(), action.phase()) {
            (TodoCommand::LoadTodos, Phase::Succeeded(_)) => ui.initial_load = false,
            (TodoCommand::ClearError, Phase::Started) => ui.error = None,
            (TodoCommand::ToggleErrorMode, Phase::Started) => ui.error_mode = !ui.error_mode,
            (TodoCommand::ToggleErrorMode, Phase::Succeeded(TodoResponse::ErrorMode(on))) => {
                ui.error_mode = *on;
            }
            _ => {}
        }

        ui.is_loading = !ui.in_flight.is_empty();
    }
}

/// The visibility filter slice
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterReducer;

impl Reducer for FilterReducer {
    type State = Filter;
    type Command = TodoCommand;

    fn reduce(&self, filter: &mut Filter, action: &Action<TodoCommand>) {
        if let (TodoCommand::SetFilter { filter: next }, true) = (action.command(), action.is_started()) {
            *filter = *next;
        }
    }
}

fn todos(state: &mut TodoState) -> &mut Vec<Todo> {
    &mut state.todos
}

fn ui(state: &mut TodoState) -> &mut UiState {
    &mut state.ui
}

fn filter(state: &mut TodoState) -> &mut Filter {
    &mut state.filter
}

/// Root reducer for [`TodoState`]
#[must_use]
pub fn app_reducer() -> CombinedReducer<TodoState, TodoCommand> {
    combine_reducers(vec![
        Box::new(scope_reducer(TodosReducer, todos)),
        Box::new(scope_reducer(UiReducer, ui)),
        Box::new(scope_reducer(FilterReducer, filter)),
    ])
}
