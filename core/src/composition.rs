//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers in various ways:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a reducer on a subset of state
//! - **`reducer_fn`**: Turn a closure into a reducer
//!
//! A typical application splits its domain into slices (a list of items, UI
//! flags, a filter) with one reducer each, scopes every slice reducer onto its
//! field of the root state, and combines the scoped reducers into the root
//! reducer handed to the reconciler.

use crate::action::{Action, Command};
use crate::reducer::Reducer;
use std::marker::PhantomData;

/// Combines multiple reducers that operate on the same state and command types.
///
/// Each reducer is run in sequence, in the order given.
///
/// # Examples
///
/// ```
/// use optimistic_core::action::{Action, Command};
/// use optimistic_core::composition::{combine_reducers, reducer_fn};
///
/// #[derive(Clone, Debug)]
/// struct Bump;
///
/// impl Command for Bump {
///     type Response = ();
///     fn kind(&self) -> &'static str {
///         "BUMP"
///     }
/// }
///
/// #[derive(Default)]
/// struct Counters {
///     started: u32,
///     seen: u32,
/// }
///
/// let combined = combine_reducers(vec![
///     Box::new(reducer_fn(|state: &mut Counters, action: &Action<Bump>| {
///         if action.is_started() {
///             state.started += 1;
///         }
///     })),
///     Box::new(reducer_fn(|state: &mut Counters, _action: &Action<Bump>| state.seen += 1)),
/// ]);
///
/// use optimistic_core::reducer::Reducer;
/// let mut state = Counters::default();
/// combined.reduce(&mut state, &Action::sync(Bump));
/// assert_eq!((state.started, state.seen), (1, 1));
/// ```
#[must_use]
pub fn combine_reducers<S, C>(
    reducers: Vec<Box<dyn Reducer<State = S, Command = C> + Send + Sync>>,
) -> CombinedReducer<S, C>
where
    S: 'static,
    C: Command,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, C>
where
    S: 'static,
    C: Command,
{
    reducers: Vec<Box<dyn Reducer<State = S, Command = C> + Send + Sync>>,
}

impl<S, C> Reducer for CombinedReducer<S, C>
where
    S: 'static,
    C: Command,
{
    type State = S;
    type Command = C;

    fn reduce(&self, state: &mut Self::State, action: &Action<Self::Command>) {
        for reducer in &self.reducers {
            reducer.reduce(state, action);
        }
    }
}

/// Scopes a reducer to operate on a subset of a larger state.
///
/// This allows you to reuse reducers designed for smaller state types
/// within a larger application state.
///
/// # Examples
///
/// ```
/// use optimistic_core::action::{Action, Command};
/// use optimistic_core::composition::{reducer_fn, scope_reducer};
/// use optimistic_core::reducer::Reducer;
///
/// #[derive(Clone, Debug)]
/// struct Push(u8);
///
/// impl Command for Push {
///     type Response = ();
///     fn kind(&self) -> &'static str {
///         "PUSH"
///     }
/// }
///
/// #[derive(Default)]
/// struct AppState {
///     items: Vec<u8>,
///     title: String,
/// }
///
/// let items = reducer_fn(|items: &mut Vec<u8>, action: &Action<Push>| items.push(action.command().0));
/// let scoped = scope_reducer(items, |app: &mut AppState| &mut app.items);
///
/// let mut state = AppState::default();
/// scoped.reduce(&mut state, &Action::sync(Push(3)));
/// assert_eq!(state.items, vec![3]);
/// assert!(state.title.is_empty());
/// ```
pub fn scope_reducer<S, SubS, R>(reducer: R, lens: fn(&mut S) -> &mut SubS) -> ScopedReducer<S, SubS, R>
where
    R: Reducer<State = SubS>,
{
    ScopedReducer {
        reducer,
        lens,
        _phantom: PhantomData,
    }
}

/// A scoped reducer that operates on a subset of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, R>
where
    R: Reducer<State = SubS>,
{
    reducer: R,
    lens: fn(&mut S) -> &mut SubS,
    _phantom: PhantomData<fn(&mut S)>,
}

impl<S, SubS, R> Reducer for ScopedReducer<S, SubS, R>
where
    R: Reducer<State = SubS>,
{
    type State = S;
    type Command = R::Command;

    fn reduce(&self, state: &mut Self::State, action: &Action<Self::Command>) {
        self.reducer.reduce((self.lens)(state), action);
    }
}

/// Turns a closure into a reducer.
///
/// Handy for small slices of state and for tests.
pub fn reducer_fn<S, C, F>(f: F) -> FnReducer<S, C, F>
where
    C: Command,
    F: Fn(&mut S, &Action<C>),
{
    FnReducer {
        f,
        _phantom: PhantomData,
    }
}

/// A reducer backed by a closure.
///
/// Created by [`reducer_fn`].
pub struct FnReducer<S, C, F> {
    f: F,
    _phantom: PhantomData<fn(&mut S, &C)>,
}

impl<S, C, F> Reducer for FnReducer<S, C, F>
where
    C: Command,
    F: Fn(&mut S, &Action<C>),
{
    type State = S;
    type Command = C;

    fn reduce(&self, state: &mut Self::State, action: &Action<Self::Command>) {
        (self.f)(state, action);
    }
}
