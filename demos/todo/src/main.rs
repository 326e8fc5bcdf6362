//! Simple CLI demo for the todo example.
//!
//! Walks through an optimistic insert, a toggle, a filter change, and a
//! rolled-back insert while the backend is in error mode. Runs against the
//! in-memory [`RecordStore`] unless `OPTIMISTIC_API_URL` points at a real
//! backend.

use anyhow::Context;
use optimistic_core::reducer::Reducer;
use optimistic_runtime::metrics::MetricsServer;
use optimistic_runtime::{Dispatcher, HttpTransport, Store, Transport};
use todo::{Filter, RecordStore, TodoCommand, TodoConfig, TodoState, api, app_reducer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("todo=debug,optimistic_runtime=debug,optimistic_core=debug")
        }))
        .init();

    let config = TodoConfig::from_env();
    tracing::info!(?config, "Starting todo demo");

    let mut metrics = config.metrics_addr.map(MetricsServer::new);
    if let Some(server) = metrics.as_mut() {
        server.start().context("Failed to start metrics")?;
    }

    let store = Store::new(TodoState::default(), app_reducer());
    let registry = api::registry(config.api_url());

    if config.uses_http() {
        let dispatcher =
            store.dispatcher_with_config(registry, HttpTransport::new(), config.dispatcher.clone());
        run(&store, &dispatcher).await?;
    } else {
        let backend = RecordStore::new()
            .with_latency(config.latency)
            .with_error_mode(config.error_mode);
        let dispatcher =
            store.dispatcher_with_config(registry, backend.clone(), config.dispatcher.clone());
        run(&store, &dispatcher).await?;
        tracing::info!(stored = backend.todos().len(), "Backend records");
    }

    if let Some(rendered) = metrics.as_ref().and_then(MetricsServer::render) {
        println!("\n=== Metrics ===\n{rendered}");
    }

    Ok(())
}

async fn run<R, T>(store: &Store<R>, dispatcher: &Dispatcher<TodoCommand, T>) -> anyhow::Result<()>
where
    R: Reducer<State = TodoState, Command = TodoCommand> + Send + Sync + 'static,
    T: Transport,
{
    println!("=== Todo Example ===\n");

    dispatcher.dispatch_and_settle(TodoCommand::LoadTodos).await?;
    print_todos("Loaded", store).await;

    // The placeholder shows before the backend answers
    let insert = dispatcher.dispatch(TodoCommand::InsertTodo {
        text: "Buy milk".to_string(),
    })?;
    store.settle().await?;
    print_todos("Inserting 'Buy milk' (optimistic)", store).await;
    insert.resolved().await;
    store.settle().await?;
    print_todos("Insert confirmed", store).await;

    let first = store.state(|s| s.todos.first().map(|todo| todo.id)).await;
    if let Some(id) = first {
        dispatcher
            .dispatch_and_settle(TodoCommand::ToggleCompleted { id })
            .await?;
        print_todos("Toggled the first todo", store).await;
    }

    dispatcher
        .dispatch_and_settle(TodoCommand::SetFilter {
            filter: Filter::Active,
        })
        .await?;
    print_todos("Filter: active", store).await;
    dispatcher
        .dispatch_and_settle(TodoCommand::SetFilter { filter: Filter::All })
        .await?;

    // With error mode on, the insert is shown, then rolled back
    let error_mode = store.state(|s| s.ui.error_mode).await;
    if !error_mode {
        dispatcher.dispatch_and_settle(TodoCommand::ToggleErrorMode).await?;
    }
    let doomed = dispatcher.dispatch(TodoCommand::InsertTodo {
        text: "Deploy on Friday".to_string(),
    })?;
    store.settle().await?;
    print_todos("Inserting 'Deploy on Friday' (optimistic)", store).await;
    doomed.resolved().await;
    store.settle().await?;
    print_todos("Insert rolled back", store).await;

    if let Some(error) = store.state(|s| s.ui.error.clone()).await {
        println!("  error: {} (cause: {:?})", error.error, error.cause);
    }
    dispatcher.dispatch_and_settle(TodoCommand::ClearError).await?;
    dispatcher.dispatch_and_settle(TodoCommand::ToggleErrorMode).await?;

    let pending = store.pending_transactions().await;
    println!("\nPending transactions: {}", pending.len());
    Ok(())
}

async fn print_todos<R>(title: &str, store: &Store<R>)
where
    R: Reducer<State = TodoState, Command = TodoCommand> + Send + Sync + 'static,
{
    let state = store.state(Clone::clone).await;
    println!("{title}:");
    for todo in state.visible_todos() {
        let status = if todo.completed { "✓" } else { " " };
        let id = if todo.is_placeholder() {
            "…".to_string()
        } else {
            todo.id.to_string()
        };
        println!("  [{status}] {id:>3} {}", todo.text);
    }
    println!(
        "  completed: {}/{}  loading: {}\n",
        state.completed_count(),
        state.todos.len(),
        state.ui.is_loading
    );
}
