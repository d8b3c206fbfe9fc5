use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use carrier_dispatch::config::Config;
use carrier_dispatch::engine::dispatcher::DispatchEngine;
use carrier_dispatch::engine::queue::enqueue_order;
use carrier_dispatch::engine::runner::run_dispatch_loop;
use carrier_dispatch::error::DispatchError;
use carrier_dispatch::fixture::Fixture;
use carrier_dispatch::state::DispatchState;

#[tokio::main]
async fn main() -> Result<(), DispatchError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let Some(fixture_path) = config.fixture_path.as_deref() else {
        tracing::warn!("DISPATCH_FIXTURE is not set; nothing to dispatch");
        return Ok(());
    };
    let fixture = Fixture::load(fixture_path)?;

    let engine = DispatchEngine::with_system_clock();
    for carrier in fixture.carriers {
        engine.register_carrier(carrier)?;
    }

    let (state, order_rx) =
        DispatchState::new(engine, config.order_queue_size, config.event_buffer_size);
    let shared_state = Arc::new(state);
    let mut outcomes = shared_state.outcome_tx.subscribe();

    let dispatch_loop = tokio::spawn(run_dispatch_loop(shared_state.clone(), order_rx));

    let expected = fixture.orders.len();
    tracing::info!(orders = expected, "dispatching fixture orders");
    for order in fixture.orders {
        enqueue_order(&shared_state, order).await?;
    }

    let mut received = 0;
    while received < expected {
        match outcomes.recv().await {
            Ok(outcome) => {
                received += 1;
                println!("{}", to_json(&outcome)?);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "outcome stream lagged");
                received += skipped as usize;
            }
            Err(RecvError::Closed) => break,
        }
    }
    dispatch_loop.abort();

    for carrier in shared_state.engine.carriers() {
        println!("{}", to_json(&carrier)?);
    }

    match shared_state.engine.metrics().encode() {
        Ok(text) => tracing::debug!(metrics = %text, "final metrics"),
        Err(err) => tracing::error!(error = %err, "failed to encode metrics"),
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DispatchError> {
    serde_json::to_string(value)
        .map_err(|err| DispatchError::Internal(format!("failed to serialize output: {err}")))
}
