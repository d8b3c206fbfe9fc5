use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::DispatchError;
use crate::models::assignment::AssignmentResult;
use crate::models::order::Order;
use crate::state::DispatchState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Assigned(AssignmentResult),
    Unassigned { order_id: String, reason: String },
}

/// Single dispatch loop: one order at a time, in arrival order.
pub async fn run_dispatch_loop(state: Arc<DispatchState>, mut order_rx: mpsc::Receiver<Order>) {
    info!("dispatch loop started");

    while let Some(order) = order_rx.recv().await {
        let metrics = state.engine.metrics();
        metrics.orders_in_queue.dec();

        let start = Instant::now();
        let (outcome, label) = match dispatch_order(&state, &order) {
            Ok(result) => (DispatchOutcome::Assigned(result), "success"),
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "order left unassigned");
                metrics
                    .assignments_total
                    .with_label_values(&["unassigned"])
                    .inc();
                let outcome = DispatchOutcome::Unassigned {
                    order_id: order.id.clone(),
                    reason: err.to_string(),
                };
                (outcome, "unassigned")
            }
        };

        metrics
            .assignment_latency_seconds
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        let _ = state.outcome_tx.send(outcome);
    }

    warn!("dispatch loop stopped: queue channel closed");
}

/// Walks the ranked candidates and takes the first one that still accepts.
/// A candidate that went stale is skipped; any other failure ends the attempt.
fn dispatch_order(state: &DispatchState, order: &Order) -> Result<AssignmentResult, DispatchError> {
    let candidates = state.engine.eligible_carriers(order);

    for candidate in &candidates {
        match state.engine.assign(order, candidate.id()) {
            Ok(result) => return Ok(result),
            Err(DispatchError::NotEligible { carrier_id, .. }) => {
                warn!(order_id = %order.id, carrier_id = %carrier_id, "candidate went stale");
            }
            Err(err) => return Err(err),
        }
    }

    Err(DispatchError::NotFound(format!(
        "eligible carrier for order {}",
        order.id
    )))
}
