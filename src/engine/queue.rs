use crate::error::DispatchError;
use crate::models::order::{Order, OrderStatus};
use crate::state::DispatchState;

pub async fn enqueue_order(state: &DispatchState, order: Order) -> Result<(), DispatchError> {
    order.ensure_status(OrderStatus::Pending)?;

    state
        .order_tx
        .send(order)
        .await
        .map_err(|err| DispatchError::Internal(format!("order queue send failed: {err}")))?;

    state.engine.metrics().orders_in_queue.inc();
    Ok(())
}
