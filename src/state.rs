use tokio::sync::{broadcast, mpsc};

use crate::engine::dispatcher::DispatchEngine;
use crate::engine::runner::DispatchOutcome;
use crate::models::order::Order;

pub struct DispatchState {
    pub engine: DispatchEngine,
    pub order_tx: mpsc::Sender<Order>,
    pub outcome_tx: broadcast::Sender<DispatchOutcome>,
}

impl DispatchState {
    pub fn new(
        engine: DispatchEngine,
        order_queue_size: usize,
        event_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<Order>) {
        let (order_tx, order_rx) = mpsc::channel(order_queue_size);
        let (outcome_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        (
            Self {
                engine,
                order_tx,
                outcome_tx,
            },
            order_rx,
        )
    }
}
