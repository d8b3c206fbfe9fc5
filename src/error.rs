use thiserror::Error;

use crate::models::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("order {order_id} is {actual:?}, expected {expected:?}")]
    InvalidState {
        order_id: String,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("carrier {carrier_id} already holds {capacity} orders")]
    CapacityExceeded { carrier_id: String, capacity: usize },

    #[error("carrier {carrier_id} is already carrying order {order_id}")]
    AlreadyBusy { carrier_id: String, order_id: String },

    #[error("carrier {carrier_id} is not eligible for order {order_id}")]
    NotEligible { carrier_id: String, order_id: String },

    #[error("order {order_id} is not held by carrier {carrier_id}")]
    NotAssigned { carrier_id: String, order_id: String },

    #[error("carrier {carrier_id} has no positive average speed")]
    DivisionByZero { carrier_id: String },

    #[error("carrier {carrier_id} has no order in progress")]
    Idle { carrier_id: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid carrier {carrier_id}: {reason}")]
    InvalidCarrier { carrier_id: String, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}
