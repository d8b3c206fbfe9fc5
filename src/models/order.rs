use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    #[default]
    Pending,
    InTransit,
    Delivered,
}

/// A parcel moving from a store to a customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub store: GeoPoint,
    pub customer: GeoPoint,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub assigned_carrier: Option<String>,
}

impl Order {
    pub fn new(id: impl Into<String>, store: GeoPoint, customer: GeoPoint) -> Self {
        Self {
            id: id.into(),
            store,
            customer,
            status: OrderStatus::Pending,
            assigned_carrier: None,
        }
    }

    pub fn ensure_status(&self, expected: OrderStatus) -> Result<(), DispatchError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(DispatchError::InvalidState {
                order_id: self.id.clone(),
                expected,
                actual: self.status,
            })
        }
    }

    /// `Pending -> InTransit`, recording the carrier that picked it up.
    pub fn start_transit(&mut self, carrier_id: &str) -> Result<(), DispatchError> {
        self.ensure_status(OrderStatus::Pending)?;
        self.status = OrderStatus::InTransit;
        self.assigned_carrier = Some(carrier_id.to_string());
        Ok(())
    }

    /// `InTransit -> Delivered`.
    pub fn mark_delivered(&mut self) -> Result<(), DispatchError> {
        self.ensure_status(OrderStatus::InTransit)?;
        self.status = OrderStatus::Delivered;
        Ok(())
    }
}
