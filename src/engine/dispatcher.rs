use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::engine::ranking::find_eligible_carriers;
use crate::error::DispatchError;
use crate::models::assignment::AssignmentResult;
use crate::models::carrier::Carrier;
use crate::models::order::{Order, OrderStatus};
use crate::observability::metrics::Metrics;

/// Sole mutator of carrier state and owner of every order it has accepted.
///
/// `orders` keeps the engine's copy of each order from the moment a carrier
/// takes it: in transit while held, delivered afterwards. An order id already
/// in that map is never handed out again.
///
/// Lock order is `orders` entry, then carrier slot. `assign` holds both from
/// validation to mutation, so two callers can never both see a carrier free,
/// nor both hand out the same order. Every other path takes one lock at a
/// time. Eligibility queries only take read locks and work on snapshots.
pub struct DispatchEngine {
    carriers: DashMap<String, Carrier>,
    orders: DashMap<String, Order>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl DispatchEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            carriers: DashMap::new(),
            orders: DashMap::new(),
            clock,
            metrics: Metrics::new(),
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Adds a carrier snapshot. Orders it already carries become owned by the
    /// engine; an order id the engine already tracks is a conflict.
    pub fn register_carrier(&self, carrier: Carrier) -> Result<(), DispatchError> {
        let mut carrier = carrier;
        carrier.validate()?;
        let carrier_id = carrier.id().to_string();

        let held: Vec<Order> = carrier.in_progress().into_iter().cloned().collect();
        let mut claimed: Vec<String> = Vec::with_capacity(held.len());
        for order in held {
            match self.orders.entry(order.id.clone()) {
                Entry::Occupied(_) => {
                    self.release_orders(&claimed);
                    return Err(DispatchError::Conflict(format!(
                        "order {} is already tracked by the engine",
                        order.id
                    )));
                }
                Entry::Vacant(slot) => {
                    claimed.push(order.id.clone());
                    slot.insert(order);
                }
            }
        }

        match self.carriers.entry(carrier_id.clone()) {
            Entry::Occupied(_) => {
                self.release_orders(&claimed);
                Err(DispatchError::Conflict(format!(
                    "carrier {carrier_id} is already registered"
                )))
            }
            Entry::Vacant(slot) => {
                self.metrics
                    .carrier_utilization
                    .with_label_values(&[carrier_id.as_str()])
                    .set(carrier.utilization());
                info!(carrier_id = %carrier_id, kind = carrier.kind_label(), "carrier registered");
                slot.insert(carrier);
                Ok(())
            }
        }
    }

    fn release_orders(&self, order_ids: &[String]) {
        for order_id in order_ids {
            self.orders.remove(order_id);
        }
    }

    pub fn carrier(&self, carrier_id: &str) -> Option<Carrier> {
        self.carriers
            .get(carrier_id)
            .map(|entry| entry.value().clone())
    }

    /// Snapshots of every carrier, ordered by id.
    pub fn carriers(&self) -> Vec<Carrier> {
        let mut carriers: Vec<Carrier> = self
            .carriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        carriers.sort_by(|a, b| a.id().cmp(b.id()));
        carriers
    }

    /// The engine's copy of an order it has accepted.
    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|entry| entry.value().clone())
    }

    /// Ranked eligible carriers at the time of the call. The answer can go
    /// stale before `assign` runs; `assign` checks again.
    pub fn eligible_carriers(&self, order: &Order) -> Vec<Carrier> {
        let snapshot = self.carriers();
        find_eligible_carriers(order, &snapshot)
            .into_iter()
            .map(|candidate| candidate.carrier.clone())
            .collect()
    }

    pub fn assign(&self, order: &Order, carrier_id: &str) -> Result<AssignmentResult, DispatchError> {
        order.ensure_status(OrderStatus::Pending)?;

        let order_slot = match self.orders.entry(order.id.clone()) {
            Entry::Occupied(existing) => {
                let owned = existing.get();
                warn!(
                    order_id = %order.id,
                    held_by = ?owned.assigned_carrier,
                    "order already accepted"
                );
                return Err(DispatchError::InvalidState {
                    order_id: order.id.clone(),
                    expected: OrderStatus::Pending,
                    actual: owned.status,
                });
            }
            Entry::Vacant(slot) => slot,
        };

        let mut entry = self
            .carriers
            .get_mut(carrier_id)
            .ok_or_else(|| DispatchError::NotFound(format!("carrier {carrier_id}")))?;
        let carrier = entry.value_mut();

        if !carrier.is_eligible_for(order) {
            self.metrics
                .assignments_total
                .with_label_values(&["not_eligible"])
                .inc();
            warn!(order_id = %order.id, carrier_id = %carrier_id, "carrier no longer eligible");
            return Err(DispatchError::NotEligible {
                carrier_id: carrier_id.to_string(),
                order_id: order.id.clone(),
            });
        }

        let price = carrier.delivery_price(&order.store, &order.customer);
        let distance_km = carrier.delivery_distance(&order.store, &order.customer);
        let estimated_minutes = match carrier.estimated_duration(&order.store, &order.customer) {
            Ok(duration) => Some(duration.num_minutes()),
            Err(err) => {
                warn!(carrier_id = %carrier_id, error = %err, "no travel time estimate");
                None
            }
        };

        let mut owned = order.clone();
        owned.start_transit(carrier_id)?;

        let assigned_at = self.clock.now();
        carrier.accept_order(order, assigned_at)?;
        order_slot.insert(owned);

        self.metrics
            .carrier_utilization
            .with_label_values(&[carrier_id])
            .set(carrier.utilization());
        self.metrics
            .assignments_total
            .with_label_values(&["success"])
            .inc();
        drop(entry);

        info!(
            order_id = %order.id,
            carrier_id = %carrier_id,
            price,
            distance_km,
            "order assigned"
        );

        Ok(AssignmentResult {
            id: Uuid::new_v4(),
            order_id: order.id.clone(),
            carrier_id: carrier_id.to_string(),
            price,
            distance_km,
            estimated_minutes,
            assigned_at,
        })
    }

    /// Completes the carrier's in-progress work if it holds `order_id`.
    /// A commercial carrier delivers its whole batch.
    pub fn complete(&self, order_id: &str, carrier_id: &str) -> Result<Vec<Order>, DispatchError> {
        let mut entry = self
            .carriers
            .get_mut(carrier_id)
            .ok_or_else(|| DispatchError::NotFound(format!("carrier {carrier_id}")))?;
        let carrier = entry.value_mut();

        if !carrier.holds_order(order_id) {
            return Err(DispatchError::NotAssigned {
                carrier_id: carrier_id.to_string(),
                order_id: order_id.to_string(),
            });
        }

        let delivered = carrier.complete()?;

        self.metrics
            .deliveries_total
            .with_label_values(&[carrier.kind_label()])
            .inc_by(delivered.len() as u64);
        self.metrics
            .carrier_utilization
            .with_label_values(&[carrier_id])
            .set(carrier.utilization());
        drop(entry);

        for order in &delivered {
            self.orders.insert(order.id.clone(), order.clone());
        }

        info!(
            order_id = %order_id,
            carrier_id = %carrier_id,
            delivered = delivered.len(),
            "delivery completed"
        );

        Ok(delivered)
    }

    pub fn rate(&self, carrier_id: &str, score: i32) -> Result<(), DispatchError> {
        let mut entry = self
            .carriers
            .get_mut(carrier_id)
            .ok_or_else(|| DispatchError::NotFound(format!("carrier {carrier_id}")))?;
        entry.value_mut().add_rating(score);
        Ok(())
    }

    /// Carrier currently holding `order_id`, with the in-transit copy.
    pub fn locate_order(&self, order_id: &str) -> Option<(String, Order)> {
        let entry = self.orders.get(order_id)?;
        let order = entry.value();
        if order.status != OrderStatus::InTransit {
            return None;
        }
        order
            .assigned_carrier
            .clone()
            .map(|carrier_id| (carrier_id, order.clone()))
    }

    /// Minutes the volunteer has spent on its current order, per the engine clock.
    pub fn elapsed_service_minutes(&self, carrier_id: &str) -> Result<Option<i64>, DispatchError> {
        let entry = self
            .carriers
            .get(carrier_id)
            .ok_or_else(|| DispatchError::NotFound(format!("carrier {carrier_id}")))?;

        Ok(match entry.value() {
            Carrier::Volunteer(volunteer) => volunteer
                .elapsed_service_time(self.clock.now())
                .map(|elapsed| elapsed.num_minutes()),
            Carrier::Commercial(_) => None,
        })
    }
}
