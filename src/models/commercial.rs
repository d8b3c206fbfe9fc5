use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::carrier::{delivery_distance, travel_time, CarrierProfile};
use crate::models::order::{Order, OrderStatus};

/// A hauler charging a fixed rate per kilometre and picking up batches of
/// up to `pickup_capacity` orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommercialCarrier {
    #[serde(flatten)]
    pub profile: CarrierProfile,
    pub tax_id: String,
    pub rate_per_km: f64,
    pub pickup_capacity: usize,
    pub average_speed_kmh: f64,
    #[serde(default)]
    km_traveled: f64,
    #[serde(default)]
    next_pickup_at: Option<DateTime<Utc>>,
    #[serde(default)]
    in_progress: Vec<Order>,
    #[serde(default)]
    ledger: Vec<Order>,
}

impl CommercialCarrier {
    pub fn new(
        profile: CarrierProfile,
        tax_id: impl Into<String>,
        rate_per_km: f64,
        pickup_capacity: usize,
        average_speed_kmh: f64,
    ) -> Self {
        let mut profile = profile;
        profile.set_free(pickup_capacity > 0);

        Self {
            profile,
            tax_id: tax_id.into(),
            rate_per_km,
            pickup_capacity,
            average_speed_kmh,
            km_traveled: 0.0,
            next_pickup_at: None,
            in_progress: Vec::new(),
            ledger: Vec::new(),
        }
    }

    pub fn delivery_distance(&self, store: &GeoPoint, customer: &GeoPoint) -> f64 {
        delivery_distance(&self.profile.home, store, customer)
    }

    /// Quoting never touches carrier state, busy or not.
    pub fn delivery_price(&self, store: &GeoPoint, customer: &GeoPoint) -> f64 {
        self.price_for_distance(self.delivery_distance(store, customer))
    }

    pub fn price_for_distance(&self, distance_km: f64) -> f64 {
        self.rate_per_km * distance_km
    }

    pub fn estimated_duration(
        &self,
        store: &GeoPoint,
        customer: &GeoPoint,
    ) -> Result<Duration, DispatchError> {
        travel_time(
            &self.profile.id,
            self.delivery_distance(store, customer),
            self.average_speed_kmh,
        )
    }

    pub fn has_spare_capacity(&self) -> bool {
        self.in_progress.len() < self.pickup_capacity
    }

    pub fn accept_order(&mut self, order: &Order, now: DateTime<Utc>) -> Result<(), DispatchError> {
        if !self.has_spare_capacity() {
            return Err(DispatchError::CapacityExceeded {
                carrier_id: self.profile.id.clone(),
                capacity: self.pickup_capacity,
            });
        }

        let mut accepted = order.clone();
        accepted.start_transit(&self.profile.id)?;

        if self.in_progress.is_empty() {
            self.next_pickup_at = Some(now);
        }
        self.in_progress.push(accepted);
        if !self.has_spare_capacity() {
            self.profile.set_free(false);
        }

        Ok(())
    }

    /// Delivers the whole batch, archives it in the ledger and hands the
    /// caller its own copy.
    pub fn complete_deliveries(&mut self) -> Vec<Order> {
        let mut delivered = std::mem::take(&mut self.in_progress);

        for order in &mut delivered {
            let distance = self.delivery_distance(&order.store, &order.customer);
            self.km_traveled += distance;
            order.status = OrderStatus::Delivered;
        }

        self.ledger.extend(delivered.iter().cloned());
        self.next_pickup_at = None;
        self.profile.set_free(self.pickup_capacity > 0);

        delivered
    }

    pub fn in_progress(&self) -> &[Order] {
        &self.in_progress
    }

    pub fn ledger(&self) -> &[Order] {
        &self.ledger
    }

    pub fn km_traveled(&self) -> f64 {
        self.km_traveled
    }

    pub fn next_pickup_at(&self) -> Option<DateTime<Utc>> {
        self.next_pickup_at
    }
}
