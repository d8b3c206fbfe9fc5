use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::carrier::{delivery_distance, travel_time, CarrierProfile};
use crate::models::order::{Order, OrderStatus};

/// An unpaid carrier serving one order at a time inside a radius of home.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolunteerCarrier {
    #[serde(flatten)]
    pub profile: CarrierProfile,
    pub service_radius_km: f64,
    pub average_speed_kmh: f64,
    #[serde(default)]
    picked_up_at: Option<DateTime<Utc>>,
    #[serde(default)]
    current: Option<Order>,
}

impl VolunteerCarrier {
    pub fn new(profile: CarrierProfile, service_radius_km: f64, average_speed_kmh: f64) -> Self {
        Self {
            profile,
            service_radius_km,
            average_speed_kmh,
            picked_up_at: None,
            current: None,
        }
    }

    /// Both the store and the customer must lie inside the service radius.
    pub fn within_radius(&self, store: &GeoPoint, customer: &GeoPoint) -> bool {
        let home = &self.profile.home;
        home.distance_to(store) <= self.service_radius_km
            && home.distance_to(customer) <= self.service_radius_km
    }

    pub fn delivery_distance(&self, store: &GeoPoint, customer: &GeoPoint) -> f64 {
        delivery_distance(&self.profile.home, store, customer)
    }

    pub fn delivery_price(&self, _store: &GeoPoint, _customer: &GeoPoint) -> f64 {
        0.0
    }

    pub fn accept_order(&mut self, order: &Order, now: DateTime<Utc>) -> Result<(), DispatchError> {
        if let Some(current) = &self.current {
            return Err(DispatchError::AlreadyBusy {
                carrier_id: self.profile.id.clone(),
                order_id: current.id.clone(),
            });
        }

        let mut accepted = order.clone();
        accepted.start_transit(&self.profile.id)?;

        self.picked_up_at = Some(now);
        self.current = Some(accepted);
        self.profile.set_free(false);
        Ok(())
    }

    /// Whole minutes since pickup; `None` while idle.
    pub fn elapsed_service_time(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.current.is_none() {
            return None;
        }
        let picked_up_at = self.picked_up_at?;
        Some(Duration::minutes((now - picked_up_at).num_minutes()))
    }

    pub fn travel_time_to_store(&self, store: &GeoPoint) -> Result<Duration, DispatchError> {
        travel_time(
            &self.profile.id,
            self.profile.home.distance_to(store),
            self.average_speed_kmh,
        )
    }

    pub fn travel_time_store_to_customer(
        &self,
        store: &GeoPoint,
        customer: &GeoPoint,
    ) -> Result<Duration, DispatchError> {
        travel_time(
            &self.profile.id,
            store.distance_to(customer),
            self.average_speed_kmh,
        )
    }

    /// Hands back the delivered order; archiving it is up to the caller.
    pub fn complete_delivery(&mut self) -> Result<Order, DispatchError> {
        let mut delivered = self.current.take().ok_or_else(|| DispatchError::Idle {
            carrier_id: self.profile.id.clone(),
        })?;

        delivered.status = OrderStatus::Delivered;
        self.picked_up_at = None;
        self.profile.set_free(true);
        Ok(delivered)
    }

    pub fn current_order(&self) -> Option<&Order> {
        self.current.as_ref()
    }

    pub fn picked_up_at(&self) -> Option<DateTime<Utc>> {
        self.picked_up_at
    }
}
