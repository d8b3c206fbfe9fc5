use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::geo::GeoPoint;
use crate::models::commercial::CommercialCarrier;
use crate::models::order::{Order, OrderStatus};
use crate::models::volunteer::VolunteerCarrier;

/// Fields shared by every kind of carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    credential_hash: String,
    pub home: GeoPoint,
    #[serde(default = "default_free")]
    free: bool,
    #[serde(default)]
    ratings: Vec<i32>,
}

fn default_free() -> bool {
    true
}

impl CarrierProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        credential_hash: impl Into<String>,
        home: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            credential_hash: credential_hash.into(),
            home,
            free: true,
            ratings: Vec::new(),
        }
    }

    pub fn credential_hash(&self) -> &str {
        &self.credential_hash
    }

    pub fn is_free(&self) -> bool {
        self.free
    }

    pub(crate) fn set_free(&mut self, free: bool) {
        self.free = free;
    }

    /// Scores are appended as given; range checks belong to the caller.
    pub fn add_rating(&mut self, score: i32) {
        self.ratings.push(score);
    }

    pub fn ratings(&self) -> &[i32] {
        &self.ratings
    }

    pub fn average_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        let total: i64 = self.ratings.iter().map(|&score| i64::from(score)).sum();
        Some(total as f64 / self.ratings.len() as f64)
    }
}

/// Home to store, then store to customer.
pub fn delivery_distance(home: &GeoPoint, store: &GeoPoint, customer: &GeoPoint) -> f64 {
    home.distance_to(store) + store.distance_to(customer)
}

/// Whole minutes needed to cover `distance_km` at `speed_kmh`.
pub(crate) fn travel_time(
    carrier_id: &str,
    distance_km: f64,
    speed_kmh: f64,
) -> Result<Duration, DispatchError> {
    if speed_kmh.is_nan() || speed_kmh <= 0.0 {
        return Err(DispatchError::DivisionByZero {
            carrier_id: carrier_id.to_string(),
        });
    }
    let minutes = (distance_km / speed_kmh * 60.0).trunc();
    if !minutes.is_finite() || minutes.abs() >= MAX_TRAVEL_MINUTES {
        return Err(travel_time_out_of_range(carrier_id));
    }
    Duration::try_minutes(minutes as i64).ok_or_else(|| travel_time_out_of_range(carrier_id))
}

// far below TimeDelta's limit, far above any real trip
const MAX_TRAVEL_MINUTES: f64 = 1e12;

fn travel_time_out_of_range(carrier_id: &str) -> DispatchError {
    DispatchError::Internal(format!(
        "travel time for carrier {carrier_id} is out of range"
    ))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Carrier {
    Commercial(CommercialCarrier),
    Volunteer(VolunteerCarrier),
}

impl Carrier {
    pub fn profile(&self) -> &CarrierProfile {
        match self {
            Carrier::Commercial(carrier) => &carrier.profile,
            Carrier::Volunteer(carrier) => &carrier.profile,
        }
    }

    fn profile_mut(&mut self) -> &mut CarrierProfile {
        match self {
            Carrier::Commercial(carrier) => &mut carrier.profile,
            Carrier::Volunteer(carrier) => &mut carrier.profile,
        }
    }

    pub fn id(&self) -> &str {
        &self.profile().id
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Carrier::Commercial(_) => "commercial",
            Carrier::Volunteer(_) => "volunteer",
        }
    }

    pub fn is_free(&self) -> bool {
        self.profile().is_free()
    }

    pub fn add_rating(&mut self, score: i32) {
        self.profile_mut().add_rating(score);
    }

    pub fn delivery_distance(&self, store: &GeoPoint, customer: &GeoPoint) -> f64 {
        match self {
            Carrier::Commercial(carrier) => carrier.delivery_distance(store, customer),
            Carrier::Volunteer(carrier) => carrier.delivery_distance(store, customer),
        }
    }

    pub fn delivery_price(&self, store: &GeoPoint, customer: &GeoPoint) -> f64 {
        match self {
            Carrier::Commercial(carrier) => carrier.delivery_price(store, customer),
            Carrier::Volunteer(carrier) => carrier.delivery_price(store, customer),
        }
    }

    pub fn estimated_duration(
        &self,
        store: &GeoPoint,
        customer: &GeoPoint,
    ) -> Result<Duration, DispatchError> {
        match self {
            Carrier::Commercial(carrier) => carrier.estimated_duration(store, customer),
            Carrier::Volunteer(carrier) => {
                let to_store = carrier.travel_time_to_store(store)?;
                let to_customer = carrier.travel_time_store_to_customer(store, customer)?;
                to_store
                    .checked_add(&to_customer)
                    .ok_or_else(|| travel_time_out_of_range(carrier.profile.id.as_str()))
            }
        }
    }

    /// Free, plus spare capacity for commercial carriers or both legs inside
    /// the service radius for volunteers.
    pub fn is_eligible_for(&self, order: &Order) -> bool {
        if !self.is_free() {
            return false;
        }
        match self {
            Carrier::Commercial(carrier) => carrier.has_spare_capacity(),
            Carrier::Volunteer(carrier) => carrier.within_radius(&order.store, &order.customer),
        }
    }

    pub fn accept_order(&mut self, order: &Order, now: DateTime<Utc>) -> Result<(), DispatchError> {
        match self {
            Carrier::Commercial(carrier) => carrier.accept_order(order, now),
            Carrier::Volunteer(carrier) => carrier.accept_order(order, now),
        }
    }

    /// Completes whatever the carrier is holding and returns the delivered orders.
    pub fn complete(&mut self) -> Result<Vec<Order>, DispatchError> {
        match self {
            Carrier::Commercial(carrier) => Ok(carrier.complete_deliveries()),
            Carrier::Volunteer(carrier) => carrier.complete_delivery().map(|order| vec![order]),
        }
    }

    pub fn in_progress(&self) -> Vec<&Order> {
        match self {
            Carrier::Commercial(carrier) => carrier.in_progress().iter().collect(),
            Carrier::Volunteer(carrier) => carrier.current_order().into_iter().collect(),
        }
    }

    pub fn holds_order(&self, order_id: &str) -> bool {
        self.in_progress().iter().any(|order| order.id == order_id)
    }

    /// In-progress load as a fraction of what the carrier can hold.
    pub fn utilization(&self) -> f64 {
        match self {
            Carrier::Commercial(carrier) => {
                if carrier.pickup_capacity == 0 {
                    return 1.0;
                }
                carrier.in_progress().len() as f64 / carrier.pickup_capacity as f64
            }
            Carrier::Volunteer(carrier) => {
                if carrier.current_order().is_some() {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Checks a snapshot received from outside and recomputes `free` from the
    /// orders it actually holds.
    pub fn validate(&mut self) -> Result<(), DispatchError> {
        let carrier_id = self.id().to_string();
        let invalid = |reason: &str| DispatchError::InvalidCarrier {
            carrier_id: carrier_id.clone(),
            reason: reason.to_string(),
        };

        if carrier_id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }

        if self
            .in_progress()
            .iter()
            .any(|order| order.status != OrderStatus::InTransit)
        {
            return Err(invalid("in-progress orders must be in transit"));
        }

        let free = match self {
            Carrier::Commercial(carrier) => {
                if !carrier.rate_per_km.is_finite() || carrier.rate_per_km < 0.0 {
                    return Err(invalid("rate per km must be a non-negative number"));
                }
                if carrier.average_speed_kmh.is_nan() || carrier.average_speed_kmh < 0.0 {
                    return Err(invalid("average speed must not be negative"));
                }
                if carrier.in_progress().len() > carrier.pickup_capacity {
                    return Err(invalid("in-progress orders exceed pickup capacity"));
                }
                carrier.has_spare_capacity()
            }
            Carrier::Volunteer(carrier) => {
                if carrier.service_radius_km.is_nan() || carrier.service_radius_km < 0.0 {
                    return Err(invalid("service radius must not be negative"));
                }
                if carrier.average_speed_kmh.is_nan() || carrier.average_speed_kmh < 0.0 {
                    return Err(invalid("average speed must not be negative"));
                }
                carrier.current_order().is_none()
            }
        };

        self.profile_mut().set_free(free);
        Ok(())
    }
}

impl From<CommercialCarrier> for Carrier {
    fn from(carrier: CommercialCarrier) -> Self {
        Carrier::Commercial(carrier)
    }
}

impl From<VolunteerCarrier> for Carrier {
    fn from(carrier: VolunteerCarrier) -> Self {
        Carrier::Volunteer(carrier)
    }
}
