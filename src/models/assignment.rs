use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub id: Uuid,
    pub order_id: String,
    pub carrier_id: String,
    pub price: f64,
    pub distance_km: f64,
    /// `None` when the carrier has no usable average speed.
    pub estimated_minutes: Option<i64>,
    pub assigned_at: DateTime<Utc>,
}
