use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::DispatchError;
use crate::models::carrier::Carrier;
use crate::models::order::Order;

/// Carrier snapshots and pending orders handed over by the registry.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub carriers: Vec<Carrier>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, DispatchError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            DispatchError::Internal(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, DispatchError> {
        serde_json::from_str(raw)
            .map_err(|err| DispatchError::Internal(format!("invalid fixture: {err}")))
    }
}
