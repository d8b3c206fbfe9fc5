use serde::{Deserialize, Serialize};

/// Mean Earth radius used by every distance in the crate.
pub const EARTH_RADIUS_KM: f64 = 6_371.01;

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in kilometres, spherical law of cosines.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        if self == other {
            return 0.0;
        }

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        // rounding can push the cosine a hair outside acos' domain
        let cosine = (lat1.cos() * lat2.cos() * delta_lng.cos() + lat1.sin() * lat2.sin())
            .clamp(-1.0, 1.0);

        cosine.acos() * EARTH_RADIUS_KM
    }
}
