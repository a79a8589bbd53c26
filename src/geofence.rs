//! Geofence resolution.
//!
//! Resolves a point to the best-matching [`Zone`] of a static catalog.
//!
//! # Matching policy
//!
//! Zones are scanned in catalog order while tracking the nearest zone seen so
//! far. The scan stops at the first zone whose radius contains the point and
//! returns that zone, even if a later zone would be closer. If no zone
//! contains the point, the globally nearest zone is returned.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Coordinates, GeofenceMatch, Zone};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points (haversine formula).
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Something that can resolve a point to a zone.
///
/// The dispatcher awaits this so that a remote resolver can replace the
/// in-process catalog without changing the dispatch path.
#[async_trait]
pub trait GeofenceLookup: Send + Sync {
    async fn resolve(&self, lat: f64, lng: f64) -> Option<GeofenceMatch>;
}

/// Resolver over an immutable, in-process zone catalog.
#[derive(Debug, Clone)]
pub struct GeofenceResolver {
    zones: Arc<[Zone]>,
}

impl GeofenceResolver {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones: zones.into(),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Find the matching zone for a point.
    ///
    /// Returns `None` only when the catalog is empty. Input is not validated.
    pub fn resolve_point(&self, lat: f64, lng: f64) -> Option<GeofenceMatch> {
        let point = Coordinates::new(lat, lng);
        let mut best: Option<(&Zone, f64)> = None;

        for zone in self.zones.iter() {
            let distance_km = haversine_km(point, zone.centroid);

            let closer = match best {
                Some((_, best_km)) => distance_km < best_km,
                None => true,
            };
            if !closer {
                continue;
            }

            best = Some((zone, distance_km));
            if distance_km <= zone.radius_km {
                break;
            }
        }

        best.map(|(zone, distance_km)| GeofenceMatch {
            zone: zone.clone(),
            distance_km,
            within_fence: distance_km <= zone.radius_km,
        })
    }
}

#[async_trait]
impl GeofenceLookup for GeofenceResolver {
    async fn resolve(&self, lat: f64, lng: f64) -> Option<GeofenceMatch> {
        self.resolve_point(lat, lng)
    }
}
