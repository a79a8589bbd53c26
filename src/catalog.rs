//! Zone catalog.
//!
//! The catalog is process-wide configuration: either the built-in list of
//! administrative units (UATs) below, or a JSON file given at start-up. It is
//! validated once and treated as immutable afterwards.
//!
//! # JSON format
//!
//! ```json
//! [
//!   {
//!     "id": "uat-brasov",
//!     "display_name": "Brasov",
//!     "centroid": { "lat": 45.656, "lng": 25.607 },
//!     "radius_km": 18.0,
//!     "contacts": [
//!       { "role": "jandarmerie", "phone": "+40700000101", "label": "Brasov - Jandarmerie" }
//!     ]
//!   }
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;

use crate::error::CatalogError;
use crate::model::{Contact, ContactRole, Coordinates, Zone};

fn uat(
    id: &str,
    name: &str,
    lat: f64,
    lng: f64,
    radius_km: f64,
    phones: &[(ContactRole, &str)],
) -> Zone {
    Zone {
        id: id.to_string(),
        display_name: name.to_string(),
        centroid: Coordinates::new(lat, lng),
        radius_km,
        contacts: phones
            .iter()
            .map(|(role, phone)| Contact::new(name, *role, *phone))
            .collect(),
    }
}

/// The built-in catalog used when no catalog file is configured.
///
/// Phone numbers are placeholders in the reserved +40700 range and must be
/// replaced through a catalog file in production.
pub fn default_zones() -> Vec<Zone> {
    use ContactRole::*;

    vec![
        uat(
            "uat-brasov",
            "Brasov",
            45.656,
            25.607,
            18.0,
            &[
                (Jandarmerie, "+40700000101"),
                (Municipality, "+40700000102"),
                (Vet, "+40700000103"),
                (HuntingManager, "+40700000104"),
            ],
        ),
        uat(
            "uat-sacele",
            "Sacele",
            45.617,
            25.694,
            12.0,
            &[
                (Jandarmerie, "+40700000201"),
                (Municipality, "+40700000202"),
                (HuntingManager, "+40700000204"),
            ],
        ),
        uat(
            "uat-rasnov",
            "Rasnov",
            45.590,
            25.460,
            10.0,
            &[
                (Jandarmerie, "+40700000301"),
                (Municipality, "+40700000302"),
            ],
        ),
        uat(
            "uat-zarnesti",
            "Zarnesti",
            45.562,
            25.318,
            15.0,
            &[
                (Jandarmerie, "+40700000401"),
                (Municipality, "+40700000402"),
                (HuntingManager, "+40700000404"),
            ],
        ),
        uat(
            "uat-predeal",
            "Predeal",
            45.503,
            25.576,
            10.0,
            &[
                (Jandarmerie, "+40700000501"),
                (Municipality, "+40700000502"),
                (Vet, "+40700000503"),
            ],
        ),
        uat(
            "uat-busteni",
            "Busteni",
            45.413,
            25.537,
            8.0,
            &[
                (Jandarmerie, "+40700000601"),
                (Municipality, "+40700000602"),
            ],
        ),
        uat(
            "uat-sinaia",
            "Sinaia",
            45.350,
            25.551,
            12.0,
            &[
                (Jandarmerie, "+40700000701"),
                (Municipality, "+40700000702"),
                (Vet, "+40700000703"),
            ],
        ),
        uat(
            "uat-baile-tusnad",
            "Baile Tusnad",
            46.147,
            25.857,
            10.0,
            &[
                (Jandarmerie, "+40700000801"),
                (Municipality, "+40700000802"),
                (HuntingManager, "+40700000804"),
            ],
        ),
    ]
}

/// Check the catalog invariants: unique ids, positive radii, valid centroids.
pub fn validate_zones(zones: &[Zone]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();

    for zone in zones {
        if !seen.insert(zone.id.as_str()) {
            return Err(CatalogError::DuplicateZone(zone.id.clone()));
        }
        if zone.id.trim().is_empty() {
            return Err(CatalogError::InvalidZone {
                zone: zone.display_name.clone(),
                reason: "id must not be empty".to_string(),
            });
        }
        if !(zone.radius_km.is_finite() && zone.radius_km > 0.0) {
            return Err(CatalogError::InvalidZone {
                zone: zone.id.clone(),
                reason: format!("radius_km must be positive, got {}", zone.radius_km),
            });
        }
        if !zone.centroid.is_valid() {
            return Err(CatalogError::InvalidZone {
                zone: zone.id.clone(),
                reason: format!(
                    "centroid out of range: {}, {}",
                    zone.centroid.lat, zone.centroid.lng
                ),
            });
        }
    }

    Ok(())
}

/// Parse and validate a catalog from JSON text.
pub fn parse_zones(json: &str) -> Result<Vec<Zone>, CatalogError> {
    let zones: Vec<Zone> = serde_json::from_str(json)?;
    validate_zones(&zones)?;
    Ok(zones)
}

/// Load and validate a catalog file.
pub fn load_zones(path: impl AsRef<Path>) -> Result<Vec<Zone>, CatalogError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_zones(&json)
}
