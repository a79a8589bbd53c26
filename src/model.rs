//! Data models for AnimAlert.
//!
//! # Lifecycle
//!
//! - [`Zone`] and [`Contact`] are loaded once at process start and never
//!   mutated afterwards.
//! - [`SightingPayload`] is built per notification attempt by a sync job or a
//!   manual trigger. It is not persisted here.
//! - [`GeofenceMatch`] and [`NotifyOutcome`] are derived values, never stored.

use serde::{Deserialize, Serialize};

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees, [-90, 90].
    pub lat: f64,

    /// Longitude in decimal degrees, [-180, 180].
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside geographic ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// The authority a contact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    /// Local gendarmerie post.
    Jandarmerie,
    /// Town hall of the administrative unit.
    Municipality,
    /// Sanitary-veterinary directorate.
    Vet,
    /// Manager of the hunting fund covering the area.
    HuntingManager,
}

impl ContactRole {
    /// Get a human-readable label, used as the SMS role tag.
    pub fn label(&self) -> &'static str {
        match self {
            ContactRole::Jandarmerie => "Jandarmerie",
            ContactRole::Municipality => "Municipality",
            ContactRole::Vet => "Vet",
            ContactRole::HuntingManager => "Hunting manager",
        }
    }
}

/// An authority contact attached to a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub role: ContactRole,

    /// Phone number in a form the SMS gateway accepts (E.164 preferred).
    pub phone: String,

    /// Display label, e.g. "Brasov - Jandarmerie".
    pub label: String,
}

impl Contact {
    /// Build a contact whose label combines the zone name and the role.
    pub fn new(zone_name: &str, role: ContactRole, phone: impl Into<String>) -> Self {
        Self {
            role,
            phone: phone.into(),
            label: format!("{} - {}", zone_name, role.label()),
        }
    }

    /// Phone number with all but the last four digits hidden, for logs.
    pub fn masked_phone(&self) -> String {
        mask_phone(&self.phone)
    }
}

/// Hide all but the last four characters of a phone number.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 4 {
        return "***".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{}", tail)
}

/// A named circular geofence with its authority contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Stable unique identifier, e.g. "uat-brasov".
    pub id: String,

    /// Human-readable name rendered into alert messages.
    pub display_name: String,

    /// Centre of the fence.
    pub centroid: Coordinates,

    /// Fence radius in kilometres. Always positive.
    pub radius_km: f64,

    /// Contacts notified for sightings resolved to this zone, in order.
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// Confidence/provenance classification attached to a sighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationTier {
    /// Automatic detection (AI and GPS).
    #[default]
    #[serde(rename = "Tier 1", alias = "tier1", alias = "tier_1")]
    Tier1,

    /// Validated by a local human observer.
    #[serde(rename = "Tier 2", alias = "tier2", alias = "tier_2")]
    Tier2,

    /// Confirmed by an institution.
    #[serde(rename = "Tier 3", alias = "tier3", alias = "tier_3")]
    Tier3,
}

impl ValidationTier {
    /// Label rendered into outbound messages.
    pub fn label(&self) -> &'static str {
        match self {
            ValidationTier::Tier1 => "Tier 1 - automatic detection (AI & GPS)",
            ValidationTier::Tier2 => "Tier 2 - local human validation",
            ValidationTier::Tier3 => "Tier 3 - institutional confirmation",
        }
    }
}

/// Input to [`crate::notify::NotificationDispatcher::notify`].
///
/// `id` is the dedup key: a sighting with the same id is notified at most
/// once per dispatcher unless the call is forced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SightingPayload {
    /// Caller-supplied unique identifier of the sighting.
    pub id: String,

    pub latitude: f64,
    pub longitude: f64,

    /// Free-text description of what was seen.
    #[serde(default)]
    pub description: Option<String>,

    /// When the sighting happened, as reported by the source.
    #[serde(default)]
    pub occurred_at: Option<String>,

    /// Position accuracy annotation, e.g. "~50m".
    #[serde(default)]
    pub accuracy: Option<String>,

    /// Source tag, e.g. "camera-trap" or "geodata-snapshot".
    #[serde(default)]
    pub provider: Option<String>,

    /// Defaults to [`ValidationTier::Tier1`] when absent.
    #[serde(default)]
    pub validation_tier: Option<ValidationTier>,
}

impl SightingPayload {
    /// Build a payload with only the required fields set.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            description: None,
            occurred_at: None,
            accuracy: None,
            provider: None,
            validation_tier: None,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// The tier used for rendering, with the default applied.
    pub fn effective_tier(&self) -> ValidationTier {
        self.validation_tier.unwrap_or_default()
    }
}

/// Result of resolving a point against the zone catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeofenceMatch {
    pub zone: Zone,

    /// Great-circle distance from the query point to the zone centroid.
    pub distance_km: f64,

    /// True iff `distance_km <= zone.radius_km`.
    pub within_fence: bool,
}

/// Per-call options for `notify`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct NotifyOptions {
    /// Send even if the sighting id was already notified.
    #[serde(default)]
    pub force: bool,
}

impl NotifyOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// A contact that was sent an SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifiedContact {
    pub role: ContactRole,
    pub phone: String,
}

/// Details of a completed notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifyReport {
    /// Contacts sent a message, in catalog order.
    pub notified: Vec<NotifiedContact>,

    /// Resolved zone id, or `None` when no zones are configured.
    pub geofence: Option<String>,

    /// Tier used for the message.
    pub validation_tier: ValidationTier,

    /// The shared base message (before role tagging).
    pub message: String,
}

/// Outcome of a `notify` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotifyOutcome {
    /// Messages were dispatched.
    Sent(NotifyReport),

    /// The sighting was already notified and the call was not forced.
    Skipped { id: String },
}

impl NotifyOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, NotifyOutcome::Skipped { .. })
    }

    pub fn report(&self) -> Option<&NotifyReport> {
        match self {
            NotifyOutcome::Sent(report) => Some(report),
            NotifyOutcome::Skipped { .. } => None,
        }
    }
}

/// Query parameters for GET /geofence.
#[derive(Debug, Deserialize)]
pub struct GeofenceQuery {
    pub lat: f64,
    pub lng: f64,
}

/// Response for GET /geofence.
#[derive(Debug, Clone, Serialize)]
pub struct GeofenceResponse {
    /// `None` when the catalog is empty.
    pub zone_id: Option<String>,
    pub display_name: Option<String>,
    pub distance_km: Option<f64>,
    pub within_fence: bool,
}

impl From<Option<GeofenceMatch>> for GeofenceResponse {
    fn from(found: Option<GeofenceMatch>) -> Self {
        match found {
            Some(m) => Self {
                zone_id: Some(m.zone.id),
                display_name: Some(m.zone.display_name),
                distance_km: Some(m.distance_km),
                within_fence: m.within_fence,
            },
            None => Self {
                zone_id: None,
                display_name: None,
                distance_km: None,
                within_fence: false,
            },
        }
    }
}

/// Zone as listed by the API. Contact phone numbers are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub id: String,
    pub display_name: String,
    pub centroid: Coordinates,
    pub radius_km: f64,
    pub contact_roles: Vec<ContactRole>,
}

impl From<&Zone> for ZoneSummary {
    fn from(zone: &Zone) -> Self {
        Self {
            id: zone.id.clone(),
            display_name: zone.display_name.clone(),
            centroid: zone.centroid,
            radius_km: zone.radius_km,
            contact_roles: zone.contacts.iter().map(|c| c.role).collect(),
        }
    }
}

/// Request body for POST /alerts/bear.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyRequest {
    #[serde(flatten)]
    pub payload: SightingPayload,

    /// Re-send even if this sighting was already notified.
    #[serde(default)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_summary_omits_phones() {
        let zone = Zone {
            id: "uat-sacele".to_string(),
            display_name: "Sacele".to_string(),
            centroid: Coordinates::new(45.62, 25.69),
            radius_km: 10.0,
            contacts: vec![Contact::new("Sacele", ContactRole::Vet, "+40700000301")],
        };

        let summary = ZoneSummary::from(&zone);
        assert_eq!(summary.contact_roles, vec![ContactRole::Vet]);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("+40700000301"));
        assert!(json.contains("\"vet\""));
    }

    #[test]
    fn test_tier_defaults_to_tier1() {
        let payload = SightingPayload::new("s-1", 45.0, 25.0);
        assert_eq!(payload.effective_tier(), ValidationTier::Tier1);
    }

    #[test]
    fn test_tier_deserializes_from_label_and_alias() {
        let tier: ValidationTier = serde_json::from_str("\"Tier 2\"").unwrap();
        assert_eq!(tier, ValidationTier::Tier2);

        let tier: ValidationTier = serde_json::from_str("\"tier3\"").unwrap();
        assert_eq!(tier, ValidationTier::Tier3);
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(
            ValidationTier::Tier1.label(),
            "Tier 1 - automatic detection (AI & GPS)"
        );
        assert_eq!(
            ValidationTier::Tier2.label(),
            "Tier 2 - local human validation"
        );
        assert_eq!(
            ValidationTier::Tier3.label(),
            "Tier 3 - institutional confirmation"
        );
    }

    #[test]
    fn test_contact_label_combines_zone_and_role() {
        let contact = Contact::new("Brasov", ContactRole::Jandarmerie, "+40700000001");
        assert_eq!(contact.label, "Brasov - Jandarmerie");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+40712345678"), "***5678");
        assert_eq!(mask_phone("123"), "***");
    }

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(45.656, 25.607).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -181.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_notify_request_flattens_payload() {
        let request: NotifyRequest = serde_json::from_str(
            r#"{"id":"abc","latitude":45.6,"longitude":25.6,"force":true}"#,
        )
        .unwrap();
        assert_eq!(request.payload.id, "abc");
        assert!(request.force);
        assert!(request.payload.validation_tier.is_none());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let skipped = NotifyOutcome::Skipped {
            id: "abc".to_string(),
        };
        let value = serde_json::to_value(&skipped).unwrap();
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["id"], "abc");
    }
}
