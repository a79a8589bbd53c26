//! Bear sighting notifications.
//!
//! [`NotificationDispatcher::notify`] turns a [`SightingPayload`] into one SMS
//! per contact of the resolved zone.
//!
//! # Guarantees
//!
//! - The payload is validated before any I/O.
//! - A sighting id is notified at most once unless the call is forced.
//! - Every outbound message is at most [`SMS_MAX_CHARS`] characters.
//! - Sends to all contacts run concurrently and are awaited together.
//! - The id is marked as notified only after every send succeeded, so a
//!   failed dispatch can be retried.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::dedup::{DedupStore, InMemoryDedupStore};
use crate::error::NotifyError;
use crate::geofence::GeofenceLookup;
use crate::model::{
    Contact, GeofenceMatch, NotifiedContact, NotifyOptions, NotifyOutcome, NotifyReport,
    SightingPayload, ValidationTier,
};
use crate::sms::{SmsMessage, SmsTransport};

/// Hard length limit of a single SMS, in characters.
pub const SMS_MAX_CHARS: usize = 160;

/// Appended to messages cut at the limit.
const ELLIPSIS: &str = "...";

/// Separator between message segments.
const SEGMENT_SEPARATOR: &str = " | ";

/// Zone name used when no zone could be resolved.
const UNKNOWN_ZONE: &str = "unknown zone";

/// Cut a message to [`SMS_MAX_CHARS`] characters.
///
/// Longer messages keep their first 157 characters followed by `...`.
pub fn truncate_sms(text: &str) -> String {
    if text.chars().count() <= SMS_MAX_CHARS {
        return text.to_string();
    }

    let keep = SMS_MAX_CHARS - ELLIPSIS.len();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Collapse whitespace so a segment stays on one line. Returns `None` for
/// absent or blank values.
fn segment(value: Option<&str>) -> Option<String> {
    let value = value?;
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Human-readable containment status for the message.
fn proximity_status(found: Option<&GeofenceMatch>) -> String {
    match found {
        Some(m) if m.within_fence => "within the zone".to_string(),
        Some(m) => format!("near, {:.1} km away", m.distance_km),
        None => "no data".to_string(),
    }
}

/// Build the shared base message, before truncation and role tagging.
///
/// Segments, in order: header with zone name, coordinates, accuracy, tier,
/// proximity status, description, source. Absent values are left out.
pub fn build_base_message(
    payload: &SightingPayload,
    tier: ValidationTier,
    found: Option<&GeofenceMatch>,
) -> String {
    let zone_name = found
        .map(|m| m.zone.display_name.as_str())
        .unwrap_or(UNKNOWN_ZONE);

    let mut segments = vec![
        format!("BEAR ALERT {}", zone_name),
        format!("GPS {:.4}, {:.4}", payload.latitude, payload.longitude),
    ];

    if let Some(accuracy) = segment(payload.accuracy.as_deref()) {
        segments.push(format!("accuracy {}", accuracy));
    }

    segments.push(tier.label().to_string());
    segments.push(proximity_status(found));

    if let Some(description) = segment(payload.description.as_deref()) {
        segments.push(description);
    }

    if let Some(provider) = segment(payload.provider.as_deref()) {
        segments.push(format!("source: {}", provider));
    }

    segments.join(SEGMENT_SEPARATOR)
}

/// Message sent to one contact: role tag plus base message, truncated.
pub fn contact_message(contact: &Contact, base: &str) -> String {
    truncate_sms(&format!("[{}] {}", contact.role.label(), base))
}

fn validate(payload: &SightingPayload) -> Result<(), NotifyError> {
    if payload.id.is_empty() {
        return Err(NotifyError::invalid("Bear sighting payload requires an id"));
    }
    if !payload.latitude.is_finite() || !payload.longitude.is_finite() {
        return Err(NotifyError::invalid(
            "Bear sighting payload requires valid latitude and longitude",
        ));
    }
    Ok(())
}

/// Resolves sightings to zones and fans out SMS alerts to zone contacts.
#[derive(Clone)]
pub struct NotificationDispatcher {
    lookup: Arc<dyn GeofenceLookup>,
    transport: Arc<dyn SmsTransport>,
    dedup: Arc<dyn DedupStore>,
}

impl NotificationDispatcher {
    /// Create a dispatcher with an in-memory dedup set.
    pub fn new(lookup: Arc<dyn GeofenceLookup>, transport: Arc<dyn SmsTransport>) -> Self {
        Self {
            lookup,
            transport,
            dedup: Arc::new(InMemoryDedupStore::new()),
        }
    }

    /// Replace the dedup store, e.g. with a persistent one.
    pub fn with_dedup_store(mut self, dedup: Arc<dyn DedupStore>) -> Self {
        self.dedup = dedup;
        self
    }

    /// Notify the contacts of the zone the sighting falls in.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::InvalidPayload`] for a blank id or non-finite coordinates
    /// - [`NotifyError::Transport`] if any send fails; the first failure in
    ///   contact order is returned once all sends have settled
    /// - [`NotifyError::Dedup`] if the dedup store fails
    #[instrument(skip(self, payload), fields(sighting_id = %payload.id, force = options.force))]
    pub async fn notify(
        &self,
        payload: &SightingPayload,
        options: NotifyOptions,
    ) -> Result<NotifyOutcome, NotifyError> {
        validate(payload)?;

        let seen = !options.force
            && self
                .dedup
                .has_seen(&payload.id)
                .await
                .map_err(NotifyError::Dedup)?;
        if seen {
            debug!("Sighting already notified, skipping");
            return Ok(NotifyOutcome::Skipped {
                id: payload.id.clone(),
            });
        }

        let found = self.lookup.resolve(payload.latitude, payload.longitude).await;
        let tier = payload.effective_tier();
        let base = truncate_sms(&build_base_message(payload, tier, found.as_ref()));

        let contacts: &[Contact] = found
            .as_ref()
            .map(|m| m.zone.contacts.as_slice())
            .unwrap_or_default();

        let sends = contacts.iter().map(|contact| {
            let sms = SmsMessage {
                phone_number: contact.phone.clone(),
                message: contact_message(contact, &base),
            };
            let transport = &self.transport;
            async move {
                transport
                    .send_sms(sms)
                    .await
                    .map_err(|source| NotifyError::Transport {
                        phone: contact.masked_phone(),
                        source,
                    })
            }
        });

        let results = join_all(sends).await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        if let Some(err) = results.into_iter().find_map(Result::err) {
            warn!(
                zone = found.as_ref().map(|m| m.zone.id.as_str()).unwrap_or("none"),
                failed,
                total = contacts.len(),
                error = %err,
                "Bear alert fan-out failed"
            );
            return Err(err);
        }

        self.dedup
            .mark_seen(&payload.id)
            .await
            .map_err(NotifyError::Dedup)?;

        let geofence = found.as_ref().map(|m| m.zone.id.clone());
        info!(
            zone = geofence.as_deref().unwrap_or("none"),
            within_fence = found.as_ref().map(|m| m.within_fence).unwrap_or(false),
            contacts = contacts.len(),
            tier = tier.label(),
            "Bear alert dispatched"
        );

        Ok(NotifyOutcome::Sent(NotifyReport {
            notified: contacts
                .iter()
                .map(|c| NotifiedContact {
                    role: c.role,
                    phone: c.phone.clone(),
                })
                .collect(),
            geofence,
            validation_tier: tier,
            message: base,
        }))
    }
}
