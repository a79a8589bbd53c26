//! Sync jobs feeding external records into the notification dispatcher.
//!
//! - [`ExternalReportSync`]: polls the external reports API
//! - [`GeodataSync`]: reads the public geodata snapshot
//!
//! Both keep only records accepted by their [`SightingFilter`] and build
//! Tier 1 payloads tagged with a fixed provider and approximate accuracy. A
//! failing sighting or an undecodable entry is logged and counted; the rest of
//! the pass goes on.
//!
//! After a pass with no failures, [`ExternalReportSync`] only asks the API for
//! reports posted since that pass started. Any failure keeps the previous
//! cut-off so the failed sightings are fetched and retried next time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::data_sources::{
    ExternalReportsClient, GeodataSnapshot, KeywordFilter, SightingFilter, SourceBatch,
    SourceRecord,
};
use crate::model::{NotifyOptions, NotifyOutcome, SightingPayload, ValidationTier};
use crate::notify::NotificationDispatcher;
use crate::sync::{SyncJob, SyncReport};

/// Provider tag for sightings from the external reports API.
pub const EXTERNAL_REPORTS_PROVIDER: &str = "external-reports";

/// Provider tag for sightings from the geodata snapshot.
pub const GEODATA_PROVIDER: &str = "geodata";

/// Accuracy annotation for source records, whose positions are approximate.
pub const APPROXIMATE_ACCURACY: &str = "approximate";

/// Build a sighting payload from a source record.
///
/// The id is namespaced by provider so ids from different sources never
/// collide in the dedup store.
pub fn sighting_from_record(record: &SourceRecord, provider: &str) -> SightingPayload {
    let id = if record.id.trim().is_empty() {
        String::new()
    } else {
        format!("{}:{}", provider, record.id.trim())
    };

    SightingPayload {
        id,
        latitude: record.latitude,
        longitude: record.longitude,
        description: record.description.clone(),
        occurred_at: record.reported_at().map(str::to_string),
        accuracy: Some(APPROXIMATE_ACCURACY.to_string()),
        provider: Some(provider.to_string()),
        validation_tier: Some(ValidationTier::Tier1),
    }
}

/// Filter records and notify each matching sighting in turn.
pub async fn dispatch_records(
    dispatcher: &NotificationDispatcher,
    filter: &dyn SightingFilter,
    records: &[SourceRecord],
    provider: &str,
) -> SyncReport {
    let mut report = SyncReport {
        fetched: records.len(),
        ..Default::default()
    };

    for record in records.iter().filter(|r| filter.matches(r)) {
        report.matched += 1;
        let payload = sighting_from_record(record, provider);

        match dispatcher.notify(&payload, NotifyOptions::default()).await {
            Ok(NotifyOutcome::Sent(_)) => report.notified += 1,
            Ok(NotifyOutcome::Skipped { .. }) => report.skipped += 1,
            Err(e) => {
                report.failed += 1;
                warn!(
                    provider,
                    record_id = %record.id,
                    error = %e,
                    "Failed to notify sighting"
                );
            }
        }
    }

    report
}

/// [`dispatch_records`] over a decoded batch. Entries that could not be
/// decoded count as fetched and failed.
pub async fn dispatch_batch(
    dispatcher: &NotificationDispatcher,
    filter: &dyn SightingFilter,
    batch: &SourceBatch,
    provider: &str,
) -> SyncReport {
    let mut report = dispatch_records(dispatcher, filter, &batch.records, provider).await;
    report.fetched += batch.rejected;
    report.failed += batch.rejected;
    report
}

/// Polls the external reports API and notifies new sightings.
pub struct ExternalReportSync {
    client: Option<ExternalReportsClient>,
    dispatcher: NotificationDispatcher,
    filter: Arc<dyn SightingFilter>,
    /// Start of the last pass that had no failures.
    last_clean_pass: Mutex<Option<DateTime<Utc>>>,
}

impl ExternalReportSync {
    /// `client` is `None` when no reports URL is configured; the job then
    /// reports itself as not configured.
    pub fn new(client: Option<ExternalReportsClient>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            client,
            dispatcher,
            filter: Arc::new(KeywordFilter::default()),
            last_clean_pass: Mutex::new(None),
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn SightingFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Cut-off sent with the next fetch, if any.
    pub fn since(&self) -> Option<DateTime<Utc>> {
        *self.last_clean_pass.lock()
    }
}

#[async_trait]
impl SyncJob for ExternalReportSync {
    fn name(&self) -> &str {
        "external-reports"
    }

    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    #[instrument(skip(self), name = "external_report_sync")]
    async fn run(&self) -> anyhow::Result<SyncReport> {
        let Some(client) = &self.client else {
            anyhow::bail!("external reports URL is not configured");
        };

        let started = Utc::now();
        let since = self.since();
        debug!(url = client.url(), since = ?since, "Fetching external reports");

        let batch = match since {
            Some(since) => client.fetch_reports_since(since).await?,
            None => client.fetch_reports().await?,
        };
        let report = dispatch_batch(
            &self.dispatcher,
            self.filter.as_ref(),
            &batch,
            EXTERNAL_REPORTS_PROVIDER,
        )
        .await;

        if report.failed == 0 {
            *self.last_clean_pass.lock() = Some(started);
        }
        Ok(report)
    }
}

/// Reads the geodata snapshot and notifies new sightings.
pub struct GeodataSync {
    snapshot: Option<GeodataSnapshot>,
    dispatcher: NotificationDispatcher,
    filter: Arc<dyn SightingFilter>,
}

impl GeodataSync {
    pub fn new(snapshot: Option<GeodataSnapshot>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            snapshot,
            dispatcher,
            filter: Arc::new(KeywordFilter::default()),
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn SightingFilter>) -> Self {
        self.filter = filter;
        self
    }
}

#[async_trait]
impl SyncJob for GeodataSync {
    fn name(&self) -> &str {
        "geodata"
    }

    fn is_configured(&self) -> bool {
        self.snapshot.is_some()
    }

    #[instrument(skip(self), name = "geodata_sync")]
    async fn run(&self) -> anyhow::Result<SyncReport> {
        let Some(snapshot) = &self.snapshot else {
            anyhow::bail!("geodata snapshot path is not configured");
        };

        debug!(path = %snapshot.path().display(), "Loading geodata snapshot");
        let batch = snapshot.load().await?;
        Ok(dispatch_batch(
            &self.dispatcher,
            self.filter.as_ref(),
            &batch,
            GEODATA_PROVIDER,
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geofence::GeofenceResolver;
    use crate::model::{Contact, ContactRole, Coordinates, Zone};
    use crate::sms::{SmsMessage, SmsTransport};

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<SmsMessage>>,
    }

    #[async_trait]
    impl SmsTransport for RecordingTransport {
        async fn send_sms(&self, sms: SmsMessage) -> anyhow::Result<()> {
            self.sent.lock().push(sms);
            Ok(())
        }
    }

    fn dispatcher(transport: Arc<RecordingTransport>) -> NotificationDispatcher {
        let zone = Zone {
            id: "uat-brasov".to_string(),
            display_name: "Brasov".to_string(),
            centroid: Coordinates::new(45.656, 25.607),
            radius_km: 18.0,
            contacts: vec![
                Contact::new("Brasov", ContactRole::Jandarmerie, "+40700000101"),
                Contact::new("Brasov", ContactRole::Municipality, "+40700000102"),
            ],
        };
        NotificationDispatcher::new(Arc::new(GeofenceResolver::new(vec![zone])), transport)
    }

    fn record(id: &str, kind: &str) -> SourceRecord {
        SourceRecord {
            id: id.to_string(),
            kind: kind.to_string(),
            latitude: 45.65,
            longitude: 25.60,
            description: Some("seen near the road".to_string()),
            posted: None,
            date: Some("2025-06-01".to_string()),
        }
    }

    #[test]
    fn test_payload_from_record() {
        let payload = sighting_from_record(&record("17", "Urs"), GEODATA_PROVIDER);

        assert_eq!(payload.id, "geodata:17");
        assert_eq!(payload.provider.as_deref(), Some("geodata"));
        assert_eq!(payload.accuracy.as_deref(), Some("approximate"));
        assert_eq!(payload.validation_tier, Some(ValidationTier::Tier1));
        assert_eq!(payload.occurred_at.as_deref(), Some("2025-06-01"));
    }

    #[test]
    fn test_blank_record_id_stays_blank() {
        let payload = sighting_from_record(&record("  ", "Urs"), GEODATA_PROVIDER);
        assert!(payload.id.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_filters_and_counts() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = dispatcher(transport.clone());
        let records = vec![
            record("1", "Urs"),
            record("2", "Mistret"),
            record("3", "Bear"),
            record("", "Urs"),
        ];

        let report = dispatch_records(
            &dispatcher,
            &KeywordFilter::default(),
            &records,
            GEODATA_PROVIDER,
        )
        .await;

        assert_eq!(
            report,
            SyncReport {
                fetched: 4,
                matched: 3,
                notified: 2,
                skipped: 0,
                failed: 1,
            }
        );
        assert_eq!(transport.sent.lock().len(), 4);

        // A second pass over the same records notifies nothing new
        let again = dispatch_records(
            &dispatcher,
            &KeywordFilter::default(),
            &records,
            GEODATA_PROVIDER,
        )
        .await;
        assert_eq!(again.skipped, 2);
        assert_eq!(again.notified, 0);
        assert_eq!(transport.sent.lock().len(), 4);
    }

    #[tokio::test]
    async fn test_unconfigured_jobs() {
        let transport = Arc::new(RecordingTransport::default());
        let external = ExternalReportSync::new(None, dispatcher(transport.clone()));
        let geodata = GeodataSync::new(None, dispatcher(transport));

        assert!(!external.is_configured());
        assert!(!geodata.is_configured());
        assert!(external.run().await.is_err());
    }

    #[tokio::test]
    async fn test_geodata_job_reads_snapshot() {
        let path = std::env::temp_dir().join(format!(
            "animalert-pipeline-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[
                {"id":"a","type":"urs brun","latitude":45.65,"longitude":25.60},
                {"id":"b","type":"caprioara","latitude":45.65,"longitude":25.60}
            ]"#,
        )
        .unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let job = GeodataSync::new(
            Some(GeodataSnapshot::new(&path)),
            dispatcher(transport.clone()),
        );

        let report = job.run().await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.notified, 1);

        let sent = transport.sent.lock().clone();
        assert!(sent.iter().all(|s| s.message.contains("source: geodata")));

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_undecodable_entries_count_as_failed() {
        let transport = Arc::new(RecordingTransport::default());
        let batch = SourceBatch {
            records: vec![record("1", "Urs")],
            rejected: 2,
        };

        let report = dispatch_batch(
            &dispatcher(transport.clone()),
            &KeywordFilter::default(),
            &batch,
            EXTERNAL_REPORTS_PROVIDER,
        )
        .await;

        assert_eq!(report.fetched, 3);
        assert_eq!(report.notified, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(transport.sent.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_geodata_pass_survives_null_coordinates() {
        let path = std::env::temp_dir().join(format!(
            "animalert-pipeline-null-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[
                {"id":"good","type":"Urs","latitude":45.65,"longitude":25.60},
                {"id":"bad","type":"Urs","latitude":null,"longitude":25.60},
                {"type":"Urs","latitude":45.65,"longitude":25.60}
            ]"#,
        )
        .unwrap();

        let transport = Arc::new(RecordingTransport::default());
        let job = GeodataSync::new(
            Some(GeodataSnapshot::new(&path)),
            dispatcher(transport.clone()),
        );

        let report = job.run().await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                fetched: 3,
                matched: 3,
                notified: 1,
                skipped: 0,
                failed: 2,
            }
        );
        assert_eq!(transport.sent.lock().len(), 2);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_custom_filter() {
        let transport = Arc::new(RecordingTransport::default());
        let all: Arc<dyn SightingFilter> = Arc::new(|_: &SourceRecord| true);
        let records = vec![record("1", "Lup"), record("2", "Mistret")];

        let report =
            dispatch_records(&dispatcher(transport), all.as_ref(), &records, "test").await;
        assert_eq!(report.matched, 2);
        assert_eq!(report.notified, 2);
    }
}
