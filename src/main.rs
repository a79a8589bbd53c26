//! AnimAlert server.
//!
//! Loads the zone catalog, wires the notification dispatcher to an SMS
//! transport, starts the hourly sync jobs and serves the HTTP API.
//!
//! # API Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /geofence?lat=&lng=` - Resolve a point to its zone
//! - `GET /zones`, `GET /zones/:id` - Zone catalog
//! - `POST /alerts/bear` - Trigger a bear alert manually
//! - `POST /sync/:job` - Run a sync pass now (`external-reports`, `geodata`)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use animalert::api::{AppState, router};
use animalert::catalog::{default_zones, load_zones};
use animalert::config::AppConfig;
use animalert::data_sources::{ExternalReportsClient, GeodataSnapshot};
use animalert::dedup::DedupStore;
use animalert::geofence::GeofenceResolver;
use animalert::notify::NotificationDispatcher;
use animalert::pipeline::{ExternalReportSync, GeodataSync};
use animalert::sms::{HttpSmsGateway, LogOnlySms, SmsTransport};
use animalert::storage::SqliteDedupStore;
use animalert::sync::SyncRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("animalert=info".parse()?))
        .init();

    let config = AppConfig::from_env();
    info!(port = config.port, "Starting AnimAlert server");

    let zones = match &config.geofence_catalog {
        Some(path) => load_zones(path)?,
        None => default_zones(),
    };
    let resolver = GeofenceResolver::new(zones);
    info!(zones = resolver.zones().len(), "Geofence catalog loaded");

    let transport: Arc<dyn SmsTransport> = match &config.sms_gateway_url {
        Some(url) => {
            info!(url = %url, "Using HTTP SMS gateway");
            Arc::new(HttpSmsGateway::new(url, config.sms_gateway_token.clone()))
        }
        None => {
            info!("No SMS gateway configured, messages are only logged");
            Arc::new(LogOnlySms)
        }
    };

    let mut dispatcher = NotificationDispatcher::new(Arc::new(resolver.clone()), transport);
    if let Some(db_url) = &config.database_url {
        let store: Arc<dyn DedupStore> = Arc::new(SqliteDedupStore::new(db_url).await?);
        dispatcher = dispatcher.with_dedup_store(store);
        info!("Persistent dedup store initialized");
    }

    let external = ExternalReportSync::new(
        config
            .external_reports_url
            .as_deref()
            .map(ExternalReportsClient::new),
        dispatcher.clone(),
    );
    let geodata = GeodataSync::new(
        config.geodata_snapshot.clone().map(GeodataSnapshot::new),
        dispatcher.clone(),
    );

    let sync_runners = vec![
        SyncRunner::with_interval(Arc::new(external), config.sync_interval),
        SyncRunner::with_interval(Arc::new(geodata), config.sync_interval),
    ];
    for runner in &sync_runners {
        runner.start();
    }

    let state = AppState {
        resolver,
        dispatcher,
        sync_runners: sync_runners.clone(),
    };
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "AnimAlert is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    for runner in &sync_runners {
        runner.shutdown();
    }
    info!("AnimAlert stopped");

    Ok(())
}
