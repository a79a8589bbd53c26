//! AnimAlert - geofence resolution and SMS fan-out for wildlife sightings.
//!
//! # Overview
//!
//! A sighting (id + coordinates) is resolved to the nearest administrative
//! zone, turned into a short alert message and sent by SMS to each authority
//! contact of that zone. Sync jobs pull sightings from external sources every
//! hour and feed them through the same path.
//!
//! # Modules
//!
//! - [`model`]: Zones, contacts, sighting payloads and notification results
//! - [`geofence`]: Haversine distance and nearest-zone resolution
//! - [`catalog`]: Built-in and file-based zone catalogs
//! - [`notify`]: Message building and deduplicated SMS fan-out
//! - [`sms`]: SMS transports
//! - [`dedup`]: Dedup store trait and in-memory store
//! - [`storage`]: SQLite-backed dedup store
//! - [`data_sources`]: External reports API and geodata snapshot
//! - [`pipeline`]: Sync jobs feeding sources into the dispatcher
//! - [`sync`]: Single-flight scheduled runner
//! - [`config`]: Environment configuration
//! - [`api`]: HTTP API handlers

pub mod api;
pub mod catalog;
pub mod config;
pub mod data_sources;
pub mod dedup;
pub mod error;
pub mod geofence;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod sms;
pub mod storage;
pub mod sync;
