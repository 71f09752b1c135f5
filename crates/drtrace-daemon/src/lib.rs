//! DrTrace daemon - host-local log ingestion and query engine.
//!
//! Endpoints:
//! - `POST /logs/ingest` - ingest a validated record batch
//! - `GET /logs/query` - windowed, filtered, ordered retrieval
//! - `POST /logs/clear` - administrative purge for one application
//! - `GET /status` - liveness and service metadata
//! - `GET /openapi.json` - machine-readable endpoint/field contract
//!
//! Records live in a SQLite table indexed by `(application_id, ts)`,
//! `(service_name, ts)` and `(module_name, ts)`; a background retention
//! worker expires records older than the configured window.

pub mod config;
pub mod error;
pub mod retention;
pub mod routes;
pub mod schema;
pub mod store;
