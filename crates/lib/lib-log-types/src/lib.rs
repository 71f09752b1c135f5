//! Shared wire types for the DrTrace log pipeline.
//!
//! Everything that crosses the client/daemon HTTP boundary lives here so
//! that both sides agree on field names by construction:
//! - [`LogLevel`] - the five-token ordinal severity scale
//! - [`LogRecord`] / [`LogBatch`] - the unified ingest wire types
//! - [`StoredRecord`] - a persisted record with its store-assigned id
//! - response envelopes for the ingest, query and clear endpoints

mod level;
mod record;

pub use level::{LogLevel, ParseLevelError};
pub use record::{
    ClearResponse, ErrorBody, ErrorDetail, IngestResponse, LogBatch, LogRecord, QueryResponse,
    StoredRecord,
};
