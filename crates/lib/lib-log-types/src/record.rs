//! Log record wire types and response envelopes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::LogLevel;

/// A single log record as carried client -> daemon.
///
/// `ts` is UTC seconds since the Unix epoch as a float; sub-second
/// precision is preserved. `context` is a free-form mapping of string keys
/// to arbitrary JSON values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Event time, UTC seconds since the Unix epoch
    pub ts: f64,

    /// Severity level
    pub level: LogLevel,

    /// Log message
    pub message: String,

    /// Application key, the primary query filter
    pub application_id: String,

    /// Logical source (logger name, component)
    pub module_name: String,

    /// Coarser grouping than module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// Source file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// Source line number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_no: Option<u32>,

    /// Exception class name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,

    /// Full stack trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,

    /// Free-form extension fields
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

/// The ingest request body: an application id plus an ordered record batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogBatch {
    pub application_id: String,
    pub logs: Vec<LogRecord>,
}

/// A persisted record: the wire record plus its store-assigned id.
///
/// Ids are 64-bit and strictly increasing across the store's lifetime, so
/// `(ts, id)` gives queries a stable order for tied timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,

    #[serde(flatten)]
    pub record: LogRecord,
}

/// Response body for `POST /logs/ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: u64,
}

/// Response body for `GET /logs/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<StoredRecord>,
    pub count: usize,
}

/// Response body for `POST /logs/clear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub deleted: u64,
}

/// Structured error envelope: `{"detail": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            detail: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
