//! HTTP route handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDateTime, Utc};
use lib_log_types::{ClearResponse, IngestResponse, LogBatch, LogLevel, QueryResponse};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::DaemonConfig;
use crate::error::ApiError;
use crate::schema;
use crate::store::{LogStore, MessageFilter, QueryFilter, MAX_QUERY_LIMIT};

/// Longest accepted `message_regex` pattern.
const MAX_REGEX_LEN: usize = 500;

const DEFAULT_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LogStore>,
    pub config: Arc<DaemonConfig>,
    openapi: Arc<serde_json::Value>,
}

impl AppState {
    pub fn new(store: Arc<LogStore>, config: DaemonConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            openapi: Arc::new(schema::document()),
        }
    }
}

/// Build the daemon router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/openapi.json", get(openapi))
        .route("/logs/ingest", post(ingest_logs))
        .route("/logs/query", get(query_logs))
        .route("/logs/clear", post(clear_logs))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Status + schema
// ============================================================================

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "host": state.config.host,
        "port": state.config.port,
        "retention_days": state.config.retention_days,
    }))
}

pub async fn openapi(State(state): State<AppState>) -> impl IntoResponse {
    Json((*state.openapi).clone())
}

// ============================================================================
// Ingestion
// ============================================================================

/// Accept and persist a batch of log records.
///
/// The whole batch is rejected with 422 when any record is missing a
/// required field or carries a level outside the enumerated set; level
/// tokens are normalized to lowercase by the wire type on the way in.
pub async fn ingest_logs(
    State(state): State<AppState>,
    payload: Result<Json<LogBatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(batch) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;

    for record in &batch.logs {
        if !record.ts.is_finite() {
            return Err(ApiError::Validation("ts must be a finite number".to_string()));
        }
    }

    let accepted = state.store.append(&batch.logs).await?;
    tracing::debug!("accepted batch of {} for {}", accepted, batch.application_id);
    Ok((StatusCode::ACCEPTED, Json(IngestResponse { accepted })))
}

// ============================================================================
// Query
// ============================================================================

/// Raw query parameters.
///
/// Everything is accepted as text so validation failures surface as the
/// structured error codes instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub start_ts: Option<String>,
    pub end_ts: Option<String>,
    pub application_id: Option<String>,
    pub module_name: Option<String>,
    pub service_name: Option<String>,
    pub min_level: Option<String>,
    pub message_contains: Option<String>,
    pub message_regex: Option<String>,
    pub limit: Option<String>,
}

pub async fn query_logs(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = build_filter(params)?;
    let results = state.store.query(&filter).await?;
    Ok(Json(QueryResponse { count: results.len(), results }))
}

fn build_filter(params: QueryParams) -> Result<QueryFilter, ApiError> {
    let start_ts = parse_ts(
        "start_ts",
        params
            .start_ts
            .as_deref()
            .ok_or_else(|| ApiError::InvalidParams("start_ts is required".to_string()))?,
    )?;
    let end_ts = parse_ts(
        "end_ts",
        params
            .end_ts
            .as_deref()
            .ok_or_else(|| ApiError::InvalidParams("end_ts is required".to_string()))?,
    )?;
    if start_ts > end_ts {
        return Err(ApiError::InvalidTimeRange(format!(
            "start_ts {start_ts} is after end_ts {end_ts}"
        )));
    }

    let min_level = params
        .min_level
        .as_deref()
        .map(|token| {
            LogLevel::from_str(token)
                .ok_or_else(|| ApiError::InvalidLevel(format!("unknown level {token:?}")))
        })
        .transpose()?;

    // Hard invariant of the API surface: never silently prefer one filter.
    let message = match (params.message_contains, params.message_regex) {
        (Some(_), Some(_)) => {
            return Err(ApiError::InvalidParams("Cannot use both filters".to_string()));
        }
        (Some(needle), None) => Some(MessageFilter::contains(&needle)),
        (None, Some(pattern)) => {
            if pattern.len() > MAX_REGEX_LEN {
                return Err(ApiError::InvalidParams(format!(
                    "message_regex exceeds {MAX_REGEX_LEN} characters"
                )));
            }
            let re = regex::Regex::new(&pattern)
                .map_err(|e| ApiError::InvalidParams(format!("invalid message_regex: {e}")))?;
            Some(MessageFilter::Regex(re))
        }
        (None, None) => None,
    };

    let limit = match params.limit.as_deref() {
        None => DEFAULT_LIMIT,
        Some(raw) => {
            let parsed: usize = raw
                .parse()
                .map_err(|_| ApiError::InvalidParams(format!("invalid limit {raw:?}")))?;
            if parsed == 0 {
                return Err(ApiError::InvalidParams(
                    "limit must be between 1 and 1000".to_string(),
                ));
            }
            parsed.min(MAX_QUERY_LIMIT)
        }
    };

    Ok(QueryFilter {
        start_ts,
        end_ts,
        application_id: params.application_id,
        module_name: params.module_name,
        service_name: params.service_name,
        min_level,
        message,
        limit,
    })
}

/// Parse a timestamp parameter: float UTC seconds, or an ISO 8601 string.
/// A string without a zone suffix is interpreted as UTC.
fn parse_ts(name: &str, raw: &str) -> Result<f64, ApiError> {
    if let Ok(seconds) = raw.parse::<f64>() {
        if seconds.is_finite() {
            return Ok(seconds);
        }
        return Err(ApiError::InvalidTimeFormat(format!(
            "{name} must be a finite number"
        )));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc).timestamp_micros() as f64 / 1_000_000.0);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().timestamp_micros() as f64 / 1_000_000.0);
        }
    }
    Err(ApiError::InvalidTimeFormat(format!(
        "{name} is neither epoch seconds nor ISO 8601: {raw:?}"
    )))
}

// ============================================================================
// Administrative clear
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ClearParams {
    pub application_id: Option<String>,
}

pub async fn clear_logs(
    State(state): State<AppState>,
    Query(params): Query<ClearParams>,
) -> Result<impl IntoResponse, ApiError> {
    let application_id = params
        .application_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidParams("application_id is required".to_string()))?;

    let deleted = state.store.clear(&application_id).await?;
    tracing::info!("cleared {} records for {}", deleted, application_id);
    Ok(Json(ClearResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: &str, end: &str) -> QueryParams {
        QueryParams {
            start_ts: Some(start.to_string()),
            end_ts: Some(end.to_string()),
            ..QueryParams::default()
        }
    }

    #[test]
    fn float_and_iso_timestamps_parse() {
        assert_eq!(parse_ts("start_ts", "1700000000.25").unwrap(), 1700000000.25);
        // zone-less ISO is UTC
        assert_eq!(parse_ts("start_ts", "1970-01-01T00:00:01").unwrap(), 1.0);
        // explicit zone converts to UTC
        assert_eq!(parse_ts("start_ts", "1970-01-01T01:00:01+01:00").unwrap(), 1.0);
    }

    #[test]
    fn garbage_timestamp_is_a_format_error() {
        let err = parse_ts("start_ts", "yesterday").unwrap_err();
        assert_eq!(err.code(), "INVALID_TIME_FORMAT");
        let err = parse_ts("start_ts", "NaN").unwrap_err();
        assert_eq!(err.code(), "INVALID_TIME_FORMAT");
    }

    #[test]
    fn missing_window_is_invalid_params() {
        let err = build_filter(QueryParams::default()).unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");
    }

    #[test]
    fn inverted_window_is_invalid_time_range() {
        let err = build_filter(params("10", "5")).unwrap_err();
        assert_eq!(err.code(), "INVALID_TIME_RANGE");
    }

    #[test]
    fn instantaneous_window_is_valid() {
        let filter = build_filter(params("5", "5")).unwrap();
        assert_eq!(filter.start_ts, filter.end_ts);
    }

    #[test]
    fn unknown_level_is_invalid_level() {
        let mut p = params("0", "10");
        p.min_level = Some("loud".to_string());
        let err = build_filter(p).unwrap_err();
        assert_eq!(err.code(), "INVALID_LEVEL");
    }

    #[test]
    fn both_message_filters_are_rejected() {
        let mut p = params("0", "10");
        p.message_contains = Some("a".to_string());
        p.message_regex = Some("b".to_string());
        let err = build_filter(p).unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");
        assert_eq!(err.to_string(), "Cannot use both filters");
    }

    #[test]
    fn bad_regex_is_rejected() {
        let mut p = params("0", "10");
        p.message_regex = Some("(unclosed".to_string());
        assert_eq!(build_filter(p).unwrap_err().code(), "INVALID_PARAMS");

        let mut p = params("0", "10");
        p.message_regex = Some("x".repeat(MAX_REGEX_LEN + 1));
        assert_eq!(build_filter(p).unwrap_err().code(), "INVALID_PARAMS");
    }

    #[test]
    fn limit_defaults_clamps_and_rejects_zero() {
        assert_eq!(build_filter(params("0", "10")).unwrap().limit, DEFAULT_LIMIT);

        let mut p = params("0", "10");
        p.limit = Some("5000".to_string());
        assert_eq!(build_filter(p).unwrap().limit, MAX_QUERY_LIMIT);

        let mut p = params("0", "10");
        p.limit = Some("0".to_string());
        assert_eq!(build_filter(p).unwrap_err().code(), "INVALID_PARAMS");

        let mut p = params("0", "10");
        p.limit = Some("ten".to_string());
        assert_eq!(build_filter(p).unwrap_err().code(), "INVALID_PARAMS");
    }
}
