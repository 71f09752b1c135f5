//! Schema publisher.
//!
//! The document served at `GET /openapi.json` is the single source of
//! truth for field names: consumers are expected to discover parameter and
//! record field names (notably `ts`, not `timestamp`) from here instead of
//! hard-coding them, so the response bodies of this daemon must match it
//! exactly.

use serde_json::{json, Value};

/// The set of error codes the `detail.code` field can carry.
///
/// `INVALID_QUERY_TYPE` and `QUERY_NOT_FOUND` are reserved by the analysis
/// surface built on top of this API and are published for completeness.
pub const ERROR_CODES: [&str; 6] = [
    "INVALID_PARAMS",
    "INVALID_TIME_RANGE",
    "INVALID_LEVEL",
    "INVALID_TIME_FORMAT",
    "INVALID_QUERY_TYPE",
    "QUERY_NOT_FOUND",
];

/// Build the OpenAPI document.
pub fn document() -> Value {
    let log_record = json!({
        "type": "object",
        "required": ["ts", "level", "message", "application_id", "module_name"],
        "properties": {
            "ts": {
                "type": "number",
                "format": "double",
                "description": "Event time, UTC seconds since the Unix epoch; sub-second precision preserved"
            },
            "level": {
                "type": "string",
                "enum": ["debug", "info", "warn", "error", "critical"],
                "description": "Severity; case-insensitive on input, stored lowercase"
            },
            "message": { "type": "string" },
            "application_id": { "type": "string" },
            "module_name": { "type": "string" },
            "service_name": { "type": "string", "nullable": true },
            "file_path": { "type": "string", "nullable": true },
            "line_no": { "type": "integer", "minimum": 0, "nullable": true },
            "exception_type": { "type": "string", "nullable": true },
            "stacktrace": { "type": "string", "nullable": true },
            "context": {
                "type": "object",
                "additionalProperties": true,
                "description": "Free-form extension mapping; defaults to empty"
            }
        }
    });

    let mut stored_record = log_record.clone();
    {
        let obj = stored_record.as_object_mut().unwrap();
        obj["required"] = json!(["id", "ts", "level", "message", "application_id", "module_name"]);
        obj["properties"]["id"] = json!({
            "type": "integer",
            "format": "int64",
            "description": "Store-assigned, strictly increasing"
        });
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "DrTrace Daemon",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Host-local log ingestion, storage, query and retention"
        },
        "paths": {
            "/status": {
                "get": {
                    "summary": "Service metadata and liveness",
                    "responses": {
                        "200": {
                            "description": "Service metadata",
                            "content": { "application/json": { "schema": {
                                "type": "object",
                                "properties": {
                                    "service": { "type": "string" },
                                    "version": { "type": "string" },
                                    "host": { "type": "string" },
                                    "port": { "type": "integer" },
                                    "retention_days": { "type": "integer" }
                                }
                            }}}
                        }
                    }
                }
            },
            "/openapi.json": {
                "get": {
                    "summary": "This document",
                    "responses": { "200": { "description": "OpenAPI schema" } }
                }
            },
            "/logs/ingest": {
                "post": {
                    "summary": "Ingest a batch of log records",
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/LogBatch" } } }
                    },
                    "responses": {
                        "202": {
                            "description": "Batch accepted",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/IngestResponse" } } }
                        },
                        "422": {
                            "description": "Schema violation; the whole batch is rejected",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
                        }
                    }
                }
            },
            "/logs/query": {
                "get": {
                    "summary": "Windowed, filtered log retrieval ordered by (ts, id)",
                    "parameters": [
                        { "name": "start_ts", "in": "query", "required": true,
                          "schema": { "type": "number" },
                          "description": "Inclusive window start; float UTC seconds or ISO 8601 (zone-less is UTC)" },
                        { "name": "end_ts", "in": "query", "required": true,
                          "schema": { "type": "number" },
                          "description": "Inclusive window end" },
                        { "name": "application_id", "in": "query", "schema": { "type": "string" } },
                        { "name": "module_name", "in": "query", "schema": { "type": "string" } },
                        { "name": "service_name", "in": "query", "schema": { "type": "string" } },
                        { "name": "min_level", "in": "query",
                          "schema": { "type": "string", "enum": ["debug", "info", "warn", "error", "critical"] },
                          "description": "Ordinal floor: lower levels are excluded" },
                        { "name": "message_contains", "in": "query", "schema": { "type": "string" },
                          "description": "Case-insensitive substring filter; mutually exclusive with message_regex" },
                        { "name": "message_regex", "in": "query",
                          "schema": { "type": "string", "maxLength": 500 },
                          "description": "Regex filter; mutually exclusive with message_contains" },
                        { "name": "limit", "in": "query",
                          "schema": { "type": "integer", "minimum": 1, "maximum": 1000, "default": 100 } }
                    ],
                    "responses": {
                        "200": {
                            "description": "Matching records",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/QueryResponse" } } }
                        },
                        "400": {
                            "description": "Invalid parameters",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
                        }
                    }
                }
            },
            "/logs/clear": {
                "post": {
                    "summary": "Delete every record for one application",
                    "parameters": [
                        { "name": "application_id", "in": "query", "required": true,
                          "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "200": {
                            "description": "Deletion count",
                            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ClearResponse" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "LogRecord": log_record,
                "StoredRecord": stored_record,
                "LogBatch": {
                    "type": "object",
                    "required": ["application_id", "logs"],
                    "properties": {
                        "application_id": { "type": "string" },
                        "logs": { "type": "array", "items": { "$ref": "#/components/schemas/LogRecord" } }
                    }
                },
                "IngestResponse": {
                    "type": "object",
                    "properties": { "accepted": { "type": "integer" } }
                },
                "QueryResponse": {
                    "type": "object",
                    "properties": {
                        "results": { "type": "array", "items": { "$ref": "#/components/schemas/StoredRecord" } },
                        "count": { "type": "integer" }
                    }
                },
                "ClearResponse": {
                    "type": "object",
                    "properties": { "deleted": { "type": "integer" } }
                },
                "Error": {
                    "type": "object",
                    "properties": {
                        "detail": {
                            "type": "object",
                            "properties": {
                                "code": { "type": "string", "enum": ERROR_CODES },
                                "message": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    })
}
