//! HTTP surface tests against a live daemon on an ephemeral port.

use std::sync::Arc;

use drtrace_daemon::config::DaemonConfig;
use drtrace_daemon::routes::{self, AppState};
use drtrace_daemon::store::LogStore;
use serde_json::{json, Value};
use tempfile::TempDir;

struct TestDaemon {
    base_url: String,
    store: Arc<LogStore>,
    _tmp: TempDir,
}

async fn spawn_daemon() -> TestDaemon {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("logs.db");
    let store = Arc::new(LogStore::open(&db_path).await.unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = DaemonConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        retention_days: 7,
        db_path,
    };
    let app = routes::router(AppState::new(Arc::clone(&store), config));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestDaemon {
        base_url: format!("http://{addr}"),
        store,
        _tmp: tmp,
    }
}

fn sample_batch() -> Value {
    json!({
        "application_id": "shop",
        "logs": [
            {"ts": 100.5, "level": "info", "message": "order placed",
             "application_id": "shop", "module_name": "orders"},
            {"ts": 101.0, "level": "WARN", "message": "inventory low",
             "application_id": "shop", "module_name": "stock",
             "service_name": "warehouse",
             "context": {"language": "python", "sku": 42}},
            {"ts": 99.0, "level": "error", "message": "card declined",
             "application_id": "shop", "module_name": "payments",
             "exception_type": "CardError", "stacktrace": "trace"}
        ]
    })
}

#[tokio::test]
async fn status_reports_service_metadata() {
    let daemon = spawn_daemon().await;
    let resp = reqwest::get(format!("{}/status", daemon.base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "drtrace-daemon");
    assert_eq!(body["retention_days"], 7);
    assert!(body["version"].is_string());
    assert!(body["port"].is_number());
}

#[tokio::test]
async fn openapi_publishes_the_field_contract() {
    let daemon = spawn_daemon().await;
    let body: Value = reqwest::get(format!("{}/openapi.json", daemon.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // canonical name is ts, not timestamp
    assert!(body["components"]["schemas"]["LogRecord"]["properties"]["ts"].is_object());
    assert!(body["paths"]["/logs/query"].is_object());
    assert!(body["paths"]["/logs/ingest"].is_object());
}

#[tokio::test]
async fn ingest_then_query_round_trips_and_orders() {
    let daemon = spawn_daemon().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/logs/ingest", daemon.base_url))
        .json(&sample_batch())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["accepted"], 3);

    let resp = client
        .get(format!("{}/logs/query", daemon.base_url))
        .query(&[("start_ts", "0"), ("end_ts", "200")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 3);
    let results = body["results"].as_array().unwrap();

    // ascending (ts, id); uppercase level normalized on ingest
    assert_eq!(results[0]["message"], "card declined");
    assert_eq!(results[1]["message"], "order placed");
    assert_eq!(results[2]["message"], "inventory low");
    assert_eq!(results[2]["level"], "warn");
    assert_eq!(results[2]["context"]["sku"], 42);
    assert!(results[0]["id"].is_number());
}

#[tokio::test]
async fn tied_timestamps_keep_ingest_order() {
    let daemon = spawn_daemon().await;
    let client = reqwest::Client::new();
    let t = 500.0;

    let batch = json!({
        "application_id": "app",
        "logs": [
            {"ts": t, "level": "info", "message": "first at t",
             "application_id": "app", "module_name": "m"},
            {"ts": t, "level": "info", "message": "second at t",
             "application_id": "app", "module_name": "m"},
            {"ts": t - 0.001, "level": "info", "message": "earlier",
             "application_id": "app", "module_name": "m"}
        ]
    });
    client
        .post(format!("{}/logs/ingest", daemon.base_url))
        .json(&batch)
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{}/logs/query", daemon.base_url))
        .query(&[("start_ts", "0"), ("end_ts", "1000")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages: Vec<_> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(messages, ["earlier", "first at t", "second at t"]);
}

#[tokio::test]
async fn ingest_missing_required_field_rejects_the_batch() {
    let daemon = spawn_daemon().await;
    let client = reqwest::Client::new();

    let batch = json!({
        "application_id": "app",
        "logs": [
            {"ts": 1.0, "level": "info", "message": "ok",
             "application_id": "app", "module_name": "m"},
            {"ts": 2.0, "level": "info", "message": "no module",
             "application_id": "app"}
        ]
    });
    let resp = client
        .post(format!("{}/logs/ingest", daemon.base_url))
        .json(&batch)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"]["code"], "INVALID_PARAMS");

    // all-or-nothing: the valid record was not stored either
    let body: Value = client
        .get(format!("{}/logs/query", daemon.base_url))
        .query(&[("start_ts", "0"), ("end_ts", "10")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn ingest_unknown_level_rejects_the_batch() {
    let daemon = spawn_daemon().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/logs/ingest", daemon.base_url))
        .json(&json!({
            "application_id": "app",
            "logs": [{"ts": 1.0, "level": "loud", "message": "m",
                      "application_id": "app", "module_name": "m"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn mutually_exclusive_message_filters_are_rejected() {
    let daemon = spawn_daemon().await;
    let resp = reqwest::Client::new()
        .get(format!("{}/logs/query", daemon.base_url))
        .query(&[
            ("start_ts", "0"),
            ("end_ts", "10"),
            ("message_contains", "a"),
            ("message_regex", "b"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"]["code"], "INVALID_PARAMS");
    assert_eq!(body["detail"]["message"], "Cannot use both filters");
}

#[tokio::test]
async fn query_validation_codes() {
    let daemon = spawn_daemon().await;
    let client = reqwest::Client::new();
    let url = format!("{}/logs/query", daemon.base_url);

    let cases: [(&[(&str, &str)], &str); 5] = [
        (&[("start_ts", "10"), ("end_ts", "5")], "INVALID_TIME_RANGE"),
        (&[("start_ts", "0"), ("end_ts", "10"), ("min_level", "loud")], "INVALID_LEVEL"),
        (&[("start_ts", "yesterday"), ("end_ts", "10")], "INVALID_TIME_FORMAT"),
        (&[("start_ts", "0"), ("end_ts", "10"), ("limit", "0")], "INVALID_PARAMS"),
        (&[("end_ts", "10")], "INVALID_PARAMS"),
    ];
    for (query, code) in cases {
        let resp = client.get(&url).query(query).send().await.unwrap();
        assert_eq!(resp.status(), 400, "for {code}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["detail"]["code"], code);
    }
}

#[tokio::test]
async fn iso_8601_window_is_interpreted_as_utc() {
    let daemon = spawn_daemon().await;
    let client = reqwest::Client::new();

    // 1970-01-01T00:00:05 UTC
    daemon
        .store
        .append(&[lib_log_types::LogRecord {
            ts: 5.0,
            level: lib_log_types::LogLevel::Info,
            message: "epoch era".to_string(),
            application_id: "app".to_string(),
            module_name: "m".to_string(),
            service_name: None,
            file_path: None,
            line_no: None,
            exception_type: None,
            stacktrace: None,
            context: Default::default(),
        }])
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{}/logs/query", daemon.base_url))
        .query(&[
            ("start_ts", "1970-01-01T00:00:00"),
            ("end_ts", "1970-01-01T00:00:10"),
        ])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["message"], "epoch era");
}

#[tokio::test]
async fn message_filters_select_over_http() {
    let daemon = spawn_daemon().await;
    let client = reqwest::Client::new();
    client
        .post(format!("{}/logs/ingest", daemon.base_url))
        .json(&sample_batch())
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{}/logs/query", daemon.base_url))
        .query(&[("start_ts", "0"), ("end_ts", "200"), ("message_contains", "ORDER")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["message"], "order placed");

    let body: Value = client
        .get(format!("{}/logs/query", daemon.base_url))
        .query(&[("start_ts", "0"), ("end_ts", "200"), ("message_regex", "declined$")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["message"], "card declined");
}

#[tokio::test]
async fn min_level_floor_over_http() {
    let daemon = spawn_daemon().await;
    let client = reqwest::Client::new();
    client
        .post(format!("{}/logs/ingest", daemon.base_url))
        .json(&sample_batch())
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{}/logs/query", daemon.base_url))
        .query(&[("start_ts", "0"), ("end_ts", "200"), ("min_level", "warn")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn clear_deletes_then_reports_zero() {
    let daemon = spawn_daemon().await;
    let client = reqwest::Client::new();
    client
        .post(format!("{}/logs/ingest", daemon.base_url))
        .json(&sample_batch())
        .send()
        .await
        .unwrap();

    let url = format!("{}/logs/clear", daemon.base_url);
    let body: Value = client
        .post(&url)
        .query(&[("application_id", "shop")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["deleted"], 3);

    let body: Value = client
        .post(&url)
        .query(&[("application_id", "shop")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["deleted"], 0);

    let resp = client.post(&url).send().await.unwrap();
    assert_eq!(resp.status(), 400);
}
