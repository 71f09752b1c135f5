//! The log store: an append-heavy, time-indexed SQLite table.
//!
//! Ids come from the table's AUTOINCREMENT rowid, so they are 64-bit and
//! strictly increasing for the lifetime of the store. Stored records are
//! never mutated; retention and the administrative clear are the only
//! deletion paths.

use std::path::Path;
use std::str::FromStr;

use lib_log_types::{LogLevel, LogRecord, StoredRecord};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;

/// Hard cap on query result size.
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Page size for scans that filter messages in Rust.
const SCAN_PAGE: usize = 512;

/// Message filter - substring and regex are mutually exclusive at the API
/// layer, so the store only ever sees one.
#[derive(Debug, Clone)]
pub enum MessageFilter {
    /// Case-insensitive substring; held lowercased.
    Contains(String),
    Regex(regex::Regex),
}

impl MessageFilter {
    pub fn contains(needle: &str) -> Self {
        Self::Contains(needle.to_lowercase())
    }

    fn matches(&self, message: &str) -> bool {
        match self {
            Self::Contains(needle) => message.to_lowercase().contains(needle.as_str()),
            Self::Regex(re) => re.is_match(message),
        }
    }
}

/// A fully validated query against the store.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    /// Inclusive window; `start_ts == end_ts` is a valid instantaneous one.
    pub start_ts: f64,
    pub end_ts: f64,
    pub application_id: Option<String>,
    pub module_name: Option<String>,
    pub service_name: Option<String>,
    /// Ordinal floor: records below this level are excluded.
    pub min_level: Option<LogLevel>,
    pub message: Option<MessageFilter>,
    pub limit: usize,
}

impl QueryFilter {
    pub fn window(start_ts: f64, end_ts: f64) -> Self {
        Self {
            start_ts,
            end_ts,
            application_id: None,
            module_name: None,
            service_name: None,
            min_level: None,
            message: None,
            limit: MAX_QUERY_LIMIT,
        }
    }
}

pub struct LogStore {
    pool: SqlitePool,
}

impl LogStore {
    /// Open (creating if missing) a store at `path`.
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory store. A single connection: each SQLite `:memory:`
    /// connection is its own database.
    pub async fn open_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS logs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                ts              REAL NOT NULL,
                level           TEXT NOT NULL,
                level_no        INTEGER NOT NULL,
                message         TEXT NOT NULL,
                application_id  TEXT NOT NULL,
                module_name     TEXT NOT NULL,
                service_name    TEXT,
                file_path       TEXT,
                line_no         INTEGER,
                exception_type  TEXT,
                stacktrace      TEXT,
                context         TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_logs_app_ts ON logs(application_id, ts)",
            "CREATE INDEX IF NOT EXISTS idx_logs_service_ts ON logs(service_name, ts)",
            "CREATE INDEX IF NOT EXISTS idx_logs_module_ts ON logs(module_name, ts)",
            "CREATE INDEX IF NOT EXISTS idx_logs_ts ON logs(ts)",
        ] {
            sqlx::query(statement).execute(pool).await?;
        }

        Ok(())
    }

    /// Append a batch. All-or-nothing: one transaction commits every record
    /// or none. Returns the number of records accepted.
    pub async fn append(&self, records: &[LogRecord]) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            let context = if record.context.is_empty() {
                None
            } else {
                serde_json::to_string(&record.context).ok()
            };
            sqlx::query(
                r#"
                INSERT INTO logs (
                    ts, level, level_no, message, application_id, module_name,
                    service_name, file_path, line_no, exception_type, stacktrace, context
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.ts)
            .bind(record.level.as_str())
            .bind(record.level.ordinal() as i64)
            .bind(&record.message)
            .bind(&record.application_id)
            .bind(&record.module_name)
            .bind(&record.service_name)
            .bind(&record.file_path)
            .bind(record.line_no.map(|n| n as i64))
            .bind(&record.exception_type)
            .bind(&record.stacktrace)
            .bind(context)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!("appended {} records", records.len());
        Ok(records.len() as u64)
    }

    /// Windowed, filtered retrieval in ascending `(ts, id)` order.
    ///
    /// SQL handles the window, equality filters and level floor over the
    /// time indexes. Message filtering runs in Rust over keyset-paginated
    /// scans, so a sparse regex match never materializes an unbounded
    /// result set.
    pub async fn query(&self, filter: &QueryFilter) -> Result<Vec<StoredRecord>, sqlx::Error> {
        let limit = filter.limit.min(MAX_QUERY_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let Some(message_filter) = &filter.message else {
            let rows = self.fetch_page(filter, None, limit).await?;
            return Ok(rows.into_iter().map(StoredRecord::from).collect());
        };

        let mut results = Vec::new();
        let mut after: Option<(f64, i64)> = None;
        loop {
            let rows = self.fetch_page(filter, after, SCAN_PAGE).await?;
            let page_len = rows.len();
            if let Some(last) = rows.last() {
                after = Some((last.ts, last.id));
            }
            for row in rows {
                if message_filter.matches(&row.message) {
                    results.push(StoredRecord::from(row));
                    if results.len() == limit {
                        return Ok(results);
                    }
                }
            }
            if page_len < SCAN_PAGE {
                return Ok(results);
            }
        }
    }

    async fn fetch_page(
        &self,
        filter: &QueryFilter,
        after: Option<(f64, i64)>,
        limit: usize,
    ) -> Result<Vec<LogRow>, sqlx::Error> {
        let mut qb: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT id, ts, level, message, application_id, module_name, \
             service_name, file_path, line_no, exception_type, stacktrace, context \
             FROM logs WHERE ts >= ",
        );
        qb.push_bind(filter.start_ts);
        qb.push(" AND ts <= ").push_bind(filter.end_ts);

        if let Some(application_id) = &filter.application_id {
            qb.push(" AND application_id = ").push_bind(application_id);
        }
        if let Some(module_name) = &filter.module_name {
            qb.push(" AND module_name = ").push_bind(module_name);
        }
        if let Some(service_name) = &filter.service_name {
            qb.push(" AND service_name = ").push_bind(service_name);
        }
        if let Some(min_level) = filter.min_level {
            qb.push(" AND level_no >= ").push_bind(min_level.ordinal() as i64);
        }
        if let Some((ts, id)) = after {
            qb.push(" AND (ts > ")
                .push_bind(ts)
                .push(" OR (ts = ")
                .push_bind(ts)
                .push(" AND id > ")
                .push_bind(id)
                .push("))");
        }

        qb.push(" ORDER BY ts ASC, id ASC LIMIT ").push_bind(limit as i64);

        qb.build_query_as::<LogRow>().fetch_all(&self.pool).await
    }

    /// Delete records with `ts < cutoff_ts`. Returns the count removed.
    pub async fn purge_older_than(&self, cutoff_ts: f64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM logs WHERE ts < ?")
            .bind(cutoff_ts)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every record for one application. Returns the count removed.
    pub async fn clear(&self, application_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM logs WHERE application_id = ?")
            .bind(application_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    ts: f64,
    level: String,
    message: String,
    application_id: String,
    module_name: String,
    service_name: Option<String>,
    file_path: Option<String>,
    line_no: Option<i64>,
    exception_type: Option<String>,
    stacktrace: Option<String>,
    context: Option<String>,
}

impl From<LogRow> for StoredRecord {
    fn from(row: LogRow) -> Self {
        Self {
            id: row.id,
            record: LogRecord {
                ts: row.ts,
                // levels are validated on ingest; Debug only covers rows
                // written by something other than this daemon
                level: LogLevel::from_str(&row.level).unwrap_or(LogLevel::Debug),
                message: row.message,
                application_id: row.application_id,
                module_name: row.module_name,
                service_name: row.service_name,
                file_path: row.file_path,
                line_no: row.line_no.map(|n| n as u32),
                exception_type: row.exception_type,
                stacktrace: row.stacktrace,
                context: row
                    .context
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_default(),
            },
        }
    }
}
