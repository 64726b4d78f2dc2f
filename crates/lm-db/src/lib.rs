//! Storage layer for license usage records.
//!
//! Provides persistence for parsed usage snapshots using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Rollups that run in parallel should load a product's history once with
//! [`Database::load_history`] and aggregate the in-memory copy.
//!
//! # Schema
//!
//! One table holds every tracked product, keyed by `(product, timestamp)`.
//!
//! ## Timestamp Format
//!
//! Timestamps are local wall-clock times stored as TEXT in the form
//! `2024-02-24T17:00:00.000`. The fixed width keeps lexicographic ordering
//! identical to chronological ordering, so window queries compare strings.
//! Sub-millisecond precision is not stored.
//!
//! ## User Storage
//!
//! The `users` column holds the user names joined with commas, in the order
//! the status report listed them.

use std::borrow::Cow;
use std::path::Path;

use chrono::NaiveDateTime;
use lm_core::record::split_users;
use lm_core::window::history_span;
use lm_core::{History, ProductName, UsageRecord, ValidationError, WindowError, WindowSource};
use rusqlite::{Connection, Row, params};
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {product}: {timestamp}")]
    TimestampParse {
        product: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// The requested history cannot be expressed as a time window.
    #[error("invalid history window: {0}")]
    Window(#[from] WindowError),
    /// A stored row does not form a valid record.
    #[error("invalid record for {product} at {timestamp}")]
    InvalidRecord {
        product: String,
        timestamp: String,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Number of stored records and the latest observation for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStatus {
    pub product: String,
    pub records: i64,
    pub last_seen: String,
}

/// A stored row before validation.
struct RecordRow {
    product: String,
    timestamp: String,
    in_use: u32,
    users: String,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            product: row.get(0)?,
            timestamp: row.get(1)?,
            in_use: row.get(2)?,
            users: row.get(3)?,
        })
    }

    fn into_record(self) -> Result<UsageRecord, DbError> {
        let timestamp = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map_err(|source| DbError::TimestampParse {
                product: self.product.clone(),
                timestamp: self.timestamp.clone(),
                source,
            })?;
        let invalid = |source| DbError::InvalidRecord {
            product: self.product.clone(),
            timestamp: self.timestamp.clone(),
            source,
        };
        let product = ProductName::new(self.product.as_str()).map_err(invalid)?;
        UsageRecord::new(product, timestamp, self.in_use, split_users(&self.users))
            .map_err(invalid)
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- usage_records: one row per product per collection run
            -- timestamp: local time, '%Y-%m-%dT%H:%M:%S.fff'
            -- users: comma-separated, length matches in_use
            CREATE TABLE IF NOT EXISTS usage_records (
                product TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                in_use INTEGER NOT NULL,
                users TEXT NOT NULL,
                PRIMARY KEY (product, timestamp)
            );

            CREATE INDEX IF NOT EXISTS idx_usage_records_timestamp ON usage_records(timestamp);
            ",
        )?;
        Ok(())
    }

    /// Appends a parsed batch in a single transaction.
    ///
    /// Records that collide with an existing `(product, timestamp)` are ignored.
    /// Returns the number of rows inserted.
    pub fn append_records(&mut self, records: &[UsageRecord]) -> Result<usize, DbError> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO usage_records (product, timestamp, in_use, users)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for record in records {
                inserted += stmt.execute(params![
                    record.product().as_str(),
                    format_timestamp(record.timestamp()),
                    record.in_use(),
                    record.users_field(),
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, total = records.len(), "appended usage records");
        Ok(inserted)
    }

    /// Lists records for a product within a time range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`; rows come
    /// back in timestamp order.
    pub fn query_records(
        &self,
        product: &ProductName,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<UsageRecord>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT product, timestamp, in_use, users
            FROM usage_records
            WHERE product = ? AND timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                product.as_str(),
                format_timestamp(start),
                format_timestamp(end)
            ],
            RecordRow::from_row,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    /// Loads every record a `history_days` rollup ending at `now` can see.
    pub fn load_history(
        &self,
        product: &ProductName,
        now: NaiveDateTime,
        history_days: u32,
    ) -> Result<History, DbError> {
        let (start, end) = history_span(now, history_days)?;
        let records = self.query_records(product, start, end)?;
        tracing::debug!(%product, records = records.len(), %start, %end, "loaded history");
        Ok(History::new(product.clone(), records))
    }

    /// Record counts and latest timestamps per product, most recent first.
    pub fn product_status(&self) -> Result<Vec<ProductStatus>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT product, COUNT(*) AS records, MAX(timestamp) AS last_seen
            FROM usage_records
            GROUP BY product
            ORDER BY last_seen DESC, product ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProductStatus {
                product: row.get(0)?,
                records: row.get(1)?,
                last_seen: row.get(2)?,
            })
        })?;
        let mut statuses = Vec::new();
        for row in rows {
            statuses.push(row?);
        }
        Ok(statuses)
    }
}

impl WindowSource for Database {
    type Error = DbError;

    fn records_in(
        &self,
        product: &ProductName,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Cow<'_, [UsageRecord]>, Self::Error> {
        self.query_records(product, start, end).map(Cow::Owned)
    }
}

fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
