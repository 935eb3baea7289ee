//! SQLite record sink
//!
//! Records land in a single `records` table, one row per appended record,
//! with the wire field names as column names and an RFC 3339 `scraped_at`
//! timestamp.

use crate::output::traits::{RecordSink, SinkResult};
use crate::output::Record;
use crate::SinkError;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// SQL schema for the records table
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    telefone TEXT NOT NULL,
    titulo TEXT NOT NULL,
    preco TEXT NOT NULL,
    descricao TEXT NOT NULL,
    cidade TEXT NOT NULL,
    ano TEXT NOT NULL,
    km TEXT NOT NULL,
    modelo TEXT NOT NULL,
    vendedor TEXT NOT NULL,
    particular INTEGER NOT NULL,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_url ON records(url);
"#;

/// SQLite-backed record sink
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Opens (or creates) the database and its schema
    pub fn open(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored records
    pub fn count(&self) -> SinkResult<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SinkError::Unavailable(format!("Failed to lock database: {}", e)))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RecordSink for SqliteSink {
    fn append(&self, record: &Record) -> SinkResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self
            .conn
            .lock()
            .map_err(|e| SinkError::Unavailable(format!("Failed to lock database: {}", e)))?;

        conn.execute(
            "INSERT INTO records (url, telefone, titulo, preco, descricao, cidade, ano, km, modelo, vendedor, particular, scraped_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.url,
                record.phone,
                record.title,
                record.price,
                record.description,
                record.city,
                record.year,
                record.mileage,
                record.model,
                record.seller,
                record.is_private_seller,
                now,
            ],
        )?;

        Ok(())
    }
}
