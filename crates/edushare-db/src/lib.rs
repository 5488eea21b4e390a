pub mod comments;
pub mod content;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod users;
pub mod votes;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Format of every timestamp column (`strftime('%Y-%m-%d %H:%M:%f')`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Same connection as `with_conn`; kept separate so write paths are easy to find.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}

/// Renders a UTC instant in the same layout SQLite writes, so text comparison
/// orders correctly against stored columns.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp. Accepts values with or without milliseconds and
/// RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use uuid::Uuid;

    use crate::Database;
    use crate::content::ContentKind;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, name: &str, points: i64) -> String {
        let id = Uuid::new_v4().to_string();
        let created = db
            .create_user(&id, &format!("{name}@example.com"), name, "hash", points)
            .unwrap();
        assert_eq!(created, crate::models::CreateUserOutcome::Created);
        id
    }

    pub fn post(db: &Database, author: &str, title: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_content(ContentKind::Post, &id, author, title, "body", &[], &[])
            .unwrap();
        id
    }

    pub fn question(db: &Database, author: &str, title: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_content(ContentKind::Question, &id, author, title, "body", &[], &[])
            .unwrap();
        id
    }

    pub fn set_created_at(db: &Database, table: &str, id: &str, ts: &str) {
        db.with_conn_mut(|conn| {
            conn.execute(
                &format!("UPDATE {table} SET created_at = ?1 WHERE id = ?2"),
                (ts, id),
            )?;
            Ok(())
        })
        .unwrap();
    }
}
