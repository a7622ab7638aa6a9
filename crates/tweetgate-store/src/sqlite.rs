//! SQLite-backed `EntityStore` implementation with durable persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::{ActionRecord, EntityStore, StoreError, StoreResult};

/// Persistent SQLite store shared by every service in the process.
#[derive(Debug)]
pub struct SqliteEntityStore {
    db_path: PathBuf,
}

impl SqliteEntityStore {
    /// Opens (or creates) the database at `path` and bootstraps the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { db_path };
        let connection = store.open_connection()?;
        initialize_schema(&connection)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Ok(connection)
    }
}

fn initialize_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS blacklist (
            entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
            screen_name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS actions (
            action_id INTEGER PRIMARY KEY AUTOINCREMENT,
            service TEXT NOT NULL,
            tweet_id TEXT NOT NULL,
            screen_name TEXT NOT NULL,
            text TEXT NOT NULL,
            account TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_actions_service ON actions (service, action_id);
        "#,
    )?;
    Ok(())
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn is_blacklisted(&self, screen_name: &str) -> StoreResult<bool> {
        let connection = self.open_connection()?;
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM blacklist WHERE screen_name = ?1",
            params![screen_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn add_to_blacklist(&self, screen_name: &str) -> StoreResult<bool> {
        let connection = self.open_connection()?;
        let inserted = connection.execute(
            "INSERT OR IGNORE INTO blacklist (screen_name) VALUES (?1)",
            params![screen_name],
        )?;
        Ok(inserted > 0)
    }

    async fn list_blacklist(&self) -> StoreResult<Vec<String>> {
        let connection = self.open_connection()?;
        let mut statement =
            connection.prepare("SELECT screen_name FROM blacklist ORDER BY entry_id")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    async fn append_action(&self, record: ActionRecord) -> StoreResult<()> {
        let connection = self.open_connection()?;
        connection.execute(
            r#"
            INSERT INTO actions (service, tweet_id, screen_name, text, account, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.service,
                record.tweet_id,
                record.screen_name,
                record.text,
                record.account,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn list_actions(&self, service: Option<&str>) -> StoreResult<Vec<ActionRecord>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare(
            r#"
            SELECT service, tweet_id, screen_name, text, account, created_at
            FROM actions
            WHERE ?1 IS NULL OR service = ?1
            ORDER BY action_id
            "#,
        )?;
        let rows = statement.query_map(params![service], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (service, tweet_id, screen_name, text, account, created_at) = row?;
            records.push(ActionRecord {
                service,
                tweet_id,
                screen_name,
                text,
                account,
                created_at: timestamp_from_db(&created_at)?,
            });
        }
        Ok(records)
    }
}

fn timestamp_from_db(raw: &str) -> StoreResult<DateTime<Utc>> {
    if raw.trim().is_empty() {
        return Err(StoreError::InvalidPersistedValue {
            field: "created_at",
            value: raw.to_string(),
        });
    }
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
