//! Opening the cache database.

use crate::error::{DatabaseResultExt, ErrorKind, Result};
use exn::ResultExt;
use sqlx::Executor;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// Schema migrations, embedded at build time and applied on every connect.
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite serializes writers, so extra connections only help concurrent readers.
const POOL_SIZE: u32 = 4;
/// A full resync holds the write lock one upsert at a time while webhooks and
/// readers keep arriving; waiting this long keeps them from surfacing as busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(3);
/// Per-connection settings without a builder method on the connect options.
const PRAGMAS: &str = "
    PRAGMA cache_size = -16384;
    PRAGMA temp_store = MEMORY;
    PRAGMA wal_autocheckpoint = 1000;
";

/// Connection pool over the content cache.
///
/// Cheap to clone. Build a [`Repository`](crate::Repository) from it to write
/// and a [`Reader`](crate::Reader) to query.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the cache at `path` and bring its schema up to date.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(path.as_ref()).create_if_missing(true);
        Self::open(options, POOL_SIZE).await
    }

    /// Open a private in-memory cache.
    ///
    /// Not test-only: other crates build their test fixtures on it.
    pub async fn connect_in_memory() -> Result<Self> {
        // Every connection to ":memory:" gets its own database, so the pool
        // must never open a second one.
        Self::open(SqliteConnectOptions::new().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, connections: u32) -> Result<Self> {
        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(connections)
            // Runs for every connection the pool opens, not only the first.
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute(sqlx::raw_sql(PRAGMAS)).await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .or_database()?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    #[instrument(skip_all)]
    async fn migrate(pool: &SqlitePool) -> Result<()> {
        MIGRATOR.run(pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Version of the newest migration applied to this database.
    pub async fn schema_version(&self) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(&self.pool)
            .await
            .or_database()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections to come back, then close the pool.
    pub async fn close(&self) {
        // Refresh planner statistics after a sync; failure here is harmless.
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;
    use mirror_content::EntityKind;

    #[tokio::test]
    async fn test_schema_is_current_after_connect() {
        let db = Database::connect_in_memory().await.unwrap();
        let latest = MIGRATOR.iter().map(|m| m.version).max();
        assert_eq!(db.schema_version().await.unwrap(), latest);
        // Re-running is a no-op.
        Database::migrate(db.pool()).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), latest);
        db.close().await;
    }

    #[tokio::test]
    async fn test_connection_settings() {
        let db = Database::connect_in_memory().await.unwrap();
        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(db.pool()).await.unwrap();
        assert_eq!(foreign_keys, 1);
        let cache_size: i64 = sqlx::query_scalar("PRAGMA cache_size").fetch_one(db.pool()).await.unwrap();
        assert_eq!(cache_size, -16384);
        db.close().await;
    }

    #[tokio::test]
    async fn test_every_kind_has_a_table() {
        let db = Database::connect_in_memory().await.unwrap();
        for kind in EntityKind::ALL {
            let table = Table::of(kind).name;
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(db.pool())
                .await
                .unwrap();
            assert_eq!(count, 0, "{table}");
        }
        db.close().await;
    }

    #[tokio::test]
    async fn test_connect_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let db = Database::connect(&path).await.unwrap();
        assert!(path.exists());
        assert!(db.schema_version().await.unwrap().is_some());
        db.close().await;
    }
}
