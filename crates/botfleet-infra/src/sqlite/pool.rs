//! SQLite connection pools for the fleet database.
//!
//! Every bot loop, the auth service, and restart recovery share one SQLite
//! file, and SQLite tolerates exactly one writer. [`DatabasePool`] keeps
//! reads and writes on separate pools so that a busy writer never starves
//! the readers: an 8-connection read-only pool for queries, a single
//! connection for all mutations. WAL journaling and foreign keys are on
//! for both.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Paired reader/writer pools over one SQLite file.
///
/// `reader` serves SELECTs concurrently; `writer` serializes every
/// mutation through its single connection. Cloning shares both pools.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open both pools for `database_url`, creating the file if needed,
    /// and apply pending migrations on the writer before the reader
    /// opens. Connections run WAL with foreign keys enforced and a
    /// 5-second busy timeout.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // The reader is read-only, so the schema must exist before it opens
        sqlx::migrate!("../../migrations")
            .run(&writer)
            .await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }
}

/// Database URL used when `config.toml` names none: `botfleet.db` inside
/// `BOTFLEET_DATA_DIR`, or `~/.botfleet/` without the env var.
pub fn default_database_url() -> String {
    let data_dir = std::env::var("BOTFLEET_DATA_DIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.botfleet")
    });
    format!("sqlite://{data_dir}/botfleet.db")
}
