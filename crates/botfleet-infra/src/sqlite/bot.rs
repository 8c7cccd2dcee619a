//! SQLite bot repository implementation.
//!
//! Implements `BotRepository` from `botfleet-core` using sqlx with split
//! read/write pools. Row creation belongs to the admin surface; [`insert`]
//! is exposed for it. The engine itself only reads rows and flips flags.
//!
//! [`insert`]: SqliteBotRepository::insert

use botfleet_core::repository::bot::BotRepository;
use botfleet_types::bot::{AuthFlags, BotId, BotIdentity};
use botfleet_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `BotRepository`.
pub struct SqliteBotRepository {
    pool: DatabasePool,
}

impl SqliteBotRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create a bot row. Fails with `Conflict` when the id already exists.
    pub async fn insert(&self, bot: &BotIdentity) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO bots (id, proxy, display_name, instructions, contact_link, is_active, is_auth, otp_requested, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(bot.id.to_string())
        .bind(&bot.proxy)
        .bind(&bot.display_name)
        .bind(&bot.instructions)
        .bind(&bot.contact_link)
        .bind(bot.is_active)
        .bind(bot.is_auth)
        .bind(bot.otp_requested)
        .bind(format_datetime(&bot.created_at))
        .bind(format_datetime(&bot.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("bot '{}' already exists", bot.id)),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }
}

/// Internal row type for mapping SQLite rows to a domain identity.
struct BotRow {
    id: String,
    proxy: String,
    display_name: String,
    instructions: Option<String>,
    contact_link: Option<String>,
    is_active: bool,
    is_auth: bool,
    otp_requested: bool,
    created_at: String,
    updated_at: String,
}

impl BotRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            proxy: row.try_get("proxy")?,
            display_name: row.try_get("display_name")?,
            instructions: row.try_get("instructions")?,
            contact_link: row.try_get("contact_link")?,
            is_active: row.try_get("is_active")?,
            is_auth: row.try_get("is_auth")?,
            otp_requested: row.try_get("otp_requested")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_identity(self) -> Result<BotIdentity, RepositoryError> {
        let id = self
            .id
            .parse::<BotId>()
            .map_err(|e| RepositoryError::Query(format!("invalid bot id: {e}")))?;

        Ok(BotIdentity {
            id,
            proxy: self.proxy,
            display_name: self.display_name,
            instructions: self.instructions,
            contact_link: self.contact_link,
            is_active: self.is_active,
            is_auth: self.is_auth,
            otp_requested: self.otp_requested,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl BotRepository for SqliteBotRepository {
    async fn get(&self, id: BotId) -> Result<Option<BotIdentity>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM bots WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let bot_row =
                    BotRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(bot_row.into_identity()?))
            }
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<BotIdentity>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM bots ORDER BY created_at")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut bots = Vec::with_capacity(rows.len());
        for row in &rows {
            let bot_row =
                BotRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            bots.push(bot_row.into_identity()?);
        }
        Ok(bots)
    }

    async fn list_active(&self) -> Result<Vec<BotIdentity>, RepositoryError> {
        // Goes through the writer connection: this feeds restart recovery
        // and must observe flag flips that just committed, which the WAL
        // reader pool may still see stale.
        let rows = sqlx::query("SELECT * FROM bots WHERE is_active = 1 ORDER BY created_at")
            .fetch_all(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut bots = Vec::with_capacity(rows.len());
        for row in &rows {
            let bot_row =
                BotRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            bots.push(bot_row.into_identity()?);
        }
        Ok(bots)
    }

    async fn set_active(&self, id: BotId, active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bots SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(format_datetime(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_auth_flags(&self, id: BotId, flags: AuthFlags) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE bots SET otp_requested = ?, is_auth = ?, updated_at = ? WHERE id = ?",
        )
        .bind(flags.otp_requested)
        .bind(flags.is_auth)
        .bind(format_datetime(&Utc::now()))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
