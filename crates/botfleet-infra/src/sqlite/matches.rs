//! SQLite match repository implementation.
//!
//! Inserts are duplicate-checked by the platform match id's UNIQUE
//! constraint; losing that race reports `Duplicate` instead of erroring, so
//! concurrent pollers stay quiet.

use botfleet_core::repository::matches::MatchRepository;
use botfleet_types::error::RepositoryError;
use botfleet_types::match_record::{MatchInsert, MatchRecord, NewMatchRecord};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MatchRepository`.
pub struct SqliteMatchRepository {
    pool: DatabasePool,
}

impl SqliteMatchRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl MatchRepository for SqliteMatchRepository {
    async fn add(&self, record: &NewMatchRecord) -> Result<MatchInsert, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO bot_matches (bot_id, match_id, peer, name, gender, matched_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.bot_id.to_string())
        .bind(&record.match_id)
        .bind(&record.peer)
        .bind(&record.name)
        .bind(&record.gender)
        .bind(record.matched_at)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(MatchInsert::Created),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Ok(MatchInsert::Duplicate)
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get_by_match_id(&self, match_id: &str) -> Result<Option<MatchRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM bot_matches WHERE match_id = ?")
            .bind(match_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            let bot_id: String = row
                .try_get("bot_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let created_at: String = row
                .try_get("created_at")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

            Ok(MatchRecord {
                bot_id: bot_id
                    .parse()
                    .map_err(|e| RepositoryError::Query(format!("invalid bot id: {e}")))?,
                match_id: row
                    .try_get("match_id")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                peer: row
                    .try_get("peer")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                name: row
                    .try_get("name")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                gender: row
                    .try_get("gender")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                matched_at: row
                    .try_get("matched_at")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteBotRepository;
    use botfleet_types::bot::{BotId, BotIdentity};

    async fn pool_with_bot() -> (DatabasePool, BotId) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        let pool = DatabasePool::new(&url).await.unwrap();

        let now = Utc::now();
        let bot = BotIdentity {
            id: BotId::new(),
            proxy: "http://proxy.example:3128".to_string(),
            display_name: "Matcher".to_string(),
            instructions: None,
            contact_link: None,
            is_active: false,
            is_auth: false,
            otp_requested: false,
            created_at: now,
            updated_at: now,
        };
        SqliteBotRepository::new(pool.clone())
            .insert(&bot)
            .await
            .unwrap();
        (pool, bot.id)
    }

    fn record(bot_id: BotId, match_id: &str) -> NewMatchRecord {
        NewMatchRecord {
            bot_id,
            match_id: match_id.to_string(),
            peer: "ploy".to_string(),
            name: "Ploy".to_string(),
            gender: Some("f".to_string()),
            matched_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn add_then_get_roundtrips() {
        let (pool, bot_id) = pool_with_bot().await;
        let repo = SqliteMatchRepository::new(pool);

        let inserted = repo.add(&record(bot_id, "m-1")).await.unwrap();
        assert_eq!(inserted, MatchInsert::Created);

        let found = repo.get_by_match_id("m-1").await.unwrap().unwrap();
        assert_eq!(found.bot_id, bot_id);
        assert_eq!(found.peer, "ploy");
        assert_eq!(found.matched_at, 1_700_000_000);
    }

    #[tokio::test]
    async fn conflicting_insert_reports_duplicate() {
        let (pool, bot_id) = pool_with_bot().await;
        let repo = SqliteMatchRepository::new(pool);

        repo.add(&record(bot_id, "m-1")).await.unwrap();
        let second = repo.add(&record(bot_id, "m-1")).await.unwrap();
        assert_eq!(second, MatchInsert::Duplicate);
    }

    #[tokio::test]
    async fn unknown_match_id_returns_none() {
        let (pool, _) = pool_with_bot().await;
        let repo = SqliteMatchRepository::new(pool);
        assert!(repo.get_by_match_id("m-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_for_unknown_bot_fails() {
        let (pool, _) = pool_with_bot().await;
        let repo = SqliteMatchRepository::new(pool);
        // Foreign key to bots is enforced
        let err = repo.add(&record(BotId::new(), "m-2")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));
    }
}
