use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sitewatch_core::error::AppError;
use sitewatch_core::models::{PendingMail, Site};
use sitewatch_core::traits::WatchStore;
use sqlx::{Pool, Sqlite, SqlitePool};

/// SQLite-backed store for sites, posts, and the mail queue.
///
/// Each method runs as a single statement, so each is its own transaction.
#[derive(Clone)]
pub struct WatchRepository {
    pool: Pool<Sqlite>,
}

/// A mail row with its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MailRecord {
    pub id: i64,
    pub body: String,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl WatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    pub async fn get_mail(&self, id: i64) -> Result<Option<MailRecord>, AppError> {
        sqlx::query_as::<_, MailRecord>(
            "SELECT id, body, is_sent, created_at, sent_at FROM mails WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))
    }

    /// Number of mails not yet delivered.
    pub async fn count_pending(&self) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mails WHERE is_sent = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(row.0)
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct SiteRow {
    url: String,
    last_link: Option<String>,
    added_at: DateTime<Utc>,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Site {
            url: row.url,
            last_link: row.last_link,
            added_at: row.added_at,
        }
    }
}

// -- Trait implementation --

impl WatchStore for WatchRepository {
    async fn site_exists(&self, url: &str) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM sites WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn add_site(&self, url: &str, initial_link: Option<&str>) -> Result<(), AppError> {
        let result = sqlx::query("INSERT INTO sites (url, last_link, added_at) VALUES (?, ?, ?)")
            .bind(url)
            .bind(initial_link)
            .bind(Utc::now())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::DuplicateKey(url.to_string()))
            }
            Err(e) => Err(AppError::DatabaseError(e.to_string())),
        }
    }

    async fn remove_site(&self, url: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sites WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_sites(&self) -> Result<Vec<Site>, AppError> {
        let rows = sqlx::query_as::<_, SiteRow>(
            "SELECT url, last_link, added_at FROM sites ORDER BY url",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_last_link(&self, url: &str, link: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE sites SET last_link = ? WHERE url = ?")
            .bind(link)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn post_exists(&self, site: &str, link: &str) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM posts WHERE site = ? AND link = ?")
            .bind(site)
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(row.is_some())
    }

    async fn record_post_if_new(&self, site: &str, link: &str) -> Result<bool, AppError> {
        // The unique constraint decides; a concurrent duplicate affects zero rows.
        let result = sqlx::query(
            r#"
            INSERT INTO posts (site, link, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (site, link) DO NOTHING
            "#,
        )
        .bind(site)
        .bind(link)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_post_and_enqueue(
        &self,
        site: &str,
        link: &str,
        body: &str,
    ) -> Result<Option<i64>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let now = Utc::now();
        let post = sqlx::query(
            r#"
            INSERT INTO posts (site, link, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (site, link) DO NOTHING
            "#,
        )
        .bind(site)
        .bind(link)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        // Already recorded; dropping `tx` rolls it back.
        if post.rows_affected() == 0 {
            return Ok(None);
        }

        let mail = sqlx::query("INSERT INTO mails (body, created_at) VALUES (?, ?)")
            .bind(body)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(Some(mail.last_insert_rowid()))
    }

    async fn existing_posts(&self) -> Result<BTreeMap<String, Vec<String>>, AppError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT site, link FROM posts ORDER BY site, rowid")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (site, link) in rows {
            grouped.entry(site).or_default().push(link);
        }
        Ok(grouped)
    }

    async fn enqueue_mail(&self, body: &str) -> Result<i64, AppError> {
        let result = sqlx::query("INSERT INTO mails (body, created_at) VALUES (?, ?)")
            .bind(body)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(result.last_insert_rowid())
    }

    async fn fetch_pending_mail(&self) -> Result<Vec<PendingMail>, AppError> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, body FROM mails WHERE is_sent = 0 ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(id, body)| PendingMail { id, body })
            .collect())
    }

    async fn mark_sent(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE mails SET is_sent = 1, sent_at = ? WHERE id = ? AND is_sent = 0")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}
