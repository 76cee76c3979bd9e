//! Dream journal repository.
//!
//! Every query is scoped by `user_id`: a dream simply does not exist for
//! anyone but its owner at this layer.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::domain::{Dream, DreamId, DreamStats, MoodCount, NewDream, TagCount, UpdateDream, UserId};
use crate::errors::{Error, Result};
use crate::storage::DbPool;

const MAX_TOP_TAGS: usize = 5;

#[derive(Debug, Clone, FromRow)]
struct DreamRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub date_dreamed: NaiveDate,
    pub mood: Option<String>,
    pub is_lucid: bool,
    pub tags: Option<String>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DreamRow {
    fn into_dream(self) -> Dream {
        let tags = Dream::tags_from_storage(self.tags.as_deref());
        Dream {
            id: DreamId::from_string(self.id),
            user_id: UserId::from_string(self.user_id),
            title: self.title,
            content: self.content,
            date_dreamed: self.date_dreamed,
            mood: self.mood,
            is_lucid: self.is_lucid,
            tags,
            is_private: self.is_private,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const DREAM_COLUMNS: &str = "id, user_id, title, content, date_dreamed, mood, is_lucid, tags, is_private, created_at, updated_at";

#[async_trait]
pub trait DreamRepository: Send + Sync {
    async fn create(&self, dream: NewDream) -> Result<Dream>;

    /// Fetch one dream, scoped to its owner.
    async fn find(&self, id: &DreamId, owner: &UserId) -> Result<Option<Dream>>;

    /// List the owner's dreams newest-first, optionally filtered by a
    /// search term over title/content/tags. Returns the page plus the
    /// total match count.
    async fn list(
        &self,
        owner: &UserId,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Dream>, i64)>;

    /// Apply a partial update to an owned dream.
    async fn update(&self, id: &DreamId, owner: &UserId, update: UpdateDream) -> Result<Dream>;

    /// Delete an owned dream. Returns whether a row was removed.
    async fn delete(&self, id: &DreamId, owner: &UserId) -> Result<bool>;

    /// Aggregate statistics over the owner's journal.
    async fn stats(&self, owner: &UserId) -> Result<DreamStats>;
}

pub struct SqlxDreamRepository {
    pool: DbPool,
}

impl SqlxDreamRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DreamRepository for SqlxDreamRepository {
    #[instrument(skip(self, dream), fields(dream_id = %dream.id, user_id = %dream.user_id), name = "db_create_dream")]
    async fn create(&self, dream: NewDream) -> Result<Dream> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO dreams (id, user_id, title, content, date_dreamed, mood, is_lucid, tags, is_private, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(dream.id.as_str())
        .bind(dream.user_id.as_str())
        .bind(&dream.title)
        .bind(&dream.content)
        .bind(dream.date_dreamed)
        .bind(&dream.mood)
        .bind(dream.is_lucid)
        .bind(Dream::tags_to_storage(&dream.tags))
        .bind(dream.is_private)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to create dream"))?;

        self.find(&dream.id, &dream.user_id)
            .await?
            .ok_or_else(|| Error::internal("Dream not found after creation"))
    }

    #[instrument(skip(self), fields(dream_id = %id, user_id = %owner), name = "db_find_dream")]
    async fn find(&self, id: &DreamId, owner: &UserId) -> Result<Option<Dream>> {
        let row = sqlx::query_as::<_, DreamRow>(&format!(
            "SELECT {DREAM_COLUMNS} FROM dreams WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_str())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch dream"))?;

        Ok(row.map(DreamRow::into_dream))
    }

    #[instrument(skip(self, search), fields(user_id = %owner), name = "db_list_dreams")]
    async fn list(
        &self,
        owner: &UserId,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Dream>, i64)> {
        let pattern = search.map(|term| format!("%{term}%"));

        let (rows, total) = if let Some(pattern) = pattern {
            let rows = sqlx::query_as::<_, DreamRow>(&format!(
                r#"
                SELECT {DREAM_COLUMNS} FROM dreams
                WHERE user_id = $1 AND (title LIKE $2 OR content LIKE $2 OR tags LIKE $2)
                ORDER BY date_dreamed DESC, created_at DESC
                LIMIT $3 OFFSET $4
                "#
            ))
            .bind(owner.as_str())
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to search dreams"))?;

            let (total,): (i64,) = sqlx::query_as(
                r#"
                SELECT COUNT(*) FROM dreams
                WHERE user_id = $1 AND (title LIKE $2 OR content LIKE $2 OR tags LIKE $2)
                "#,
            )
            .bind(owner.as_str())
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count dreams"))?;

            (rows, total)
        } else {
            let rows = sqlx::query_as::<_, DreamRow>(&format!(
                r#"
                SELECT {DREAM_COLUMNS} FROM dreams
                WHERE user_id = $1
                ORDER BY date_dreamed DESC, created_at DESC
                LIMIT $2 OFFSET $3
                "#
            ))
            .bind(owner.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to list dreams"))?;

            let (total,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM dreams WHERE user_id = $1")
                    .bind(owner.as_str())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|err| Error::database(err, "Failed to count dreams"))?;

            (rows, total)
        };

        Ok((rows.into_iter().map(DreamRow::into_dream).collect(), total))
    }

    // Read-merge-write runs inside one transaction so concurrent updates
    // to the same dream serialize instead of clobbering each other.
    #[instrument(skip(self, update), fields(dream_id = %id, user_id = %owner), name = "db_update_dream")]
    async fn update(&self, id: &DreamId, owner: &UserId, update: UpdateDream) -> Result<Dream> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| Error::database(err, "Failed to start dream update"))?;

        let existing = sqlx::query_as::<_, DreamRow>(&format!(
            "SELECT {DREAM_COLUMNS} FROM dreams WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_str())
        .bind(owner.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch dream"))?
        .map(DreamRow::into_dream)
        .ok_or_else(|| Error::not_found("dream", id.as_str()))?;

        let title = update.title.unwrap_or(existing.title);
        let content = update.content.unwrap_or(existing.content);
        let date_dreamed = update.date_dreamed.unwrap_or(existing.date_dreamed);
        let mood = update.mood.unwrap_or(existing.mood);
        let is_lucid = update.is_lucid.unwrap_or(existing.is_lucid);
        let tags = update.tags.unwrap_or(existing.tags);
        let is_private = update.is_private.unwrap_or(existing.is_private);
        let updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE dreams
            SET title = $1, content = $2, date_dreamed = $3, mood = $4,
                is_lucid = $5, tags = $6, is_private = $7, updated_at = $8
            WHERE id = $9 AND user_id = $10
            "#,
        )
        .bind(&title)
        .bind(&content)
        .bind(date_dreamed)
        .bind(&mood)
        .bind(is_lucid)
        .bind(Dream::tags_to_storage(&tags))
        .bind(is_private)
        .bind(updated_at)
        .bind(id.as_str())
        .bind(owner.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|err| Error::database(err, "Failed to update dream"))?;

        tx.commit()
            .await
            .map_err(|err| Error::database(err, "Failed to commit dream update"))?;

        Ok(Dream {
            id: id.clone(),
            user_id: owner.clone(),
            title,
            content,
            date_dreamed,
            mood,
            is_lucid,
            tags,
            is_private,
            created_at: existing.created_at,
            updated_at,
        })
    }

    #[instrument(skip(self), fields(dream_id = %id, user_id = %owner), name = "db_delete_dream")]
    async fn delete(&self, id: &DreamId, owner: &UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM dreams WHERE id = $1 AND user_id = $2")
            .bind(id.as_str())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to delete dream"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %owner), name = "db_dream_stats")]
    async fn stats(&self, owner: &UserId) -> Result<DreamStats> {
        let (total, lucid): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_lucid THEN 1 ELSE 0 END), 0)
            FROM dreams WHERE user_id = $1
            "#,
        )
        .bind(owner.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to compute dream totals"))?;

        let cutoff = Utc::now().date_naive() - Duration::days(30);
        let (recent,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM dreams WHERE user_id = $1 AND date_dreamed >= $2",
        )
        .bind(owner.as_str())
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to count recent dreams"))?;

        let moods: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT mood, COUNT(*) FROM dreams
            WHERE user_id = $1 AND mood IS NOT NULL
            GROUP BY mood ORDER BY COUNT(*) DESC, mood ASC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to aggregate moods"))?;

        // Tags are stored comma-separated, so the breakdown happens here
        // rather than in SQL.
        let tag_rows: Vec<(Option<String>,)> = sqlx::query_as(
            "SELECT tags FROM dreams WHERE user_id = $1 AND tags IS NOT NULL",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch tags"))?;

        let mut tag_counts: HashMap<String, i64> = HashMap::new();
        for (raw,) in tag_rows {
            for tag in Dream::tags_from_storage(raw.as_deref()) {
                *tag_counts.entry(tag).or_insert(0) += 1;
            }
        }
        let mut top_tags: Vec<TagCount> = tag_counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        top_tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        top_tags.truncate(MAX_TOP_TAGS);

        let lucid_percentage = if total > 0 {
            (lucid as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Ok(DreamStats {
            total_dreams: total,
            lucid_dreams: lucid,
            lucid_percentage,
            dreams_last_30_days: recent,
            moods: moods.into_iter().map(|(mood, count)| MoodCount { mood, count }).collect(),
            top_tags,
        })
    }
}
