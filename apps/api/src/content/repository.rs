use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::content::{ContentRecord, ContentSubmission, FilterParams};

/// Persistence for content records.
///
/// Implementations receive already-validated, normalized submissions and own
/// id assignment and timestamps.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// All records in ascending id order.
    async fn find_all(&self) -> Result<Vec<ContentRecord>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ContentRecord>, AppError>;

    /// Inserts a new record with a fresh id and `created_at == updated_at`.
    async fn insert(&self, submission: &ContentSubmission) -> Result<ContentRecord, AppError>;

    /// Overwrites the editable fields and bumps `updated_at`.
    /// Returns `None` if no record has this id.
    async fn update(
        &self,
        id: i64,
        submission: &ContentSubmission,
    ) -> Result<Option<ContentRecord>, AppError>;

    /// Hard delete. Returns false if no record had this id.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Exact category/author match plus case-insensitive substring match of
    /// `query` against title, body and tags. Absent parameters match anything.
    async fn find_by_filters(&self, filters: &FilterParams) -> Result<Vec<ContentRecord>, AppError>;
}

/// New `updated_at` for an edit: now, but never at or before the previous value.
pub(crate) fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now > previous {
        now
    } else {
        floor
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "id, title, body, category, author, tags, created_at, updated_at";

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn find_all(&self) -> Result<Vec<ContentRecord>, AppError> {
        let rows = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM content ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ContentRecord>, AppError> {
        let row = sqlx::query_as::<_, ContentRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM content WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert(&self, submission: &ContentSubmission) -> Result<ContentRecord, AppError> {
        let row = sqlx::query_as::<_, ContentRecord>(&format!(
            r#"
            INSERT INTO content (title, body, category, author, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&submission.title)
        .bind(&submission.body)
        .bind(&submission.category)
        .bind(&submission.author)
        .bind(&submission.tags)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        submission: &ContentSubmission,
    ) -> Result<Option<ContentRecord>, AppError> {
        // updated_at must move forward even if NOW() has not
        let row = sqlx::query_as::<_, ContentRecord>(&format!(
            r#"
            UPDATE content
            SET title = $2, body = $3, category = $4, author = $5, tags = $6,
                updated_at = GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&submission.title)
        .bind(&submission.body)
        .bind(&submission.category)
        .bind(&submission.author)
        .bind(&submission.tags)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM content WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_filters(&self, filters: &FilterParams) -> Result<Vec<ContentRecord>, AppError> {
        let rows = sqlx::query_as::<_, ContentRecord>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM content
            WHERE ($1::TEXT IS NULL OR category = $1)
              AND ($2::TEXT IS NULL OR author = $2)
              AND ($3::TEXT IS NULL
                   OR STRPOS(LOWER(title), LOWER($3)) > 0
                   OR STRPOS(LOWER(body), LOWER($3)) > 0
                   OR STRPOS(LOWER(COALESCE(tags, '')), LOWER($3)) > 0)
            ORDER BY id
            "#
        ))
        .bind(&filters.category)
        .bind(&filters.author)
        .bind(&filters.query)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryTable {
    rows: BTreeMap<i64, ContentRecord>,
    last_id: i64,
}

/// Process-local repository, used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryContentRepository {
    table: RwLock<MemoryTable>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn find_all(&self) -> Result<Vec<ContentRecord>, AppError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ContentRecord>, AppError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn insert(&self, submission: &ContentSubmission) -> Result<ContentRecord, AppError> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let now = Utc::now();
        let record = ContentRecord {
            id: table.last_id,
            title: submission.title.clone(),
            body: submission.body.clone(),
            category: submission.category.clone(),
            author: submission.author.clone(),
            tags: submission.tags.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: i64,
        submission: &ContentSubmission,
    ) -> Result<Option<ContentRecord>, AppError> {
        let mut table = self.table.write().await;
        let Some(record) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        record.title = submission.title.clone();
        record.body = submission.body.clone();
        record.category = submission.category.clone();
        record.author = submission.author.clone();
        record.tags = submission.tags.clone();
        record.updated_at = next_updated_at(record.updated_at, Utc::now());
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn find_by_filters(&self, filters: &FilterParams) -> Result<Vec<ContentRecord>, AppError> {
        let needle = filters.query.as_deref().map(str::to_lowercase);
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|r| match &filters.category {
                Some(c) => r.category.as_deref() == Some(c.as_str()),
                None => true,
            })
            .filter(|r| match &filters.author {
                Some(a) => r.author.as_deref() == Some(a.as_str()),
                None => true,
            })
            .filter(|r| match &needle {
                Some(n) => {
                    r.title.to_lowercase().contains(n)
                        || r.body.to_lowercase().contains(n)
                        || r.tags
                            .as_deref()
                            .is_some_and(|t| t.to_lowercase().contains(n))
                }
                None => true,
            })
            .cloned()
            .collect())
    }
}
