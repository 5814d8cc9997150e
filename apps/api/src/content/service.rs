use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::content::repository::ContentRepository;
use crate::content::validation::validate_submission;
use crate::errors::AppError;
use crate::models::content::{
    ContentRecord, ContentSubmission, FilterParams, SearchParams, SearchResult,
};
use crate::search::{ContentIndex, IndexQuery};

/// Outcome of a full index rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexReport {
    pub indexed: usize,
}

impl ReindexReport {
    pub fn message(&self) -> String {
        format!(
            "Reindexing completed successfully ({} records)",
            self.indexed
        )
    }
}

/// Keeps the repository and the search index in step.
///
/// Every mutation holds the index write lock from before the repository call
/// until the index has been updated, so concurrent writers reach the index in
/// the same order they reached the repository. The index is only touched once
/// the repository write has succeeded.
pub struct ContentService {
    repo: Arc<dyn ContentRepository>,
    index: RwLock<ContentIndex>,
    default_max_results: usize,
}

impl ContentService {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        index: ContentIndex,
        default_max_results: usize,
    ) -> Self {
        Self {
            repo,
            index: RwLock::new(index),
            default_max_results,
        }
    }

    pub async fn list_all(&self) -> Result<Vec<ContentRecord>, AppError> {
        self.repo.find_all().await
    }

    pub async fn get(&self, id: i64) -> Result<ContentRecord, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, submission: &ContentSubmission) -> Result<ContentRecord, AppError> {
        let submission = checked(submission)?;
        let mut index = self.index.write().await;
        let record = self.repo.insert(&submission).await?;
        index.upsert(&record)?;
        info!("Created content {}", record.id);
        Ok(record)
    }

    pub async fn update(
        &self,
        id: i64,
        submission: &ContentSubmission,
    ) -> Result<ContentRecord, AppError> {
        let submission = checked(submission)?;
        let mut index = self.index.write().await;
        let record = self
            .repo
            .update(id, &submission)
            .await?
            .ok_or_else(|| not_found(id))?;
        index.upsert(&record)?;
        info!("Updated content {id}");
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut index = self.index.write().await;
        if !self.repo.delete(id).await? {
            return Err(not_found(id));
        }
        index.remove(id)?;
        info!("Deleted content {id}");
        Ok(())
    }

    /// Ranked search with highlights.
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<SearchResult>, AppError> {
        let max_results = params.max_results.unwrap_or(self.default_max_results);
        if max_results == 0 {
            return Err(AppError::Validation(
                "maxResults must be at least 1".to_string(),
            ));
        }

        let query = IndexQuery::new(
            params.query.as_deref(),
            params.category.as_deref(),
            params.author.as_deref(),
            max_results,
        );
        let results = self.index.read().await.search(&query)?;
        debug!("Search {:?} returned {} hits", query, results.len());
        Ok(results)
    }

    /// Unranked exact-criteria listing.
    pub async fn filter(&self, params: &FilterParams) -> Result<Vec<ContentRecord>, AppError> {
        self.repo.find_by_filters(&params.normalized()).await
    }

    /// Rebuilds the index from every persisted record. Writes that arrive
    /// while the rebuild runs wait for it and are applied on top.
    pub async fn reindex(&self) -> Result<ReindexReport, AppError> {
        let mut index = self.index.write().await;
        let records = self.repo.find_all().await?;
        index.rebuild(&records)?;
        let indexed = records.len();
        info!("Reindexed {indexed} content records");
        Ok(ReindexReport { indexed })
    }

    /// Number of documents currently searchable.
    pub async fn indexed_count(&self) -> u64 {
        self.index.read().await.num_docs()
    }
}

fn checked(submission: &ContentSubmission) -> Result<ContentSubmission, AppError> {
    let submission = submission.normalized();
    validate_submission(&submission).map_err(AppError::InvalidSubmission)?;
    Ok(submission)
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Content not found with id: {id}"))
}
