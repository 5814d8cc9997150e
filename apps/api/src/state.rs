use std::sync::Arc;

use crate::config::Config;
use crate::content::repository::ContentRepository;
use crate::content::service::ContentService;
use crate::search::ContentIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentService>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<dyn ContentRepository>, index: ContentIndex, config: Config) -> Self {
        Self {
            content: Arc::new(ContentService::new(
                repo,
                index,
                config.default_max_results,
            )),
            config,
        }
    }
}
