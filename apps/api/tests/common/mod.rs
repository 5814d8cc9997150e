#![allow(dead_code)]

use std::sync::Arc;

use content_search::config::Config;
use content_search::content::repository::InMemoryContentRepository;
use content_search::models::content::{ContentRecord, ContentSubmission};
use content_search::search::ContentIndex;
use content_search::{build_router, AppState, ContentClient};

/// A running server on an ephemeral port, backed by the in-memory repository.
pub struct TestEnv {
    pub client: ContentClient,
    pub base_url: String,
}

impl TestEnv {
    pub async fn start() -> Self {
        let state = AppState::new(
            Arc::new(InMemoryContentRepository::new()),
            ContentIndex::in_memory().unwrap(),
            Config::default(),
        );
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{addr}/api");
        Self {
            client: ContentClient::new(base_url.clone()).unwrap(),
            base_url,
        }
    }

    pub async fn create(&self, title: &str, body: &str) -> ContentRecord {
        self.client
            .create(&ContentSubmission::new(title, body))
            .await
            .unwrap()
    }

    pub async fn raw_get(&self, path_and_query: &str) -> serde_json::Value {
        reqwest::get(format!("{}{}", self.base_url, path_and_query))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}
