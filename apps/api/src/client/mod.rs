//! Content API client: a typed wrapper over the `/content` REST endpoints.
//!
//! One request per call. Failures are logged and returned to the caller
//! unchanged; nothing is retried.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::content::{
    ContentRecord, ContentSubmission, FieldError, FilterParams, SearchParams, SearchResult,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-level failure, or a body that could not be decoded.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Field errors for inline display; empty for every other kind of failure.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ClientError::Validation { fields, .. } => fields.as_slice(),
            _ => &[],
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    details: Vec<FieldError>,
}

#[derive(Clone)]
pub struct ContentClient {
    client: Client,
    base_url: String,
}

impl ContentClient {
    /// `base_url` is the API root, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_all(&self) -> Result<Vec<ContentRecord>, ClientError> {
        let response = send(self.client.get(self.url("/content"))).await?;
        json(response).await
    }

    pub async fn get(&self, id: i64) -> Result<ContentRecord, ClientError> {
        let response = send(self.client.get(self.url(&format!("/content/{id}")))).await?;
        json(response).await
    }

    pub async fn create(
        &self,
        submission: &ContentSubmission,
    ) -> Result<ContentRecord, ClientError> {
        let request = self.client.post(self.url("/content")).json(submission);
        json(send(request).await?).await
    }

    pub async fn update(
        &self,
        id: i64,
        submission: &ContentSubmission,
    ) -> Result<ContentRecord, ClientError> {
        let request = self
            .client
            .put(self.url(&format!("/content/{id}")))
            .json(submission);
        json(send(request).await?).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let response = send(self.client.delete(self.url(&format!("/content/{id}")))).await?;
        check(response).await?;
        Ok(())
    }

    pub async fn search(&self, params: &SearchParams) -> Result<Vec<SearchResult>, ClientError> {
        let request = self
            .client
            .get(self.url("/content/search"))
            .query(&search_query_pairs(params));
        json(send(request).await?).await
    }

    pub async fn filter(&self, params: &FilterParams) -> Result<Vec<ContentRecord>, ClientError> {
        let request = self
            .client
            .get(self.url("/content/filter"))
            .query(&filter_query_pairs(params));
        json(send(request).await?).await
    }

    /// Blocks until the server has rebuilt its index; returns its status line.
    pub async fn reindex(&self) -> Result<String, ClientError> {
        let response = send(self.client.post(self.url("/content/reindex"))).await?;
        Ok(check(response).await?.text().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Unset and blank parameters are left out entirely rather than sent empty.
fn search_query_pairs(params: &SearchParams) -> Vec<(&'static str, String)> {
    let mut pairs = present([
        ("query", &params.query),
        ("category", &params.category),
        ("author", &params.author),
    ]);
    if let Some(max) = params.max_results {
        pairs.push(("maxResults", max.to_string()));
    }
    pairs
}

fn filter_query_pairs(params: &FilterParams) -> Vec<(&'static str, String)> {
    present([
        ("category", &params.category),
        ("author", &params.author),
        ("query", &params.query),
    ])
}

fn present<const N: usize>(
    fields: [(&'static str, &Option<String>); N],
) -> Vec<(&'static str, String)> {
    fields
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key, v.to_string()))
        })
        .collect()
}

async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
    request.send().await.map_err(|e| {
        warn!("Content API request failed: {e}");
        ClientError::Http(e)
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    Ok(check(response).await?.json::<T>().await?)
}

/// Passes successful responses through and turns everything else into a
/// `ClientError`, using the server's error envelope when there is one.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    let url = response.url().clone();
    if status.is_success() {
        debug!("{} {}", status.as_u16(), url);
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error = error_from_body(status, body);
    warn!("Content API call to {} failed: {}", url, error);
    Err(error)
}

fn error_from_body(status: StatusCode, body: String) -> ClientError {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(&body).ok();

    match (status, parsed) {
        (StatusCode::NOT_FOUND, Some(e)) => ClientError::NotFound(e.error.message),
        (StatusCode::NOT_FOUND, None) => ClientError::NotFound(body),
        (StatusCode::BAD_REQUEST, Some(e)) if e.error.code == "VALIDATION_ERROR" => {
            ClientError::Validation {
                message: e.error.message,
                fields: e.error.details,
            }
        }
        (_, Some(e)) => ClientError::Api {
            status: status.as_u16(),
            message: e.error.message,
        },
        (_, None) => ClientError::Api {
            status: status.as_u16(),
            message: body,
        },
    }
}
