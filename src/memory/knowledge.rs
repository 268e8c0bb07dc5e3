//! Knowledge-base (dataset) API client
//!
//! Permanent memory is appended as segments to the first document of the
//! first dataset visible to the API key.

use reqwest::{header, Client};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::KnowledgeBaseConfig;
use crate::error::{Error, Result};

/// Paged list envelope
#[derive(Debug, Clone, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Dataset or document entry; only the id matters here
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    /// Entry id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct SegmentContent<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct SegmentsRequest<'a> {
    segments: Vec<SegmentContent<'a>>,
}

/// Where segments end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTarget {
    /// Dataset id
    pub dataset_id: String,
    /// Document id
    pub document_id: String,
}

/// Knowledge-base API client
#[derive(Clone)]
pub struct KnowledgeBaseClient {
    client: Client,
    base_url: String,
}

impl KnowledgeBaseClient {
    /// Create a new client
    pub fn new(config: &KnowledgeBaseConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .map_err(|e| Error::Config(format!("Invalid knowledge-base key: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(KnowledgeBaseClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_first(&self, path: &str, what: &str) -> Result<Entry> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("page", "1"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status, body));
        }

        let page: Page<Entry> = response.json().await?;
        page.data
            .into_iter()
            .next()
            .ok_or_else(|| Error::KnowledgeBase(format!("no {} found", what)))
    }

    /// First dataset visible to the key
    pub async fn first_dataset(&self) -> Result<Entry> {
        self.get_first("/v1/datasets", "dataset").await
    }

    /// First document of a dataset
    pub async fn first_document(&self, dataset_id: &str) -> Result<Entry> {
        self.get_first(&format!("/v1/datasets/{}/documents", dataset_id), "document")
            .await
    }

    /// Add segments to a document
    pub async fn add_segments(&self, target: &SegmentTarget, segments: &[String]) -> Result<()> {
        let url = format!(
            "{}/v1/datasets/{}/documents/{}/segments",
            self.base_url, target.dataset_id, target.document_id
        );
        let request = SegmentsRequest {
            segments: segments
                .iter()
                .map(|content| SegmentContent { content })
                .collect(),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status, body));
        }

        Ok(())
    }

    /// Look up the first dataset/document and add `segments` to it
    pub async fn upsert_segments(&self, segments: &[String]) -> Result<SegmentTarget> {
        if segments.is_empty() {
            return Err(Error::InvalidInput("no segments to upload".to_string()));
        }

        let dataset = self.first_dataset().await?;
        let document = self.first_document(&dataset.id).await?;
        let target = SegmentTarget {
            dataset_id: dataset.id,
            document_id: document.id,
        };

        self.add_segments(&target, segments).await?;
        info!(
            "Uploaded {} segment(s) to document {} of dataset {}",
            segments.len(),
            target.document_id,
            target.dataset_id
        );

        Ok(target)
    }
}
