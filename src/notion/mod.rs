pub mod wire;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, info};

use wire::BlockList;

const API_BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2025-09-03";
const PAGE_SIZE: u32 = 100;

/// Read access to the two Notion endpoints the page is built from.
///
/// Responses come back as raw JSON so shape checking stays with the mappers.
#[async_trait]
pub trait NotionSource: Send + Sync {
    /// `GET /pages/{page_id}`
    async fn retrieve_page(&self, page_id: &str) -> Result<serde_json::Value>;

    /// `GET /blocks/{block_id}/children`, every page of results.
    async fn list_block_children(&self, block_id: &str) -> Result<Vec<serde_json::Value>>;
}

/// Notion REST client authenticated with an integration secret.
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
}

impl NotionClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .context("NOTION_API_KEY is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert("notion-version", HeaderValue::from_static(NOTION_VERSION));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build Notion HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Notion request failed: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Notion returned {} for {}: {}", status, url, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Notion returned a non-JSON body for {}", url))
    }
}

#[async_trait]
impl NotionSource for NotionClient {
    async fn retrieve_page(&self, page_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        debug!("Retrieving page {}", page_id);
        self.get_json(&url, &[]).await
    }

    async fn list_block_children(&self, block_id: &str) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/blocks/{}/children", self.base_url, block_id);
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("page_size", PAGE_SIZE.to_string())];
            if let Some(c) = &cursor {
                query.push(("start_cursor", c.clone()));
            }

            let value = self.get_json(&url, &query).await?;
            let list: BlockList = serde_json::from_value(value)
                .with_context(|| format!("Unexpected block list shape for {}", block_id))?;
            results.extend(list.results);

            match list.next_cursor {
                Some(next) if list.has_more => cursor = Some(next),
                _ => break,
            }
        }

        info!("Listed {} child blocks of {}", results.len(), block_id);
        Ok(results)
    }
}
