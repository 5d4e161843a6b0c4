//! Notion database adapter.
//!
//! [`NotionStore`] implements [`RemoteStore`] over the Notion REST API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `query` | `POST /v1/databases/{database_id}/query` (follows `next_cursor`) |
//! | `create` | `POST /v1/pages` with `parent.database_id` |
//! | `update` | `PATCH /v1/pages/{page_id}` with `properties` |
//! | `archive` | `PATCH /v1/pages/{page_id}` with `archived: true` |
//!
//! # Error Classification
//!
//! - Network errors and timeouts → [`StoreError::Transient`]
//! - HTTP 429 (rate limited) and 5xx (server error) → [`StoreError::Transient`]
//! - Any other non-success status → [`StoreError::Protocol`] with status and body
//! - A success response that cannot be decoded → [`StoreError::Protocol`]
//!
//! Retrying is the caller's job (see [`crate::retry`]).
//!
//! Page properties are decoded into typed structs. A property that is
//! absent or has an unexpected shape becomes `None` on the returned
//! [`RemoteRow`]; the reconciliation reader decides what to do with it.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use bookclub_sync_core::store::{BookProperties, RemoteRow, RemoteStore, StoreResult};
use bookclub_sync_core::StoreError;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::{Credentials, NotionConfig};

/// Largest page size the query endpoint accepts.
const QUERY_PAGE_SIZE: u32 = 100;

/// [`RemoteStore`] backed by a Notion database.
pub struct NotionStore {
    client: reqwest::Client,
    api_base: String,
    api_version: String,
    token: String,
    database_id: String,
    title_property: String,
    rating_property: String,
    favorites_property: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TitleProperty {
    title: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: Option<String>,
    #[serde(default)]
    text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    content: String,
}

#[derive(Debug, Deserialize)]
struct NumberProperty {
    number: Option<f64>,
}

impl NotionStore {
    /// Create a store for the database named in `credentials`.
    pub fn new(config: &NotionConfig, credentials: &Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            token: credentials.token.clone(),
            database_id: credentials.database_id.clone(),
            title_property: config.title_property.clone(),
            rating_property: config.rating_property.clone(),
            favorites_property: config.favorites_property.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Send a request with auth headers and classify the outcome.
    async fn send(&self, request: reqwest::RequestBuilder) -> StoreResult<Value> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            return response.json::<Value>().await.map_err(|e| {
                if e.is_decode() {
                    StoreError::Protocol {
                        status: Some(status.as_u16()),
                        body: format!("undecodable response: {}", e),
                    }
                } else {
                    StoreError::Transient(e.to_string())
                }
            });
        }

        let body_text = response.text().await.unwrap_or_default();

        // Rate limited or server error: retry
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(StoreError::Transient(format!(
                "Notion API error {}: {}",
                status, body_text
            )));
        }

        // Client error (not 429): do not retry
        Err(StoreError::Protocol {
            status: Some(status.as_u16()),
            body: body_text,
        })
    }

    fn properties_json(&self, properties: &BookProperties) -> Value {
        let mut map = Map::new();
        map.insert(
            self.title_property.clone(),
            json!({ "title": [{ "text": { "content": properties.title } }] }),
        );
        map.insert(
            self.rating_property.clone(),
            json!({ "number": properties.average }),
        );
        map.insert(
            self.favorites_property.clone(),
            json!({ "number": properties.favorites }),
        );
        Value::Object(map)
    }

    fn row_from_page(&self, page: Page) -> RemoteRow {
        let title = page
            .properties
            .get(&self.title_property)
            .and_then(|v| serde_json::from_value::<TitleProperty>(v.clone()).ok())
            .map(|t| {
                t.title
                    .into_iter()
                    .filter_map(|rt| rt.plain_text.or_else(|| rt.text.map(|t| t.content)))
                    .collect::<String>()
            })
            .filter(|t| !t.is_empty());

        let number = |name: &str| {
            page.properties
                .get(name)
                .and_then(|v| serde_json::from_value::<NumberProperty>(v.clone()).ok())
                .and_then(|n| n.number)
        };

        RemoteRow {
            average: number(&self.rating_property),
            favorites: number(&self.favorites_property),
            title,
            id: page.id,
        }
    }

    fn decode_page(&self, value: Value) -> StoreResult<RemoteRow> {
        let page: Page = serde_json::from_value(value).map_err(|e| StoreError::Protocol {
            status: None,
            body: format!("unexpected page shape: {}", e),
        })?;
        Ok(self.row_from_page(page))
    }
}

#[async_trait]
impl RemoteStore for NotionStore {
    async fn query(&self) -> StoreResult<Vec<RemoteRow>> {
        let url = self.url(&format!("/v1/databases/{}/query", self.database_id));
        let mut rows = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": QUERY_PAGE_SIZE });
            if let Some(ref c) = cursor {
                body["start_cursor"] = json!(c);
            }

            let value = self.send(self.client.post(&url).json(&body)).await?;
            let page: QueryResponse =
                serde_json::from_value(value).map_err(|e| StoreError::Protocol {
                    status: None,
                    body: format!("unexpected query response: {}", e),
                })?;

            debug!(
                rows = page.results.len(),
                has_more = page.has_more,
                "notion query page"
            );
            rows.extend(page.results.into_iter().map(|p| self.row_from_page(p)));

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(rows)
    }

    async fn create(&self, properties: &BookProperties) -> StoreResult<RemoteRow> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": self.properties_json(properties),
        });
        let value = self
            .send(self.client.post(self.url("/v1/pages")).json(&body))
            .await?;
        self.decode_page(value)
    }

    async fn update(&self, id: &str, properties: &BookProperties) -> StoreResult<RemoteRow> {
        let body = json!({ "properties": self.properties_json(properties) });
        let value = self
            .send(
                self.client
                    .patch(self.url(&format!("/v1/pages/{}", id)))
                    .json(&body),
            )
            .await?;
        self.decode_page(value)
    }

    async fn archive(&self, id: &str) -> StoreResult<RemoteRow> {
        let body = json!({ "archived": true });
        let value = self
            .send(
                self.client
                    .patch(self.url(&format!("/v1/pages/{}", id)))
                    .json(&body),
            )
            .await?;
        self.decode_page(value)
    }
}
