//! Reqwest-based keyed-document collection client.

use async_trait::async_trait;
use core_auth::SessionProvider;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use store_traits::{RemoteCollection, RemoteDocument, Result, StoreError};
use tracing::{debug, warn};

const MERGE_PATCH_CONTENT_TYPE: &str = "application/merge-patch+json";

/// Connection settings for the document API.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Base URL of the API, without the `/v1` prefix.
    pub base_url: String,
    /// Documents requested per listing page.
    pub page_size: u32,
    pub timeout: Duration,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            page_size: 500,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One page of a collection listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    documents: Vec<RemoteDocument>,
    next_cursor: Option<String>,
}

pub struct RestCollectionClient {
    client: Client,
    base_url: String,
    page_size: u32,
    sessions: Arc<dyn SessionProvider>,
}

impl RestCollectionClient {
    pub fn new(config: RestConfig, sessions: Arc<dyn SessionProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("canvass-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            sessions,
        })
    }

    fn documents_url(&self, principal: &str, collection: &str) -> String {
        format!(
            "{}/v1/principals/{}/collections/{}/documents",
            self.base_url, principal, collection
        )
    }

    fn document_url(&self, principal: &str, collection: &str, key: &str) -> String {
        format!("{}/{}", self.documents_url(principal, collection), key)
    }

    async fn bearer_token(&self) -> Result<String> {
        let session = self
            .sessions
            .current_session()
            .await
            .ok_or_else(|| StoreError::Unauthorized("no active session".to_string()))?;
        session
            .access_token
            .ok_or_else(|| StoreError::Unauthorized("session has no access token".to_string()))
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(map_status(status.as_u16(), message))
    }
}

fn map_status(status: u16, message: String) -> StoreError {
    match status {
        401 | 403 => StoreError::Unauthorized(message),
        _ => StoreError::Remote { status, message },
    }
}

fn map_transport(err: reqwest::Error) -> StoreError {
    if err.is_decode() {
        StoreError::Serialization(err.to_string())
    } else {
        StoreError::Network(err.to_string())
    }
}

#[async_trait]
impl RemoteCollection for RestCollectionClient {
    async fn list(
        &self,
        principal: &str,
        collection: &str,
        cursor: Option<String>,
    ) -> Result<(Vec<RemoteDocument>, Option<String>)> {
        let token = self.bearer_token().await?;
        let mut request = self
            .client
            .get(self.documents_url(principal, collection))
            .bearer_auth(token)
            .query(&[("pageSize", self.page_size.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = request.send().await.map_err(map_transport)?;
        let page: ListResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(map_transport)?;

        debug!(
            collection,
            documents = page.documents.len(),
            has_more = page.next_cursor.is_some(),
            "Listed collection page"
        );
        Ok((page.documents, page.next_cursor))
    }

    async fn upsert_merge(
        &self,
        principal: &str,
        collection: &str,
        document: &RemoteDocument,
    ) -> Result<()> {
        let token = self.bearer_token().await?;
        let body =
            serde_json::to_vec(document).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let response = self
            .client
            .patch(self.document_url(principal, collection, &document.key))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, MERGE_PATCH_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(map_transport)?;

        Self::check_status(response).await?;
        debug!(collection, key = %document.key, "Upserted document");
        Ok(())
    }

    async fn delete(&self, principal: &str, collection: &str, key: &str) -> Result<()> {
        let token = self.bearer_token().await?;
        let response = self
            .client
            .delete(self.document_url(principal, collection, key))
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport)?;

        // Deleting an absent document is a success; deletes are retried by
        // callers and must be idempotent.
        if response.status() == StatusCode::NOT_FOUND {
            warn!(collection, key, "Delete target already gone");
            return Ok(());
        }
        Self::check_status(response).await?;
        debug!(collection, key, "Deleted document");
        Ok(())
    }
}
