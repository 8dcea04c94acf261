//! Dropbox API client.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use dropline_common::{Error, Result, SecretString};

use super::config::DropboxConfig;
use super::header::http_header_safe_json;
use crate::provider::{RemoteFile, SharedLink, SharingProvider};

/// Header carrying the JSON arguments of content endpoints.
const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Response from listing shared links.
#[derive(Debug, Deserialize)]
struct ListSharedLinksResponse {
    links: Vec<SharedLink>,
}

/// Dropbox API client.
pub struct DropboxClient {
    http: Client,
    api_base: String,
    content_base: String,
}

impl DropboxClient {
    /// Create a new Dropbox client.
    pub fn new(config: &DropboxConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            content_base: config.content_base.trim_end_matches('/').to_string(),
        })
    }

    fn bearer(token: &SecretString) -> String {
        format!("Bearer {}", token.expose())
    }

    /// POST a JSON body to an RPC endpoint.
    async fn rpc<T: serde::de::DeserializeOwned>(
        &self,
        token: &SecretString,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/{}", self.api_base, endpoint);

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, Self::bearer(token))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("Failed to call {}: {}", endpoint, e)))?;

        self.handle_response(response).await
    }

    /// Handle API response with error checking.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Upload(format!("Failed to parse response: {}", e)))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(Error::Authentication(
                "Invalid or expired token".to_string(),
            ))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Upload(format!("API error: {} - {}", status, body)))
        }
    }
}

#[async_trait]
impl SharingProvider for DropboxClient {
    async fn upload(&self, token: &SecretString, name: &str, data: Bytes) -> Result<RemoteFile> {
        let url = format!("{}/files/upload", self.content_base);
        let arg = http_header_safe_json(&json!({
            "path": format!("/{}", name),
            "autorename": true,
        }))?;

        debug!("Uploading {} ({} bytes)", name, data.len());

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, Self::bearer(token))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(API_ARG_HEADER, arg)
            .body(data)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("Failed to upload file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn list_shared_links(&self, token: &SecretString, path: &str) -> Result<Vec<SharedLink>> {
        let list: ListSharedLinksResponse = self
            .rpc(token, "sharing/list_shared_links", json!({ "path": path }))
            .await?;
        Ok(list.links)
    }

    async fn create_shared_link(&self, token: &SecretString, path: &str) -> Result<SharedLink> {
        self.rpc(
            token,
            "sharing/create_shared_link_with_settings",
            json!({
                "path": path,
                "settings": { "requested_visibility": { ".tag": "public" } },
            }),
        )
        .await
    }
}
