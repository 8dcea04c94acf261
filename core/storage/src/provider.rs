//! Seams between the upload pipeline and the storage provider.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dropline_common::{Result, SecretString};

/// File reference returned by the provider after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Final file name (may differ from the requested one after autorename).
    pub name: String,
    /// Display path used to address the file in later calls.
    pub path_display: String,
}

/// Publicly readable link to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLink {
    pub url: String,
}

/// Source of currently-valid access tokens.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Get a valid access token, refreshing it if necessary.
    ///
    /// # Errors
    /// - `NoCredential` when the account was never connected
    /// - `RefreshFailed` when the refresh exchange was rejected
    async fn access_token(&self) -> Result<SecretString>;
}

/// Storage provider able to host files behind public links.
#[async_trait]
pub trait SharingProvider: Send + Sync {
    /// Upload `data` to `/<name>` without overwriting existing files.
    async fn upload(&self, token: &SecretString, name: &str, data: Bytes) -> Result<RemoteFile>;

    /// List links already shared for `path`.
    async fn list_shared_links(&self, token: &SecretString, path: &str) -> Result<Vec<SharedLink>>;

    /// Create a new public link for `path`.
    async fn create_shared_link(&self, token: &SecretString, path: &str) -> Result<SharedLink>;

    /// Get a public link for `path`, reusing an existing one if present.
    ///
    /// # Postconditions
    /// - A new link is only created when none exists
    async fn share(&self, token: &SecretString, path: &str) -> Result<SharedLink> {
        let links = self.list_shared_links(token, path).await?;
        match links.into_iter().next() {
            Some(link) => {
                debug!("Reusing shared link for {}", path);
                Ok(link)
            }
            None => {
                debug!("Creating shared link for {}", path);
                self.create_shared_link(token, path).await
            }
        }
    }
}
