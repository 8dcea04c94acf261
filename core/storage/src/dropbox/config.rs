//! Endpoint configuration for the Dropbox integration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use dropline_common::{Error, Result};

/// Dropbox app client id.
const DROPBOX_CLIENT_ID: &str = "ghagecp4sgm6v99";
/// OAuth2 authorization endpoint.
const DROPBOX_AUTH_URL: &str = "https://www.dropbox.com/oauth2/authorize";
/// Redirect URL registered for the app.
const REDIRECT_URL: &str = "https://roamjs.com/oauth?auth=true";
/// Token exchange proxy; holds the client secret on our behalf.
const AUTH_PROXY_URL: &str = "https://lambda.roamjs.com/dropbox-auth";
/// RPC endpoint base.
const DROPBOX_API_BASE: &str = "https://api.dropboxapi.com/2";
/// Content (upload/download) endpoint base.
const DROPBOX_CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

/// Configuration for OAuth2 authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Client ID of the Dropbox app.
    pub client_id: String,
    /// Authorization page the user is sent to.
    pub authorize_url: String,
    /// Redirect URL for the OAuth2 callback.
    pub redirect_uri: String,
    /// Anonymous token exchange endpoint.
    pub auth_proxy_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: DROPBOX_CLIENT_ID.to_string(),
            authorize_url: DROPBOX_AUTH_URL.to_string(),
            redirect_uri: REDIRECT_URL.to_string(),
            auth_proxy_url: AUTH_PROXY_URL.to_string(),
        }
    }
}

/// Dropbox integration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropboxConfig {
    /// Base URL of the RPC endpoints (sharing).
    pub api_base: String,
    /// Base URL of the content endpoints (upload).
    pub content_base: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// OAuth2 settings.
    pub auth: AuthConfig,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            api_base: DROPBOX_API_BASE.to_string(),
            content_base: DROPBOX_CONTENT_BASE.to_string(),
            user_agent: "Dropline/0.1".to_string(),
            auth: AuthConfig::default(),
        }
    }
}

impl DropboxConfig {
    /// Load configuration from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::InvalidInput(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default config file location (`<config dir>/dropline/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dropline").join("config.json"))
    }

    /// Default credential storage file (`<data dir>/dropline/storage.json`).
    pub fn default_credentials_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("dropline").join("storage.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: DropboxConfig =
            serde_json::from_str(r#"{"api_base": "http://localhost:9000/2"}"#).unwrap();

        assert_eq!(config.api_base, "http://localhost:9000/2");
        assert_eq!(config.content_base, DROPBOX_CONTENT_BASE);
        assert_eq!(config.auth, AuthConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"auth": {"client_id": "custom"}}"#).unwrap();

        let config = DropboxConfig::load(&path).unwrap();
        assert_eq!(config.auth.client_id, "custom");
        assert_eq!(config.auth.redirect_uri, REDIRECT_URL);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DropboxConfig::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, DropboxConfig::default());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();

        assert!(matches!(
            DropboxConfig::load(&path),
            Err(Error::InvalidInput(_))
        ));
    }
}
