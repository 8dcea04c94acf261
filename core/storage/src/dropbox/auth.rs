//! OAuth2 token exchange and access token lifecycle for Dropbox.
//!
//! Token exchanges go through an anonymous proxy that holds the app's
//! client secret. Access tokens are refreshed lazily, when a caller asks for
//! one and the stored token has outlived `expires_in`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use dropline_common::{Error, Result, SecretString};

use super::config::AuthConfig;
use crate::credentials::{CredentialRecord, CredentialStore};
use crate::provider::AccessTokenSource;

/// Client for the anonymous token exchange proxy.
pub struct AuthProxy {
    http: Client,
    config: AuthConfig,
}

impl AuthProxy {
    /// Create a new proxy client.
    pub fn new(config: AuthConfig, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// URL of the authorization page the user must visit to connect an account.
    pub fn authorization_url(&self) -> Result<String> {
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("token_access_type", "offline"),
            ],
        )
        .map_err(|e| Error::InvalidInput(format!("Invalid auth URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Exchange an authorization code for an initial grant.
    ///
    /// # Errors
    /// - `Authentication` if the proxy rejects the code or returns no access token
    pub async fn exchange_code(&self, code: &str) -> Result<Map<String, Value>> {
        let body = json!({
            "code": code,
            "grant_type": "authorization_code",
            "redirect_uri": self.config.redirect_uri,
        });

        self.exchange(&body)
            .await
            .map_err(|payload| Error::Authentication(format!("Token exchange failed: {}", payload)))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    /// - `RefreshFailed` carrying the upstream payload
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<Map<String, Value>> {
        let body = json!({
            "refresh_token": refresh_token.expose(),
            "grant_type": "refresh_token",
        });

        self.exchange(&body).await.map_err(Error::RefreshFailed)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// POST `body` to the proxy. On failure, returns the upstream payload.
    async fn exchange(&self, body: &Value) -> std::result::Result<Map<String, Value>, String> {
        let response = self
            .http
            .post(&self.config.auth_proxy_url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            return Err(format!("{} - {}", status, text));
        }

        let payload: Map<String, Value> = serde_json::from_str(&text)
            .map_err(|_| format!("Did not find an access token. Found: {}", text))?;

        match payload.get("access_token") {
            Some(Value::String(token)) if !token.is_empty() => Ok(payload),
            _ => Err(format!("Did not find an access token. Found: {}", text)),
        }
    }
}

/// Age and expiry of the stored grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStatus {
    /// Uid of the stored entry in use.
    pub uid: String,
    /// When the access token was issued, if recorded.
    pub issued_at: Option<DateTime<Utc>>,
    /// Seconds since issue.
    pub age_secs: i64,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// Whether the next request will refresh first.
    pub expired: bool,
}

/// Produces valid access tokens from the stored grant, refreshing and
/// persisting it when expired.
pub struct TokenManager {
    proxy: AuthProxy,
    credentials: CredentialStore,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    /// Create a new token manager.
    pub fn new(proxy: AuthProxy, credentials: CredentialStore) -> Self {
        Self {
            proxy,
            credentials,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// No network call is made while the stored token is younger than its
    /// `expires_in`.
    ///
    /// # Errors
    /// - `NoCredential` if no grant is stored
    /// - `RefreshFailed` if the refresh exchange fails
    pub async fn get_access_token(&self) -> Result<SecretString> {
        let record = self.load_required().await?;
        if !record.is_expired_at(Utc::now()) {
            return Ok(record.access_token.clone());
        }

        let _guard = self.refresh_lock.lock().await;

        // Double-check after acquiring the lock
        let record = self.load_required().await?;
        if !record.is_expired_at(Utc::now()) {
            return Ok(record.access_token.clone());
        }

        info!("Refreshing expired access token");

        let response = self.proxy.refresh(&record.refresh_token).await?;
        let issued_at = Utc::now();
        let refreshed = record.merge_refresh(response)?;

        if self.credentials.replace(&refreshed, issued_at).await? {
            debug!("Persisted refreshed token for {}", refreshed.node.uid);
        }

        Ok(refreshed.access_token.clone())
    }

    /// Connect an account from an authorization code.
    ///
    /// Returns the uid of the new stored entry.
    pub async fn login(&self, code: &str) -> Result<String> {
        let response = self.proxy.exchange_code(code).await?;
        let issued_at = Utc::now();
        let record: CredentialRecord = serde_json::from_value(Value::Object(response))?;

        let label = record
            .extra
            .get("account_id")
            .and_then(Value::as_str)
            .unwrap_or("Dropbox")
            .to_string();

        let uid = self.credentials.insert(&label, &record, issued_at).await?;
        info!("Stored Dropbox login {} for {}", uid, label);
        Ok(uid)
    }

    /// Describe the stored grant without touching the network.
    pub async fn status(&self) -> Result<Option<TokenStatus>> {
        let now = Utc::now();
        Ok(self.credentials.load().await?.map(|record| TokenStatus {
            uid: record.node.uid.clone(),
            issued_at: record.node.time,
            age_secs: record.age_at(now),
            expires_in: record.expires_in,
            expired: record.is_expired_at(now),
        }))
    }

    /// Get the proxy client.
    pub fn proxy(&self) -> &AuthProxy {
        &self.proxy
    }

    async fn load_required(&self) -> Result<CredentialRecord> {
        self.credentials.load().await?.ok_or_else(|| {
            Error::NoCredential("Try logging in to Dropbox first.".to_string())
        })
    }
}

#[async_trait]
impl AccessTokenSource for TokenManager {
    async fn access_token(&self) -> Result<SecretString> {
        self.get_access_token().await
    }
}
