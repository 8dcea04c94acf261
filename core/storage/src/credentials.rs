//! Persisted OAuth grant and the key/value storage it lives in.
//!
//! The grant is stored as one entry of a JSON array kept under a single
//! storage key. Other entries under the same key belong to unrelated
//! accounts and are never touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use dropline_common::{Error, Result, SecretString};

/// Storage key holding the Dropbox grants.
pub const OAUTH_STORAGE_KEY: &str = "oauth-dropbox";

/// String key/value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// In-memory key/value store.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Key/value store backed by a single JSON object file.
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Create a store at `path`. The file is created on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                Error::Storage(format!(
                    "Corrupt storage file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value);
        let json = serde_json::to_string_pretty(&entries)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling first so readers never see a partial file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Wrote storage key {} to {}", key, self.path.display());
        Ok(())
    }
}

/// One persisted entry under the storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    /// Unique id of the entry.
    pub uid: String,
    /// JSON-encoded grant.
    pub data: String,
    /// When the access token in `data` was issued (epoch milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Account label.
    #[serde(default)]
    pub text: String,
}

/// The collection of entries under one storage key, addressed by uid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredItems(Vec<StoredItem>);

impl StoredItems {
    /// Parse the raw stored value. A missing value is an empty collection.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            None => Ok(Self::default()),
            Some(raw) if raw.trim().is_empty() => Ok(Self::default()),
            Some(raw) => serde_json::from_str(raw)
                .map(Self)
                .map_err(|e| Error::Storage(format!("Invalid stored credentials: {}", e))),
        }
    }

    /// Serialize back to the stored form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// The entry in use when no uid is specified.
    pub fn first(&self) -> Option<&StoredItem> {
        self.0.first()
    }

    /// Find an entry by uid.
    pub fn find(&self, uid: &str) -> Option<&StoredItem> {
        self.0.iter().find(|item| item.uid == uid)
    }

    /// Replace the entry sharing `item.uid`, keeping its position.
    ///
    /// Returns false when no entry has that uid.
    pub fn replace(&mut self, item: StoredItem) -> bool {
        match self.0.iter_mut().find(|existing| existing.uid == item.uid) {
            Some(existing) => {
                *existing = item;
                true
            }
            None => false,
        }
    }

    /// Append a new entry.
    pub fn push(&mut self, item: StoredItem) {
        self.0.push(item);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredItem> {
        self.0.iter()
    }
}

/// Identity of the stored entry a grant was loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialNode {
    /// Uid of the stored entry.
    pub uid: String,
    /// When the access token was issued.
    pub time: Option<DateTime<Utc>>,
}

/// OAuth grant for the connected account.
///
/// `expires_in` is relative to `node.time`, never absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: SecretString,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: SecretString,
    /// Fields this crate does not interpret (account id, scope, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub node: CredentialNode,
}

impl CredentialRecord {
    /// Build a record from a stored entry.
    pub fn from_item(item: &StoredItem) -> Result<Self> {
        let mut record: CredentialRecord = serde_json::from_str(&item.data)
            .map_err(|e| Error::Storage(format!("Invalid grant for {}: {}", item.uid, e)))?;
        record.node = CredentialNode {
            uid: item.uid.clone(),
            time: item.time.and_then(DateTime::<Utc>::from_timestamp_millis),
        };
        Ok(record)
    }

    /// Seconds since the access token was issued. A missing issue time
    /// counts from the Unix epoch.
    pub fn age_at(&self, now: DateTime<Utc>) -> i64 {
        let issued = self.node.time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        (now - issued).num_seconds()
    }

    /// Whether the access token must be refreshed before use.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.age_at(now) > self.expires_in
    }

    /// Apply a token exchange response on top of this grant.
    ///
    /// The refresh token and unrelated fields are kept unless the response
    /// overrides them.
    pub fn merge_refresh(&self, response: Map<String, Value>) -> Result<Self> {
        let mut merged = Map::new();
        merged.insert(
            "refresh_token".to_string(),
            Value::String(self.refresh_token.expose().to_string()),
        );
        merged.extend(self.extra.clone());
        merged.extend(response);

        let mut record: CredentialRecord = serde_json::from_value(Value::Object(merged))?;
        record.node = self.node.clone();
        Ok(record)
    }

    /// JSON form stored in `StoredItem::data`.
    pub fn to_data(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Reads and rewrites the grant entry under the OAuth storage key.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl CredentialStore {
    /// Create an adapter over the default storage key.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, OAUTH_STORAGE_KEY)
    }

    /// Create an adapter over a custom storage key.
    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// All entries under the storage key.
    pub async fn items(&self) -> Result<StoredItems> {
        let raw = self.store.get(&self.key).await?;
        StoredItems::parse(raw.as_deref())
    }

    /// Load the grant in use, if any.
    pub async fn load(&self) -> Result<Option<CredentialRecord>> {
        let items = self.items().await?;
        items.first().map(CredentialRecord::from_item).transpose()
    }

    /// Persist `record` into the entry it was loaded from.
    ///
    /// # Postconditions
    /// - The entry matching `record.node.uid` holds the new grant and issue time
    /// - All other entries are unchanged
    ///
    /// Returns false if the entry no longer exists.
    pub async fn replace(&self, record: &CredentialRecord, issued_at: DateTime<Utc>) -> Result<bool> {
        let mut items = self.items().await?;

        let text = match items.find(&record.node.uid) {
            Some(existing) => existing.text.clone(),
            None => {
                warn!(
                    "Stored credential {} disappeared, not persisting refreshed token",
                    record.node.uid
                );
                return Ok(false);
            }
        };

        items.replace(StoredItem {
            uid: record.node.uid.clone(),
            data: record.to_data()?,
            time: Some(issued_at.timestamp_millis()),
            text,
        });

        self.store.set(&self.key, items.to_json()?).await?;
        Ok(true)
    }

    /// Store a new grant as a fresh entry and return its uid.
    pub async fn insert(
        &self,
        text: &str,
        record: &CredentialRecord,
        issued_at: DateTime<Utc>,
    ) -> Result<String> {
        let mut items = self.items().await?;
        let uid = Uuid::new_v4().simple().to_string();

        items.push(StoredItem {
            uid: uid.clone(),
            data: record.to_data()?,
            time: Some(issued_at.timestamp_millis()),
            text: text.to_string(),
        });

        self.store.set(&self.key, items.to_json()?).await?;
        Ok(uid)
    }
}
