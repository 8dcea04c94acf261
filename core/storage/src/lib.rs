//! Storage side of the Dropline upload pipeline.
//!
//! This crate provides the provider-facing half of an upload:
//! - Content-type resolution from file names
//! - Persisted OAuth grants and the key/value stores holding them
//! - Access token lifecycle (lazy refresh, persistence)
//! - The Dropbox HTTP protocol: upload, shared link lookup and creation
//!
//! # Design Principles
//! - Trait seams (`AccessTokenSource`, `SharingProvider`) keep the upload
//!   orchestration independent of the HTTP client
//! - Async operations: all I/O is async
//! - Unified error semantics through `dropline_common::Error`

pub mod credentials;
pub mod dropbox;
pub mod mime;
pub mod provider;

pub use credentials::{
    CredentialNode, CredentialRecord, CredentialStore, FileKeyValueStore, KeyValueStore,
    MemoryKeyValueStore, StoredItem, StoredItems, OAUTH_STORAGE_KEY,
};
pub use dropbox::{AuthConfig, AuthProxy, DropboxClient, DropboxConfig, TokenManager, TokenStatus};
pub use provider::{AccessTokenSource, RemoteFile, SharedLink, SharingProvider};
