//! Dropbox backend for Dropline.
//!
//! This module provides:
//! - OAuth2 token exchange through an anonymous proxy, with lazy refresh
//! - File upload with ASCII-safe argument headers
//! - Shared link lookup and creation

pub mod auth;
pub mod client;
pub mod config;
pub mod header;

pub use auth::{AuthProxy, TokenManager, TokenStatus};
pub use client::DropboxClient;
pub use config::{AuthConfig, DropboxConfig};
pub use header::http_header_safe_json;
