//! Common utilities and types shared across Dropline crates.
//!
//! This module provides the error taxonomy used by the upload pipeline and
//! the identifiers that cross crate boundaries.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{BlockUid, InsertionTarget, SecretString};
