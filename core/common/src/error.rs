//! Common error types for Dropline.

use thiserror::Error;

/// Top-level error type for Dropline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No stored OAuth grant exists for the connected account.
    #[error("Could not find your login info. {0}")]
    NoCredential(String),

    /// The auth proxy did not return a new access token.
    ///
    /// Carries the upstream payload verbatim.
    #[error("Failed to refresh your access token: {0}")]
    RefreshFailed(String),

    /// Transport or API failure at any step of the provider protocol.
    #[error("Upload error: {0}")]
    Upload(String),

    /// The provider rejected the access token.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Credential persistence failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Writing to the host document failed.
    #[error("Document error: {0}")]
    Document(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Stable tag naming the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NoCredential(_) => "no_credential",
            Error::RefreshFailed(_) => "refresh_failed",
            Error::Upload(_) => "upload",
            Error::Authentication(_) => "authentication",
            Error::Storage(_) => "storage",
            Error::Document(_) => "document",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
        }
    }

    /// Raw error dump written next to a failed upload.
    pub fn to_report(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
