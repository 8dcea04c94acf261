//! Common types used throughout Dropline.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unique identifier of a block in the host outline document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockUid(String);

impl BlockUid {
    /// Create a new BlockUid from a string.
    ///
    /// # Errors
    /// - Returns error if uid is empty
    pub fn new(uid: impl Into<String>) -> crate::Result<Self> {
        let uid = uid.into();
        if uid.is_empty() {
            return Err(crate::Error::InvalidInput(
                "BlockUid cannot be empty".to_string(),
            ));
        }
        Ok(Self(uid))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the placeholder for an upload is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertionTarget {
    /// Create a new block under `parent`, at `order` among its children
    /// (appended when `None`).
    NewChild {
        parent: BlockUid,
        order: Option<u32>,
    },
    /// Overwrite the text of a block that already exists.
    Existing(BlockUid),
}

/// String secret (access or refresh token) that zeroizes on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First characters followed by an ellipsis, for display.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_block_uid_creation() {
        let uid = BlockUid::new("abc123XYZ").unwrap();
        assert_eq!(uid.as_str(), "abc123XYZ");
        assert_eq!(uid.to_string(), "abc123XYZ");
    }

    #[test]
    fn test_block_uid_empty_fails() {
        assert!(BlockUid::new("").is_err());
    }

    #[test]
    fn test_secret_serializes_transparently() {
        let secret = SecretString::new("sl.token");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"sl.token\"");

        let back: SecretString = serde_json::from_str("\"sl.token\"").unwrap();
        assert_eq!(back.expose(), "sl.token");
    }

    #[test]
    fn test_secret_masked() {
        assert_eq!(SecretString::new("sl.ABCDEFG").masked(), "sl.A…");
    }

    proptest! {
        #[test]
        fn test_secret_debug_is_redacted(value in "[a-zA-Z0-9]{8,40}") {
            let secret = SecretString::new(value.clone());
            let debug = format!("{:?}", secret);
            prop_assert!(!debug.contains(&value));
        }
    }
}
