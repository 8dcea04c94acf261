//! Files handed to the upload pipeline.

use bytes::Bytes;
use std::path::{Path, PathBuf};

use dropline_common::{Error, Result};

/// Where the content of an upload comes from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on disk, read when the upload starts.
    Path(PathBuf),
    /// Content already in memory (clipboard, drag payload).
    Bytes(Bytes),
}

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    source: FileSource,
}

impl UploadFile {
    /// Refer to a file on disk. The name is the path's final component.
    ///
    /// # Errors
    /// - Path has no file name
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidInput(format!("{} has no file name", path.display()))
            })?;

        Ok(Self {
            name,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Wrap in-memory content.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(data.into()),
        }
    }

    /// Original file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the content comes from.
    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Read the full content.
    pub async fn read_all(&self) -> Result<Bytes> {
        match &self.source {
            FileSource::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            FileSource::Bytes(data) => Ok(data.clone()),
        }
    }
}
