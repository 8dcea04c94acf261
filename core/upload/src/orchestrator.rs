//! Upload orchestration: placeholder, token, upload, share, markup.
//!
//! Every upload creates exactly one placeholder block before any network
//! call and resolves it exactly once, either to the final markup or to a
//! failure report with the raw error as a child block.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use dropline_common::{BlockUid, Error, InsertionTarget, Result, SecretString};
use dropline_storage::{AccessTokenSource, SharingProvider};

use crate::document::HostDocument;
use crate::file::UploadFile;
use crate::markup::{resolve_content_type, select_markup, Markup};

/// Placeholder text shown while an upload is in flight.
pub const LOADING_TEXT: &str = "Loading...";

/// First line of a failure report.
pub const FAILURE_TEXT: &str = "Failed to upload file to Dropbox. See the error below:";

/// Terminal state of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The placeholder now holds `markup` (which may be the unknown
    /// content type message).
    Completed { block: BlockUid, markup: Markup },
    /// The placeholder holds a failure report, if it could be created.
    Failed {
        block: Option<BlockUid>,
        error: String,
    },
}

impl UploadOutcome {
    /// Whether the file was uploaded and linked.
    pub fn is_completed(&self) -> bool {
        matches!(self, UploadOutcome::Completed { .. })
    }

    /// The placeholder block, if one was created.
    pub fn block(&self) -> Option<&BlockUid> {
        match self {
            UploadOutcome::Completed { block, .. } => Some(block),
            UploadOutcome::Failed { block, .. } => block.as_ref(),
        }
    }
}

/// Drives one file from the host document to a public link and back.
pub struct Uploader {
    tokens: Arc<dyn AccessTokenSource>,
    storage: Arc<dyn SharingProvider>,
    document: Arc<dyn HostDocument>,
}

impl Uploader {
    /// Create a new uploader.
    pub fn new(
        tokens: Arc<dyn AccessTokenSource>,
        storage: Arc<dyn SharingProvider>,
        document: Arc<dyn HostDocument>,
    ) -> Self {
        Self {
            tokens,
            storage,
            document,
        }
    }

    /// Start an upload without waiting for it.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(self: &Arc<Self>, file: UploadFile, target: InsertionTarget) -> JoinHandle<UploadOutcome> {
        let uploader = Arc::clone(self);
        tokio::spawn(async move { uploader.upload(file, target).await })
    }

    /// Upload `file` and write the result at `target`.
    ///
    /// Never fails: every error after the placeholder exists is written
    /// into the document.
    pub async fn upload(&self, file: UploadFile, target: InsertionTarget) -> UploadOutcome {
        let block = match self.create_placeholder(&target).await {
            Ok(block) => block,
            Err(e) => {
                error!("Failed to create placeholder for {}: {}", file.name(), e);
                return UploadOutcome::Failed {
                    block: None,
                    error: e.to_string(),
                };
            }
        };

        let outcome = match self.run(&file, &block).await {
            Ok(markup) => {
                info!("Uploaded {} as {}", file.name(), markup);
                UploadOutcome::Completed { block, markup }
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", file.name(), e);
                self.report_failure(&block, &e).await;
                UploadOutcome::Failed {
                    block: Some(block),
                    error: e.to_string(),
                }
            }
        };

        self.document.hide_drop_indicators().await;
        outcome
    }

    async fn create_placeholder(&self, target: &InsertionTarget) -> Result<BlockUid> {
        match target {
            InsertionTarget::NewChild { parent, order } => {
                self.document
                    .create_block(parent, *order, LOADING_TEXT)
                    .await
            }
            InsertionTarget::Existing(uid) => {
                self.document.update_block(uid, LOADING_TEXT).await?;
                Ok(uid.clone())
            }
        }
    }

    async fn run(&self, file: &UploadFile, block: &BlockUid) -> Result<Markup> {
        let token = self.tokens.access_token().await?;
        let markup = self.transfer(file, &token).await?;
        self.document.update_block(block, &markup.to_string()).await?;
        Ok(markup)
    }

    async fn transfer(&self, file: &UploadFile, token: &SecretString) -> Result<Markup> {
        let data = file.read_all().await?;
        let remote = self.storage.upload(token, file.name(), data).await?;
        debug!("Stored {} at {}", file.name(), remote.path_display);

        let link = self.storage.share(token, &remote.path_display).await?;
        let content_type = resolve_content_type(&remote.name);

        Ok(select_markup(content_type, file.name(), &link.url))
    }

    async fn report_failure(&self, block: &BlockUid, err: &Error) {
        if let Err(e) = self.document.update_block(block, FAILURE_TEXT).await {
            error!("Failed to write failure report to {}: {}", block, e);
        }

        let detail = err.to_report().to_string();
        if let Err(e) = self.document.create_block(block, None, &detail).await {
            error!("Failed to write error detail under {}: {}", block, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use async_trait::async_trait;
    use bytes::Bytes;
    use dropline_storage::{RemoteFile, SharedLink};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct FakeTokens {
        token: Option<&'static str>,
        log: Log,
    }

    #[async_trait]
    impl AccessTokenSource for FakeTokens {
        async fn access_token(&self) -> Result<SecretString> {
            self.log.lock().unwrap().push("token".to_string());
            self.token
                .map(SecretString::new)
                .ok_or_else(|| Error::NoCredential("Try logging in to Dropbox first.".to_string()))
        }
    }

    struct FakeStorage {
        existing_link: Option<&'static str>,
        fail_upload: bool,
        log: Log,
    }

    #[async_trait]
    impl SharingProvider for FakeStorage {
        async fn upload(&self, _token: &SecretString, name: &str, _data: Bytes) -> Result<RemoteFile> {
            self.log.lock().unwrap().push(format!("upload {}", name));
            if self.fail_upload {
                return Err(Error::Upload("connection reset".to_string()));
            }
            Ok(RemoteFile {
                name: name.to_string(),
                path_display: format!("/{}", name),
            })
        }

        async fn list_shared_links(&self, _token: &SecretString, path: &str) -> Result<Vec<SharedLink>> {
            self.log.lock().unwrap().push(format!("list {}", path));
            Ok(self
                .existing_link
                .map(|url| SharedLink { url: url.to_string() })
                .into_iter()
                .collect())
        }

        async fn create_shared_link(&self, _token: &SecretString, path: &str) -> Result<SharedLink> {
            self.log.lock().unwrap().push(format!("create {}", path));
            Ok(SharedLink {
                url: format!("https://www.dropbox.com/s/xyz{}?dl=0", path),
            })
        }
    }

    /// Records placeholder writes into the shared log before delegating.
    struct LoggedDocument {
        inner: MemoryDocument,
        log: Log,
    }

    #[async_trait]
    impl HostDocument for LoggedDocument {
        async fn create_block(&self, parent: &BlockUid, order: Option<u32>, text: &str) -> Result<BlockUid> {
            self.log.lock().unwrap().push(format!("create_block {}", text));
            self.inner.create_block(parent, order, text).await
        }

        async fn update_block(&self, uid: &BlockUid, text: &str) -> Result<()> {
            self.log.lock().unwrap().push(format!("update_block {}", text));
            self.inner.update_block(uid, text).await
        }

        async fn hide_drop_indicators(&self) {
            self.inner.hide_drop_indicators().await
        }
    }

    struct Harness {
        uploader: Arc<Uploader>,
        document: Arc<LoggedDocument>,
        page: BlockUid,
        log: Log,
    }

    fn harness(token: Option<&'static str>, existing_link: Option<&'static str>, fail_upload: bool) -> Harness {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let document = Arc::new(LoggedDocument {
            inner: MemoryDocument::new(),
            log: log.clone(),
        });
        let page = document.inner.create_root("page").unwrap();
        let uploader = Arc::new(Uploader::new(
            Arc::new(FakeTokens {
                token,
                log: log.clone(),
            }),
            Arc::new(FakeStorage {
                existing_link,
                fail_upload,
                log: log.clone(),
            }),
            document.clone(),
        ));
        Harness {
            uploader,
            document,
            page,
            log,
        }
    }

    fn new_child(page: &BlockUid) -> InsertionTarget {
        InsertionTarget::NewChild {
            parent: page.clone(),
            order: Some(0),
        }
    }

    #[tokio::test]
    async fn test_image_upload_creates_link_and_embeds() {
        let h = harness(Some("tok"), None, false);
        let file = UploadFile::from_bytes("photo.png", &b"\x89PNG"[..]);

        let outcome = h.uploader.upload(file, new_child(&h.page)).await;

        let block = outcome.block().unwrap().clone();
        assert!(outcome.is_completed());
        assert_eq!(
            h.document.inner.text(&block).unwrap(),
            "![](https://dl.dropboxusercontent.com/s/xyz/photo.png?raw=1)"
        );
        assert_eq!(h.document.inner.children(&h.page).len(), 1);

        let log = h.log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "create_block Loading...",
                "token",
                "upload photo.png",
                "list /photo.png",
                "create /photo.png",
                "update_block ![](https://dl.dropboxusercontent.com/s/xyz/photo.png?raw=1)",
            ]
        );
    }

    #[tokio::test]
    async fn test_existing_link_is_reused() {
        let h = harness(Some("tok"), Some("https://www.dropbox.com/s/old/talk.mp3?dl=0"), false);
        let file = UploadFile::from_bytes("talk.mp3", &b"ID3"[..]);

        let outcome = h.uploader.upload(file, new_child(&h.page)).await;

        let block = outcome.block().unwrap();
        assert_eq!(
            h.document.inner.text(block).unwrap(),
            "{{audio: https://www.dropbox.com/s/old/talk.mp3?raw=1}}"
        );
        assert!(!h.log.lock().unwrap().iter().any(|e| e.starts_with("create /")));
    }

    #[tokio::test]
    async fn test_unknown_extension() {
        let h = harness(Some("tok"), None, false);
        let file = UploadFile::from_bytes("notes.xyz", &b"?"[..]);

        let outcome = h.uploader.upload(file, new_child(&h.page)).await;

        match &outcome {
            UploadOutcome::Completed { block, markup } => {
                assert_eq!(
                    markup,
                    &Markup::UnknownContentType {
                        name: "notes.xyz".to_string()
                    }
                );
                assert_eq!(
                    h.document.inner.text(block).unwrap(),
                    "Unknown Content type for file notes.xyz"
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_uppercase_extension_still_embeds() {
        let h = harness(Some("tok"), None, false);
        let file = UploadFile::from_bytes("PHOTO.PNG", &b"\x89PNG"[..]);

        let outcome = h.uploader.upload(file, new_child(&h.page)).await;

        let block = outcome.block().unwrap();
        assert_eq!(
            h.document.inner.text(block).unwrap(),
            "![](https://dl.dropboxusercontent.com/s/xyz/PHOTO.PNG?raw=1)"
        );
    }

    #[tokio::test]
    async fn test_upload_failure_writes_report() {
        let h = harness(Some("tok"), None, true);
        let file = UploadFile::from_bytes("photo.png", &b"\x89PNG"[..]);

        let outcome = h.uploader.upload(file, new_child(&h.page)).await;

        let block = outcome.block().unwrap().clone();
        assert!(!outcome.is_completed());
        assert_eq!(h.document.inner.text(&block).unwrap(), FAILURE_TEXT);

        let details = h.document.inner.children(&block);
        assert_eq!(details.len(), 1);
        let report: serde_json::Value = serde_json::from_str(&details[0].text).unwrap();
        assert_eq!(report["kind"], "upload");
        assert!(report["message"].as_str().unwrap().contains("connection reset"));
        assert_eq!(h.document.inner.indicators_hidden(), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_stops_before_upload() {
        let h = harness(None, None, false);
        let file = UploadFile::from_bytes("photo.png", &b"\x89PNG"[..]);

        let outcome = h.uploader.upload(file, new_child(&h.page)).await;

        let block = outcome.block().unwrap().clone();
        assert_eq!(h.document.inner.text(&block).unwrap(), FAILURE_TEXT);
        let log = h.log.lock().unwrap().clone();
        assert!(!log.iter().any(|e| e.starts_with("upload")));

        let report: serde_json::Value =
            serde_json::from_str(&h.document.inner.children(&block)[0].text).unwrap();
        assert_eq!(report["kind"], "no_credential");
    }

    #[tokio::test]
    async fn test_existing_block_is_overwritten() {
        let h = harness(Some("tok"), None, false);
        let editing = h
            .document
            .inner
            .create_block(&h.page, None, "draft text")
            .await
            .unwrap();
        let file = UploadFile::from_bytes("report.pdf", &b"%PDF"[..]);

        let outcome = h
            .uploader
            .upload(file, InsertionTarget::Existing(editing.clone()))
            .await;

        assert_eq!(outcome.block(), Some(&editing));
        assert_eq!(
            h.document.inner.text(&editing).unwrap(),
            "{{pdf: https://www.dropbox.com/s/xyz/report.pdf?raw=1}}"
        );
        assert_eq!(h.log.lock().unwrap()[0], "update_block Loading...");
        assert_eq!(h.document.inner.children(&h.page).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_parent_fails_without_network() {
        let h = harness(Some("tok"), None, false);
        let target = InsertionTarget::NewChild {
            parent: BlockUid::new("ghost").unwrap(),
            order: None,
        };

        let outcome = h
            .uploader
            .upload(UploadFile::from_bytes("a.png", &b"a"[..]), target)
            .await;

        assert_eq!(outcome.block(), None);
        assert!(!h.log.lock().unwrap().iter().any(|e| e == "token"));
    }

    #[tokio::test]
    async fn test_spawned_uploads_are_independent() {
        let h = harness(Some("tok"), None, false);

        let first = h
            .uploader
            .spawn(UploadFile::from_bytes("a.png", &b"a"[..]), new_child(&h.page));
        let second = h
            .uploader
            .spawn(UploadFile::from_bytes("b.mp4", &b"b"[..]), new_child(&h.page));

        let first = first.await.unwrap();
        let second = second.await.unwrap();

        assert!(first.is_completed() && second.is_completed());
        assert_ne!(first.block(), second.block());
        assert_eq!(h.document.inner.children(&h.page).len(), 2);
        assert_eq!(h.document.inner.indicators_hidden(), 2);
    }
}
