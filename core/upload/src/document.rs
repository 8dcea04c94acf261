//! Host outline document interface.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use dropline_common::{BlockUid, Error, Result};

/// Writes into the host outline document.
#[async_trait]
pub trait HostDocument: Send + Sync {
    /// Create a block with `text` under `parent`, at `order` among its
    /// children (appended when `None`).
    async fn create_block(&self, parent: &BlockUid, order: Option<u32>, text: &str)
        -> Result<BlockUid>;

    /// Replace the text of an existing block.
    async fn update_block(&self, uid: &BlockUid, text: &str) -> Result<()>;

    /// Hide drop-target indicators left over from a drag-and-drop.
    async fn hide_drop_indicators(&self) {}
}

/// A block of the in-memory outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub uid: BlockUid,
    pub text: String,
    pub children: Vec<BlockUid>,
}

/// In-memory outline document.
///
/// Blocks form a tree; roots are created with `create_root`.
#[derive(Default)]
pub struct MemoryDocument {
    blocks: RwLock<HashMap<BlockUid, Block>>,
    indicators_hidden: AtomicUsize,
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<BlockUid, Block>>> {
        self.blocks
            .read()
            .map_err(|_| Error::Document("Document lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<BlockUid, Block>>> {
        self.blocks
            .write()
            .map_err(|_| Error::Document("Document lock poisoned".to_string()))
    }

    fn new_uid() -> Result<BlockUid> {
        let uid: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        BlockUid::new(uid)
    }

    /// Create a top-level block.
    pub fn create_root(&self, text: &str) -> Result<BlockUid> {
        let uid = Self::new_uid()?;
        self.write()?.insert(
            uid.clone(),
            Block {
                uid: uid.clone(),
                text: text.to_string(),
                children: Vec::new(),
            },
        );
        Ok(uid)
    }

    /// Get a block by uid.
    pub fn block(&self, uid: &BlockUid) -> Option<Block> {
        self.read().ok()?.get(uid).cloned()
    }

    /// Get the text of a block.
    pub fn text(&self, uid: &BlockUid) -> Option<String> {
        self.block(uid).map(|b| b.text)
    }

    /// Children of a block, in order.
    pub fn children(&self, uid: &BlockUid) -> Vec<Block> {
        let Ok(blocks) = self.read() else {
            return Vec::new();
        };
        blocks
            .get(uid)
            .map(|parent| {
                parent
                    .children
                    .iter()
                    .filter_map(|child| blocks.get(child).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of blocks.
    pub fn len(&self) -> usize {
        self.read().map(|b| b.len()).unwrap_or(0)
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times drop indicators were hidden.
    pub fn indicators_hidden(&self) -> usize {
        self.indicators_hidden.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostDocument for MemoryDocument {
    async fn create_block(
        &self,
        parent: &BlockUid,
        order: Option<u32>,
        text: &str,
    ) -> Result<BlockUid> {
        let uid = Self::new_uid()?;
        let mut blocks = self.write()?;

        let siblings = &mut blocks
            .get_mut(parent)
            .ok_or_else(|| Error::Document(format!("Parent block {} not found", parent)))?
            .children;
        let index = order
            .map(|o| (o as usize).min(siblings.len()))
            .unwrap_or(siblings.len());
        siblings.insert(index, uid.clone());

        blocks.insert(
            uid.clone(),
            Block {
                uid: uid.clone(),
                text: text.to_string(),
                children: Vec::new(),
            },
        );
        Ok(uid)
    }

    async fn update_block(&self, uid: &BlockUid, text: &str) -> Result<()> {
        let mut blocks = self.write()?;
        let block = blocks
            .get_mut(uid)
            .ok_or_else(|| Error::Document(format!("Block {} not found", uid)))?;
        block.text = text.to_string();
        Ok(())
    }

    async fn hide_drop_indicators(&self) {
        self.indicators_hidden.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_block_at_order() {
        let doc = MemoryDocument::new();
        let page = doc.create_root("page").unwrap();

        let first = doc.create_block(&page, None, "first").await.unwrap();
        let last = doc.create_block(&page, None, "last").await.unwrap();
        let middle = doc.create_block(&page, Some(1), "middle").await.unwrap();

        let order: Vec<BlockUid> = doc.children(&page).into_iter().map(|b| b.uid).collect();
        assert_eq!(order, vec![first, middle, last]);
    }

    #[tokio::test]
    async fn test_order_past_end_appends() {
        let doc = MemoryDocument::new();
        let page = doc.create_root("page").unwrap();
        doc.create_block(&page, None, "a").await.unwrap();

        let b = doc.create_block(&page, Some(42), "b").await.unwrap();
        assert_eq!(doc.children(&page).last().unwrap().uid, b);
    }

    #[tokio::test]
    async fn test_missing_parent() {
        let doc = MemoryDocument::new();
        let ghost = BlockUid::new("ghost").unwrap();

        let result = doc.create_block(&ghost, None, "x").await;
        assert!(matches!(result, Err(Error::Document(_))));
    }

    #[tokio::test]
    async fn test_update_block() {
        let doc = MemoryDocument::new();
        let page = doc.create_root("page").unwrap();

        doc.update_block(&page, "renamed").await.unwrap();
        assert_eq!(doc.text(&page).as_deref(), Some("renamed"));
        assert_eq!(doc.len(), 1);
    }
}
