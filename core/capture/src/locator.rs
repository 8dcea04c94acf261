//! Positional lookups into the host document.

use std::collections::HashMap;

use dropline_common::{BlockUid, Error, InsertionTarget, Result};

use crate::dom::ElementId;

/// Maps page elements to positions in the host document.
pub trait HostLocator: Send + Sync {
    /// Where a file dropped on `zone` should be inserted.
    fn drop_insertion(&self, zone: ElementId) -> Result<InsertionTarget>;

    /// The block edited through `input`.
    fn block_uid(&self, input: ElementId) -> Result<BlockUid>;
}

/// Locator backed by fixed tables, for hosts that report positions up front.
#[derive(Debug, Default, Clone)]
pub struct MapLocator {
    drop_targets: HashMap<ElementId, InsertionTarget>,
    inputs: HashMap<ElementId, BlockUid>,
}

impl MapLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the insertion point of a drop zone.
    pub fn with_drop_zone(mut self, zone: ElementId, target: InsertionTarget) -> Self {
        self.drop_targets.insert(zone, target);
        self
    }

    /// Register the block behind a text input.
    pub fn with_input(mut self, input: ElementId, block: BlockUid) -> Self {
        self.inputs.insert(input, block);
        self
    }
}

impl HostLocator for MapLocator {
    fn drop_insertion(&self, zone: ElementId) -> Result<InsertionTarget> {
        self.drop_targets
            .get(&zone)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("No drop position for element {}", zone.0)))
    }

    fn block_uid(&self, input: ElementId) -> Result<BlockUid> {
        self.inputs
            .get(&input)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("No block for element {}", input.0)))
    }
}
