//! Routes file-carrying page events to the uploader.
//!
//! Three surfaces feed uploads:
//! - drop zones between blocks (new sibling block at the drop position)
//! - block text inputs receiving a paste (overwrite the edited block)
//! - transient file inputs the host mounts on the body (overwrite the block
//!   of the most recently observed text input)
//!
//! Handling an event never waits for the upload it starts.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dropline_common::InsertionTarget;
use dropline_upload::{UploadFile, UploadOutcome, Uploader};

use crate::dom::{DomEvent, ElementId, EventResponse, Mutation};
use crate::locator::HostLocator;
use crate::observer::{ElementObserver, BLOCK_INPUT, DROP_ZONE};

/// Result of handling one event.
#[derive(Debug)]
pub struct Dispatch {
    pub response: EventResponse,
    /// The upload started by the event, if any.
    pub upload: Option<JoinHandle<UploadOutcome>>,
}

impl Dispatch {
    fn ignored() -> Self {
        Self {
            response: EventResponse::passthrough(),
            upload: None,
        }
    }
}

/// Input of the capture event loop.
#[derive(Debug)]
pub enum CaptureInput {
    Mutations(Vec<Mutation>),
    Event(DomEvent),
    Shutdown,
}

struct CaptureState {
    active: bool,
    drop_zones: ElementObserver,
    block_inputs: ElementObserver,
    /// Most recently observed block input. Written only when a block input
    /// is observed, read only by the file-picker path, cleared on teardown.
    last_input: Option<ElementId>,
    /// Transient file inputs awaiting their one `change` or their removal.
    pending_pickers: HashSet<ElementId>,
}

/// Event capture layer.
pub struct CaptureLayer {
    uploader: Arc<Uploader>,
    locator: Arc<dyn HostLocator>,
    state: Mutex<CaptureState>,
}

impl CaptureLayer {
    pub fn new(uploader: Arc<Uploader>, locator: Arc<dyn HostLocator>) -> Self {
        Self {
            uploader,
            locator,
            state: Mutex::new(CaptureState {
                active: true,
                drop_zones: ElementObserver::new(DROP_ZONE),
                block_inputs: ElementObserver::new(BLOCK_INPUT),
                last_input: None,
                pending_pickers: HashSet::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a structural change of the page.
    pub fn on_mutation(&self, mutation: Mutation) {
        let mut state = self.state();
        if !state.active {
            return;
        }

        match mutation {
            Mutation::Added(element) => {
                if state.drop_zones.observe(&element) {
                    debug!("Attached drop listener to {:?}", element.id);
                }
                if state.block_inputs.observe(&element) {
                    debug!("Attached paste listener to {:?}", element.id);
                    state.last_input = Some(element.id);
                }
            }
            Mutation::Removed(id) => {
                state.drop_zones.forget(id);
                state.block_inputs.forget(id);
                // A cancelled picker is unmounted without a `change`
                if state.pending_pickers.remove(&id) {
                    debug!("Dropped file selection listener on {:?}", id);
                }
            }
        }
    }

    /// Apply a batch of structural changes in order.
    pub fn on_mutations(&self, mutations: impl IntoIterator<Item = Mutation>) {
        for mutation in mutations {
            self.on_mutation(mutation);
        }
    }

    /// Handle one page event.
    ///
    /// Events carrying at least one file on an observed surface start an
    /// upload of the first file and are consumed; all others pass through.
    pub fn dispatch(&self, event: DomEvent) -> Dispatch {
        let mut state = self.state();
        if !state.active {
            return Dispatch::ignored();
        }

        match event {
            DomEvent::Drop { target, files } => {
                if !state.drop_zones.is_attached(target) {
                    return Dispatch::ignored();
                }
                drop(state);
                self.start(files, || self.locator.drop_insertion(target))
            }
            DomEvent::Paste { target, files } => {
                if !state.block_inputs.is_attached(target) {
                    return Dispatch::ignored();
                }
                drop(state);
                self.start(files, || {
                    self.locator
                        .block_uid(target)
                        .map(InsertionTarget::Existing)
                })
            }
            DomEvent::Click { target } => {
                if target.is_transient_file_input() && state.pending_pickers.insert(target.id) {
                    debug!("Listening for file selection on {:?}", target.id);
                }
                Dispatch::ignored()
            }
            DomEvent::Change { target, files } => {
                if !state.pending_pickers.remove(&target) {
                    return Dispatch::ignored();
                }
                let Some(input) = state.last_input else {
                    warn!("File selected but no block input has been observed");
                    return Dispatch::ignored();
                };
                drop(state);
                self.start(files, || {
                    self.locator
                        .block_uid(input)
                        .map(InsertionTarget::Existing)
                })
            }
        }
    }

    fn start(
        &self,
        files: Vec<UploadFile>,
        locate: impl FnOnce() -> dropline_common::Result<InsertionTarget>,
    ) -> Dispatch {
        let Some(file) = files.into_iter().next() else {
            return Dispatch::ignored();
        };

        let target = match locate() {
            Ok(target) => target,
            Err(e) => {
                warn!("Could not locate insertion point for {}: {}", file.name(), e);
                return Dispatch::ignored();
            }
        };

        info!("Uploading {} to {:?}", file.name(), target);
        Dispatch {
            response: EventResponse::consumed(),
            upload: Some(self.uploader.spawn(file, target)),
        }
    }

    /// The block input the file-picker path writes into.
    pub fn last_input(&self) -> Option<ElementId> {
        self.state().last_input
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Detach from every element and stop handling events.
    pub fn teardown(&self) {
        let mut state = self.state();
        state.active = false;
        state.drop_zones.clear();
        state.block_inputs.clear();
        state.pending_pickers.clear();
        state.last_input = None;
        info!("Event capture stopped");
    }

    /// Consume page input until `Shutdown` or until the channel closes,
    /// then tear down.
    ///
    /// Returns the uploads started along the way, minus those already
    /// finished when a later one started. None are aborted.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<CaptureInput>) -> Vec<JoinHandle<UploadOutcome>> {
        let mut uploads = Vec::new();

        while let Some(input) = rx.recv().await {
            match input {
                CaptureInput::Mutations(mutations) => self.on_mutations(mutations),
                CaptureInput::Event(event) => {
                    if let Some(upload) = self.dispatch(event).upload {
                        uploads.retain(|handle: &JoinHandle<UploadOutcome>| !handle.is_finished());
                        uploads.push(upload);
                    }
                }
                CaptureInput::Shutdown => break,
            }
        }

        self.teardown();
        uploads
    }
}
