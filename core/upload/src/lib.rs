//! Dropline upload orchestration.
//!
//! This module provides:
//! - The host document interface and an in-memory outline
//! - Markup selection for uploaded files
//! - The upload pipeline: placeholder, token, upload, shared link, write-back
//!
//! # Architecture
//! The uploader sits between the event capture layer and the storage
//! provider. It owns no state beyond its collaborators; each upload owns its
//! own placeholder block.

pub mod document;
pub mod file;
pub mod markup;
pub mod orchestrator;

pub use document::{Block, HostDocument, MemoryDocument};
pub use file::{FileSource, UploadFile};
pub use markup::{select_markup, Markup, MARKUP_RULES};
pub use orchestrator::{UploadOutcome, Uploader, FAILURE_TEXT, LOADING_TEXT};
