//! Dropline event capture.
//!
//! Watches the host page for drop zones, block text inputs and the
//! transient file inputs behind the host's "attach file" action, and turns
//! file-carrying events on them into uploads.
//!
//! The page is modeled as a stream of [`Mutation`]s and [`DomEvent`]s.
//! Positions inside the host document are resolved through a
//! [`HostLocator`].

pub mod capture;
pub mod dom;
pub mod locator;
pub mod observer;

pub use capture::{CaptureInput, CaptureLayer, Dispatch};
pub use dom::{DomEvent, Element, ElementId, EventResponse, Mutation};
pub use locator::{HostLocator, MapLocator};
pub use observer::{ElementObserver, Marker, BLOCK_INPUT, DROP_ZONE};
