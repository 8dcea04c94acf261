//! Minimal element and event model of the host page.

use dropline_upload::UploadFile;

/// Identity of an element for as long as it is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// An element reported by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: ElementId,
    /// Tag name, as the DOM reports it (`DIV`, `TEXTAREA`, ...).
    pub tag: String,
    pub classes: Vec<String>,
    /// `type` attribute of input elements.
    pub input_type: Option<String>,
    /// Whether the element's parent is the page body itself.
    pub parent_is_body: bool,
}

impl Element {
    /// Create an element with no classes, nested somewhere below the body.
    pub fn new(id: ElementId, tag: impl Into<String>) -> Self {
        Self {
            id,
            tag: tag.into(),
            classes: Vec::new(),
            input_type: None,
            parent_is_body: false,
        }
    }

    /// Add a class name.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set the input `type`.
    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    /// Mark the element as a direct child of the body.
    pub fn attached_to_body(mut self) -> Self {
        self.parent_is_body = true;
        self
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// A hidden file input the host mounts on the body for its own
    /// "attach file" action.
    pub fn is_transient_file_input(&self) -> bool {
        self.is_tag("INPUT")
            && self.parent_is_body
            && self
                .input_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("file"))
    }
}

/// Structural change of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Added(Element),
    Removed(ElementId),
}

/// Event delivered to the capture layer.
#[derive(Debug, Clone)]
pub enum DomEvent {
    /// Files dropped on an element.
    Drop {
        target: ElementId,
        files: Vec<UploadFile>,
    },
    /// Clipboard paste into an element.
    Paste {
        target: ElementId,
        files: Vec<UploadFile>,
    },
    /// Click anywhere on the page, seen in the capture phase.
    Click { target: Element },
    /// Selection changed on an input element.
    Change {
        target: ElementId,
        files: Vec<UploadFile>,
    },
}

/// What the capture layer did to the event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventResponse {
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl EventResponse {
    /// Leave the event to the host.
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Suppress the host's own handling.
    pub fn consumed() -> Self {
        Self {
            default_prevented: true,
            propagation_stopped: true,
        }
    }
}
