//! Marker matching for elements the host mounts at runtime.

use std::collections::HashSet;

use crate::dom::{Element, ElementId};

/// Tag and class identifying a kind of host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub tag: &'static str,
    pub class: &'static str,
}

/// Drop areas between blocks.
pub const DROP_ZONE: Marker = Marker {
    tag: "DIV",
    class: "dnd-drop-area",
};

/// Text input of the block being edited.
pub const BLOCK_INPUT: Marker = Marker {
    tag: "TEXTAREA",
    class: "rm-block-input",
};

impl Marker {
    pub fn matches(&self, element: &Element) -> bool {
        element.is_tag(self.tag) && element.has_class(self.class)
    }
}

/// Tracks which mounted elements of one marker have a listener attached.
#[derive(Debug)]
pub struct ElementObserver {
    marker: Marker,
    attached: HashSet<ElementId>,
}

impl ElementObserver {
    pub fn new(marker: Marker) -> Self {
        Self {
            marker,
            attached: HashSet::new(),
        }
    }

    /// Attach to `element` if it matches and is not attached yet.
    ///
    /// Returns true only the first time a matching element is seen.
    pub fn observe(&mut self, element: &Element) -> bool {
        self.marker.matches(element) && self.attached.insert(element.id)
    }

    /// Detach from an unmounted element.
    pub fn forget(&mut self, id: ElementId) -> bool {
        self.attached.remove(&id)
    }

    pub fn is_attached(&self, id: ElementId) -> bool {
        self.attached.contains(&id)
    }

    pub fn clear(&mut self) {
        self.attached.clear();
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_once_per_element() {
        let mut observer = ElementObserver::new(DROP_ZONE);
        let zone = Element::new(ElementId(7), "DIV").with_class("dnd-drop-area");

        assert!(observer.observe(&zone));
        assert!(!observer.observe(&zone));
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn test_non_matching_elements_ignored() {
        let mut observer = ElementObserver::new(BLOCK_INPUT);
        let div = Element::new(ElementId(1), "DIV").with_class("rm-block-input");
        let textarea = Element::new(ElementId(2), "TEXTAREA").with_class("other");

        assert!(!observer.observe(&div));
        assert!(!observer.observe(&textarea));
        assert!(observer.is_empty());
    }

    #[test]
    fn test_forget_allows_reattach() {
        let mut observer = ElementObserver::new(BLOCK_INPUT);
        let input = Element::new(ElementId(3), "TEXTAREA").with_class("rm-block-input");

        observer.observe(&input);
        assert!(observer.forget(input.id));
        assert!(!observer.is_attached(input.id));
        assert!(observer.observe(&input));
    }
}
