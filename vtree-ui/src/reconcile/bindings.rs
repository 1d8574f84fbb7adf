use crate::node::{ComponentHandle, WeakComponent};
use crate::surface::{ElementId, Surface};
use std::collections::HashMap;

/// Maps live elements back to the component that rendered them
#[derive(Default)]
pub(crate) struct ComponentBindings {
    by_element: HashMap<ElementId, WeakComponent>,
}

impl ComponentBindings {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&mut self, element: ElementId, component: &ComponentHandle) {
        self.by_element.insert(element, component.downgrade());
    }

    pub(crate) fn unbind(&mut self, element: ElementId) {
        self.by_element.remove(&element);
    }

    pub(crate) fn get(&self, element: ElementId) -> Option<ComponentHandle> {
        self.by_element.get(&element)?.upgrade()
    }

    /// Nearest component bound at or above `start` in the live tree
    pub(crate) fn resolve(&self, surface: &dyn Surface, start: ElementId) -> Option<ComponentHandle> {
        let mut current = Some(start);
        while let Some(element) = current {
            if let Some(component) = self.get(element) {
                return Some(component);
            }
            current = surface.parent(element);
        }
        None
    }
}
