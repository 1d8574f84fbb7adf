use super::component::ComponentHandle;
use super::declared::{AttrName, Attributes};
use crate::animation::Animation;
use crate::reconcile::ListenerSlot;
use crate::surface::ElementId;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Tag of the filler elements inserted while growing a reordered child list
pub const PLACEHOLDER_TAG: &str = "vt-placeholder";

/// The record kept for a declared node after it has been applied to a surface.
///
/// Mirrors the sanitized declaration it came from, plus the live element and
/// the listener slots bound on it.
#[derive(Debug)]
pub struct RenderedNode {
    pub(crate) tag: AttrName,
    pub(crate) content: Option<String>,
    pub(crate) raw: bool,
    pub(crate) attrs: Attributes,
    pub(crate) children: Vec<RenderedNode>,
    pub(crate) element: ElementId,
    pub(crate) component: Option<ComponentHandle>,
    pub(crate) listeners: HashMap<AttrName, ListenerSlot>,
    pub(crate) animations: SmallVec<[Animation; 1]>,
}

impl RenderedNode {
    pub(crate) fn new(
        element: ElementId,
        tag: &str,
        raw: bool,
        component: Option<ComponentHandle>,
    ) -> Self {
        Self {
            tag: tag.into(),
            content: None,
            raw,
            attrs: Attributes::new(),
            children: Vec::new(),
            element,
            component,
            listeners: HashMap::new(),
            animations: SmallVec::new(),
        }
    }

    pub(crate) fn placeholder(element: ElementId) -> Self {
        Self::new(element, PLACEHOLDER_TAG, false, None)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn children(&self) -> &[RenderedNode] {
        &self.children
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn component(&self) -> Option<&ComponentHandle> {
        self.component.as_ref()
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn is_placeholder(&self) -> bool {
        self.component.is_none() && self.tag.as_str() == PLACEHOLDER_TAG
    }

    /// Depth-first search for the node bound to `element`
    pub fn find(&self, element: ElementId) -> Option<&RenderedNode> {
        if self.element == element {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(element))
    }
}
