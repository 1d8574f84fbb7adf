use super::markup::{self, MarkupNode};
use super::{ElementId, Event, FrameCallback, Listener, ListenerId, Surface};
use std::cell::{Cell, RefCell};
use std::fmt;

/// A mutating operation recorded by [`MemorySurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    CreateElement {
        element: ElementId,
        tag: String,
    },
    SetAttribute {
        element: ElementId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        element: ElementId,
        name: String,
    },
    AddListener {
        element: ElementId,
        kind: String,
    },
    RemoveListener {
        element: ElementId,
        kind: String,
    },
    InsertChild {
        parent: ElementId,
        child: ElementId,
    },
    RemoveChild {
        parent: ElementId,
        child: ElementId,
    },
    SetText {
        element: ElementId,
        text: String,
    },
    SetMarkup {
        element: ElementId,
        markup: String,
    },
}

struct RegisteredListener {
    id: ListenerId,
    kind: String,
    listener: Listener,
}

enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        listeners: Vec<RegisteredListener>,
    },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

/// Arena-based storage for surface nodes
struct NodeArena {
    nodes: Vec<NodeData>,
}

impl NodeArena {
    fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn create(&mut self, kind: NodeKind) -> ElementId {
        let id = ElementId::new(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn get(&self, id: ElementId) -> Option<&NodeData> {
        self.nodes.get(id.raw() as usize)
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.raw() as usize)
    }

    fn detach(&mut self, child: ElementId) {
        let Some(parent) = self.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = None;
        }
    }

    fn clear_children(&mut self, element: ElementId) {
        let children = match self.get_mut(element) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            if let Some(c) = self.get_mut(child) {
                c.parent = None;
            }
        }
    }

    fn attach(&mut self, parent: ElementId, child: ElementId, index: Option<usize>) {
        if let Some(p) = self.get_mut(parent) {
            match index {
                Some(i) if i <= p.children.len() => p.children.insert(i, child),
                _ => p.children.push(child),
            }
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    fn is_ancestor(&self, candidate: ElementId, of: ElementId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn build(&mut self, parent: ElementId, nodes: Vec<MarkupNode>) {
        for node in nodes {
            let id = match node {
                MarkupNode::Text(text) => self.create(NodeKind::Text(text)),
                MarkupNode::Element {
                    tag,
                    attrs,
                    children,
                } => {
                    let id = self.create(NodeKind::Element {
                        tag,
                        attrs,
                        listeners: Vec::new(),
                    });
                    self.build(id, children);
                    id
                }
            };
            self.attach(parent, id, None);
        }
    }

    fn text_into(&self, id: ElementId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.text_into(*child, out);
                }
            }
        }
    }

    fn markup_into(&self, id: ElementId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&markup::escape_text(text)),
            NodeKind::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&markup::escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if markup::is_void(tag) && node.children.is_empty() {
                    return;
                }
                for child in &node.children {
                    self.markup_into(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// In-memory [`Surface`] for tests and debugging.
///
/// Every mutating call is recorded as a [`SurfaceOp`]; frames only run when the
/// owner calls [`run_frame`](Self::run_frame) and time only moves through
/// [`advance`](Self::advance) / [`set_time`](Self::set_time).
pub struct MemorySurface {
    arena: RefCell<NodeArena>,
    frames: RefCell<Vec<FrameCallback>>,
    ops: RefCell<Vec<SurfaceOp>>,
    clock: Cell<f64>,
    next_listener: Cell<u64>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self {
            arena: RefCell::new(NodeArena::new()),
            frames: RefCell::new(Vec::new()),
            ops: RefCell::new(Vec::new()),
            clock: Cell::new(0.0),
            next_listener: Cell::new(1),
        }
    }

    fn record(&self, op: SurfaceOp) {
        self.ops.borrow_mut().push(op);
    }

    /// Take all recorded operations, clearing the log
    pub fn take_ops(&self) -> Vec<SurfaceOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    pub fn tag(&self, element: ElementId) -> Option<String> {
        match &self.arena.borrow().get(element)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_text(&self, element: ElementId) -> bool {
        matches!(
            self.arena.borrow().get(element).map(|n| &n.kind),
            Some(NodeKind::Text(_))
        )
    }

    /// Child nodes, text runs included
    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.arena
            .borrow()
            .get(element)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Child elements only
    pub fn element_children(&self, element: ElementId) -> Vec<ElementId> {
        let arena = self.arena.borrow();
        arena
            .get(element)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|c| matches!(arena.get(*c).map(|d| &d.kind), Some(NodeKind::Element { .. })))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn attributes(&self, element: ElementId) -> Vec<(String, String)> {
        match self.arena.borrow().get(element).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs.clone(),
            _ => Vec::new(),
        }
    }

    pub fn listener_count(&self, element: ElementId, kind: &str) -> usize {
        match self.arena.borrow().get(element).map(|n| &n.kind) {
            Some(NodeKind::Element { listeners, .. }) => {
                listeners.iter().filter(|l| l.kind == kind).count()
            }
            _ => 0,
        }
    }

    pub fn outer_markup(&self, element: ElementId) -> String {
        let mut out = String::new();
        self.arena.borrow().markup_into(element, &mut out);
        out
    }

    /// Dispatch an event at its target and bubble it through the ancestors.
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &Event) -> usize {
        let path: Vec<ElementId> = {
            let arena = self.arena.borrow();
            let mut path = Vec::new();
            let mut current = Some(event.target);
            while let Some(id) = current {
                path.push(id);
                current = arena.get(id).and_then(|n| n.parent);
            }
            path
        };

        let mut invoked = 0;
        for element in path {
            // Snapshot so listeners can detach themselves mid-dispatch
            let listeners: Vec<Listener> = match self.arena.borrow().get(element).map(|n| &n.kind) {
                Some(NodeKind::Element { listeners, .. }) => listeners
                    .iter()
                    .filter(|l| l.kind == event.kind)
                    .map(|l| l.listener.clone())
                    .collect(),
                _ => Vec::new(),
            };
            for listener in listeners {
                listener(event);
                invoked += 1;
            }
        }
        invoked
    }

    pub fn set_time(&self, now_ms: f64) {
        self.clock.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.clock.set(self.clock.get() + delta_ms);
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Run every callback queued before this call. Callbacks queued while the
    /// frame runs wait for the next one. Returns the number of callbacks run.
    pub fn run_frame(&self) -> usize {
        let callbacks = std::mem::take(&mut *self.frames.borrow_mut());
        let now = self.clock.get();
        let count = callbacks.len();
        for callback in callbacks {
            callback(now);
        }
        count
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemorySurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySurface")
            .field("nodes", &self.arena.borrow().nodes.len())
            .field("pending_frames", &self.frames.borrow().len())
            .field("clock", &self.clock.get())
            .finish()
    }
}

impl Surface for MemorySurface {
    fn create_element(&self, tag: &str) -> ElementId {
        let element = self.arena.borrow_mut().create(NodeKind::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            listeners: Vec::new(),
        });
        self.record(SurfaceOp::CreateElement {
            element,
            tag: tag.to_string(),
        });
        element
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        {
            let mut arena = self.arena.borrow_mut();
            let Some(NodeKind::Element { attrs, .. }) = arena.get_mut(element).map(|n| &mut n.kind)
            else {
                return;
            };
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
        self.record(SurfaceOp::SetAttribute {
            element,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_attribute(&self, element: ElementId, name: &str) {
        {
            let mut arena = self.arena.borrow_mut();
            let Some(NodeKind::Element { attrs, .. }) = arena.get_mut(element).map(|n| &mut n.kind)
            else {
                return;
            };
            attrs.retain(|(n, _)| n != name);
        }
        self.record(SurfaceOp::RemoveAttribute {
            element,
            name: name.to_string(),
        });
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        match &self.arena.borrow().get(element)?.kind {
            NodeKind::Element { attrs, .. } => {
                attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
            }
            NodeKind::Text(_) => None,
        }
    }

    fn add_event_listener(&self, element: ElementId, kind: &str, listener: Listener) -> ListenerId {
        let id = ListenerId::new(self.next_listener.get());
        self.next_listener.set(id.raw() + 1);
        {
            let mut arena = self.arena.borrow_mut();
            if let Some(NodeKind::Element { listeners, .. }) =
                arena.get_mut(element).map(|n| &mut n.kind)
            {
                listeners.push(RegisteredListener {
                    id,
                    kind: kind.to_string(),
                    listener,
                });
            }
        }
        self.record(SurfaceOp::AddListener {
            element,
            kind: kind.to_string(),
        });
        id
    }

    fn remove_event_listener(&self, element: ElementId, kind: &str, listener: ListenerId) {
        {
            let mut arena = self.arena.borrow_mut();
            if let Some(NodeKind::Element { listeners, .. }) =
                arena.get_mut(element).map(|n| &mut n.kind)
            {
                listeners.retain(|l| l.id != listener);
            }
        }
        self.record(SurfaceOp::RemoveListener {
            element,
            kind: kind.to_string(),
        });
    }

    fn append_child(&self, parent: ElementId, child: ElementId) {
        self.insert_before(parent, child, None);
    }

    fn insert_before(&self, parent: ElementId, child: ElementId, reference: Option<ElementId>) {
        {
            let mut arena = self.arena.borrow_mut();
            if arena.get(parent).is_none() || arena.is_ancestor(child, parent) {
                return;
            }
            arena.detach(child);
            let index = reference.and_then(|r| {
                arena
                    .get(parent)
                    .and_then(|p| p.children.iter().position(|c| *c == r))
            });
            arena.attach(parent, child, index);
        }
        self.record(SurfaceOp::InsertChild { parent, child });
    }

    fn remove_child(&self, parent: ElementId, child: ElementId) {
        {
            let mut arena = self.arena.borrow_mut();
            if arena.get(child).and_then(|c| c.parent) != Some(parent) {
                return;
            }
            arena.detach(child);
        }
        self.record(SurfaceOp::RemoveChild { parent, child });
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.arena.borrow().get(element)?.parent
    }

    fn next_sibling(&self, element: ElementId) -> Option<ElementId> {
        let arena = self.arena.borrow();
        let parent = arena.get(element)?.parent?;
        let siblings = &arena.get(parent)?.children;
        let index = siblings.iter().position(|c| *c == element)?;
        siblings.get(index + 1).copied()
    }

    fn text_content(&self, element: ElementId) -> String {
        let mut out = String::new();
        self.arena.borrow().text_into(element, &mut out);
        out
    }

    fn set_text_content(&self, element: ElementId, text: &str) {
        {
            let mut arena = self.arena.borrow_mut();
            if arena.get(element).is_none() {
                return;
            }
            arena.clear_children(element);
            if !text.is_empty() {
                let node = arena.create(NodeKind::Text(text.to_string()));
                arena.attach(element, node, None);
            }
        }
        self.record(SurfaceOp::SetText {
            element,
            text: text.to_string(),
        });
    }

    fn inner_markup(&self, element: ElementId) -> String {
        let arena = self.arena.borrow();
        let mut out = String::new();
        if let Some(node) = arena.get(element) {
            for child in &node.children {
                arena.markup_into(*child, &mut out);
            }
        }
        out
    }

    fn set_inner_markup(&self, element: ElementId, markup: &str) {
        {
            let mut arena = self.arena.borrow_mut();
            if arena.get(element).is_none() {
                return;
            }
            arena.clear_children(element);
            arena.build(element, markup::parse(markup));
        }
        self.record(SurfaceOp::SetMarkup {
            element,
            markup: markup.to_string(),
        });
    }

    fn request_frame(&self, callback: FrameCallback) {
        self.frames.borrow_mut().push(callback);
    }

    fn now(&self) -> f64 {
        self.clock.get()
    }
}
