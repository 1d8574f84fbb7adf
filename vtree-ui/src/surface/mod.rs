//! The live-element backend the reconciler drives.
//!
//! A [`Surface`] is deliberately small: create elements, set and remove
//! attributes, attach listeners, move children around, read and write text or
//! raw markup, and schedule frame callbacks. Everything else the renderer needs
//! it tracks itself.

mod markup;
mod memory;

pub use memory::{MemorySurface, SurfaceOp};

use std::fmt;
use std::rc::Rc;

/// Handle to a live element owned by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a registered event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Native event data delivered to listeners
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event kind, e.g. `click`
    pub kind: String,
    /// The element the event originated on
    pub target: ElementId,
    /// Optional payload (input value, key name, ...)
    pub value: Option<String>,
}

impl Event {
    pub fn new(kind: impl Into<String>, target: ElementId) -> Self {
        Self {
            kind: kind.into(),
            target,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

pub type Listener = Rc<dyn Fn(&Event)>;

/// Frame callback, invoked with the frame timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Operations the reconciler needs from a live-element backend.
///
/// All methods take `&self`; implementations use interior mutability the way a
/// browser document does. Operations on unknown elements are ignored.
pub trait Surface {
    fn create_element(&self, tag: &str) -> ElementId;

    fn set_attribute(&self, element: ElementId, name: &str, value: &str);
    fn remove_attribute(&self, element: ElementId, name: &str);
    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    fn add_event_listener(&self, element: ElementId, kind: &str, listener: Listener)
    -> ListenerId;
    fn remove_event_listener(&self, element: ElementId, kind: &str, listener: ListenerId);

    fn append_child(&self, parent: ElementId, child: ElementId);
    /// Insert `child` before `reference`, or append when `reference` is `None`.
    /// A child that is already attached somewhere is moved.
    fn insert_before(&self, parent: ElementId, child: ElementId, reference: Option<ElementId>);
    fn remove_child(&self, parent: ElementId, child: ElementId);
    fn parent(&self, element: ElementId) -> Option<ElementId>;
    fn next_sibling(&self, element: ElementId) -> Option<ElementId>;

    fn text_content(&self, element: ElementId) -> String;
    /// Replaces every child of `element` with a single escaped text run
    fn set_text_content(&self, element: ElementId, text: &str);
    fn inner_markup(&self, element: ElementId) -> String;
    /// Replaces every child of `element` with parsed markup
    fn set_inner_markup(&self, element: ElementId, markup: &str);

    fn request_frame(&self, callback: FrameCallback);
    /// Current high-resolution time in milliseconds
    fn now(&self) -> f64;
}
