mod builder;
mod component;
mod declared;
mod rendered;

pub use builder::{Child, Target, h};
pub use component::{AsAny, Component, ComponentHandle, RemoveContext};
pub(crate) use component::WeakComponent;
pub use declared::{
    AttrName, AttrValue, Attributes, Declared, EventContext, Handler, HandlerOutput, Node, Style,
    TEXT_TAG,
};
pub use rendered::{PLACEHOLDER_TAG, RenderedNode};
