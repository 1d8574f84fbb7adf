pub mod animation;
pub mod config;
pub mod error;
pub mod node;
mod reconcile;
mod renderer;
pub mod surface;

pub use animation::{Animation, AnimationValue, Easing};
pub use config::RendererConfig;
pub use error::{RenderError, Result};
pub use node::{
    AttrValue, Attributes, Child, Component, ComponentHandle, Declared, EventContext, Handler,
    Node, RemoveContext, RenderedNode, Style, h,
};
pub use renderer::{RefreshHandle, Renderer, refresh};
pub use surface::{ElementId, Event, MemorySurface, Surface, SurfaceOp};
