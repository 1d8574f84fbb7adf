use crate::error::Result;
use serde::Deserialize;

/// Default upper bound on child-list length for the reorder pass
pub const DEFAULT_REORDER_CEILING: usize = 1000;

/// Default animation duration in milliseconds
pub const DEFAULT_ANIMATION_DURATION_MS: f64 = 400.0;

/// Tunables for a [`Renderer`](crate::Renderer)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Child lists longer than this skip the reorder pass entirely
    pub reorder_ceiling: usize,
    /// Attribute that identifies plain (non-component) children for reordering
    pub key_attribute: String,
    /// Duration used by animation declarations that don't specify one
    pub default_animation_duration_ms: f64,
    /// Register the renderer as the target of the free [`refresh`](crate::refresh) function
    pub global_refresh: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            reorder_ceiling: DEFAULT_REORDER_CEILING,
            key_attribute: "id".to_string(),
            default_animation_duration_ms: DEFAULT_ANIMATION_DURATION_MS,
            global_refresh: false,
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_global_refresh(mut self) -> Self {
        self.global_refresh = true;
        self
    }
}
