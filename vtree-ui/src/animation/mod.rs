//! Time-based attribute animation.
//!
//! A node declares [`Animation`]s; once the node is live the renderer hands them
//! to an [`AnimationDriver`] which writes an interpolated value on every frame
//! and finishes on the exact declared end value. While a declaration is present
//! the driver owns that attribute and the attribute diff leaves it alone.

mod driver;
mod easing;
mod interpolate;

pub(crate) use driver::{AnimationDriver, PreparedRun, RunKey};
pub use easing::Easing;
pub use interpolate::{Interpolatable, format_number, lerp};

use crate::error::{RenderError, Result};
use crate::node::AttrName;
use serde::Deserialize;
use std::fmt;

/// Start or end value of an animation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnimationValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for AnimationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationValue::Number(n) => f.write_str(&format_number(*n)),
            AnimationValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<f64> for AnimationValue {
    fn from(value: f64) -> Self {
        AnimationValue::Number(value)
    }
}

impl From<i32> for AnimationValue {
    fn from(value: i32) -> Self {
        AnimationValue::Number(f64::from(value))
    }
}

impl From<&str> for AnimationValue {
    fn from(value: &str) -> Self {
        AnimationValue::Text(value.to_string())
    }
}

impl From<String> for AnimationValue {
    fn from(value: String) -> Self {
        AnimationValue::Text(value)
    }
}

/// Declared animation of one attribute.
///
/// Durations and delays are in milliseconds. A missing duration uses the
/// renderer's default, a missing easing is linear.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Animation {
    pub attr: AttrName,
    pub from: AnimationValue,
    pub to: AnimationValue,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub delay: Option<f64>,
    #[serde(default)]
    pub easing: Option<String>,
}

impl Animation {
    pub fn new(
        attr: &str,
        from: impl Into<AnimationValue>,
        to: impl Into<AnimationValue>,
    ) -> Self {
        Self {
            attr: attr.into(),
            from: from.into(),
            to: to.into(),
            duration: None,
            delay: None,
            easing: None,
        }
    }

    pub fn duration(mut self, ms: f64) -> Self {
        self.duration = Some(ms);
        self
    }

    pub fn delay(mut self, ms: f64) -> Self {
        self.delay = Some(ms);
        self
    }

    pub fn easing(mut self, name: impl Into<String>) -> Self {
        self.easing = Some(name.into());
        self
    }

    /// Validate the declaration and resolve it into a runnable form
    pub(crate) fn prepare(&self, default_duration: f64) -> Result<PreparedRun> {
        let easing = match &self.easing {
            Some(name) => name.parse::<Easing>()?,
            None => Easing::Linear,
        };
        let from = self.endpoint(&self.from)?;
        let to = self.endpoint(&self.to)?;
        if !from.compatible(&to) {
            return Err(RenderError::MismatchedAnimationValues {
                attr: self.attr.to_string(),
            });
        }
        let duration = self
            .duration
            .filter(|d| d.is_finite())
            .unwrap_or(default_duration)
            .max(0.0);
        let delay = self.delay.filter(|d| d.is_finite()).unwrap_or(0.0).max(0.0);

        Ok(PreparedRun {
            declaration: self.clone(),
            easing,
            from,
            to,
            end_value: self.to.to_string(),
            duration,
            delay,
        })
    }

    fn endpoint(&self, value: &AnimationValue) -> Result<Interpolatable> {
        Interpolatable::parse(value).ok_or_else(|| RenderError::InvalidAnimationValue {
            attr: self.attr.to_string(),
            value: value.to_string(),
        })
    }
}
