use super::{Animation, Easing, Interpolatable};
use crate::node::AttrName;
use crate::surface::{ElementId, Surface};
use std::collections::HashMap;
use tracing::trace;

/// A validated declaration, ready to run
#[derive(Debug, Clone)]
pub(crate) struct PreparedRun {
    pub(crate) declaration: Animation,
    pub(crate) easing: Easing,
    pub(crate) from: Interpolatable,
    pub(crate) to: Interpolatable,
    /// The declared `to`, written verbatim on the final frame
    pub(crate) end_value: String,
    pub(crate) duration: f64,
    pub(crate) delay: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RunKey {
    pub(crate) element: ElementId,
    pub(crate) attr: AttrName,
}

#[derive(Debug)]
struct AnimationRun {
    generation: u64,
    /// Time the interpolation starts, delay included
    start: f64,
    prepared: PreparedRun,
    current: Option<String>,
    finished: bool,
}

/// Tracks every running animation, keyed by element and attribute.
///
/// Each run carries a generation; frames scheduled for a superseded or
/// cancelled run find a different generation (or nothing) and stop.
#[derive(Debug, Default)]
pub(crate) struct AnimationDriver {
    runs: HashMap<RunKey, AnimationRun>,
    next_generation: u64,
}

impl AnimationDriver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether `element` already runs (or has finished) this exact declaration
    pub(crate) fn is_running(&self, element: ElementId, declaration: &Animation) -> bool {
        let key = RunKey {
            element,
            attr: declaration.attr.clone(),
        };
        self.runs
            .get(&key)
            .is_some_and(|run| run.prepared.declaration == *declaration)
    }

    /// Start `prepared` on `element`, superseding any run on the same attribute
    pub(crate) fn start(
        &mut self,
        element: ElementId,
        prepared: PreparedRun,
        now: f64,
    ) -> (RunKey, u64) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let key = RunKey {
            element,
            attr: prepared.declaration.attr.clone(),
        };
        trace!(
            "Starting animation of {} on {} ({}ms, {})",
            key.attr,
            element,
            prepared.duration,
            prepared.easing.name()
        );
        self.runs.insert(
            key.clone(),
            AnimationRun {
                generation,
                start: now + prepared.delay,
                prepared,
                current: None,
                finished: false,
            },
        );
        (key, generation)
    }

    /// Advance one run to `now`, writing the value to the surface. Returns
    /// whether another frame is wanted.
    pub(crate) fn step(
        &mut self,
        key: &RunKey,
        generation: u64,
        now: f64,
        surface: &dyn Surface,
    ) -> bool {
        let Some(run) = self.runs.get_mut(key) else {
            return false;
        };
        if run.generation != generation || run.finished {
            return false;
        }
        if surface.parent(key.element).is_none() {
            trace!("Element {} detached, dropping animation of {}", key.element, key.attr);
            self.runs.remove(key);
            return false;
        }
        if now < run.start {
            return true;
        }

        let elapsed = now - run.start;
        let prepared = &run.prepared;
        let value = if elapsed >= prepared.duration {
            run.finished = true;
            Some(prepared.end_value.clone())
        } else {
            let progress = prepared.easing.apply(elapsed / prepared.duration);
            prepared.from.interpolate(&prepared.to, progress)
        };

        if let Some(value) = value {
            surface.set_attribute(key.element, &key.attr, &value);
            run.current = Some(value);
        }
        !run.finished
    }

    /// Last value written for this attribute, if any
    pub(crate) fn current_value(&self, element: ElementId, attr: &str) -> Option<&str> {
        let key = RunKey {
            element,
            attr: attr.into(),
        };
        self.runs.get(&key).and_then(|run| run.current.as_deref())
    }

    pub(crate) fn cancel(&mut self, element: ElementId, attr: &str) {
        let key = RunKey {
            element,
            attr: attr.into(),
        };
        self.runs.remove(&key);
    }

    pub(crate) fn cancel_element(&mut self, element: ElementId) {
        self.runs.retain(|key, _| key.element != element);
    }

    /// Runs that still want frames
    pub(crate) fn active(&self) -> usize {
        self.runs.values().filter(|run| !run.finished).count()
    }
}
