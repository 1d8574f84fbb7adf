//! Reconciliation of declared trees against the previously rendered tree.
//!
//! [`Reconciler::create`] builds a fresh subtree, [`Reconciler::reconcile`]
//! patches an existing one in place or replaces it, and
//! [`Reconciler::release`] runs removal hooks and drops per-element state.

mod attrs;
mod bindings;
mod children;

pub(crate) use attrs::ListenerSlot;
pub(crate) use bindings::ComponentBindings;

use crate::animation::{Animation, PreparedRun};
use crate::config::RendererConfig;
use crate::error::Result;
use crate::node::{AttrValue, ComponentHandle, Declared, Node, RemoveContext, RenderedNode};
use crate::renderer::RendererShared;
use crate::surface::{ElementId, Surface};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Outcome of reconciling one previously rendered node
#[derive(Debug)]
pub(crate) enum Reconciled {
    Kept(RenderedNode),
    /// The live element was gone; the caller drops the record
    Removed,
}

/// A declaration resolved down to the plain node it renders
struct Resolved {
    node: Node,
    component: Option<ComponentHandle>,
}

impl Resolved {
    fn plain(node: Node) -> Self {
        Self {
            node: node.sanitized(),
            component: None,
        }
    }

    fn rendered_by(component: ComponentHandle) -> Self {
        Self {
            node: component.expand().sanitized(),
            component: Some(component),
        }
    }
}

pub(crate) struct Reconciler<'r> {
    shared: &'r RendererShared,
}

impl<'r> Reconciler<'r> {
    pub(crate) fn new(shared: &'r RendererShared) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &'r RendererShared {
        self.shared
    }

    pub(crate) fn surface(&self) -> &'r dyn Surface {
        &*self.shared.surface
    }

    pub(crate) fn config(&self) -> &'r RendererConfig {
        &self.shared.config
    }

    /// Build `declared` as a new subtree appended to `parent`
    pub(crate) fn create(&self, parent: ElementId, declared: Declared) -> Result<RenderedNode> {
        let resolved = self.resolve_new(declared, None);
        self.materialize(parent, resolved, None)
    }

    /// Build `declared` in the place of `prior`, whose element is gone. A
    /// component rendering itself again is not re-initialized.
    pub(crate) fn recreate(
        &self,
        parent: ElementId,
        prior: &RenderedNode,
        declared: Declared,
    ) -> Result<RenderedNode> {
        self.release(prior, true);
        let resolved = self.resolve_new(declared, prior.component.as_ref());
        self.materialize(parent, resolved, None)
    }

    /// Reconcile `prior` against `declared`, patching the live element in place
    /// when the two line up and replacing it when they don't
    pub(crate) fn reconcile(&self, prior: RenderedNode, declared: Declared) -> Result<Reconciled> {
        let Some(parent) = self.surface().parent(prior.element) else {
            debug!("Element {} was detached externally, dropping it", prior.element);
            self.release(&prior, true);
            return Ok(Reconciled::Removed);
        };

        let same_identity = match (&declared, &prior.component) {
            (Declared::Component(next), Some(previous)) => next.same_as_previous(previous),
            (Declared::Node(_), None) => true,
            _ => false,
        };
        if !same_identity {
            return self
                .replace(parent, prior, Pending::Declared(declared))
                .map(Reconciled::Kept);
        }

        let resolved = match declared {
            Declared::Component(component) => {
                if !component.has_changed() {
                    trace!("Component on {} unchanged, skipping", prior.element);
                    return Ok(Reconciled::Kept(prior));
                }
                Resolved::rendered_by(component)
            }
            Declared::Node(node) => Resolved::plain(node),
        };

        if resolved.node.tag != prior.tag || resolved.node.raw != prior.raw {
            return self
                .replace(parent, prior, Pending::Resolved(resolved))
                .map(Reconciled::Kept);
        }
        self.patch(prior, resolved).map(Reconciled::Kept)
    }

    /// Fire removal hooks depth first over the children of `node` (each child
    /// before its own descendants), then on `node` itself when `include_self`,
    /// dropping per-element state along the way
    pub(crate) fn release(&self, node: &RenderedNode, include_self: bool) {
        for child in &node.children {
            self.release_one(child);
            self.release(child, false);
        }
        if include_self {
            self.release_one(node);
        }
    }

    fn release_one(&self, node: &RenderedNode) {
        if let Some(component) = &node.component {
            let ctx = RemoveContext {
                container: self.surface().parent(node.element),
                element: node.element,
                node,
            };
            component.removed(&ctx);
        }
        self.shared.bindings.borrow_mut().unbind(node.element);
        self.shared.animations.borrow_mut().cancel_element(node.element);
        for slot in node.listeners.values() {
            slot.clear();
        }
    }

    /// Write text or markup content, replacing whatever `element` holds
    pub(crate) fn write_content(&self, element: ElementId, content: Option<&str>, raw: bool) {
        let content = content.unwrap_or("");
        if raw {
            self.surface().set_inner_markup(element, content);
        } else {
            self.surface().set_text_content(element, content);
        }
    }

    /// Resolve a declaration for the create path. `on_init` runs here unless
    /// the component is replacing its own previous element.
    fn resolve_new(&self, declared: Declared, replaced: Option<&ComponentHandle>) -> Resolved {
        match declared {
            Declared::Node(node) => Resolved::plain(node),
            Declared::Component(component) => {
                let is_same_instance = replaced.is_some_and(|old| old.ptr_eq(&component));
                if !is_same_instance {
                    component.init(self.shared.refresh_handle());
                }
                Resolved::rendered_by(component)
            }
        }
    }

    fn replace(&self, parent: ElementId, prior: RenderedNode, next: Pending) -> Result<RenderedNode> {
        trace!("Replacing element {} (<{}>)", prior.element, prior.tag);
        self.release(&prior, true);
        let resolved = match next {
            Pending::Declared(declared) => self.resolve_new(declared, prior.component.as_ref()),
            Pending::Resolved(resolved) => resolved,
        };
        self.materialize(parent, resolved, Some(prior.element))
    }

    /// Create the live element for `resolved` and insert it, either replacing
    /// `replaces` in place or appended to `parent`
    fn materialize(
        &self,
        parent: ElementId,
        resolved: Resolved,
        replaces: Option<ElementId>,
    ) -> Result<RenderedNode> {
        let Resolved { node, component } = resolved;
        let runs = self.prepare_animations(&node.animations)?;

        let surface = self.surface();
        let element = surface.create_element(&node.tag);
        let mut rendered = RenderedNode::new(element, &node.tag, node.raw, component.clone());
        attrs::apply_attributes(self, &mut rendered, node.attrs, &node.animations);

        if node.children.is_empty() {
            if let Some(content) = node.content.as_deref() {
                self.write_content(element, Some(content), node.raw);
            }
            rendered.content = node.content;
        } else {
            for child in node.children.into_iter().flatten() {
                match self.create(element, child) {
                    Ok(created) => rendered.children.push(created),
                    Err(err) => {
                        // Never announced as created, so only its children see removal
                        self.release(&rendered, false);
                        for slot in rendered.listeners.values() {
                            slot.clear();
                        }
                        return Err(err);
                    }
                }
            }
        }

        if let Some(component) = &component {
            self.shared.bindings.borrow_mut().bind(element, component);
        }
        match replaces {
            Some(old) => {
                surface.insert_before(parent, element, Some(old));
                surface.remove_child(parent, old);
            }
            None => surface.append_child(parent, element),
        }

        if let Some(component) = &component {
            component.created(&rendered);
        }
        self.update_animations(&mut rendered, node.animations, runs);
        Ok(rendered)
    }

    fn patch(&self, mut rendered: RenderedNode, resolved: Resolved) -> Result<RenderedNode> {
        let Resolved { node, component } = resolved;
        let runs = match self.prepare_animations(&node.animations) {
            Ok(runs) => runs,
            Err(err) => {
                self.release(&rendered, true);
                return Err(err);
            }
        };

        if let Some(component) = &component {
            self.shared
                .bindings
                .borrow_mut()
                .bind(rendered.element, component);
            rendered.component = Some(component.clone());
        }

        let attrs_changed =
            attrs::apply_attributes(self, &mut rendered, node.attrs, &node.animations);
        let declared: Vec<Declared> = node.children.into_iter().flatten().collect();
        let content_changed =
            match children::reconcile_children(self, &mut rendered, declared, node.content) {
                Ok(changed) => changed,
                Err(err) => {
                    self.release(&rendered, true);
                    return Err(err);
                }
            };
        self.update_animations(&mut rendered, node.animations, runs);

        if attrs_changed || content_changed {
            if let Some(component) = &component {
                component.updated(&rendered);
            }
        }
        Ok(rendered)
    }

    /// Validate every declaration up front. When several declarations target
    /// the same attribute the last one wins.
    fn prepare_animations(&self, animations: &[Animation]) -> Result<Vec<PreparedRun>> {
        let default_duration = self.config().default_animation_duration_ms;
        animations
            .iter()
            .enumerate()
            .filter(|(i, a)| !animations[i + 1..].iter().any(|later| later.attr == a.attr))
            .map(|(_, a)| a.prepare(default_duration))
            .collect()
    }

    /// Start declarations that are new or changed, release attributes that are
    /// no longer animated, and record the driver's current values
    fn update_animations(
        &self,
        rendered: &mut RenderedNode,
        animations: SmallVec<[Animation; 1]>,
        runs: Vec<PreparedRun>,
    ) {
        let element = rendered.element;
        let mut driver = self.shared.animations.borrow_mut();

        for previous in &rendered.animations {
            if !animations.iter().any(|a| a.attr == previous.attr) {
                driver.cancel(element, &previous.attr);
            }
        }

        let now = self.surface().now();
        let mut started = Vec::new();
        for run in runs {
            if !driver.is_running(element, &run.declaration) {
                started.push(driver.start(element, run, now));
            }
        }

        for animation in &animations {
            if let Some(value) = driver.current_value(element, &animation.attr) {
                rendered
                    .attrs
                    .insert(&animation.attr, AttrValue::Value(value.to_string()));
            }
        }
        drop(driver);

        for (key, generation) in started {
            self.shared.schedule_animation(key, generation);
        }
        rendered.animations = animations;
    }
}

enum Pending {
    Declared(Declared),
    Resolved(Resolved),
}
