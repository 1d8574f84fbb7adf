use super::Reconciler;
use crate::animation::Animation;
use crate::node::{AttrValue, Attributes, ComponentHandle, EventContext, Handler, RenderedNode};
use crate::renderer::RendererShared;
use crate::surface::{ElementId, Event, Listener, ListenerId, Surface};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

#[derive(Clone)]
struct SlotBinding {
    handler: Handler,
    /// Component that declared the handler
    owner: Option<ComponentHandle>,
}

#[derive(Default)]
struct SlotState {
    binding: RefCell<Option<SlotBinding>>,
    listener: Cell<Option<ListenerId>>,
}

/// The handler currently bound to one event name on one element.
///
/// The surface listener is registered once and forwards to whatever handler
/// the slot holds, so rebinding a handler on every render costs nothing on
/// the surface.
#[derive(Clone, Default)]
pub(crate) struct ListenerSlot(Rc<SlotState>);

impl ListenerSlot {
    fn bind(&self, handler: Handler, owner: Option<ComponentHandle>) {
        *self.0.binding.borrow_mut() = Some(SlotBinding { handler, owner });
    }

    fn binding(&self) -> Option<SlotBinding> {
        self.0.binding.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.0.binding.borrow_mut().take();
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.0.binding.borrow().is_some()
    }
}

impl fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSlot")
            .field("bound", &self.is_bound())
            .field("listener", &self.0.listener.get())
            .finish()
    }
}

/// Bring the live attributes of `rendered` in line with `next`.
///
/// Values are compared in serialized form. Attributes named by `animated` are
/// owned by the animation driver and skipped. Returns whether any
/// non-handler attribute changed.
pub(crate) fn apply_attributes(
    engine: &Reconciler<'_>,
    rendered: &mut RenderedNode,
    next: Attributes,
    animated: &[Animation],
) -> bool {
    let surface = engine.surface();
    let element = rendered.element;
    let previous = std::mem::take(&mut rendered.attrs);
    let is_animated = |name: &str| animated.iter().any(|a| a.attr.as_str() == name);
    let mut changed = false;

    for (name, value) in next.iter() {
        if is_animated(name) {
            continue;
        }
        let before = previous.get(name);
        if let AttrValue::Handler(handler) = value {
            if before.and_then(AttrValue::serialized).is_some() {
                surface.remove_attribute(element, name);
                changed = true;
            }
            bind_handler(engine, rendered, name, handler.clone());
            continue;
        }
        if before.is_some_and(AttrValue::is_handler) {
            unbind_handler(surface, rendered, name);
        }

        let old = before.and_then(AttrValue::serialized);
        let new = value.serialized();
        if old != new {
            match &new {
                Some(v) => surface.set_attribute(element, name, v),
                None => surface.remove_attribute(element, name),
            }
            changed = true;
        }
    }

    for (name, value) in previous.iter() {
        if next.contains(name) || is_animated(name) {
            continue;
        }
        if value.is_handler() {
            unbind_handler(surface, rendered, name);
        } else if value.serialized().is_some() {
            surface.remove_attribute(element, name);
            changed = true;
        }
    }

    rendered.attrs = next;
    changed
}

fn bind_handler(engine: &Reconciler<'_>, rendered: &mut RenderedNode, name: &str, handler: Handler) {
    let owner = rendered.component.clone();
    if let Some(slot) = rendered.listeners.get(name) {
        slot.bind(handler, owner);
        return;
    }

    let slot = ListenerSlot::default();
    slot.bind(handler, owner);
    let listener = forwarding_listener(engine.shared().weak(), slot.clone(), rendered.element, name);
    let id = engine
        .surface()
        .add_event_listener(rendered.element, name, listener);
    slot.0.listener.set(Some(id));
    trace!("Bound {} listener on {}", name, rendered.element);
    rendered.listeners.insert(name.into(), slot);
}

fn unbind_handler(surface: &dyn Surface, rendered: &mut RenderedNode, name: &str) {
    let Some(slot) = rendered.listeners.remove(name) else {
        return;
    };
    if let Some(id) = slot.0.listener.take() {
        surface.remove_event_listener(rendered.element, name, id);
    }
    slot.clear();
}

fn forwarding_listener(
    shared: Weak<RendererShared>,
    slot: ListenerSlot,
    element: ElementId,
    kind: &str,
) -> Listener {
    let kind = kind.to_string();
    Rc::new(move |event: &Event| {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let Some(binding) = slot.binding() else {
            // Handler went away; a stale listener removes itself
            if let Some(id) = slot.0.listener.take() {
                shared.surface.remove_event_listener(element, &kind, id);
            }
            debug!("Dropped stale {} listener on {}", kind, element);
            return;
        };

        let resolved = shared
            .bindings
            .borrow()
            .resolve(&*shared.surface, event.target);
        let ctx = EventContext {
            component: resolved.or(binding.owner),
            event: event.clone(),
            element,
        };
        if binding.handler.call(&ctx) {
            shared.refresh();
        }
    })
}
