use super::declared::Declared;
use super::rendered::RenderedNode;
use crate::renderer::RefreshHandle;
use crate::surface::ElementId;
use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Downcasting support for components
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A stateful unit that renders to a [`Declared`] value.
///
/// Only `render` is required. Every hook has a no-op default.
pub trait Component: AsAny {
    fn render(&mut self) -> Declared;

    /// Custom identity check against the component previously rendered in the
    /// same position. `None` falls back to instance identity.
    fn is_equal(&self, _other: &dyn Component) -> Option<bool> {
        None
    }

    /// Returning `false` skips rendering and diffing this component's subtree
    fn has_changed(&self) -> bool {
        true
    }

    /// Called once, before the first render of this instance
    fn on_init(&mut self, _renderer: RefreshHandle) {}

    /// Called after the element is created and inserted
    fn on_create(&mut self, _node: &RenderedNode) {}

    /// Called after a patch that changed attributes or content
    fn on_update(&mut self, _node: &RenderedNode) {}

    /// Called before the element is removed from its container
    fn on_remove(&mut self, _ctx: &RemoveContext<'_>) {}
}

/// What a component sees when it is being removed
pub struct RemoveContext<'a> {
    /// The live container the element is being removed from, if still attached
    pub container: Option<ElementId>,
    pub element: ElementId,
    pub node: &'a RenderedNode,
}

/// Shared handle to a component instance.
///
/// Identity is instance identity: two handles are the same component when they
/// point at the same allocation.
#[derive(Clone)]
pub struct ComponentHandle(Rc<RefCell<dyn Component>>);

impl ComponentHandle {
    pub fn new<C: Component + 'static>(component: C) -> Self {
        Self(Rc::new(RefCell::new(component)))
    }

    pub fn ptr_eq(&self, other: &ComponentHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, dyn Component> {
        self.0.borrow()
    }

    /// Run `f` against the component if it is a `C`
    pub fn with_mut<C: 'static, R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let mut component = self.0.borrow_mut();
        (*component).as_any_mut().downcast_mut::<C>().map(f)
    }

    pub fn is<C: 'static>(&self) -> bool {
        (*self.0.borrow()).as_any().is::<C>()
    }

    pub(crate) fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.0))
    }

    /// Identity check used when reconciling against the previous render
    pub(crate) fn same_as_previous(&self, previous: &ComponentHandle) -> bool {
        let verdict = self.0.borrow().is_equal(&*previous.0.borrow());
        verdict.unwrap_or_else(|| self.ptr_eq(previous))
    }

    /// Render until a plain node comes out. Components returned from `render`
    /// are expanded in place and get no hooks of their own.
    pub(crate) fn expand(&self) -> super::Node {
        let mut declared = self.0.borrow_mut().render();
        loop {
            match declared {
                Declared::Node(node) => return node,
                Declared::Component(inner) => declared = inner.0.borrow_mut().render(),
            }
        }
    }

    pub(crate) fn init(&self, handle: RefreshHandle) {
        self.0.borrow_mut().on_init(handle);
    }

    pub(crate) fn created(&self, node: &RenderedNode) {
        self.0.borrow_mut().on_create(node);
    }

    pub(crate) fn updated(&self, node: &RenderedNode) {
        self.0.borrow_mut().on_update(node);
    }

    pub(crate) fn removed(&self, ctx: &RemoveContext<'_>) {
        self.0.borrow_mut().on_remove(ctx);
    }

    pub(crate) fn has_changed(&self) -> bool {
        self.0.borrow().has_changed()
    }
}

impl<C: Component + 'static> From<Rc<RefCell<C>>> for ComponentHandle {
    fn from(component: Rc<RefCell<C>>) -> Self {
        Self(component)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentHandle({:p})", Rc::as_ptr(&self.0))
    }
}

#[derive(Clone)]
pub(crate) struct WeakComponent(Weak<RefCell<dyn Component>>);

impl WeakComponent {
    pub(crate) fn upgrade(&self) -> Option<ComponentHandle> {
        self.0.upgrade().map(ComponentHandle)
    }
}
