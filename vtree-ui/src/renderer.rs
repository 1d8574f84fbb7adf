use crate::animation::{AnimationDriver, RunKey};
use crate::config::RendererConfig;
use crate::error::Result;
use crate::node::{Declared, RenderedNode};
use crate::reconcile::{ComponentBindings, Reconciled, Reconciler};
use crate::surface::{ElementId, Surface};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;
use tracing::{debug, debug_span, error, warn};

thread_local! {
    static DEFAULT_RENDERER: RefCell<Option<RefreshHandle>> = const { RefCell::new(None) };
}

/// Request a repaint from the renderer registered as the thread default.
///
/// Does nothing when no renderer was created with `global_refresh` or the
/// registered one has been dropped.
pub fn refresh() {
    let handle = DEFAULT_RENDERER.with(|slot| slot.borrow().clone());
    match handle {
        Some(handle) => handle.refresh(),
        None => debug!("refresh() called without a default renderer"),
    }
}

#[derive(Default)]
struct TreeState {
    root: Option<Declared>,
    rendered: Option<RenderedNode>,
}

/// Resets the in-progress flag even if a hook panics
struct RenderGuard<'a>(&'a Cell<bool>);

impl<'a> RenderGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for RenderGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub(crate) struct RendererShared {
    pub(crate) surface: Rc<dyn Surface>,
    pub(crate) container: ElementId,
    pub(crate) config: RendererConfig,
    pub(crate) bindings: RefCell<ComponentBindings>,
    pub(crate) animations: RefCell<AnimationDriver>,
    tree: RefCell<TreeState>,
    repaint_scheduled: Cell<bool>,
    rendering: Cell<bool>,
    weak: Weak<RendererShared>,
}

impl RendererShared {
    pub(crate) fn weak(&self) -> Weak<RendererShared> {
        self.weak.clone()
    }

    pub(crate) fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle(self.weak())
    }

    fn render(&self, root: Option<Declared>) -> Result<()> {
        if self.rendering.get() {
            warn!("Render requested while rendering, deferring to the next frame");
            if let Some(root) = root {
                self.tree.borrow_mut().root = Some(root);
            }
            self.refresh();
            return Ok(());
        }

        // A direct render supersedes any pending refresh
        self.repaint_scheduled.set(false);

        let (prior, declared) = {
            let mut tree = self.tree.borrow_mut();
            if let Some(root) = root {
                tree.root = Some(root);
            }
            (tree.rendered.take(), tree.root.clone())
        };
        let Some(declared) = declared else {
            debug!("Nothing to render");
            self.tree.borrow_mut().rendered = prior;
            return Ok(());
        };

        let _span = debug_span!("render", container = %self.container).entered();
        let started = Instant::now();
        let result = {
            let _guard = RenderGuard::enter(&self.rendering);
            self.reconcile_root(prior, declared)
        };

        match result {
            Ok(rendered) => {
                self.tree.borrow_mut().rendered = rendered;
                debug!("Rendered in {:?}", started.elapsed());
                Ok(())
            }
            Err(err) => {
                // The engine released the discarded tree on the way out; the
                // partially applied surface can't be trusted, so start over
                error!("Render failed: {}", err);
                self.surface.set_text_content(self.container, "");
                Err(err)
            }
        }
    }

    fn reconcile_root(
        &self,
        prior: Option<RenderedNode>,
        declared: Declared,
    ) -> Result<Option<RenderedNode>> {
        let engine = Reconciler::new(self);
        let Some(prior) = prior else {
            return engine.create(self.container, declared).map(Some);
        };

        if self.surface.parent(prior.element).is_none() {
            debug!("Root element was detached, creating it again");
            return engine.recreate(self.container, &prior, declared).map(Some);
        }

        match engine.reconcile(prior, declared)? {
            Reconciled::Kept(rendered) => Ok(Some(rendered)),
            Reconciled::Removed => Ok(None),
        }
    }

    /// Schedule a render for the next frame. Calls before that frame coalesce.
    pub(crate) fn refresh(&self) {
        if self.repaint_scheduled.replace(true) {
            return;
        }
        let weak = self.weak();
        self.surface.request_frame(Box::new(move |_: f64| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if !shared.repaint_scheduled.get() {
                return;
            }
            if let Err(err) = shared.render(None) {
                error!("Deferred render failed: {}", err);
            }
        }));
    }

    pub(crate) fn schedule_animation(&self, key: RunKey, generation: u64) {
        let weak = self.weak();
        self.surface.request_frame(Box::new(move |now: f64| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let again = shared
                .animations
                .borrow_mut()
                .step(&key, generation, now, &*shared.surface);
            if again {
                shared.schedule_animation(key, generation);
            }
        }));
    }
}

/// Renders declared trees into a container element on a [`Surface`].
///
/// The renderer keeps the last rendered tree and reconciles each new render
/// against it, touching the surface only where something changed.
pub struct Renderer {
    shared: Rc<RendererShared>,
}

impl Renderer {
    pub fn new(surface: Rc<dyn Surface>, container: ElementId) -> Self {
        Self::with_config(surface, container, RendererConfig::default())
    }

    pub fn with_config(surface: Rc<dyn Surface>, container: ElementId, config: RendererConfig) -> Self {
        let global = config.global_refresh;
        let shared = Rc::new_cyclic(|weak| RendererShared {
            surface,
            container,
            config,
            bindings: RefCell::new(ComponentBindings::new()),
            animations: RefCell::new(AnimationDriver::new()),
            tree: RefCell::new(TreeState::default()),
            repaint_scheduled: Cell::new(false),
            rendering: Cell::new(false),
            weak: weak.clone(),
        });
        let renderer = Self { shared };
        if global {
            renderer.register_default();
        }
        renderer
    }

    /// Render `root`, replacing the stored root declaration
    pub fn render(&self, root: impl Into<Declared>) -> Result<()> {
        self.shared.render(Some(root.into()))
    }

    /// Render the stored root declaration again
    pub fn rerender(&self) -> Result<()> {
        self.shared.render(None)
    }

    /// Schedule a render on the next frame; repeated calls coalesce
    pub fn refresh(&self) {
        self.shared.refresh();
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        self.shared.refresh_handle()
    }

    /// Make this renderer the target of the free [`refresh`] function
    pub fn register_default(&self) {
        let handle = self.refresh_handle();
        DEFAULT_RENDERER.with(|slot| *slot.borrow_mut() = Some(handle));
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        self.shared.repaint_scheduled.get()
    }

    pub fn surface(&self) -> &Rc<dyn Surface> {
        &self.shared.surface
    }

    pub fn container(&self) -> ElementId {
        self.shared.container
    }

    pub fn config(&self) -> &RendererConfig {
        &self.shared.config
    }

    /// Live element of the rendered root, if anything has been rendered
    pub fn root_element(&self) -> Option<ElementId> {
        self.with_rendered(|tree| tree.map(RenderedNode::element))
    }

    pub fn with_rendered<R>(&self, f: impl FnOnce(Option<&RenderedNode>) -> R) -> R {
        let tree = self.shared.tree.borrow();
        f(tree.rendered.as_ref())
    }

    /// Animations that still have frames to run
    pub fn active_animations(&self) -> usize {
        self.shared.animations.borrow().active()
    }
}

/// Weak handle that lets components and handlers request repaints
#[derive(Clone)]
pub struct RefreshHandle(Weak<RendererShared>);

impl RefreshHandle {
    pub fn refresh(&self) {
        if let Some(shared) = self.0.upgrade() {
            shared.refresh();
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl std::fmt::Debug for RefreshHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
