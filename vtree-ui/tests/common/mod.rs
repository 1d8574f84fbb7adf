#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use vtree_ui::{
    Component, Declared, ElementId, MemorySurface, Node, RefreshHandle, RemoveContext,
    RenderedNode, Renderer, RendererConfig, Surface,
};

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub surface: Rc<MemorySurface>,
    pub container: ElementId,
    pub renderer: Renderer,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    pub fn with_config(config: RendererConfig) -> Self {
        init_tracing();
        let surface = Rc::new(MemorySurface::new());
        let container = surface.create_element("body");
        surface.clear_ops();
        let renderer = Renderer::with_config(surface.clone(), container, config);
        Self {
            surface,
            container,
            renderer,
        }
    }

    pub fn root(&self) -> ElementId {
        self.renderer.root_element().expect("nothing rendered")
    }

    pub fn markup(&self) -> String {
        self.surface.inner_markup(self.container)
    }

    /// Element children of the rendered root
    pub fn items(&self) -> Vec<ElementId> {
        self.surface.element_children(self.root())
    }
}

pub fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

/// Component that records every hook it sees
pub struct Probe {
    pub name: &'static str,
    pub tag: &'static str,
    pub text: String,
    pub changed: bool,
    pub children: Vec<Declared>,
    pub log: Log,
    pub refresh: Option<RefreshHandle>,
}

impl Probe {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            tag: "div",
            text: name.to_string(),
            changed: true,
            children: Vec::new(),
            log: log.clone(),
            refresh: None,
        }
    }

    pub fn shared(self) -> Rc<RefCell<Probe>> {
        Rc::new(RefCell::new(self))
    }

    fn record(&self, event: &str) {
        self.log.borrow_mut().push(format!("{}:{}", self.name, event));
    }
}

impl Component for Probe {
    fn render(&mut self) -> Declared {
        self.record("render");
        let node = Node::new(self.tag).attr("data-name", self.name);
        if self.children.is_empty() {
            node.content(self.text.clone()).into()
        } else {
            node.children(self.children.clone()).into()
        }
    }

    fn has_changed(&self) -> bool {
        self.changed
    }

    fn on_init(&mut self, renderer: RefreshHandle) {
        self.record("init");
        self.refresh = Some(renderer);
    }

    fn on_create(&mut self, _node: &RenderedNode) {
        self.record("create");
    }

    fn on_update(&mut self, _node: &RenderedNode) {
        self.record("update");
    }

    fn on_remove(&mut self, _ctx: &RemoveContext<'_>) {
        self.record("remove");
    }
}

/// Increments a counter in `on_create` and shows it
pub struct CreateCounter {
    pub created: u32,
}

impl Component for CreateCounter {
    fn render(&mut self) -> Declared {
        Node::new("div")
            .attr("id", "counter")
            .content(self.created.to_string())
            .into()
    }

    fn on_create(&mut self, _node: &RenderedNode) {
        self.created += 1;
    }
}
