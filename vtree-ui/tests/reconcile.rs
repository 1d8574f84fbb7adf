mod common;

use common::{CreateCounter, Harness, Probe, log, take};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use vtree_ui::{
    Animation, AttrValue, Attributes, Child, Component, Declared, ElementId, Event, EventContext,
    Node, RemoveContext, RendererConfig, Style, Surface, SurfaceOp, h,
};

fn list(ids: &[&str]) -> Node {
    Node::new("ul").children(
        ids.iter()
            .map(|id| Node::new("li").attr("id", *id).content(*id)),
    )
}

fn plain_list(items: &[&str]) -> Node {
    Node::new("ul").children(items.iter().map(|t| Node::new("li").content(*t)))
}

fn created_tags(ops: &[SurfaceOp]) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            SurfaceOp::CreateElement { tag, .. } => Some(tag.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_initial_render_builds_tree() {
    let t = Harness::new();
    t.renderer
        .render(
            Node::new("div")
                .attr("class", "app")
                .child(Node::new("h1").content("Title"))
                .child(Node::new("p").content("body")),
        )
        .unwrap();

    assert_eq!(
        t.markup(),
        r#"<div class="app"><h1>Title</h1><p>body</p></div>"#
    );
    assert_eq!(t.surface.parent(t.root()), Some(t.container));
}

#[test]
fn test_children_take_precedence_over_content() {
    let t = Harness::new();
    t.renderer
        .render(
            Node::new("div")
                .content("ignored")
                .child(Node::text("kept")),
        )
        .unwrap();

    assert_eq!(t.markup(), "<div><span>kept</span></div>");
    t.renderer.with_rendered(|tree| {
        let root = tree.unwrap();
        assert_eq!(root.content(), None);
        assert_eq!(root.children().len(), 1);
    });
}

#[test]
fn test_gaps_in_children_are_dropped() {
    let t = Harness::new();
    t.renderer
        .render(
            Node::new("div")
                .gap()
                .child(Node::new("b"))
                .gap()
                .child(Node::new("i")),
        )
        .unwrap();

    assert_eq!(t.markup(), "<div><b></b><i></i></div>");
}

#[test]
fn test_second_render_is_idempotent() {
    let t = Harness::new();
    let hooks = log();
    let probe = Probe::new("probe", &hooks).shared();
    let page = || {
        Node::new("div")
            .attr("class", "page")
            .style(Style::new().set("color", "red"))
            .on("click", |_| ())
            .child(Node::new("h1").content("Title"))
            .child(list(&["a", "b"]))
            .child(probe.clone())
    };

    t.renderer.render(page()).unwrap();
    let before = t.markup();
    t.surface.clear_ops();
    take(&hooks);

    t.renderer.render(page()).unwrap();

    assert!(t.surface.take_ops().is_empty());
    assert_eq!(t.markup(), before);
    assert_eq!(take(&hooks), vec!["probe:render"]);
}

#[test]
fn test_attribute_changes_are_patched() {
    let t = Harness::new();
    t.renderer
        .render(Node::new("div").attr("class", "x").attr("title", "t"))
        .unwrap();
    let root = t.root();
    t.surface.clear_ops();

    t.renderer
        .render(Node::new("div").attr("class", "y").attr("data-k", "v"))
        .unwrap();

    assert_eq!(t.root(), root);
    assert_eq!(
        t.surface.attributes(root),
        vec![
            ("class".to_string(), "y".to_string()),
            ("data-k".to_string(), "v".to_string()),
        ]
    );
    assert_eq!(t.surface.take_ops().len(), 3);

    t.renderer
        .render(
            Node::new("div")
                .attr("class", None::<&str>)
                .attr("data-k", "v"),
        )
        .unwrap();
    assert_eq!(t.surface.attribute(root, "class"), None);
    assert_eq!(
        t.surface.take_ops(),
        vec![SurfaceOp::RemoveAttribute {
            element: root,
            name: "class".to_string()
        }]
    );
}

#[test]
fn test_style_map_matching_string_is_not_rewritten() {
    let t = Harness::new();
    t.renderer
        .render(Node::new("div").style(Style::new().set("color", "red").set("width", "1px")))
        .unwrap();
    assert_eq!(
        t.surface.attribute(t.root(), "style").as_deref(),
        Some("color:red;width:1px;")
    );
    t.surface.clear_ops();

    t.renderer
        .render(Node::new("div").attr("style", "color:red;width:1px;"))
        .unwrap();

    assert!(t.surface.take_ops().is_empty());
}

#[test]
fn test_keyed_reversal_keeps_elements() {
    let t = Harness::new();
    t.renderer.render(list(&["a", "b", "c"])).unwrap();
    let before = t.items();
    t.surface.clear_ops();

    t.renderer.render(list(&["c", "b", "a"])).unwrap();

    let after = t.items();
    assert_eq!(after, vec![before[2], before[1], before[0]]);
    assert!(created_tags(&t.surface.take_ops()).is_empty());
    assert_eq!(
        t.markup(),
        r#"<ul><li id="c">c</li><li id="b">b</li><li id="a">a</li></ul>"#
    );
}

#[test]
fn test_component_reversal_keeps_elements() {
    let t = Harness::new();
    let hooks = log();
    let probes: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|name| Probe::new(name, &hooks).shared())
        .collect();
    let render = |order: &[usize]| {
        Node::new("section").children(order.iter().map(|i| probes[*i].clone()))
    };

    t.renderer.render(render(&[0, 1, 2])).unwrap();
    let before = t.items();
    take(&hooks);

    t.renderer.render(render(&[2, 1, 0])).unwrap();

    assert_eq!(t.items(), vec![before[2], before[1], before[0]]);
    let events = take(&hooks);
    assert!(events.iter().all(|e| e.ends_with(":render")), "{:?}", events);
}

#[test]
fn test_keyed_growth_creates_only_new_child() {
    let t = Harness::new();
    t.renderer.render(list(&["a", "b"])).unwrap();
    let before = t.items();
    t.surface.clear_ops();

    t.renderer.render(list(&["a", "b", "c"])).unwrap();

    let after = t.items();
    assert_eq!(after.len(), 3);
    assert_eq!(&after[..2], &before[..]);
    let created = created_tags(&t.surface.take_ops());
    assert_eq!(created.iter().filter(|tag| *tag == "li").count(), 1);
    assert!(!t.markup().contains("vt-placeholder"));
}

#[test]
fn test_keyed_insert_at_front_keeps_elements() {
    let t = Harness::new();
    t.renderer.render(list(&["a", "b"])).unwrap();
    let before = t.items();

    t.renderer.render(list(&["x", "a", "b"])).unwrap();

    let after = t.items();
    assert_eq!(&after[1..], &before[..]);
    assert!(!before.contains(&after[0]));
    assert_eq!(
        t.markup(),
        r#"<ul><li id="x">x</li><li id="a">a</li><li id="b">b</li></ul>"#
    );
}

#[test]
fn test_component_growth_in_the_middle_creates_only_new_ones() {
    let t = Harness::new();
    let hooks = log();
    let [a, b, c, d] = ["A", "B", "C", "D"].map(|name| Probe::new(name, &hooks).shared());
    let page = |items: &[&Rc<RefCell<Probe>>]| {
        Node::new("div").children(items.iter().map(|p| (*p).clone()))
    };

    t.renderer.render(page(&[&a, &d])).unwrap();
    let before = t.items();
    take(&hooks);

    t.renderer.render(page(&[&a, &b, &c, &d])).unwrap();

    let after = t.items();
    assert_eq!(after.len(), 4);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[3], before[1]);
    assert_eq!(
        take(&hooks),
        vec![
            "A:render", "B:init", "B:render", "B:create", "C:init", "C:render", "C:create",
            "D:render",
        ]
    );
    assert!(!t.markup().contains("vt-placeholder"));

    t.renderer.render(page(&[&a, &d])).unwrap();

    assert_eq!(t.items(), before);
    assert_eq!(
        take(&hooks),
        vec!["C:remove", "B:remove", "A:render", "D:render"]
    );
}

#[test]
fn test_growth_and_shrink_preserve_component_state() {
    let t = Harness::new();
    let [a, b, c, d] = [(); 4].map(|_| Rc::new(RefCell::new(CreateCounter { created: 0 })));
    let page = |items: &[&Rc<RefCell<CreateCounter>>]| {
        Node::new("div").children(items.iter().map(|p| (*p).clone()))
    };

    t.renderer.render(page(&[&a, &d])).unwrap();
    t.renderer.render(page(&[&a, &b, &c, &d])).unwrap();
    t.renderer.render(page(&[&a, &d])).unwrap();

    for counter in [&a, &b, &c, &d] {
        assert_eq!(counter.borrow().created, 1);
    }
    assert_eq!(
        t.markup(),
        r#"<div><div id="counter">1</div><div id="counter">1</div></div>"#
    );
}

#[test]
fn test_keyed_shrink_removes_surplus() {
    let t = Harness::new();
    t.renderer.render(list(&["a", "b", "c"])).unwrap();
    let before = t.items();

    t.renderer.render(list(&["c"])).unwrap();

    assert_eq!(t.items(), vec![before[2]]);
    assert_eq!(t.surface.parent(before[0]), None);
    assert_eq!(t.surface.parent(before[1]), None);
    assert_eq!(t.markup(), r#"<ul><li id="c">c</li></ul>"#);
}

#[test]
fn test_component_shrink_fires_remove_hooks() {
    let t = Harness::new();
    let hooks = log();
    let a = Probe::new("A", &hooks).shared();
    let b = Probe::new("B", &hooks).shared();
    let c = Probe::new("C", &hooks).shared();

    t.renderer
        .render(Node::new("div").child(a.clone()).child(b.clone()).child(c.clone()))
        .unwrap();
    take(&hooks);

    t.renderer.render(Node::new("div").child(c.clone())).unwrap();

    let events = take(&hooks);
    assert!(events.contains(&"A:remove".to_string()));
    assert!(events.contains(&"B:remove".to_string()));
    assert!(!events.contains(&"C:remove".to_string()));
    assert_eq!(t.items().len(), 1);
}

#[test]
fn test_unkeyed_count_change_recreates_children() {
    let t = Harness::new();
    t.renderer.render(plain_list(&["1", "2"])).unwrap();
    let before = t.items();

    t.renderer.render(plain_list(&["1", "2", "3"])).unwrap();

    let after = t.items();
    assert_eq!(after.len(), 3);
    assert!(after.iter().all(|el| !before.contains(el)));
    assert_eq!(t.markup(), "<ul><li>1</li><li>2</li><li>3</li></ul>");
}

#[test]
fn test_content_swap_fires_remove_hooks() {
    let t = Harness::new();
    let hooks = log();
    let probe = Probe::new("P", &hooks).shared();
    t.renderer.render(Node::new("div").child(probe.clone())).unwrap();
    take(&hooks);

    t.renderer.render(Node::new("div").content("plain")).unwrap();

    assert_eq!(take(&hooks), vec!["P:remove"]);
    assert_eq!(t.markup(), "<div>plain</div>");
}

#[test]
fn test_tag_change_recreates_element() {
    let t = Harness::new();
    t.renderer.render(Node::new("div").content("x")).unwrap();
    let old = t.root();

    t.renderer.render(Node::new("section").content("x")).unwrap();

    assert_ne!(t.root(), old);
    assert_eq!(t.surface.parent(old), None);
    assert_eq!(t.markup(), "<section>x</section>");
}

#[test]
fn test_raw_content_is_markup_and_text_is_escaped() {
    let t = Harness::new();
    t.renderer
        .render(Node::new("p").content("<b>bold</b>"))
        .unwrap();
    assert_eq!(t.markup(), "<p>&lt;b&gt;bold&lt;/b&gt;</p>");
    let text_root = t.root();

    t.renderer
        .render(Node::new("p").raw_content("<b>bold</b>"))
        .unwrap();
    assert_eq!(t.markup(), "<p><b>bold</b></p>");
    assert_ne!(t.root(), text_root);
    assert_eq!(t.surface.element_children(t.root()).len(), 1);
}

#[test]
fn test_detached_child_fires_remove_and_is_dropped() {
    let t = Harness::new();
    let hooks = log();
    let a = Probe::new("A", &hooks).shared();
    let b = Probe::new("B", &hooks).shared();
    let page = || Node::new("div").child(a.clone()).child(b.clone());

    t.renderer.render(page()).unwrap();
    let b_element = t.items()[1];
    t.surface.remove_child(t.root(), b_element);
    take(&hooks);

    t.renderer.render(page()).unwrap();
    assert!(take(&hooks).contains(&"B:remove".to_string()));
    t.renderer
        .with_rendered(|tree| assert_eq!(tree.unwrap().children().len(), 1));

    t.renderer.render(page()).unwrap();
    assert_eq!(t.items().len(), 2);
    assert!(!t.items().contains(&b_element));
}

#[test]
fn test_detached_root_is_recreated() {
    let t = Harness::new();
    t.renderer.render(Node::new("main").content("hi")).unwrap();
    let old = t.root();
    t.surface.remove_child(t.container, old);

    t.renderer.rerender().unwrap();

    assert_ne!(t.root(), old);
    assert_eq!(t.markup(), "<main>hi</main>");
}

#[test]
fn test_detached_component_root_is_not_initialized_again() {
    let t = Harness::new();
    let hooks = log();
    let probe = Probe::new("P", &hooks).shared();
    t.renderer.render(probe.clone()).unwrap();
    let old = t.root();
    t.surface.remove_child(t.container, old);
    take(&hooks);

    t.renderer.rerender().unwrap();

    assert_ne!(t.root(), old);
    assert_eq!(take(&hooks), vec!["P:remove", "P:render", "P:create"]);
    assert_eq!(t.markup(), r#"<div data-name="P">P</div>"#);
}

#[test]
fn test_failed_render_releases_previous_tree() {
    let t = Harness::new();
    let hooks = log();
    let probe = Probe::new("P", &hooks).shared();
    let clicks = Rc::new(Cell::new(0));
    let page = |broken: bool| {
        let c = clicks.clone();
        let mut node = Node::new("div")
            .on("click", move |_: &EventContext| {
                c.set(c.get() + 1);
                false
            })
            .child(probe.clone());
        if broken {
            node = node.child(
                Node::new("p").animate(Animation::new("opacity", 0, 1).easing("wobble")),
            );
        }
        node
    };

    t.renderer.render(page(false)).unwrap();
    let old_root = t.root();
    take(&hooks);

    assert!(t.renderer.render(page(true)).is_err());

    assert_eq!(take(&hooks).last().map(String::as_str), Some("P:remove"));
    assert_eq!(t.markup(), "");
    t.surface.dispatch(&Event::new("click", old_root));
    assert_eq!(clicks.get(), 0);
    assert_eq!(t.surface.listener_count(old_root, "click"), 0);

    t.renderer.render(page(false)).unwrap();
    assert_eq!(t.markup(), r#"<div><div data-name="P">P</div></div>"#);
}

#[test]
fn test_unchanged_component_skips_its_subtree() {
    let t = Harness::new();
    let hooks = log();
    let probe = Probe::new("P", &hooks).shared();
    t.renderer.render(probe.clone()).unwrap();
    take(&hooks);
    t.surface.clear_ops();

    {
        let mut p = probe.borrow_mut();
        p.changed = false;
        p.text = "new text".to_string();
    }
    t.renderer.rerender().unwrap();

    assert!(take(&hooks).is_empty());
    assert!(t.surface.take_ops().is_empty());
    assert_eq!(t.markup(), r#"<div data-name="P">P</div>"#);
}

#[test]
fn test_hook_order_and_single_init() {
    let t = Harness::new();
    let hooks = log();
    let child = Probe::new("child", &hooks).shared();
    let mut parent = Probe::new("parent", &hooks);
    parent.children = vec![child.clone().into()];
    let parent = parent.shared();

    t.renderer.render(parent.clone()).unwrap();
    assert_eq!(
        take(&hooks),
        vec![
            "parent:init",
            "parent:render",
            "child:init",
            "child:render",
            "child:create",
            "parent:create",
        ]
    );

    child.borrow_mut().text = "changed".to_string();
    t.renderer.rerender().unwrap();
    assert_eq!(
        take(&hooks),
        vec!["parent:render", "child:render", "child:update"]
    );

    t.renderer.render(Node::new("p")).unwrap();
    assert_eq!(take(&hooks), vec!["child:remove", "parent:remove"]);
}

#[test]
fn test_component_identity_change_recreates() {
    let t = Harness::new();
    let hooks = log();
    t.renderer.render(Probe::new("one", &hooks).shared()).unwrap();
    let old = t.root();
    take(&hooks);

    t.renderer.render(Probe::new("two", &hooks).shared()).unwrap();

    assert_ne!(t.root(), old);
    assert_eq!(
        take(&hooks),
        vec!["one:remove", "two:init", "two:render", "two:create"]
    );
}

struct Keyed {
    key: u32,
    text: &'static str,
}

impl Component for Keyed {
    fn render(&mut self) -> Declared {
        Node::new("div").content(self.text).into()
    }

    fn is_equal(&self, other: &dyn Component) -> Option<bool> {
        let other = other.as_any().downcast_ref::<Keyed>()?;
        Some(other.key == self.key)
    }
}

#[test]
fn test_custom_equality_keeps_element_across_instances() {
    let t = Harness::new();
    t.renderer
        .render(Rc::new(RefCell::new(Keyed { key: 1, text: "first" })))
        .unwrap();
    let root = t.root();

    t.renderer
        .render(Rc::new(RefCell::new(Keyed { key: 1, text: "second" })))
        .unwrap();
    assert_eq!(t.root(), root);
    assert_eq!(t.markup(), "<div>second</div>");

    t.renderer
        .render(Rc::new(RefCell::new(Keyed { key: 2, text: "third" })))
        .unwrap();
    assert_ne!(t.root(), root);
    assert_eq!(t.markup(), "<div>third</div>");
}

struct Wrapper {
    inner: Rc<RefCell<Probe>>,
}

impl Component for Wrapper {
    fn render(&mut self) -> Declared {
        self.inner.clone().into()
    }
}

#[test]
fn test_component_returned_from_render_is_expanded_without_hooks() {
    let t = Harness::new();
    let hooks = log();
    let inner = Probe::new("inner", &hooks).shared();
    t.renderer
        .render(Rc::new(RefCell::new(Wrapper { inner })))
        .unwrap();

    assert_eq!(take(&hooks), vec!["inner:render"]);
    assert_eq!(t.markup(), r#"<div data-name="inner">inner</div>"#);
}

#[test]
fn test_create_hook_runs_after_render() {
    let t = Harness::new();
    let counter = Rc::new(RefCell::new(CreateCounter { created: 0 }));

    t.renderer.render(counter.clone()).unwrap();
    assert_eq!(t.markup(), r#"<div id="counter">0</div>"#);
    assert_eq!(counter.borrow().created, 1);

    t.renderer.rerender().unwrap();
    assert_eq!(t.markup(), r#"<div id="counter">1</div>"#);
    assert_eq!(counter.borrow().created, 1);
}

#[test]
fn test_reorder_ceiling_disables_reordering() {
    let config = RendererConfig {
        reorder_ceiling: 2,
        ..RendererConfig::default()
    };
    let t = Harness::with_config(config);
    t.renderer.render(list(&["a", "b", "c"])).unwrap();
    let before = t.items();

    t.renderer.render(list(&["c", "b", "a"])).unwrap();

    assert_eq!(t.items(), before);
    assert_eq!(t.surface.attribute(before[0], "id").as_deref(), Some("c"));
}

#[test]
fn test_custom_key_attribute() {
    let config = RendererConfig {
        key_attribute: "data-key".to_string(),
        ..RendererConfig::default()
    };
    let t = Harness::with_config(config);
    let keyed = |keys: &[&str]| {
        Node::new("ol").children(
            keys.iter()
                .map(|k| Node::new("li").attr("data-key", *k).content(*k)),
        )
    };
    t.renderer.render(keyed(&["x", "y"])).unwrap();
    let before = t.items();

    t.renderer.render(keyed(&["y", "x"])).unwrap();

    assert_eq!(t.items(), vec![before[1], before[0]]);
}

#[test]
fn test_remove_hook_sees_container() {
    struct Watcher(Rc<Cell<Option<ElementId>>>);

    impl Component for Watcher {
        fn render(&mut self) -> Declared {
            Node::new("aside").into()
        }

        fn on_remove(&mut self, ctx: &RemoveContext<'_>) {
            self.0.set(ctx.container);
        }
    }

    let t = Harness::new();
    let seen = Rc::new(Cell::new(None));
    t.renderer
        .render(
            Node::new("div").child(Rc::new(RefCell::new(Watcher(seen.clone())))),
        )
        .unwrap();
    let root = t.root();

    t.renderer.render(Node::new("div")).unwrap();

    assert_eq!(seen.get(), Some(root));
}

#[test]
fn test_hyperscript_builder() {
    let t = Harness::new();
    let items: Vec<Declared> = vec![Node::text("a").into(), Node::text("b").into()];
    t.renderer
        .render(h(
            "div",
            Attributes::new().with("class", "box"),
            [
                Child::from("lead"),
                Child::from(items),
                Child::from(None::<Node>),
                h("em", Attributes::new(), [Child::from("end")]).into(),
            ],
        ))
        .unwrap();

    assert_eq!(
        t.markup(),
        r#"<div class="box"><span>lead</span><span>a</span><span>b</span><em>end</em></div>"#
    );
    t.renderer.with_rendered(|tree| {
        let root = tree.unwrap();
        assert_eq!(root.attrs().get("class"), Some(&AttrValue::from("box")));
    });
}
