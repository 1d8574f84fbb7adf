use super::component::ComponentHandle;
use crate::animation::Animation;
use crate::surface::{ElementId, Event};
use smallvec::SmallVec;
use smartstring::{LazyCompact, SmartString};
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type AttrName = SmartString<LazyCompact>;

/// Tag given to text-bearing nodes created from bare strings
pub const TEXT_TAG: &str = "span";

/// What a handler receives when its event fires
pub struct EventContext {
    /// Nearest component enclosing the event target, else the declaring component
    pub component: Option<ComponentHandle>,
    pub event: Event,
    /// Element the handler is bound on
    pub element: ElementId,
}

impl EventContext {
    /// Run `f` against the resolved component if it is a `C`
    pub fn with_component<C: 'static, R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        self.component.as_ref()?.with_mut(f)
    }
}

/// Values an event handler may return.
///
/// `false` opts out of the repaint that otherwise follows every handled event.
pub trait HandlerOutput {
    fn wants_repaint(self) -> bool;
}

impl HandlerOutput for () {
    fn wants_repaint(self) -> bool {
        true
    }
}

impl HandlerOutput for bool {
    fn wants_repaint(self) -> bool {
        self
    }
}

/// Event handler attribute value
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&EventContext) -> bool>);

impl Handler {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&EventContext) -> R + 'static,
        R: HandlerOutput,
    {
        Self(Rc::new(move |ctx: &EventContext| f(ctx).wants_repaint()))
    }

    /// Invoke the handler, returning whether a repaint was requested
    pub fn call(&self, ctx: &EventContext) -> bool {
        (self.0)(ctx)
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Rc::as_ptr(&self.0))
    }
}

/// Ordered style mapping, serialized as `key:value;` pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style(Vec<(AttrName, Option<String>)>);

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    /// Keep the key but give it no value; it is skipped when serialized
    pub fn unset(mut self, key: &str) -> Self {
        self.insert(key, None);
        self
    }

    fn insert(&mut self, key: &str, value: Option<String>) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key.into(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn to_css(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            if let Some(value) = value {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
                out.push(';');
            }
        }
        out
    }
}

/// A single attribute value
#[derive(Debug, Clone)]
pub enum AttrValue {
    /// Scalar, applied as-is
    Value(String),
    Style(Style),
    /// Bound as an event listener named after the attribute
    Handler(Handler),
    /// Means "this attribute is absent"
    Null,
}

impl AttrValue {
    pub fn is_handler(&self) -> bool {
        matches!(self, AttrValue::Handler(_))
    }

    /// Surface form of the value; `None` for handlers and nulls
    pub fn serialized(&self) -> Option<Cow<'_, str>> {
        match self {
            AttrValue::Value(v) => Some(Cow::Borrowed(v.as_str())),
            AttrValue::Style(style) => Some(Cow::Owned(style.to_css())),
            AttrValue::Handler(_) | AttrValue::Null => None,
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Handler(a), AttrValue::Handler(b)) => a.ptr_eq(b),
            (AttrValue::Handler(_), _) | (_, AttrValue::Handler(_)) => false,
            _ => self.serialized() == other.serialized(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Value(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Value(value)
    }
}

impl From<Style> for AttrValue {
    fn from(value: Style) -> Self {
        AttrValue::Style(value)
    }
}

impl From<Handler> for AttrValue {
    fn from(value: Handler) -> Self {
        AttrValue::Handler(value)
    }
}

macro_rules! scalar_attr {
    ($($t:ty),*) => {
        $(impl From<$t> for AttrValue {
            fn from(value: $t) -> Self {
                AttrValue::Value(value.to_string())
            }
        })*
    };
}

scalar_attr!(bool, i32, i64, u32, u64, usize, f32, f64);

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttrValue::Null, Into::into)
    }
}

/// Attribute map preserving declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(AttrName, AttrValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name.into(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let index = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Declared visual element for one render cycle
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: AttrName,
    pub content: Option<String>,
    /// `None` entries are gaps and are dropped before rendering
    pub children: Vec<Option<Declared>>,
    pub attrs: Attributes,
    /// Content is inserted as markup rather than text
    pub raw: bool,
    pub animations: SmallVec<[Animation; 1]>,
}

impl Node {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Text-bearing node, the same shape bare strings become
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(TEXT_TAG).content(content)
    }

    pub fn attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name, value);
        self
    }

    pub fn on<F, R>(self, event: &str, handler: F) -> Self
    where
        F: Fn(&EventContext) -> R + 'static,
        R: HandlerOutput,
    {
        self.attr(event, Handler::new(handler))
    }

    pub fn style(self, style: Style) -> Self {
        self.attr("style", style)
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn raw_content(mut self, markup: impl Into<String>) -> Self {
        self.content = Some(markup.into());
        self.raw = true;
        self
    }

    pub fn child(mut self, child: impl Into<Declared>) -> Self {
        self.children.push(Some(child.into()));
        self
    }

    /// Leave a gap in the child list
    pub fn gap(mut self) -> Self {
        self.children.push(None);
        self
    }

    pub fn children<I, D>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Declared>,
    {
        self.children
            .extend(children.into_iter().map(|c| Some(c.into())));
        self
    }

    pub fn animate(mut self, animation: Animation) -> Self {
        self.animations.push(animation);
        self
    }

    /// Drop gaps, and drop content when children take precedence over it
    pub(crate) fn sanitized(mut self) -> Self {
        self.children.retain(Option::is_some);
        if !self.children.is_empty() {
            self.content = None;
        }
        self
    }
}

/// A declared value: a plain node or a component that renders one
#[derive(Debug, Clone)]
pub enum Declared {
    Node(Node),
    Component(ComponentHandle),
}

impl Declared {
    pub fn is_component(&self) -> bool {
        matches!(self, Declared::Component(_))
    }
}

impl From<Node> for Declared {
    fn from(node: Node) -> Self {
        Declared::Node(node)
    }
}

impl From<ComponentHandle> for Declared {
    fn from(component: ComponentHandle) -> Self {
        Declared::Component(component)
    }
}

impl<C: super::Component + 'static> From<Rc<RefCell<C>>> for Declared {
    fn from(component: Rc<RefCell<C>>) -> Self {
        Declared::Component(component.into())
    }
}

impl From<&str> for Declared {
    fn from(text: &str) -> Self {
        Declared::Node(Node::text(text))
    }
}

impl From<String> for Declared {
    fn from(text: String) -> Self {
        Declared::Node(Node::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_serialization_skips_unset() {
        let style = Style::new()
            .set("color", "red")
            .unset("margin")
            .set("width", "10px");
        assert_eq!(style.to_css(), "color:red;width:10px;");
    }

    #[test]
    fn test_style_equals_matching_string() {
        let style = AttrValue::from(Style::new().set("color", "red"));
        assert_eq!(style, AttrValue::from("color:red;"));
    }

    #[test]
    fn test_null_attribute_has_no_serialized_form() {
        assert_eq!(AttrValue::from(None::<&str>).serialized(), None);
        assert_eq!(AttrValue::from(3).serialized().as_deref(), Some("3"));
        assert_eq!(AttrValue::from(true).serialized().as_deref(), Some("true"));
    }

    #[test]
    fn test_attributes_keep_order_and_replace_in_place() {
        let attrs = Attributes::new()
            .with("b", "1")
            .with("a", "2")
            .with("b", "3");
        let names: Vec<_> = attrs.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(attrs.get("b"), Some(&AttrValue::from("3")));
    }

    #[test]
    fn test_handler_output_controls_repaint() {
        let ctx = EventContext {
            component: None,
            event: Event::new("click", ElementId::new(0)),
            element: ElementId::new(0),
        };
        assert!(Handler::new(|_: &EventContext| ()).call(&ctx));
        assert!(Handler::new(|_: &EventContext| true).call(&ctx));
        assert!(!Handler::new(|_: &EventContext| false).call(&ctx));
    }

    #[test]
    fn test_sanitize_drops_gaps_and_content_under_children() {
        let node = Node::new("div")
            .content("ignored")
            .gap()
            .child(Node::text("kept"))
            .gap()
            .sanitized();
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.content, None);
    }

    #[test]
    fn test_sanitize_keeps_content_without_children() {
        let node = Node::new("p").content("hello").gap().sanitized();
        assert!(node.children.is_empty());
        assert_eq!(node.content.as_deref(), Some("hello"));
    }
}
