//! Hyperscript-style construction of declared values.

use super::component::{Component, ComponentHandle};
use super::declared::{AttrName, Attributes, Declared, Node};
use std::cell::RefCell;
use std::rc::Rc;

/// First argument to [`h`]: an element tag or a component
pub enum Target {
    Tag(AttrName),
    Component(ComponentHandle),
}

impl From<&str> for Target {
    fn from(tag: &str) -> Self {
        Target::Tag(tag.into())
    }
}

impl From<String> for Target {
    fn from(tag: String) -> Self {
        Target::Tag(tag.into())
    }
}

impl From<ComponentHandle> for Target {
    fn from(component: ComponentHandle) -> Self {
        Target::Component(component)
    }
}

impl<C: Component + 'static> From<Rc<RefCell<C>>> for Target {
    fn from(component: Rc<RefCell<C>>) -> Self {
        Target::Component(component.into())
    }
}

/// A child argument to [`h`]
pub enum Child {
    Declared(Declared),
    /// Bare text, wrapped in a text node unless it is the only child
    Text(String),
    /// Spliced into the parent's child list
    List(Vec<Declared>),
    /// Kept as a gap; dropped when the node is rendered
    Empty,
}

impl From<Declared> for Child {
    fn from(value: Declared) -> Self {
        Child::Declared(value)
    }
}

impl From<Node> for Child {
    fn from(value: Node) -> Self {
        Child::Declared(value.into())
    }
}

impl From<ComponentHandle> for Child {
    fn from(value: ComponentHandle) -> Self {
        Child::Declared(value.into())
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value)
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Text(value.to_string())
    }
}

impl From<Vec<Declared>> for Child {
    fn from(value: Vec<Declared>) -> Self {
        Child::List(value)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Empty, Into::into)
    }
}

/// Build a declared value.
///
/// A component target ignores `attrs` and `children`. A single text child
/// becomes the node's content; otherwise text children are wrapped in text
/// nodes and lists are flattened one level.
pub fn h<T, I>(target: T, attrs: Attributes, children: I) -> Declared
where
    T: Into<Target>,
    I: IntoIterator<Item = Child>,
{
    let tag = match target.into() {
        Target::Component(component) => return Declared::Component(component),
        Target::Tag(tag) => tag,
    };

    let mut node = Node {
        tag,
        attrs,
        ..Node::default()
    };

    let mut children: Vec<Child> = children.into_iter().collect();
    if let [Child::Text(_)] = children.as_slice() {
        if let Some(Child::Text(text)) = children.pop() {
            node.content = Some(text);
        }
        return node.into();
    }

    for child in children {
        match child {
            Child::Declared(declared) => node.children.push(Some(declared)),
            Child::Text(text) => node.children.push(Some(Node::text(text).into())),
            Child::List(list) => node.children.extend(list.into_iter().map(Some)),
            Child::Empty => node.children.push(None),
        }
    }
    node.into()
}
