use super::{Reconciled, Reconciler};
use crate::error::Result;
use crate::node::{ComponentHandle, Declared, PLACEHOLDER_TAG, RenderedNode};
use crate::surface::{ElementId, Surface};
use tracing::trace;

/// How a declared child can be recognised among the previous children
enum Identity<'a> {
    Component(&'a ComponentHandle),
    Key(String),
    Anonymous,
}

impl<'a> Identity<'a> {
    fn of(declared: &'a Declared, key_attribute: &str) -> Self {
        match declared {
            Declared::Component(component) => Identity::Component(component),
            Declared::Node(node) => node
                .attrs
                .get(key_attribute)
                .and_then(|v| v.serialized())
                .map_or(Identity::Anonymous, |key| Identity::Key(key.into_owned())),
        }
    }

    fn matches(&self, surface: &dyn Surface, key_attribute: &str, node: &RenderedNode) -> bool {
        match self {
            Identity::Component(component) => node
                .component
                .as_ref()
                .is_some_and(|c| c.ptr_eq(component)),
            Identity::Key(key) => {
                surface.attribute(node.element, key_attribute).as_deref() == Some(key.as_str())
            }
            Identity::Anonymous => false,
        }
    }
}

/// Reconcile the children (or content) of `rendered` against the declared
/// ones. Returns whether the content was replaced wholesale.
pub(crate) fn reconcile_children(
    engine: &Reconciler<'_>,
    rendered: &mut RenderedNode,
    declared: Vec<Declared>,
    content: Option<String>,
) -> Result<bool> {
    let element = rendered.element;

    if !rendered.children.is_empty()
        && !declared.is_empty()
        && declared.len() <= engine.config().reorder_ceiling
    {
        reorder(engine, element, &mut rendered.children, &declared);
    }

    if rendered.children.len() != declared.len() || rendered.content != content {
        trace!(
            "Replacing content of {} ({} -> {} children)",
            element,
            rendered.children.len(),
            declared.len()
        );
        let previous = std::mem::take(&mut rendered.children);
        for child in &previous {
            engine.release(child, true);
        }

        if declared.is_empty() {
            engine.write_content(element, content.as_deref(), rendered.raw);
            rendered.content = content;
        } else {
            engine.surface().set_text_content(element, "");
            rendered.content = None;
            for child in declared {
                let created = engine.create(element, child)?;
                rendered.children.push(created);
            }
        }
        return Ok(true);
    }

    let mut previous = std::mem::take(&mut rendered.children).into_iter();
    for next in declared {
        let Some(prior) = previous.next() else {
            break;
        };
        match engine.reconcile(prior, next) {
            Ok(Reconciled::Kept(node)) => rendered.children.push(node),
            Ok(Reconciled::Removed) => {}
            Err(err) => {
                // The caller releases what was kept; the rest is ours to drop
                for rest in previous {
                    engine.release(&rest, true);
                }
                return Err(err);
            }
        }
    }
    Ok(false)
}

/// Move previous children so that each declared child with a recognisable
/// identity lines up with the child that rendered it last time. Grows the
/// list with placeholders and trims surplus children so both lists end up the
/// same length.
fn reorder(
    engine: &Reconciler<'_>,
    parent: ElementId,
    children: &mut Vec<RenderedNode>,
    declared: &[Declared],
) {
    let surface = engine.surface();
    let key_attribute = engine.config().key_attribute.clone();
    let identities: Vec<Identity<'_>> = declared
        .iter()
        .map(|d| Identity::of(d, &key_attribute))
        .collect();

    let any_match = identities
        .iter()
        .any(|id| children.iter().any(|c| id.matches(surface, &key_attribute, c)));
    if !any_match {
        return;
    }

    while children.len() < declared.len() {
        let placeholder = surface.create_element(PLACEHOLDER_TAG);
        surface.append_child(parent, placeholder);
        children.push(RenderedNode::placeholder(placeholder));
    }

    // Positions already holding the child their declared identity asked for
    let mut settled = vec![false; children.len()];
    for (i, identity) in identities.iter().enumerate() {
        if matches!(identity, Identity::Anonymous) {
            continue;
        }
        if identity.matches(surface, &key_attribute, &children[i]) {
            settled[i] = true;
            continue;
        }
        let found = (0..children.len()).find(|&j| {
            j != i && !settled[j] && identity.matches(surface, &key_attribute, &children[j])
        });
        if let Some(j) = found {
            let (first, second) = (i.min(j), i.max(j));
            swap_live(surface, parent, children[first].element, children[second].element);
            children.swap(i, j);
            settled[i] = true;
        }
    }

    if children.len() > declared.len() {
        let surplus: Vec<RenderedNode> = children.drain(declared.len()..).collect();
        for node in surplus {
            engine.release(&node, true);
            surface.remove_child(parent, node.element);
        }
    }
}

/// Exchange the positions of `first` and `second` (first precedes second)
fn swap_live(surface: &dyn Surface, parent: ElementId, first: ElementId, second: ElementId) {
    if surface.parent(first) != Some(parent) || surface.parent(second) != Some(parent) {
        return;
    }
    let after_second = surface.next_sibling(second);
    surface.insert_before(parent, second, Some(first));
    surface.insert_before(parent, first, after_second);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;

    #[test]
    fn test_swap_live_adjacent_and_apart() {
        let surface = MemorySurface::new();
        let parent = surface.create_element("ul");
        let items: Vec<_> = (0..4).map(|_| surface.create_element("li")).collect();
        for item in &items {
            surface.append_child(parent, *item);
        }

        swap_live(&surface, parent, items[0], items[1]);
        assert_eq!(surface.children(parent), vec![items[1], items[0], items[2], items[3]]);

        swap_live(&surface, parent, items[1], items[3]);
        assert_eq!(surface.children(parent), vec![items[3], items[0], items[2], items[1]]);
    }

    #[test]
    fn test_swap_live_skips_detached() {
        let surface = MemorySurface::new();
        let parent = surface.create_element("ul");
        let a = surface.create_element("li");
        let b = surface.create_element("li");
        surface.append_child(parent, a);

        swap_live(&surface, parent, a, b);
        assert_eq!(surface.children(parent), vec![a]);
    }
}
