//! Folding fragments into the resident tree.

use super::element::Element;
use crate::assembler::Fragment;
use tracing::trace;

/// Merge `fragment` into the tree and return the element it landed on.
///
/// With `parent` EMPTY the fragment is the root: `root` is reused when
/// there is one, otherwise a new root is created. Under a real parent the
/// element with the fragment's tag is reused or created and attached.
pub(crate) fn merge(fragment: Fragment, parent: &Element, root: &Element) -> Element {
    let element = if parent.exists() {
        parent.child_or_insert(&fragment.name)
    } else if root.exists() {
        root.clone()
    } else {
        Element::new_root(&fragment.name)
    };

    trace!(name = %fragment.name, children = fragment.children.len(), "merging fragment");
    populate(&element, fragment);
    element
}

/// Overwrite `element` with the fragment's content. The child list is
/// rebuilt from exactly the children present, evicting everything else.
fn populate(element: &Element, fragment: Fragment) {
    if let Some(attributes) = fragment.attributes {
        element.set_attributes(attributes);
    }
    element.set_text(fragment.text);

    let mut merged: Vec<Element> = Vec::with_capacity(fragment.children.len());
    for child in fragment.children {
        // Same tag twice in one fragment: fold into one element, last wins
        let target = match merged.iter().position(|e| e.name() == Some(child.name.as_str())) {
            Some(index) => merged.remove(index),
            None => element
                .lookup(&child.name)
                .unwrap_or_else(|| element.new_child(&child.name)),
        };
        populate(&target, child);
        merged.push(target);
    }
    element.replace_children(merged);
}
