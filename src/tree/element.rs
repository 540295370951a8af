//! Resident element tree.
//!
//! Ownership flows from parent to child: a node holds its children by
//! `Rc` and its parent only by `Weak`, so detaching an element from its
//! parent's child list frees the whole subtree as soon as the caller drops
//! its own handles.
//!
//! [`Element::EMPTY`] is the null object every failing navigation step
//! returns, so chains like `root.child("a").child("b").attr("id")` never
//! need a check in between.

use super::text::Text;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// A resident node.
struct Node {
    name: String,
    parent: Weak<Node>,
    data: RefCell<NodeData>,
}

#[derive(Default)]
struct NodeData {
    attributes: HashMap<String, String>,
    text: Option<Text>,
    /// At most one child per tag name, in document order
    children: Vec<Element>,
}

/// Handle to a resident element, or [`Element::EMPTY`].
///
/// Cloning is cheap and yields another handle to the same node. Equality is
/// identity; the empty element is not equal to anything, itself included.
#[derive(Clone, Default)]
pub struct Element(Option<Rc<Node>>);

impl Element {
    /// The absent element.
    pub const EMPTY: Element = Element(None);

    pub(crate) fn new_root(name: &str) -> Element {
        Element(Some(Rc::new(Node {
            name: name.to_string(),
            parent: Weak::new(),
            data: RefCell::default(),
        })))
    }

    /// Create a detached child of `self`. The caller attaches it.
    pub(crate) fn new_child(&self, name: &str) -> Element {
        Element(Some(Rc::new(Node {
            name: name.to_string(),
            parent: self.0.as_ref().map(Rc::downgrade).unwrap_or_default(),
            data: RefCell::default(),
        })))
    }

    /// False only for the empty element.
    pub fn exists(&self) -> bool {
        self.0.is_some()
    }

    /// Raw qualified tag name.
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref().map(|node| node.name.as_str())
    }

    /// Slash-joined names from the root down to this element, e.g. `/r/a/b`.
    pub fn path(&self) -> Option<String> {
        let mut names = Vec::new();
        let mut cursor = self.0.clone();
        while let Some(node) = cursor {
            names.push(node.name.clone());
            cursor = node.parent.upgrade();
        }
        if names.is_empty() {
            return None;
        }
        names.reverse();
        Some(format!("/{}", names.join("/")))
    }

    /// The parent, or EMPTY for the root, a detached element and EMPTY.
    pub fn parent(&self) -> Element {
        Element(self.0.as_ref().and_then(|node| node.parent.upgrade()))
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.with_data(|data| data.attributes.get(name).cloned())
            .flatten()
    }

    /// Copy of the attribute mapping (empty for EMPTY).
    pub fn attributes(&self) -> HashMap<String, String> {
        self.with_data(|data| data.attributes.clone())
            .unwrap_or_default()
    }

    pub fn text(&self) -> Option<Text> {
        self.with_data(|data| data.text.clone()).flatten()
    }

    /// Text with multiple runs joined by `separator`.
    pub fn text_joined(&self, separator: &str) -> Option<String> {
        self.text().map(|text| text.join(separator))
    }

    /// The child with this tag name, if resident.
    pub fn lookup(&self, name: &str) -> Option<Element> {
        self.with_data(|data| {
            data.children
                .iter()
                .find(|child| child.name() == Some(name))
                .cloned()
        })
        .flatten()
    }

    /// The child with this tag name, or EMPTY.
    pub fn child(&self, name: &str) -> Element {
        self.lookup(name).unwrap_or(Element::EMPTY)
    }

    /// Follow tag names down the tree; EMPTY as soon as a step is missing.
    pub fn descend<I, S>(&self, segments: I) -> Element
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = self.clone();
        for segment in segments {
            if !current.exists() {
                break;
            }
            current = current.child(segment.as_ref());
        }
        current
    }

    /// Like [`descend`](Self::descend) over a slash-separated path such as
    /// `"a/b"`. Empty segments are skipped.
    pub fn select(&self, path: &str) -> Element {
        self.descend(path.split('/').filter(|segment| !segment.is_empty()))
    }

    /// Resident children in document order.
    pub fn children(&self) -> Vec<Element> {
        self.with_data(|data| data.children.clone())
            .unwrap_or_default()
    }

    /// True when `self` is `other` or one of its descendants. Always false
    /// when either side is EMPTY.
    pub fn is_within(&self, other: &Element) -> bool {
        let Some(target) = other.0.as_ref() else {
            return false;
        };
        let mut cursor = self.0.clone();
        while let Some(node) = cursor {
            if Rc::ptr_eq(&node, target) {
                return true;
            }
            cursor = node.parent.upgrade();
        }
        false
    }

    /// Drop attributes, text and children. No-op on EMPTY.
    pub fn clear(&self) {
        if let Some(node) = &self.0 {
            *node.data.borrow_mut() = NodeData::default();
        }
    }

    /// The child with this tag name, created and attached when missing.
    pub(crate) fn child_or_insert(&self, name: &str) -> Element {
        if let Some(existing) = self.lookup(name) {
            return existing;
        }
        let created = self.new_child(name);
        if let Some(node) = &self.0 {
            node.data.borrow_mut().children.push(created.clone());
        }
        created
    }

    pub(crate) fn set_attributes(&self, attributes: HashMap<String, String>) {
        if let Some(node) = &self.0 {
            node.data.borrow_mut().attributes = attributes;
        }
    }

    pub(crate) fn set_text(&self, text: Option<Text>) {
        if let Some(node) = &self.0 {
            node.data.borrow_mut().text = text;
        }
    }

    pub(crate) fn replace_children(&self, children: Vec<Element>) {
        if let Some(node) = &self.0 {
            node.data.borrow_mut().children = children;
        }
    }

    pub(crate) fn clear_children(&self) {
        self.replace_children(Vec::new());
    }

    fn with_data<T>(&self, f: impl FnOnce(&NodeData) -> T) -> Option<T> {
        self.0.as_ref().map(|node| f(&node.data.borrow()))
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(path) => f.debug_tuple("Element").field(&path).finish(),
            None => f.write_str("Element::EMPTY"),
        }
    }
}
