//! Fragment: the wire shape of one subtree.

use crate::core::attributes::Attribute;
use crate::tree::Text;
use std::collections::HashMap;

/// One element with its content, as the assembler built it.
///
/// `attributes` is `None` once the element's attributes were already
/// delivered in an earlier message; the receiver keeps what it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub name: String,
    pub attributes: Option<HashMap<String, String>>,
    pub text: Option<Text>,
    pub children: Vec<Fragment>,
}

impl Fragment {
    /// A fragment with no attributes, text or children.
    pub fn new(name: impl Into<String>) -> Self {
        Fragment {
            name: name.into(),
            attributes: Some(HashMap::new()),
            text: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn open(name: &str, attributes: Vec<Attribute>) -> Self {
        Fragment {
            name: name.to_string(),
            attributes: Some(
                attributes
                    .into_iter()
                    .map(|attribute| (attribute.name, attribute.value))
                    .collect(),
            ),
            text: None,
            children: Vec::new(),
        }
    }

    /// Builder used to spell out expected fragments.
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, run: &str) -> Self {
        Text::append(&mut self.text, run.to_string());
        self
    }

    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    /// Mark attributes as delivered, here and in every descendant.
    pub fn without_attributes(mut self) -> Self {
        self.clear_attributes();
        self
    }

    pub fn child(&self, name: &str) -> Option<&Fragment> {
        self.children.iter().find(|child| child.name == name)
    }

    pub(crate) fn clear_attributes(&mut self) {
        self.attributes = None;
        for child in &mut self.children {
            child.clear_attributes();
        }
    }
}
