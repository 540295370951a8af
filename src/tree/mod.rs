//! Resident tree: the part of the document the consumer can see.
//!
//! - Element: `Rc`-based node handle with the EMPTY null object
//! - Text: character data runs
//! - merge: folds incoming fragments into the tree

pub mod element;
pub(crate) mod merge;
pub mod text;

pub use element::Element;
pub use text::Text;
