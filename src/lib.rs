//! xmlstride - memory-bounded pull navigation over streamed XML
//!
//! Walk a large XML document (typically a long run of repeated sibling
//! "records") as if it were resident, while only the branch being parsed
//! and the most recently completed record are held in memory.
//!
//! Layers, leaves first:
//! - core: scanner, entities, attributes, encoding and the push lexer
//! - reader: buffered byte source
//! - assembler: worker side, turns lexer events into record fragments
//! - protocol: commands and messages between navigator and worker
//! - tree: resident elements and fragment merging
//! - navigator: the consumer-facing [`Navigator`] and [`Stride`] loop
//!
//! ```no_run
//! # fn main() -> xmlstride::Result<()> {
//! use xmlstride::{Navigator, Stride};
//!
//! let mut nav = Navigator::open("orders.xml")?;
//! let root = nav.root()?;
//! let mut orders = Stride::new(root.child("order"));
//! while orders.step(&mut nav)? {
//!     let order = orders.element();
//!     println!("{:?} {:?}", order.attr("id"), order.child("total").text_joined(""));
//! }
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod config;
pub mod core;
pub mod error;
pub mod memory;
pub mod navigator;
pub mod protocol;
pub mod reader;
pub mod tree;

pub use assembler::Fragment;
pub use config::NavigatorConfig;
pub use error::{Category, Diagnostic, Error, Position, Result, Severity};
pub use navigator::{Navigator, Stride};
pub use protocol::{BreakpointPaths, Command, Message};
pub use tree::{Element, Text};
