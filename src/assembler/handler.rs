//! Assembler
//!
//! Implements ContentHandler/ErrorHandler to build fragments from lexer
//! events and hand them to the navigator one record at a time.
//!
//! A record boundary is a start tag whose name matches a child the open
//! element already closed. At a boundary the earliest unflushed fragment is
//! sent (with its open descendants nested as last children) and the worker
//! blocks until the navigator answers.

use super::fragment::Fragment;
use crate::core::attributes::Attribute;
use crate::core::lexer::{ContentHandler, ErrorHandler, Flow};
use crate::error::Diagnostic;
use crate::protocol::{BreakpointPaths, Command, Message, WorkerEnd};
use crate::tree::Text;
use tracing::{debug, trace};

/// Collector that turns lexer events into messages
pub(crate) struct Assembler {
    link: WorkerEnd,
    /// Open fragments, root first
    stack: Vec<Fragment>,
    /// Index of the earliest unflushed fragment
    min: usize,
    /// First diagnostic seen; later ones are dropped
    diagnostic: Option<Diagnostic>,
    completed: bool,
}

impl Assembler {
    pub(crate) fn new(link: WorkerEnd) -> Self {
        Self {
            link,
            stack: Vec::with_capacity(16),
            min: 0,
            diagnostic: None,
            completed: false,
        }
    }

    /// True once the whole document was sent
    pub(crate) fn completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    /// Send the unflushed part of the stack and wait for the navigator.
    fn flush(&mut self, name: &str) -> Flow {
        let names = |fragments: &[Fragment]| -> Vec<String> {
            fragments.iter().map(|f| f.name.clone()).collect()
        };
        let ancestors = names(&self.stack[1..=self.min]);
        let mut full = names(&self.stack[1..]);
        full.push(name.to_string());

        trace!(depth = self.stack.len(), min = self.min, path = ?full, "record boundary");
        let message = Message::Data {
            fragment: self.snapshot(),
            paths: Some(BreakpointPaths { ancestors, full }),
        };
        if !self.link.reply(message) {
            debug!("navigator went away, stopping");
            return Flow::Break(());
        }
        if self.link.await_command() == Command::Stop {
            debug!("stop requested at record boundary");
            return Flow::Break(());
        }

        // Attributes were delivered; text and children stay for the next flush
        for fragment in &mut self.stack[self.min..] {
            fragment.clear_attributes();
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.children.clear();
        }
        self.min = self.stack.len();
        Flow::Continue(())
    }

    /// `stack[min]` with every open descendant nested as its last child
    fn snapshot(&self) -> Fragment {
        let mut open = self.stack[self.min..].iter().rev();
        let mut nested = open.next().cloned().unwrap_or_else(|| Fragment::new(""));
        for fragment in open {
            let mut parent = fragment.clone();
            parent.children.push(nested);
            nested = parent;
        }
        nested
    }

    fn fail(&mut self, diagnostic: &Diagnostic) -> Flow {
        if self.diagnostic.is_none() {
            debug!(%diagnostic, "parse failed");
            self.diagnostic = Some(diagnostic.clone());
            self.link.reply(Message::Error(diagnostic.clone()));
        }
        Flow::Break(())
    }
}

impl ContentHandler for Assembler {
    fn start_element(&mut self, name: &str, attributes: Vec<Attribute>) -> Flow {
        let boundary = self
            .stack
            .last()
            .is_some_and(|parent| parent.child(name).is_some());
        if boundary && self.flush(name).is_break() {
            return Flow::Break(());
        }
        self.stack.push(Fragment::open(name, attributes));
        Flow::Continue(())
    }

    fn characters(&mut self, text: &str) -> Flow {
        let run = text.trim();
        if run.is_empty() {
            return Flow::Continue(());
        }
        if let Some(open) = self.stack.last_mut() {
            Text::append(&mut open.text, run.to_string());
        }
        Flow::Continue(())
    }

    fn end_element(&mut self, _name: &str) -> Flow {
        let Some(fragment) = self.stack.pop() else {
            return Flow::Continue(());
        };
        if self.stack.len() == self.min {
            self.min = self.stack.len().saturating_sub(1);
        }

        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(fragment);
                Flow::Continue(())
            }
            None => {
                // Root closed: send everything and stop reading
                trace!("document complete");
                self.completed = true;
                self.link.reply(Message::Data {
                    fragment,
                    paths: None,
                });
                Flow::Break(())
            }
        }
    }
}

impl ErrorHandler for Assembler {
    fn warning(&mut self, diagnostic: &Diagnostic) -> Flow {
        self.fail(diagnostic)
    }

    fn error(&mut self, diagnostic: &Diagnostic) -> Flow {
        self.fail(diagnostic)
    }

    fn fatal_error(&mut self, diagnostic: &Diagnostic) {
        let _ = self.fail(diagnostic);
    }
}
