//! Consumer side: the navigable view of a document being parsed.
//!
//! A [`Navigator`] owns the resident tree and a worker thread that lexes
//! the source. Every [`next`](Navigator::next) lets the worker run to the
//! next record boundary and merges what it sends into the tree, so the
//! consumer only ever holds the branch being extended plus the most
//! recently completed record.

mod session;
mod stride;

pub use stride::Stride;

use crate::config::NavigatorConfig;
use crate::error::{Error, Result};
use crate::protocol::{BreakpointPaths, Message};
use crate::tree::merge::merge;
use crate::tree::Element;
use session::Session;
use std::fs::File;
use std::io::Read;
use std::mem;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Pull-style navigator over a streamed XML document.
pub struct Navigator {
    /// `None` once the worker was joined
    session: Option<Session>,
    root: Element,
    breakpoint: Element,
    previous: Element,
    finished: bool,
}

impl Navigator {
    /// Navigate the document read from `reader`.
    ///
    /// Nothing is read until the first call that advances.
    pub fn new<R>(reader: R) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        Self::with_config(reader, NavigatorConfig::default())
    }

    pub fn with_config<R>(reader: R, config: NavigatorConfig) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        Ok(Navigator {
            session: Some(Session::spawn(reader, &config)?),
            root: Element::EMPTY,
            breakpoint: Element::EMPTY,
            previous: Element::EMPTY,
            finished: false,
        })
    }

    /// Navigate the document stored at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, NavigatorConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: NavigatorConfig) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened document");
        Self::with_config(file, config)
    }

    /// The root element, advancing to the first boundary if nothing was
    /// parsed yet. EMPTY if the document never produced a root.
    pub fn root(&mut self) -> Result<Element> {
        if !self.root.exists() && !self.finished {
            self.next()?;
        }
        Ok(self.root.clone())
    }

    /// The element currently being extended; EMPTY once finished.
    pub fn breakpoint(&self) -> Element {
        self.breakpoint.clone()
    }

    /// The most recently superseded breakpoint.
    pub fn previous_breakpoint(&self) -> Element {
        self.previous.clone()
    }

    /// True after the end of the document, [`finish`](Self::finish) or an
    /// error.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Parse up to the next record boundary and merge it. No-op once
    /// finished.
    pub fn next(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            self.finished = true;
            return Ok(());
        };

        match session.advance() {
            Ok(message) => self.apply(message),
            Err(e) => {
                self.session = None;
                self.close();
                Err(e)
            }
        }
    }

    /// Stop the worker (if still running) and wait for it. Idempotent.
    pub fn finish(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        self.close();
        session.stop()
    }

    fn apply(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Data {
                fragment,
                paths: Some(paths),
            } => {
                let parent = self.anchor_parent(&paths);
                let merged = merge(fragment, &parent, &self.root);
                if !parent.exists() {
                    self.root = merged;
                }
                let current = self.root.descend(&paths.full);
                trace!(breakpoint = ?current, "advanced");
                self.previous = mem::replace(&mut self.breakpoint, current);
                Ok(())
            }
            Message::Data {
                fragment,
                paths: None,
            } => {
                self.root = merge(fragment, &Element::EMPTY, &self.root);
                debug!("document complete");
                self.close();
                self.join()
            }
            Message::Error(diagnostic) => {
                self.close();
                self.join()?;
                Err(Error::Parse(diagnostic))
            }
        }
    }

    /// Where a flushed fragment goes: under the parent of the element its
    /// ancestor path names, or at root level.
    fn anchor_parent(&self, paths: &BreakpointPaths) -> Element {
        let Some((_, above)) = paths.ancestors.split_last() else {
            return Element::EMPTY;
        };
        if !self.root.exists() {
            return Element::EMPTY;
        }
        // Elements the consumer cleared are recreated on the way down
        above
            .iter()
            .fold(self.root.clone(), |element, name| element.child_or_insert(name))
    }

    /// Mark finished; the current breakpoint becomes the previous one.
    fn close(&mut self) {
        self.finished = true;
        self.previous = mem::replace(&mut self.breakpoint, Element::EMPTY);
    }

    fn join(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.join(),
            None => Ok(()),
        }
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(error = %e, "failed to stop parsing worker");
        }
    }
}
