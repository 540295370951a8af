//! Worker side: assembling fragments from the lexer.
//!
//! The worker thread runs [`run`]: it waits for the first command, then
//! lexes the source with an [`Assembler`](handler::Assembler) as handler,
//! which sends one message per record boundary and pauses in between.

pub mod fragment;
pub(crate) mod handler;

pub use fragment::Fragment;

use crate::core::lexer::{Lexer, Outcome};
use crate::protocol::{Command, WorkerEnd};
use handler::Assembler;
use std::io::Read;
use tracing::{debug, warn};

/// Worker entry point. Nothing is read from `reader` before the first
/// `Advance`.
pub(crate) fn run<R: Read>(reader: R, link: WorkerEnd, capacity: usize) {
    if link.await_command() == Command::Stop {
        debug!("stopped before parsing started");
        return;
    }

    debug!(capacity, "parsing started");
    let mut lexer = Lexer::with_capacity(reader, capacity);
    let mut assembler = Assembler::new(link);
    match lexer.run(&mut assembler) {
        Outcome::Aborted if assembler.completed() => {
            debug!(position = %lexer.position(), "parsing complete")
        }
        Outcome::Aborted => debug!(position = %lexer.position(), "parsing cancelled"),
        Outcome::Failed => debug!(diagnostic = ?assembler.diagnostic(), "parsing failed"),
        Outcome::Completed => warn!("lexer finished without the root element closing"),
    }
}
