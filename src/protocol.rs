//! Messages between the navigator and its parsing worker.
//!
//! The two sides alternate strictly: the navigator sends one [`Command`],
//! the worker answers with at most one [`Message`] and then waits for the
//! next command. Both directions are `crossbeam_channel::bounded(1)`
//! queues, so neither side can run ahead.

use crate::assembler::Fragment;
use crate::error::Diagnostic;
use crossbeam_channel::{Receiver, Sender};

/// Navigator to worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Parse up to the next record boundary (or the end of the document).
    Advance,
    /// Stop parsing. Not answered.
    Stop,
}

/// Tag paths below the root that locate a flushed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointPaths {
    /// Names from just below the root down to the flushed fragment; empty
    /// when the fragment is the root itself.
    pub ancestors: Vec<String>,
    /// Names from just below the root down to the element that triggered
    /// the boundary.
    pub full: Vec<String>,
}

/// Worker to navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A subtree to merge. Without paths this is the whole document and
    /// parsing is complete.
    Data {
        fragment: Fragment,
        paths: Option<BreakpointPaths>,
    },
    /// Parsing failed; nothing follows.
    Error(Diagnostic),
}

/// Navigator side of the duplex channel.
pub(crate) struct ControllerEnd {
    commands: Sender<Command>,
    messages: Receiver<Message>,
}

/// Worker side of the duplex channel.
pub(crate) struct WorkerEnd {
    commands: Receiver<Command>,
    messages: Sender<Message>,
}

/// Create both ends of a navigator/worker channel.
pub(crate) fn duplex() -> (ControllerEnd, WorkerEnd) {
    let (command_tx, command_rx) = crossbeam_channel::bounded(1);
    let (message_tx, message_rx) = crossbeam_channel::bounded(1);
    (
        ControllerEnd {
            commands: command_tx,
            messages: message_rx,
        },
        WorkerEnd {
            commands: command_rx,
            messages: message_tx,
        },
    )
}

impl ControllerEnd {
    /// Returns false when the worker is gone.
    pub(crate) fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Block for the worker's reply; `None` when the worker is gone.
    pub(crate) fn receive(&self) -> Option<Message> {
        self.messages.recv().ok()
    }
}

impl WorkerEnd {
    /// Block for the next command. A vanished navigator reads as `Stop`.
    pub(crate) fn await_command(&self) -> Command {
        self.commands.recv().unwrap_or(Command::Stop)
    }

    /// Returns false when the navigator is gone.
    pub(crate) fn reply(&self, message: Message) -> bool {
        self.messages.send(message).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_request_reply() {
        let (controller, worker) = duplex();
        let handle = thread::spawn(move || {
            while worker.await_command() == Command::Advance {
                worker.reply(Message::Data {
                    fragment: Fragment::new("r"),
                    paths: None,
                });
            }
        });

        assert!(controller.send(Command::Advance));
        assert_eq!(
            controller.receive(),
            Some(Message::Data {
                fragment: Fragment::new("r"),
                paths: None
            })
        );
        assert!(controller.send(Command::Stop));
        handle.join().unwrap();
        assert_eq!(controller.receive(), None);
    }

    #[test]
    fn test_dropped_controller_reads_as_stop() {
        let (controller, worker) = duplex();
        drop(controller);
        assert_eq!(worker.await_command(), Command::Stop);
        assert!(!worker.reply(Message::Data {
            fragment: Fragment::new("r"),
            paths: None
        }));
    }
}
