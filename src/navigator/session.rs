//! Navigator-side handle on the parsing worker thread.

use crate::assembler;
use crate::config::NavigatorConfig;
use crate::error::{Error, Result};
use crate::protocol::{duplex, Command, ControllerEnd, Message};
use std::io::Read;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// A running worker and the channel to it.
pub(crate) struct Session {
    link: ControllerEnd,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    /// Start the worker thread. It reads nothing until the first advance.
    pub(crate) fn spawn<R>(reader: R, config: &NavigatorConfig) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (link, worker_end) = duplex();
        let capacity = config.buffer_capacity;

        let mut builder = thread::Builder::new().name(config.worker_name.clone());
        if let Some(size) = config.worker_stack_size {
            builder = builder.stack_size(size);
        }
        let worker = builder
            .spawn(move || assembler::run(reader, worker_end, capacity))
            .map_err(Error::Spawn)?;

        debug!(name = %config.worker_name, capacity, "spawned parsing worker");
        Ok(Session {
            link,
            worker: Some(worker),
        })
    }

    /// Ask for the next message and wait for it.
    pub(crate) fn advance(&mut self) -> Result<Message> {
        if self.link.send(Command::Advance) {
            if let Some(message) = self.link.receive() {
                return Ok(message);
            }
        }
        Err(self.vanished())
    }

    /// Send `Stop` (ignored by a worker that already exited) and wait for
    /// the thread.
    pub(crate) fn stop(&mut self) -> Result<()> {
        if self.worker.is_some() {
            debug!("stopping parsing worker");
            self.link.send(Command::Stop);
        }
        self.join()
    }

    /// Wait for the worker thread to exit.
    pub(crate) fn join(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| {
                warn!("parsing worker panicked");
                Error::WorkerPanicked
            }),
            None => Ok(()),
        }
    }

    /// The worker dropped its end without answering.
    fn vanished(&mut self) -> Error {
        match self.join() {
            Err(e) => e,
            Ok(()) => {
                warn!("parsing worker exited without replying");
                Error::protocol("worker exited without replying")
            }
        }
    }
}
