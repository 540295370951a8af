//! Navigator configuration.

use crate::reader::buffered::DEFAULT_BUFFER_SIZE;

/// Configuration for a [`Navigator`](crate::Navigator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorConfig {
    /// Initial read buffer size in bytes. The buffer grows when a single
    /// token does not fit.
    /// Default: 8192
    pub buffer_capacity: usize,
    /// Name of the parsing worker thread.
    /// Default: `"xmlstride-worker"`
    pub worker_name: String,
    /// Stack size of the parsing worker thread.
    /// Default: None (platform default)
    pub worker_stack_size: Option<usize>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_SIZE,
            worker_name: "xmlstride-worker".to_string(),
            worker_stack_size: None,
        }
    }
}

impl NavigatorConfig {
    /// Creates a new `NavigatorConfig` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial read buffer size (at least one byte).
    pub fn buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes.max(1);
        self
    }

    /// Sets the worker thread name.
    pub fn worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    /// Sets the worker thread stack size.
    pub fn worker_stack_size(mut self, bytes: usize) -> Self {
        self.worker_stack_size = Some(bytes);
        self
    }
}
