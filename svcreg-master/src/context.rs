//! Shared state handed to every connection handler

use std::sync::Arc;
use std::time::Duration;

use svcreg_core::config::ServerConfig;
use svcreg_core::protocol::DEFAULT_MAX_FRAME_BYTES;
use svcreg_core::RegistryStore;

/// Built once at startup and shared by `Arc` with every connection task.
///
/// Holds the store handle, never individual records.
pub struct MasterContext {
    store: Arc<dyn RegistryStore>,
    max_frame_bytes: usize,
    io_timeout: Option<Duration>,
}

impl MasterContext {
    #[must_use]
    pub fn new(store: Arc<dyn RegistryStore>, server: &ServerConfig) -> Self {
        Self {
            store,
            max_frame_bytes: server.max_frame_bytes,
            io_timeout: server.io_timeout(),
        }
    }

    /// Context with default frame bound and no socket deadline
    #[must_use]
    pub fn with_store(store: Arc<dyn RegistryStore>) -> Self {
        Self {
            store,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            io_timeout: None,
        }
    }

    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Option<Duration>) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    #[must_use]
    pub fn store(&self) -> &dyn RegistryStore {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    #[must_use]
    pub const fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout
    }
}
