//! Registry storage
//!
//! The store is the only stateful component of the registry. Callers go
//! through [`RegistryStore`] for every read and write and never keep a record
//! around between requests.

mod memory;
mod postgres;

pub use memory::MemoryRegistryStore;
pub use postgres::PgRegistryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ServerIdentity, ServerRecord};

/// Storage backend for the registry
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Insert or overwrite the record keyed by `(server_type, server_name)`.
    ///
    /// Upserts on the same key are applied atomically in some total order;
    /// upserts on different keys never wait on each other.
    async fn upsert(&self, record: &ServerRecord) -> Result<()>;

    /// Exact-match lookup on the full identity. `Ok(None)` means the identity
    /// was never registered; backend failures are
    /// [`Error::StoreUnavailable`](crate::Error::StoreUnavailable).
    async fn lookup(&self, identity: &ServerIdentity) -> Result<Option<ServerRecord>>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
