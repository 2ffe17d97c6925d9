pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod store;
pub mod validation;

pub use config::{ClientConfig, MasterConfig};
pub use error::{Error, Result};
pub use models::{Endpoint, ServerIdentity, ServerRecord};
pub use store::{MemoryRegistryStore, PgRegistryStore, RegistryStore};
