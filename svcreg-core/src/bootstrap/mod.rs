//! Startup helpers shared by the svcreg binaries
//!
//! Everything here runs before the first connection is accepted; failures
//! are fatal and surface as [`Error::Config`](crate::Error::Config) or
//! [`Error::StoreUnavailable`](crate::Error::StoreUnavailable).

pub mod config;
pub mod database;

pub use config::{load_client_config, load_master_config};
pub use database::init_database;
