//! svcreg master: accepts registry connections and answers register and
//! discover requests against a [`RegistryStore`](svcreg_core::RegistryStore).

pub mod context;
pub mod handler;
pub mod listener;
pub mod migrations;

pub use context::MasterContext;
pub use handler::{handle_connection, process_request};
pub use listener::MasterListener;
