//! Client side of the svcreg service registry.
//!
//! [`RegistryClient`] issues register and discover requests against a
//! master; [`RegisteredService`] and [`launch`] let a worker process
//! register itself and then run.

pub mod client;
pub mod error;
pub mod service;

pub use client::RegistryClient;
pub use error::{ClientError, LaunchError, Result};
pub use service::{launch, RegisteredService};
