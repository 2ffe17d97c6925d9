//! Registered worker services
//!
//! A worker implements [`RegisteredService`]; [`launch`] publishes its
//! endpoint to the master and only then hands control to `run`.

use async_trait::async_trait;
use tracing::info;

use svcreg_core::{Endpoint, ServerIdentity};

use crate::client::RegistryClient;
use crate::error::LaunchError;

#[async_trait]
pub trait RegisteredService: Send + Sync {
    /// Identity this service registers under
    fn identity(&self) -> ServerIdentity;

    /// Endpoint consumers should connect to
    fn endpoint(&self) -> Endpoint;

    /// Serve until stopped. Long-running services normally never return `Ok`.
    async fn run(&self) -> anyhow::Result<()>;
}

/// Register `service` with the master, then run it.
///
/// The service is not started when registration fails or is refused.
pub async fn launch<S>(service: &S, client: &RegistryClient) -> Result<(), LaunchError>
where
    S: RegisteredService + ?Sized,
{
    let identity = service.identity();
    let endpoint = service.endpoint();

    info!(%identity, %endpoint, master = %client.address(), "Registering with master");
    let accepted = client
        .register(identity.clone(), endpoint.clone())
        .await
        .map_err(|source| LaunchError::Registration {
            identity: identity.to_string(),
            source,
        })?;
    if !accepted {
        return Err(LaunchError::RegistrationRefused(identity.to_string()));
    }

    info!(%identity, %endpoint, "Registration successful, starting service");
    service.run().await.map_err(|source| LaunchError::Service {
        identity: identity.to_string(),
        source,
    })
}
