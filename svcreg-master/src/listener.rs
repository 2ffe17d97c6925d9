//! TCP accept loop

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument};

use crate::context::MasterContext;
use crate::handler::handle_connection;

/// Pause after a failed accept (e.g. file descriptor exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
/// How long in-flight exchanges may run after shutdown is requested
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts registry connections and serves each on its own task.
///
/// A handler's failure or panic stays inside its task and never affects
/// other connections or the accept loop.
pub struct MasterListener {
    listener: TcpListener,
    ctx: Arc<MasterContext>,
}

impl MasterListener {
    pub async fn bind(address: &str, ctx: Arc<MasterContext>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address).await?;
        info!(
            address = %listener.local_addr()?,
            backend = ctx.store().backend_name(),
            "Master server listening"
        );
        Ok(Self { listener, ctx })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` completes, then give in-flight
    /// exchanges a bounded time to finish.
    pub async fn serve_with_shutdown<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            error!(error = %e, "Connection handler panicked");
                        }
                    }
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "Accepted connection");
                            let ctx = Arc::clone(&self.ctx);
                            connections.spawn(
                                async move {
                                    if let Err(e) = handle_connection(stream, &ctx).await {
                                        warn!(error = %e, "Could not deliver response");
                                    }
                                    debug!("Connection closed");
                                }
                                .instrument(tracing::info_span!("connection", %peer)),
                            );
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                }
            }
        }

        let in_flight = connections.len();
        if in_flight > 0 {
            info!(in_flight, "Waiting for in-flight connections to finish");
        }
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = connections.len(),
                "Drain timeout reached, aborting remaining connections"
            );
            connections.abort_all();
        }
        info!("Master server stopped");
    }
}
