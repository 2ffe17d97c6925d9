//! Per-connection request handling
//!
//! A connection carries exactly one exchange:
//! await request -> parse -> dispatch -> respond -> close.
//! Every failure after the connection is accepted is turned into a
//! `{status:"error", message}` response; the handler only gives up without
//! answering when the socket itself can no longer be written.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use svcreg_core::protocol::{decode_request, encode_response, read_frame, write_frame, Request, Response};
use svcreg_core::{Error, RegistryStore, Result, ServerRecord};

use crate::context::MasterContext;

async fn with_deadline<T, F>(deadline: Option<Duration>, on_timeout: impl FnOnce(Duration) -> Error, io: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, io)
            .await
            .map_err(|_| on_timeout(limit))?,
        None => io.await,
    }
}

/// Serve one request/response exchange on `stream`, then close it.
///
/// Returns an error only when the response could not be delivered.
pub async fn handle_connection<S>(mut stream: S, ctx: &MasterContext) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let received = with_deadline(
        ctx.io_timeout(),
        |limit| Error::Framing(format!("no complete request within {limit:?}")),
        read_frame(&mut stream, ctx.max_frame_bytes()),
    )
    .await;

    let response = match received {
        Ok(payload) => process_request(&payload, ctx.store()).await,
        Err(e) => {
            warn!(error = %e, "Failed to read request frame");
            Response::from_error(&e)
        }
    };

    let encoded = encode_response(&response)?;
    with_deadline(
        ctx.io_timeout(),
        |limit| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("response not written within {limit:?}"),
            ))
        },
        write_frame(&mut stream, &encoded),
    )
    .await?;

    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "Peer closed before shutdown completed");
    }
    Ok(())
}

/// Decode one request payload, run it against the store and build the
/// response. Never fails: errors become error responses.
pub async fn process_request(payload: &[u8], store: &dyn RegistryStore) -> Response {
    let request = match decode_request(payload) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected malformed request");
            return Response::from_error(&e);
        }
    };

    let kind = request.kind();
    let identity = request.identity();
    match dispatch(request, store).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                Error::NotFound(_) => info!(%identity, "Discover found no registration"),
                Error::StoreUnavailable(_) => error!(
                    %identity,
                    request = kind,
                    backend = store.backend_name(),
                    error = %e,
                    "Registry store unavailable"
                ),
                _ => warn!(%identity, request = kind, error = %e, "Request failed"),
            }
            Response::from_error(&e)
        }
    }
}

async fn dispatch(request: Request, store: &dyn RegistryStore) -> Result<Response> {
    match request {
        Request::Register {
            target_server_type,
            target_server_name,
            ip,
            port,
        } => {
            let record = ServerRecord {
                server_type: target_server_type,
                server_name: target_server_name,
                ip,
                port,
            };
            store.upsert(&record).await?;
            info!(
                identity = %record.identity(),
                endpoint = %record.endpoint(),
                "Registered server"
            );
            Ok(Response::success())
        }
        discover @ Request::Discover { .. } => {
            let identity = discover.identity();
            let record = store
                .lookup(&identity)
                .await?
                .ok_or_else(|| Error::NotFound(identity.to_string()))?;
            debug!(%identity, endpoint = %record.endpoint(), "Discovered server");
            Ok(Response::found(record.endpoint()))
        }
    }
}
