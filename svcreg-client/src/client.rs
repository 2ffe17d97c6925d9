//! Registry client
//!
//! Every call opens a fresh connection, sends one request frame, reads one
//! response frame and closes. There is no retry and no connection reuse.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use svcreg_core::protocol::{
    decode_response, encode_request, read_frame, write_frame, ErrorKind, Request, Response,
    DEFAULT_MAX_FRAME_BYTES,
};
use svcreg_core::{ClientConfig, Endpoint, ServerIdentity};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct RegistryClient {
    host: String,
    port: u16,
    max_frame_bytes: usize,
    io_timeout: Option<Duration>,
    default_target: Option<ServerIdentity>,
}

impl RegistryClient {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            io_timeout: None,
            default_target: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            host: config.master_server.host.clone(),
            port: config.master_server.port,
            max_frame_bytes: config.master_server.max_frame_bytes,
            io_timeout: config.master_server.io_timeout_seconds.map(Duration::from_secs),
            default_target: config.default_target(),
        }
    }

    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Bound the whole exchange (connect, write, read) of each call
    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Option<Duration>) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    #[must_use]
    pub fn with_default_target(mut self, target: ServerIdentity) -> Self {
        self.default_target = Some(target);
        self
    }

    /// `host:port` of the master, for logs and errors
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Publish or update `identity`'s endpoint.
    ///
    /// `Ok(false)` means the master answered with an error (its message is
    /// logged); `Err` means no answer was obtained.
    pub async fn register(&self, identity: ServerIdentity, endpoint: Endpoint) -> Result<bool> {
        let request = Request::register(identity, endpoint);
        let response = self.send(&request).await?;

        if response.is_success() {
            debug!(identity = %request.identity(), "Registration accepted");
            Ok(true)
        } else {
            warn!(
                identity = %request.identity(),
                message = response.message.as_deref().unwrap_or_default(),
                "Registration refused by master"
            );
            Ok(false)
        }
    }

    /// Resolve `identity` to its current endpoint. `Ok(None)` means the
    /// master has no registration for it.
    pub async fn discover(&self, identity: ServerIdentity) -> Result<Option<Endpoint>> {
        let request = Request::discover(identity);
        let response = self.send(&request).await?;

        match response.error_kind() {
            None => response.endpoint().map(Some).ok_or_else(|| {
                ClientError::communication(&self.address(), "success response carried no endpoint")
            }),
            Some(ErrorKind::NotFound) => {
                debug!(identity = %request.identity(), "No registration found");
                Ok(None)
            }
            Some(_) => Err(ClientError::Rejected(response.message.unwrap_or_default())),
        }
    }

    /// Resolve the default target identity taken from configuration
    pub async fn discover_default(&self) -> Result<Option<Endpoint>> {
        let target = self.default_target.clone().ok_or_else(|| {
            ClientError::Configuration("no default target_server configured".to_string())
        })?;
        self.discover(target).await
    }

    /// Send one request and return the master's response, whatever its status
    pub async fn send(&self, request: &Request) -> Result<Response> {
        request
            .validate()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        let payload = encode_request(request).map_err(|e| ClientError::InvalidRequest(e.to_string()))?;

        debug!(master = %self.address(), request = request.kind(), "Sending request");
        let exchanged = match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, self.round_trip(&payload))
                .await
                .unwrap_or_else(|_| {
                    Err(svcreg_core::Error::Io(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("no response within {limit:?}"),
                    )))
                }),
            None => self.round_trip(&payload).await,
        };

        exchanged.map_err(|e| ClientError::communication(&self.address(), e))
    }

    async fn round_trip(&self, payload: &[u8]) -> svcreg_core::Result<Response> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        write_frame(&mut stream, payload).await?;
        let response = read_frame(&mut stream, self.max_frame_bytes).await?;
        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "Master closed the connection first");
        }
        decode_response(&response)
    }
}
