//! Wire protocol shared by the master and its clients
//!
//! Every connection carries exactly one request frame followed by one
//! response frame. A frame is a big-endian `u32` payload length followed by
//! that many bytes of UTF-8 JSON:
//!
//! ```text
//! [u32 BE: len][JSON bytes of len]
//! ```
//!
//! Requests are tagged by `type`:
//!
//! ```json
//! {"type":"register","target_server_type":"web","target_server_name":"api1","ip":"10.0.0.5","port":8080}
//! {"type":"discover","target_server_type":"web","target_server_name":"api1"}
//! ```
//!
//! Responses carry `status` plus either the endpoint (`ip`, `port`) or a
//! `message`. Error messages start with a fixed prefix (see [`ErrorKind`]) so
//! a client can tell "not registered" apart from "could not check".

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::models::{Endpoint, ServerIdentity, ServerRecord};

/// Default upper bound on a frame payload, in bytes
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024;

/// Registry request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    Register {
        target_server_type: String,
        target_server_name: String,
        ip: String,
        port: u16,
    },
    Discover {
        target_server_type: String,
        target_server_name: String,
    },
}

impl Request {
    #[must_use]
    pub fn register(identity: ServerIdentity, endpoint: Endpoint) -> Self {
        Self::Register {
            target_server_type: identity.server_type,
            target_server_name: identity.server_name,
            ip: endpoint.ip,
            port: endpoint.port,
        }
    }

    #[must_use]
    pub fn discover(identity: ServerIdentity) -> Self {
        Self::Discover {
            target_server_type: identity.server_type,
            target_server_name: identity.server_name,
        }
    }

    /// Request kind as it appears in the `type` field
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Discover { .. } => "discover",
        }
    }

    #[must_use]
    pub fn identity(&self) -> ServerIdentity {
        match self {
            Self::Register {
                target_server_type,
                target_server_name,
                ..
            }
            | Self::Discover {
                target_server_type,
                target_server_name,
            } => ServerIdentity::new(target_server_type, target_server_name),
        }
    }

    /// Check field contents beyond what deserialization enforces
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Register {
                target_server_type,
                target_server_name,
                ip,
                port,
            } => ServerRecord {
                server_type: target_server_type.clone(),
                server_name: target_server_name.clone(),
                ip: ip.clone(),
                port: *port,
            }
            .validate()?,
            Self::Discover { .. } => self.identity().validate()?,
        }
        Ok(())
    }
}

/// Decode and validate a request payload.
///
/// Any JSON error (bad syntax, unknown `type`, missing field, non-numeric or
/// out-of-range `port`) is reported as [`Error::MalformedRequest`].
pub fn decode_request(payload: &[u8]) -> Result<Request> {
    let request: Request = serde_json::from_slice(payload)
        .map_err(|e| Error::MalformedRequest(e.to_string()))?;
    request.validate()?;
    Ok(request)
}

pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(request)?)
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Registry response
///
/// Optional fields are omitted from the encoding when absent, so each
/// response carries only the fields of its shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// `{status:"success"}`
    #[must_use]
    pub const fn success() -> Self {
        Self {
            status: Status::Success,
            ip: None,
            port: None,
            message: None,
        }
    }

    /// `{status:"success", ip, port}`
    #[must_use]
    pub fn found(endpoint: Endpoint) -> Self {
        Self {
            status: Status::Success,
            ip: Some(endpoint.ip),
            port: Some(endpoint.port),
            message: None,
        }
    }

    /// `{status:"error", message}` with the message prefixed by its kind
    #[must_use]
    pub fn error(kind: ErrorKind, detail: impl AsRef<str>) -> Self {
        Self {
            status: Status::Error,
            ip: None,
            port: None,
            message: Some(format!("{}: {}", kind.prefix(), detail.as_ref())),
        }
    }

    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::NotFound(detail) => Self::error(ErrorKind::NotFound, detail),
            Error::StoreUnavailable(detail) => Self::error(ErrorKind::StoreUnavailable, detail),
            Error::MalformedRequest(detail) => Self::error(ErrorKind::MalformedRequest, detail),
            Error::Framing(detail) => Self::error(ErrorKind::Framing, detail),
            other => Self::error(ErrorKind::Internal, other.to_string()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Endpoint carried by a successful discover response
    #[must_use]
    pub fn endpoint(&self) -> Option<Endpoint> {
        match (&self.status, &self.ip, self.port) {
            (Status::Success, Some(ip), Some(port)) => Some(Endpoint::new(ip, port)),
            _ => None,
        }
    }

    /// Classification of an error response
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.status {
            Status::Success => None,
            Status::Error => Some(ErrorKind::classify(self.message.as_deref().unwrap_or_default())),
        }
    }
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(response)?)
}

pub fn decode_response(payload: &[u8]) -> Result<Response> {
    Ok(serde_json::from_slice(payload)?)
}

/// Failure classes carried in an error response's message prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    StoreUnavailable,
    MalformedRequest,
    Framing,
    Internal,
}

impl ErrorKind {
    const ALL: [Self; 5] = [
        Self::NotFound,
        Self::StoreUnavailable,
        Self::MalformedRequest,
        Self::Framing,
        Self::Internal,
    ];

    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::StoreUnavailable => "store unavailable",
            Self::MalformedRequest => "malformed request",
            Self::Framing => "framing error",
            Self::Internal => "internal error",
        }
    }

    /// Recover the kind from a response message. Unprefixed messages are
    /// `Internal`.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| {
                message
                    .strip_prefix(kind.prefix())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
            })
            .unwrap_or(Self::Internal)
    }
}

/// Read one length-prefixed frame.
///
/// A declared length above `max_len`, or a stream that ends before the
/// whole frame arrived, is an [`Error::Framing`].
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R, max_len: usize) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            Error::Framing("connection closed before a frame header was received".to_string())
        }
        _ => Error::Io(e),
    })?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_len {
        return Err(Error::Framing(format!(
            "frame of {len} bytes exceeds maximum of {max_len} bytes"
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::Framing(format!(
            "connection closed before the {len}-byte frame payload was received"
        )),
        _ => Error::Io(e),
    })?;

    Ok(payload)
}

/// Write one length-prefixed frame and flush it
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| Error::Framing(format!("payload of {} bytes is too large to frame", payload.len())))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
