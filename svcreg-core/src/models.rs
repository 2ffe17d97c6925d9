//! Registry data model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::{validate_host, validate_identity_field, validate_port, ValidationResult};

/// Composite key identifying a logical service instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub server_type: String,
    pub server_name: String,
}

impl ServerIdentity {
    #[must_use]
    pub fn new(server_type: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            server_type: server_type.into(),
            server_name: server_name.into(),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_identity_field("target_server_type", &self.server_type)?;
        validate_identity_field("target_server_name", &self.server_name)
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.server_type, self.server_name)
    }
}

/// Network endpoint advertised by a registered server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self { ip: ip.into(), port }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_host(&self.ip)?;
        validate_port(self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ip.contains(':') {
            write!(f, "[{}]:{}", self.ip, self.port)
        } else {
            write!(f, "{}:{}", self.ip, self.port)
        }
    }
}

/// One row of the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub server_type: String,
    pub server_name: String,
    pub ip: String,
    pub port: u16,
}

impl ServerRecord {
    #[must_use]
    pub fn new(identity: ServerIdentity, endpoint: Endpoint) -> Self {
        Self {
            server_type: identity.server_type,
            server_name: identity.server_name,
            ip: endpoint.ip,
            port: endpoint.port,
        }
    }

    #[must_use]
    pub fn identity(&self) -> ServerIdentity {
        ServerIdentity::new(&self.server_type, &self.server_name)
    }

    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.ip, self.port)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        self.identity().validate()?;
        self.endpoint().validate()
    }
}
