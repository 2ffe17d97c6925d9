//! Input validation for registry identities and endpoints
//!
//! Every request that reaches a store passes through these checks, so the
//! store can assume non-empty, bounded keys and an in-range port.

/// Maximum byte length of `server_type` and `server_name`
pub const IDENTITY_FIELD_MAX: usize = 255;
/// Maximum byte length of an endpoint host (IP literal or hostname)
pub const HOST_MAX: usize = 255;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {field}: {message}")]
    Field { field: &'static str, message: String },
}

impl ValidationError {
    fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Field {
            field,
            message: message.into(),
        }
    }
}

/// Validation result
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate one half of an identity key
pub fn validate_identity_field(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::field(field, "must not be empty"));
    }
    if value.len() > IDENTITY_FIELD_MAX {
        return Err(ValidationError::field(
            field,
            format!("must be at most {IDENTITY_FIELD_MAX} bytes"),
        ));
    }
    Ok(())
}

/// Validate an endpoint host. Hostnames are accepted as well as IP literals.
pub fn validate_host(host: &str) -> ValidationResult<()> {
    if host.trim().is_empty() {
        return Err(ValidationError::field("ip", "must not be empty"));
    }
    if host.len() > HOST_MAX {
        return Err(ValidationError::field(
            "ip",
            format!("must be at most {HOST_MAX} bytes"),
        ));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(ValidationError::field("ip", "must not contain whitespace"));
    }
    Ok(())
}

/// Validate an endpoint port (1-65535)
pub fn validate_port(port: u16) -> ValidationResult<()> {
    if port == 0 {
        return Err(ValidationError::field("port", "must be between 1 and 65535"));
    }
    Ok(())
}
