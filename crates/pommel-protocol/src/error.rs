use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The §7 error taxonomy, shared between the daemon (which maps each
/// variant to an HTTP status) and the CLI (which reads it back out of a
/// JSON error body to decide whether a retry makes sense).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ApiError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("method not allowed: {message}")]
    MethodNotAllowed { message: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("service unavailable: {message}")]
    Unavailable { message: String },
}

impl ApiError {
    /// The HTTP status code the daemon should answer with for this
    /// variant (§7: 400/404/405/409/500/503).
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::MethodNotAllowed { .. } => 405,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } => 500,
            Self::Unavailable { .. } => 503,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest { message }
            | Self::NotFound { message }
            | Self::MethodNotAllowed { message }
            | Self::Conflict { message }
            | Self::Internal { message }
            | Self::Unavailable { message } => message,
        }
    }

    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_taxonomy() {
        assert_eq!(ApiError::invalid_request("x").http_status(), 400);
        assert_eq!(ApiError::not_found("x").http_status(), 404);
        assert_eq!(ApiError::conflict("x").http_status(), 409);
        assert_eq!(ApiError::internal("x").http_status(), 500);
        assert_eq!(ApiError::unavailable("x").http_status(), 503);
    }

    #[test]
    fn serializes_with_a_discriminant_tag() {
        let err = ApiError::not_found("chunk missing");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "not_found");
        assert_eq!(json["message"], "chunk missing");
    }
}
