//! Error types surfaced by the session and request layers.
//!
//! Decode and resolution errors live next to the code that produces them
//! (`auth::token_codec`, `auth::resolver`); everything that crosses the
//! session or HTTP boundary is defined here.

use thiserror::Error;

use crate::auth::ResolutionFailure;

/// Durable storage failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Stored identity is corrupted: {detail}")]
    Corruption { detail: String },
    #[error("Storage I/O error: {detail}")]
    Io { detail: String },
    #[error("Storage serialization error: {detail}")]
    Serialization { detail: String },
}

impl StorageError {
    pub fn corruption(detail: impl Into<String>) -> Self {
        Self::Corruption {
            detail: detail.into(),
        }
    }

    pub fn io(detail: impl Into<String>) -> Self {
        Self::Io {
            detail: detail.into(),
        }
    }

    pub fn serialization(detail: impl Into<String>) -> Self {
        Self::Serialization {
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Corruption { .. } => "STORAGE_CORRUPTION",
            StorageError::Io { .. } => "STORAGE_IO",
            StorageError::Serialization { .. } => "STORAGE_SERIALIZATION",
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::io(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::serialization(e.to_string())
    }
}

/// Outcome of a failed authenticated request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Authentication required")]
    AuthenticationRequired,
    #[error("Access forbidden")]
    AccessForbidden,
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Network error: {detail}")]
    Network { detail: String },
    #[error("Invalid response body: {detail}")]
    InvalidBody { detail: String },
}

impl RequestError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self::Network {
            detail: detail.into(),
        }
    }

    pub fn invalid_body(detail: impl Into<String>) -> Self {
        Self::InvalidBody {
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RequestError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            RequestError::AccessForbidden => "ACCESS_FORBIDDEN",
            RequestError::Http { .. } => "HTTP_ERROR",
            RequestError::Network { .. } => "NETWORK_ERROR",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
        }
    }

    /// HTTP status when the server answered, `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::AuthenticationRequired => Some(401),
            RequestError::AccessForbidden => Some(403),
            RequestError::Http { status, .. } => Some(*status),
            RequestError::Network { .. } | RequestError::InvalidBody { .. } => None,
        }
    }
}

/// Why a login attempt did not produce an authenticated session.
///
/// `Display` is the user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    #[error("Login failed: {status}")]
    Rejected { status: u16, body: String },
    #[error("Login failed: {detail}")]
    Network { detail: String },
    #[error("Login failed: unreadable response ({detail})")]
    InvalidResponse { detail: String },
    #[error("No token received from server")]
    MissingToken,
    #[error("Could not determine user information: {0}")]
    Unresolvable(ResolutionFailure),
    #[error("Could not persist session: {detail}")]
    Storage { detail: String },
    #[error("Another login is already in progress")]
    InProgress,
}

impl LoginFailure {
    pub fn code(&self) -> &'static str {
        match self {
            LoginFailure::Rejected { .. } => "LOGIN_REJECTED",
            LoginFailure::Network { .. } => "LOGIN_NETWORK",
            LoginFailure::InvalidResponse { .. } => "LOGIN_INVALID_RESPONSE",
            LoginFailure::MissingToken => "LOGIN_MISSING_TOKEN",
            LoginFailure::Unresolvable(_) => "LOGIN_UNRESOLVABLE",
            LoginFailure::Storage { .. } => "LOGIN_STORAGE",
            LoginFailure::InProgress => "LOGIN_IN_PROGRESS",
        }
    }
}

/// Configuration loading failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration for {key}: {detail}")]
    Invalid { key: &'static str, detail: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, detail: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            detail: detail.into(),
        }
    }
}
