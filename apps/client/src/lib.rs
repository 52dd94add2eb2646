#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

//! Session and authenticated-request core of the planner client.
//!
//! [`AuthSession`] owns the login state and its durable copy;
//! [`AuthenticatedClient`] routes every backend call through it.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod session;
pub mod telemetry;

// Re-exports for public API
pub use auth::{Credential, Identity, UnverifiedClaims};
pub use config::{ClientConfig, LogFormat};
pub use error::{ConfigError, LoginFailure, RequestError, StorageError};
pub use http::{AuthenticatedClient, Method, ReqwestTransport, Transport};
pub use session::{
    AuthSession, FileStore, LoginOutcome, LogoutReason, MemoryStore, SessionEvent, SessionState,
    SessionStore,
};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    client_test_support::logging::init();
}
