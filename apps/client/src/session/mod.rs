//! Session state, its durable storage, and transition events.

pub mod auth_session;
pub mod backend;
pub mod events;
pub mod store;

pub use auth_session::{AuthSession, LoginOutcome, SessionState, LOGIN_PATH};
pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use events::{LogoutReason, SessionEvent};
pub use store::{Session, SessionStore, StoredSession, CREDENTIAL_KEY, IDENTITY_KEY};
