use crate::auth::Identity;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// Explicit `logout()`.
    UserRequested,
    /// The backend answered 401 to a call made with the session's credential.
    Revoked,
    /// `restore()` found nothing usable in durable storage.
    Discarded,
}

/// Session transitions, broadcast to anything that renders login state.
///
/// Only real transitions are emitted: a second `logout()` on an empty
/// session produces nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(Identity),
    LoggedOut { reason: LogoutReason },
}
