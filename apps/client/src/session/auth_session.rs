//! Login / logout / restore state machine.
//!
//! All mutation of the session happens inside one `parking_lot` critical
//! section per transition, and the lock is never held across an `.await`.
//! Callers therefore see either the state before a transition or the state
//! after it, never a mix of the two.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::events::{LogoutReason, SessionEvent};
use super::store::{Session, SessionStore, StoredSession};
use crate::auth::{resolver, Credential, Identity, LoginResponse};
use crate::error::LoginFailure;
use crate::http::transport::{Method, OutboundRequest, Transport};
use crate::logging::pii::Redacted;
use crate::logging::security;

pub const LOGIN_PATH: &str = "/api/auth/login";

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::LoggedOut => "logged_out",
            SessionState::LoggingIn => "logging_in",
            SessionState::LoggedIn => "logged_in",
        };
        f.write_str(s)
    }
}

/// Result of [`AuthSession::login`]. Login never returns `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(Identity),
    Failed(LoginFailure),
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            LoginOutcome::Authenticated(identity) => Some(identity),
            LoginOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&LoginFailure> {
        match self {
            LoginOutcome::Authenticated(_) => None,
            LoginOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<Identity, LoginFailure> {
        match self {
            LoginOutcome::Authenticated(identity) => Ok(identity),
            LoginOutcome::Failed(failure) => Err(failure),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    session: Session,
}

impl Inner {
    /// State implied by the session alone, outside of an in-flight login.
    fn settled_state(&self) -> SessionState {
        if self.session.is_authenticated() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }
}

/// The single session context of a client process.
///
/// Construct once, wrap in an `Arc`, and hand clones to every collaborator
/// that needs the credential or identity.
pub struct AuthSession {
    inner: Mutex<Inner>,
    store: SessionStore,
    transport: Arc<dyn Transport>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthSession {
    /// Empty, `LoggedOut` session. Call [`AuthSession::restore`] to pick up
    /// a persisted one.
    pub fn new(store: SessionStore, transport: Arc<dyn Transport>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                state: SessionState::LoggedOut,
                session: Session::empty(),
            }),
            store,
            transport,
            events,
        }
    }

    /// Build and restore in one step, as done at process start.
    pub fn restored(store: SessionStore, transport: Arc<dyn Transport>) -> Arc<Self> {
        let session = Arc::new(Self::new(store, transport));
        session.restore();
        session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn credential(&self) -> Option<Credential> {
        self.inner.lock().session.credential().cloned()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.lock().session.identity().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().session.is_authenticated()
    }

    pub fn snapshot(&self) -> Session {
        self.inner.lock().session.clone()
    }

    /// Authenticate against the backend. Failures come back as
    /// [`LoginOutcome::Failed`] and leave the previous session untouched.
    pub async fn login(&self, email: &str, password: &str) -> LoginOutcome {
        {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::LoggingIn {
                return LoginOutcome::Failed(LoginFailure::InProgress);
            }
            inner.state = SessionState::LoggingIn;
        }
        let guard = LoginGuard { session: self };

        info!(email = %Redacted(email), "attempting login");
        let issued = self.request_identity(email, password).await;

        let outcome = match issued {
            Ok((credential, identity)) => self.commit_login(credential, identity),
            Err(failure) => LoginOutcome::Failed(failure),
        };

        drop(guard);
        if let LoginOutcome::Failed(failure) = &outcome {
            security::login_failed(failure.code(), Some(email));
            debug!(state = %self.state(), %failure, "login failed");
        }
        outcome
    }

    /// End the session from any state. Returns whether a live session ended.
    pub fn logout(&self) -> bool {
        self.end_session(LogoutReason::UserRequested)
    }

    /// Tear down after a 401, but only if the session still holds the
    /// credential the failing call was made with.
    pub(crate) fn revoke(&self, used: &Credential) -> bool {
        let mut inner = self.inner.lock();
        if inner.session.credential() != Some(used) {
            debug!("ignoring 401 for a credential no longer in use");
            return false;
        }
        let ended = self.end_session_locked(&mut inner, LogoutReason::Revoked);
        drop(inner);
        if ended {
            security::session_revoked();
        }
        ended
    }

    /// Re-derive the session from durable storage. No network I/O.
    pub fn restore(&self) -> SessionState {
        let mut inner = self.inner.lock();
        let was_authenticated = inner.session.is_authenticated();

        let restored = match self.store.load() {
            Ok(StoredSession::Authenticated(session)) => session,
            Ok(StoredSession::StrayCredential(credential)) => self.adopt_stray(credential),
            Ok(StoredSession::Empty) => Session::empty(),
            Err(e) => {
                warn!(error = %e, code = e.code(), "session storage unreadable, starting logged out");
                Session::empty()
            }
        };

        let identity_changed = inner.session.identity() != restored.identity();
        inner.session = restored;
        if inner.state != SessionState::LoggingIn {
            inner.state = inner.settled_state();
        }

        match inner.session.identity() {
            Some(identity) if identity_changed => {
                info!(user_id = %identity.id, "session restored");
                self.emit(SessionEvent::LoggedIn(identity.clone()));
            }
            None if was_authenticated => {
                self.emit(SessionEvent::LoggedOut {
                    reason: LogoutReason::Discarded,
                });
            }
            _ => {}
        }
        inner.state
    }

    async fn request_identity(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Credential, Identity), LoginFailure> {
        let request = OutboundRequest::new(Method::POST, LOGIN_PATH)
            .with_body(Some(json!({ "email": email, "password": password })));

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| LoginFailure::Network { detail: e.detail })?;

        if !response.is_success() {
            return Err(LoginFailure::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: LoginResponse = serde_json::from_str(&response.body)
            .map_err(|e| LoginFailure::InvalidResponse {
                detail: e.to_string(),
            })?;
        let credential = parsed.credential().ok_or(LoginFailure::MissingToken)?;
        let (identity, source) =
            resolver::resolve(&parsed, &credential).map_err(LoginFailure::Unresolvable)?;
        debug!(?source, user_id = %identity.id, "login response resolved");

        Ok((credential, identity))
    }

    fn commit_login(&self, credential: Credential, identity: Identity) -> LoginOutcome {
        let mut inner = self.inner.lock();
        if let Err(e) = self.store.save(&credential, &identity) {
            return LoginOutcome::Failed(LoginFailure::Storage {
                detail: e.to_string(),
            });
        }
        inner.session = Session::authenticated(credential, identity.clone());
        inner.state = SessionState::LoggedIn;
        info!(user_id = %identity.id, email = %Redacted(&identity.email), "logged in");
        self.emit(SessionEvent::LoggedIn(identity.clone()));
        LoginOutcome::Authenticated(identity)
    }

    fn adopt_stray(&self, credential: Credential) -> Session {
        match resolver::resolve_from_credential(&credential) {
            Ok(identity) => match self.store.save(&credential, &identity) {
                Ok(()) => {
                    debug!(user_id = %identity.id, "identity recovered from stored credential");
                    Session::authenticated(credential, identity)
                }
                Err(e) => {
                    warn!(error = %e, "could not persist recovered identity, discarding credential");
                    self.clear_store();
                    Session::empty()
                }
            },
            Err(failure) => {
                warn!(%failure, "discarding stored credential without a resolvable identity");
                self.clear_store();
                Session::empty()
            }
        }
    }

    fn end_session(&self, reason: LogoutReason) -> bool {
        let mut inner = self.inner.lock();
        self.end_session_locked(&mut inner, reason)
    }

    fn end_session_locked(&self, inner: &mut Inner, reason: LogoutReason) -> bool {
        let ended = inner.session.is_authenticated();
        inner.session = Session::empty();
        if inner.state != SessionState::LoggingIn {
            inner.state = SessionState::LoggedOut;
        }
        self.clear_store();

        if ended {
            info!(?reason, "logged out");
            self.emit(SessionEvent::LoggedOut { reason });
        }
        ended
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, code = e.code(), "failed to clear session storage");
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Settles the state when a login ends, including when its future is
/// dropped mid-flight.
struct LoginGuard<'a> {
    session: &'a AuthSession,
}

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.inner.lock();
        if inner.state == SessionState::LoggingIn {
            inner.state = inner.settled_state();
        }
    }
}
