//! Durable `(credential, identity)` persistence with corruption recovery.

use std::sync::Arc;

use tracing::{debug, warn};

use super::backend::KeyValueStore;
use crate::auth::{Credential, Identity};
use crate::error::StorageError;
use crate::logging::security;

/// Slot holding the raw bearer credential.
pub const CREDENTIAL_KEY: &str = "jwt_token";
/// Slot holding the identity as a JSON record.
pub const IDENTITY_KEY: &str = "user";

/// A session is either empty or fully authenticated; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<Credential>,
    identity: Option<Identity>,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn authenticated(credential: Credential, identity: Identity) -> Self {
        Self {
            credential: Some(credential),
            identity: Some(identity),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some() && self.identity.is_some()
    }
}

/// What the durable slots held at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSession {
    Empty,
    Authenticated(Session),
    /// A credential survived without its identity.
    StrayCredential(Credential),
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Persist both slots in one batch; on error the previous pair remains.
    pub fn save(&self, credential: &Credential, identity: &Identity) -> Result<(), StorageError> {
        if credential.is_blank() || !identity.is_complete() {
            return Err(StorageError::serialization(
                "refusing to persist an incomplete session",
            ));
        }
        let identity_json = serde_json::to_string(identity)?;
        self.backend.set_all(&[
            (CREDENTIAL_KEY, credential.as_str().to_string()),
            (IDENTITY_KEY, identity_json),
        ])?;
        debug!(user_id = %identity.id, "session persisted");
        Ok(())
    }

    /// Read both slots. Corrupted contents are cleared and reported as empty.
    pub fn load(&self) -> Result<StoredSession, StorageError> {
        match self.read_slots() {
            Ok(stored) => Ok(stored),
            Err(StorageError::Corruption { detail }) => {
                security::storage_corruption(&detail);
                self.clear()?;
                Ok(StoredSession::Empty)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove both slots. Clearing an empty store is a no-op.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove_all(&[CREDENTIAL_KEY, IDENTITY_KEY])
    }

    fn read_slots(&self) -> Result<StoredSession, StorageError> {
        let credential = self
            .backend
            .get(CREDENTIAL_KEY)?
            .map(Credential::new)
            .filter(|c| !c.is_blank());
        let identity_raw = self.backend.get(IDENTITY_KEY)?;

        let identity = match identity_raw {
            Some(raw) => {
                let identity: Identity = serde_json::from_str(&raw)
                    .map_err(|e| StorageError::corruption(format!("identity: {e}")))?;
                if !identity.is_complete() {
                    return Err(StorageError::corruption("identity missing id or email"));
                }
                Some(identity)
            }
            None => None,
        };

        match (credential, identity) {
            (Some(credential), Some(identity)) => Ok(StoredSession::Authenticated(
                Session::authenticated(credential, identity),
            )),
            (Some(credential), None) => Ok(StoredSession::StrayCredential(credential)),
            (None, Some(identity)) => {
                warn!(user_id = %identity.id, "dropping identity stored without a credential");
                self.clear()?;
                Ok(StoredSession::Empty)
            }
            (None, None) => Ok(StoredSession::Empty),
        }
    }
}
