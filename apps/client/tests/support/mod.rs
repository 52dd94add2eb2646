#![allow(dead_code)]

pub mod tokens;
pub mod transport;

use std::sync::Arc;

use planner_client::session::{AuthSession, KeyValueStore, MemoryStore, SessionStore};
use planner_client::AuthenticatedClient;

pub use tokens::mint_token;
pub use transport::ScriptedTransport;

/// Session, client, and the pieces behind them, wired over memory storage.
pub struct Harness {
    pub storage: Arc<MemoryStore>,
    pub transport: Arc<ScriptedTransport>,
    pub session: Arc<AuthSession>,
    pub client: AuthenticatedClient,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStore::new()))
    }

    /// Build over pre-seeded storage and run the start-up restore.
    pub fn with_storage(storage: Arc<MemoryStore>) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let backend: Arc<dyn KeyValueStore> = storage.clone();
        let session = AuthSession::restored(SessionStore::new(backend), transport.clone());
        let client = AuthenticatedClient::new(session.clone(), transport.clone());
        Self {
            storage,
            transport,
            session,
            client,
        }
    }
}
