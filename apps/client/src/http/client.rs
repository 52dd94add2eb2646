//! Authenticated request wrapper used by every backend collaborator.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::transport::{Method, OutboundRequest, Transport, TransportResponse};
use crate::error::RequestError;
use crate::session::AuthSession;

/// Attaches the session credential to outgoing calls and maps authorization
/// failures back onto the session.
///
/// Each call snapshots the credential when it starts. A 401 ends the session
/// for later calls but does not touch calls already in flight.
#[derive(Clone)]
pub struct AuthenticatedClient {
    session: Arc<AuthSession>,
    transport: Arc<dyn Transport>,
}

impl AuthenticatedClient {
    pub fn new(session: Arc<AuthSession>, transport: Arc<dyn Transport>) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, RequestError> {
        let credential = self.session.credential();
        let request = OutboundRequest::new(method.clone(), path)
            .with_bearer(credential.clone())
            .with_body(body);

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(%method, path, error = %e, "request failed without a response");
            RequestError::network(e.detail)
        })?;

        match response.status {
            401 => {
                warn!(%method, path, "401 received, ending session");
                if let Some(used) = &credential {
                    self.session.revoke(used);
                }
                Err(RequestError::AuthenticationRequired)
            }
            403 => {
                warn!(%method, path, "403 received");
                Err(RequestError::AccessForbidden)
            }
            _ if !response.is_success() => {
                warn!(%method, path, status = response.status, "request rejected");
                Err(RequestError::Http {
                    status: response.status,
                    body: response.body,
                })
            }
            _ => {
                debug!(%method, path, status = response.status, "request succeeded");
                parse_body(response)
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value, RequestError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, RequestError> {
        self.request(Method::POST, path, body).await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<Value, RequestError> {
        self.request(Method::PUT, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, RequestError> {
        self.request(Method::DELETE, path, None).await
    }

    /// GET and deserialize into a typed record.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        let value = self.get(path).await?;
        serde_json::from_value(value).map_err(|e| RequestError::invalid_body(e.to_string()))
    }

    /// POST a typed payload and deserialize the reply.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload =
            serde_json::to_value(body).map_err(|e| RequestError::invalid_body(e.to_string()))?;
        let value = self.post(path, Some(payload)).await?;
        serde_json::from_value(value).map_err(|e| RequestError::invalid_body(e.to_string()))
    }
}

/// Empty 2xx bodies (204, DELETE) are `Null`.
fn parse_body(response: TransportResponse) -> Result<Value, RequestError> {
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&response.body).map_err(|e| RequestError::invalid_body(e.to_string()))
}
