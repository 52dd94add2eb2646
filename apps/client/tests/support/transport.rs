//! Scripted stand-in for the network.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use planner_client::http::{OutboundRequest, Transport, TransportError, TransportResponse};
use serde_json::Value;

#[derive(Debug, Clone)]
enum Reply {
    Respond(TransportResponse),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Scripted {
    reply: Reply,
    delay: Option<Duration>,
}

/// Replies are queued per path and consumed in order. A path with an empty
/// queue answers 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    seen: Mutex<Vec<OutboundRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) -> &Self {
        self.push(path, Reply::Respond(TransportResponse::new(status, body)), None)
    }

    pub fn respond_json(&self, path: &str, status: u16, body: Value) -> &Self {
        self.respond(path, status, body.to_string())
    }

    pub fn respond_after(
        &self,
        path: &str,
        delay: Duration,
        status: u16,
        body: impl Into<String>,
    ) -> &Self {
        self.push(
            path,
            Reply::Respond(TransportResponse::new(status, body)),
            Some(delay),
        )
    }

    pub fn fail(&self, path: &str, detail: &str) -> &Self {
        self.push(path, Reply::Fail(detail.to_string()), None)
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.seen.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<OutboundRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn push(&self, path: &str, reply: Reply, delay: Option<Duration>) -> &Self {
        self.routes
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Scripted { reply, delay });
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let next = {
            let mut routes = self.routes.lock();
            routes
                .get_mut(&request.path)
                .and_then(VecDeque::pop_front)
        };
        self.seen.lock().push(request);

        let Some(scripted) = next else {
            return Ok(TransportResponse::new(404, "no scripted reply"));
        };
        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }
        match scripted.reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(detail) => Err(TransportError::new(detail)),
        }
    }
}
