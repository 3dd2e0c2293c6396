use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use crate::backend::{Request, Response};

/// Asynchronous request/response channel to a social network.
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send(&self, request: &Request) -> impl Future<Output = Result<Response, Self::Error>> + Send;
}

/// Error type for the scripted transport.
#[derive(Debug, thiserror::Error)]
pub enum ScriptedTransportError {
    #[error("no scripted response for {0}")]
    NoRoute(String),
    #[error("scripted failure: {0}")]
    Failed(String),
}

/// An in-memory transport replaying canned replies.
///
/// Replies are queued per URL path and consumed in order. Every request
/// sent is recorded. Useful for testing and as a reference implementation.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Result<Response, String>>>>,
    sent: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the next request to `path`.
    pub fn respond(&self, path: &str, response: Response) -> &Self {
        lock(&self.routes)
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(response));
        self
    }

    /// Queues a 200 reply with a JSON body.
    pub fn respond_json(&self, path: &str, body: &str) -> &Self {
        self.respond(path, Response::ok(body.as_bytes().to_vec()))
    }

    /// Queues a transport-level failure.
    pub fn fail(&self, path: &str, message: &str) -> &Self {
        lock(&self.routes)
            .entry(path.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
        self
    }

    /// Requests sent so far, in order.
    pub fn sent(&self) -> Vec<Request> {
        lock(&self.sent).clone()
    }

    fn reply(&self, request: &Request) -> Result<Response, ScriptedTransportError> {
        lock(&self.sent).push(request.clone());
        let path = request.url.path();
        match lock(&self.routes).get_mut(path).and_then(VecDeque::pop_front) {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ScriptedTransportError::Failed(message)),
            None => Err(ScriptedTransportError::NoRoute(path.to_string())),
        }
    }
}

impl Transport for ScriptedTransport {
    type Error = ScriptedTransportError;

    fn send(&self, request: &Request) -> impl Future<Output = Result<Response, Self::Error>> + Send {
        std::future::ready(self.reply(request))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
