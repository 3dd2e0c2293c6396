use thiserror::Error;

use crate::cache::EntryId;
use crate::item::ItemStatus;
use crate::tag::TypeTag;

/// Category of an asynchronous failure stored on a node or item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure, HTTP error payload, or malformed reply.
    RequestError,
    /// An identifier changed across an update.
    DataUpdateError,
    /// A state-machine invariant was violated.
    OtherError,
}

/// A captured failure: kind plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestError, message)
    }
}

/// Errors returned synchronously to the caller of an adapter operation.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("node {0} already has a request in flight")]
    Busy(String),

    #[error("no current node")]
    NoNode,

    #[error("adapter is not ready")]
    NotReady,

    #[error("connection {0} cannot be combined with other filters")]
    ExclusiveConnection(String),

    #[error("unsupported connection type {0}")]
    UnsupportedConnection(TypeTag),

    #[error("no cache entry {0}")]
    UnknownEntry(EntryId),

    #[error("entry {0} has no identifier to load")]
    NotIdentifiable(EntryId),

    #[error("item of entry {entry} cannot load while {status:?}")]
    ItemNotLoadable { entry: EntryId, status: ItemStatus },

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors raised by a backend while building requests or decoding replies.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Errors for cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache entry not found: {0}")]
    NotFound(EntryId),

    #[error("identifier changed from {expected} to {found}")]
    IdentifierChanged { expected: String, found: String },
}
