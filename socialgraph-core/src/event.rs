use crate::backend::Method;
use crate::cache::EntryId;
use crate::error::Failure;
use crate::item::{ChangedField, ItemEvent};
use crate::model::ListChange;
use crate::node::NodeId;
use crate::value::Value;

/// Observable status of an adapter, derived from its current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterStatus {
    Initializing,
    Idle,
    Busy,
    Error,
}

/// Identifies one request issued by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub(crate) u64);

/// Notification emitted by an adapter, drained with `Adapter::take_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    StatusChanged(AdapterStatus),
    ErrorChanged(Option<Failure>),
    /// The current node or its own entry changed.
    NodeChanged { node: Option<NodeId>, entry: Option<EntryId> },
    NodePositionChanged { has_previous_node: bool, has_next_node: bool },
    PagingChanged { has_previous: bool, has_next: bool },
    Model(ListChange),
    /// Logical fields of a shared entry changed.
    EntryChanged { entry: EntryId, fields: Vec<ChangedField> },
    /// A materialized item queued a notification.
    ItemChanged { entry: EntryId, event: ItemEvent },
    CurrentUserChanged(String),
    ArbitraryResponse {
        request: RequestId,
        method: Method,
        result: Result<Value, Failure>,
    },
}
