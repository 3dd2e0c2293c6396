//! Socialgraph core populates browsable views of social-network object graphs.
//!
//! Core concepts:
//! - **Cache**: Shared, reference-counted store of object data keyed by identifier
//! - **Node**: One browsed object, with its own entry and a list of related entries
//! - **NodeStack**: Navigation history of nodes
//! - **Adapter**: Drives nodes through their fetch phases and projects the current one
//!   into a **ListModel**
//! - **Backend**: Network-specific request building and reply interpretation
//! - **Transport**: Asynchronous request/response channel; **Session** pumps it
//!
//! The adapter performs no I/O. It queues requests and accepts replies,
//! so it can be driven by any transport or step by step in tests.
//!
//! # Example
//!
//! ```ignore
//! use socialgraph_core::{Adapter, Filter, ScriptedTransport, Session};
//!
//! let mut adapter = Adapter::ready(backend);
//! adapter.populate("42", vec![Filter::new(COMMENTS).shared()])?;
//!
//! let mut session = Session::new(adapter, ScriptedTransport::new());
//! session.run().await;
//! for change in session.adapter_mut().take_events() {
//!     println!("{change:?}");
//! }
//! ```

mod adapter;
mod alias;
mod backend;
mod cache;
mod decompose;
mod error;
mod event;
mod filter;
mod item;
mod model;
mod node;
mod paging;
mod session;
mod stack;
mod tag;
mod transport;
mod value;

pub use adapter::{Adapter, Outgoing, Row};
pub use alias::AliasTable;
pub use backend::{Backend, Connection, ConnectionQuery, Method, Request, Response};
pub use cache::{Cache, CacheEntry, EntryId, MergeMode};
pub use error::{AdapterError, BackendError, CacheError, ErrorKind, Failure};
pub use event::{AdapterEvent, AdapterStatus, RequestId};
pub use filter::{Filter, same_filters};
pub use item::{
    AdapterId, ChangeTable, ChangedField, ContentItemFactory, FieldDiff, IdentifiableFactory, Item, ItemEvent,
    ItemStatus, Lifecycle, diff_top_level,
};
pub use model::{FieldSorter, ListChange, ListModel, Sorter};
pub use node::{ExtraInfo, Node, NodeId, NodeStatus, PassMarker};
pub use paging::{ConnectionPaging, Cursor, Direction, PageReport, PageState, PagingPolicy};
pub use session::Session;
pub use stack::NodeStack;
pub use tag::{IDENTIFIER_KEY, TYPE_KEY, TypeTag, identifier_of, stamp, tag_of};
pub use transport::{ScriptedTransport, ScriptedTransportError, Transport};
pub use value::{Map, Value, merge};
