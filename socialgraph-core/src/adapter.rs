use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::alias::AliasTable;
use crate::backend::{Backend, Connection, ConnectionQuery, Method, Request, Response};
use crate::cache::{Cache, CacheEntry, EntryId, MergeMode};
use crate::decompose::decompose;
use crate::error::{AdapterError, BackendError, ErrorKind, Failure};
use crate::event::{AdapterEvent, AdapterStatus, RequestId};
use crate::filter::Filter;
use crate::item::{AdapterId, ChangedField, Item, Lifecycle};
use crate::model::{ListModel, Sorter};
use crate::node::{ExtraInfo, Node, NodeId, NodeStatus, PassMarker};
use crate::paging::Direction;
use crate::stack::NodeStack;
use crate::tag::{self, TypeTag};
use crate::value::{Map, Value};

/// A request waiting to be handed to a transport.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub id: RequestId,
    pub request: Request,
}

#[derive(Debug)]
enum Phase {
    NodeData {
        requested: String,
        batched_alias: Option<String>,
    },
    TypeDetection,
    SecondaryFields,
    RelatedData {
        direction: Direction,
        queries: Vec<ConnectionQuery>,
    },
    Arbitrary {
        method: Method,
    },
    ItemData {
        entry: EntryId,
        mode: MergeMode,
    },
}

impl Phase {
    fn expects(&self, node: &Node) -> bool {
        match self {
            Phase::NodeData { .. } => node.status == NodeStatus::LoadingNodeData,
            Phase::TypeDetection => node.extra.marker == Some(PassMarker::TypeDetection),
            Phase::SecondaryFields => node.extra.marker == Some(PassMarker::SecondaryFields),
            Phase::RelatedData { direction, .. } => node.status == NodeStatus::loading_related(*direction),
            Phase::Arbitrary { .. } | Phase::ItemData { .. } => false,
        }
    }
}

#[derive(Debug)]
struct InFlight {
    node: Option<NodeId>,
    path: String,
    phase: Phase,
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    status: AdapterStatus,
    failure: Option<Failure>,
    node: Option<NodeId>,
    entry: Option<EntryId>,
    has_previous_node: bool,
    has_next_node: bool,
    has_previous: bool,
    has_next: bool,
}

/// One row of the list model, as exposed to views.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    pub entry: EntryId,
    pub type_tag: TypeTag,
    pub identifier: &'a str,
    pub data: &'a Map,
    pub section: String,
}

/// The graph population engine.
///
/// Owns the cache, the node stack and the list model, and drives every
/// node through node-data, type-detection, secondary-field and
/// related-data fetches. It performs no I/O itself: requests are queued
/// for a transport (`next_request`) and replies are handed back through
/// `deliver`. Observers drain `take_events`.
pub struct Adapter<B: Backend> {
    id: AdapterId,
    backend: B,
    cache: Cache,
    stack: NodeStack,
    model: ListModel,
    lifecycle: Lifecycle,
    host_ready: bool,
    pending_populate: Option<(String, Vec<Arc<Filter>>)>,
    aliases: AliasTable,
    outbox: VecDeque<Outgoing>,
    in_flight: HashMap<RequestId, InFlight>,
    next_request: u64,
    events: Vec<AdapterEvent>,
    snapshot: Snapshot,
}

impl<B: Backend> Adapter<B> {
    /// Creates an adapter that still has to be completed and see its host ready.
    pub fn new(backend: B) -> Self {
        let cache = Cache::with_change_table(backend.change_table());
        Adapter {
            id: AdapterId::next(),
            backend,
            cache,
            stack: NodeStack::new(),
            model: ListModel::new(),
            lifecycle: Lifecycle::Created,
            host_ready: false,
            pending_populate: None,
            aliases: AliasTable::new(),
            outbox: VecDeque::new(),
            in_flight: HashMap::new(),
            next_request: 0,
            events: Vec::new(),
            snapshot: Snapshot {
                status: AdapterStatus::Initializing,
                failure: None,
                node: None,
                entry: None,
                has_previous_node: false,
                has_next_node: false,
                has_previous: false,
                has_next: false,
            },
        }
    }

    /// Creates an adapter that is complete and whose host is ready.
    pub fn ready(backend: B) -> Self {
        let mut adapter = Self::new(backend);
        adapter.on_host_ready();
        adapter.complete();
        adapter
    }

    /// Finishes construction. Requests start once the host is ready too.
    pub fn complete(&mut self) {
        self.lifecycle = self.lifecycle.complete(self.host_ready);
        self.start_if_ready();
    }

    /// The surrounding host signalled readiness.
    pub fn on_host_ready(&mut self) {
        self.host_ready = true;
        self.lifecycle = self.lifecycle.on_host_ready();
        self.cache.on_host_ready();
        self.start_if_ready();
    }

    fn start_if_ready(&mut self) {
        if self.lifecycle.is_ready() {
            if let Some((identifier, filters)) = self.pending_populate.take() {
                debug!(identifier = %identifier, "running deferred populate");
                if let Err(err) = self.populate_now(&identifier, filters) {
                    warn!(identifier = %identifier, error = %err, "deferred populate failed");
                }
            }
        }
        self.sync();
    }

    pub fn id(&self) -> AdapterId {
        self.id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn stack(&self) -> &NodeStack {
        &self.stack
    }

    pub fn model(&self) -> &ListModel {
        &self.model
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn status(&self) -> AdapterStatus {
        if !self.lifecycle.is_ready() {
            return AdapterStatus::Initializing;
        }
        match self.stack.current().map(Node::status) {
            Some(status) if status.is_loading() => AdapterStatus::Busy,
            Some(NodeStatus::Error) => AdapterStatus::Error,
            _ => AdapterStatus::Idle,
        }
    }

    /// Failure recorded on the current node.
    pub fn failure(&self) -> Option<&Failure> {
        self.stack.current().and_then(Node::failure)
    }

    pub fn current_node(&self) -> Option<&Node> {
        self.stack.current()
    }

    /// The current node's own entry.
    pub fn node_entry(&self) -> Option<&CacheEntry> {
        self.current_node()
            .and_then(Node::entry)
            .and_then(|id| self.cache.get(id))
    }

    /// The current node's materialized object.
    pub fn node_item(&self) -> Option<&Item> {
        self.node_entry().and_then(CacheEntry::item)
    }

    /// The current node's related entries, in order.
    pub fn related(&self) -> Vec<&CacheEntry> {
        self.current_node()
            .map(|n| n.related().iter().filter_map(|id| self.cache.get(*id)).collect())
            .unwrap_or_default()
    }

    pub fn has_previous(&self) -> bool {
        self.model.has_previous()
    }

    pub fn has_next(&self) -> bool {
        self.model.has_next()
    }

    pub fn has_previous_node(&self) -> bool {
        self.stack.has_previous_node()
    }

    pub fn has_next_node(&self) -> bool {
        self.stack.has_next_node()
    }

    /// Canonical identifier of the signed-in user, once learnt.
    pub fn current_user_identifier(&self) -> Option<&str> {
        self.backend.self_alias().and_then(|alias| self.aliases.get(alias))
    }

    /// Number of requests issued and not yet delivered.
    pub fn pending_requests(&self) -> usize {
        self.in_flight.len()
    }

    pub fn take_events(&mut self) -> Vec<AdapterEvent> {
        std::mem::take(&mut self.events)
    }

    /// Next request for the transport, in issue order.
    pub fn next_request(&mut self) -> Option<Outgoing> {
        self.outbox.pop_front()
    }

    pub fn take_requests(&mut self) -> Vec<Outgoing> {
        self.outbox.drain(..).collect()
    }

    /// Reads one model row.
    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        let entry = self.model.entry_at(index)?;
        let cached = self.cache.get(entry)?;
        Some(Row {
            entry,
            type_tag: cached.type_tag(),
            identifier: cached.identifier(),
            data: cached.data(),
            section: self.backend.section(cached.type_tag(), cached.data()),
        })
    }

    /// The materialized object of a model row, created on first access.
    pub fn row_item(&mut self, index: usize) -> Option<&Item> {
        let entry = self.model.entry_at(index)?;
        self.materialize(entry);
        self.sync();
        self.cache.get(entry).and_then(CacheEntry::item)
    }

    pub fn add_sorter(&mut self, sorter: Box<dyn Sorter>) {
        self.model.add_sorter(&self.cache, sorter);
        self.sync();
    }

    /// Drops every sorter; rows go back to the order they were delivered in.
    pub fn clear_sorters(&mut self) {
        let order = self
            .current_node()
            .map(|node| node.related().to_vec())
            .unwrap_or_default();
        self.model.clear_sorters(&order);
        self.sync();
    }

    /// Pushes a node for `identifier` and starts populating it.
    ///
    /// Before the adapter is ready the call is deferred; only the latest
    /// deferred populate runs.
    pub fn populate(&mut self, identifier: &str, filters: Vec<Arc<Filter>>) -> Result<(), AdapterError> {
        self.check_filters(&filters)?;

        if !self.lifecycle.is_ready() {
            debug!(identifier, "deferring populate until the adapter is ready");
            self.pending_populate = Some((identifier.to_string(), filters));
            return Ok(());
        }

        let result = self.populate_now(identifier, filters);
        self.sync();
        result
    }

    fn populate_now(&mut self, identifier: &str, filters: Vec<Arc<Filter>>) -> Result<(), AdapterError> {
        if let Some(current) = self.stack.current() {
            if current.matches(identifier, &filters) {
                if current.status().is_loading() {
                    return Err(AdapterError::Busy(identifier.to_string()));
                }
                debug!(identifier, "node is already current");
                return Ok(());
            }
        }

        let shared = self
            .stack
            .find_matching(identifier, &filters)
            .filter(|n| n.status() == NodeStatus::Idle && n.entry().is_some())
            .map(|n| (n.entry(), n.related().to_vec(), n.extra().clone()));
        if let Some((entry, related, _)) = &shared {
            // Hold the shared entries while the push drops forward history.
            for id in entry.iter().chain(related.iter()) {
                self.cache.acquire(*id);
            }
        }

        let (node_id, destroyed) = self
            .stack
            .push(&mut self.cache, identifier.to_string(), filters);
        self.detach(&destroyed);

        if let Some((entry, related, extra)) = shared {
            if let Some(node) = self.stack.get_mut(node_id) {
                node.share_from(&mut self.cache, entry, &related, &extra);
            }
            for id in entry.iter().chain(related.iter()) {
                self.cache.release(*id);
            }
            self.show_current();
            return Ok(());
        }

        let resolved = self.aliases.resolve(identifier).to_string();
        let cached = self
            .cache
            .lookup(&resolved)
            .filter(|id| self.cache.get(*id).is_some_and(|e| !e.type_tag().is_unknown()));
        if let Some(entry) = cached {
            self.cache.acquire(entry);
            if let Some(node) = self.stack.get_mut(node_id) {
                node.bind_entry(&mut self.cache, entry);
            }
            self.show_current();
            self.start_related(node_id, Direction::Replace);
            return Ok(());
        }

        self.show_current();
        self.start_node_data(node_id);
        Ok(())
    }

    /// Re-runs the whole population sequence for the current node.
    pub fn reload(&mut self) -> Result<(), AdapterError> {
        let node = self.idle_current()?;
        self.start_node_data(node);
        self.sync();
        Ok(())
    }

    /// Fetches the next page of every connection that has one.
    pub fn load_next(&mut self) -> Result<(), AdapterError> {
        self.load_more(Direction::Append)
    }

    /// Fetches the previous page of every connection that has one.
    pub fn load_previous(&mut self) -> Result<(), AdapterError> {
        self.load_more(Direction::Prepend)
    }

    fn load_more(&mut self, direction: Direction) -> Result<(), AdapterError> {
        let node_id = self.idle_current()?;
        let more = self.stack.get(node_id).is_some_and(|n| match direction {
            Direction::Append => n.has_next(),
            Direction::Prepend => n.has_previous(),
            Direction::Replace => true,
        });
        if !more {
            debug!(?direction, "nothing more to load");
            return Ok(());
        }
        self.start_related(node_id, direction);
        self.sync();
        Ok(())
    }

    fn idle_current(&self) -> Result<NodeId, AdapterError> {
        if !self.lifecycle.is_ready() {
            return Err(AdapterError::NotReady);
        }
        let node = self.stack.current().ok_or(AdapterError::NoNode)?;
        if node.status().is_loading() {
            return Err(AdapterError::Busy(node.identifier().to_string()));
        }
        Ok(node.id())
    }

    /// Moves to the next node in history.
    pub fn next_node(&mut self) -> bool {
        let moved = self.stack.next();
        if moved {
            self.show_current();
        }
        self.sync();
        moved
    }

    /// Moves to the previous node in history, keeping the one left behind.
    pub fn previous_node(&mut self) -> bool {
        let moved = self.stack.previous();
        if moved {
            self.show_current();
        }
        self.sync();
        moved
    }

    /// Destroys the top node, releasing its cache references.
    pub fn pop_node(&mut self) -> bool {
        let Some(popped) = self.stack.pop(&mut self.cache) else {
            return false;
        };
        self.detach(&[popped]);
        self.show_current();
        self.sync();
        true
    }

    /// Destroys every node.
    pub fn clear(&mut self) {
        let destroyed = self.stack.clear(&mut self.cache);
        self.detach(&destroyed);
        self.show_current();
        self.sync();
    }

    /// Issues a one-off request bound to no node.
    ///
    /// The reply arrives as `AdapterEvent::ArbitraryResponse`.
    pub fn arbitrary_request(
        &mut self,
        method: Method,
        identifier: &str,
        subpath: Option<&str>,
        fields: &[String],
        params: &[(String, String)],
    ) -> Result<RequestId, AdapterError> {
        if !self.lifecycle.is_ready() {
            return Err(AdapterError::NotReady);
        }
        let resolved = self.aliases.resolve(identifier).to_string();
        let mut request = self.backend.object_request(&resolved, subpath, fields, params)?;
        request.method = method;
        Ok(self.enqueue(None, request, Phase::Arbitrary { method }))
    }

    /// Refetches one cached object outside of any node.
    ///
    /// The entry's item is materialized if needed and goes `Busy` until the
    /// reply lands, then `Idle`, or `Error` with the failure. `mode` decides
    /// whether the reply is merged into the cached data or replaces it. A
    /// reply carrying another identifier invalidates the item.
    pub fn load_item(&mut self, entry: EntryId, mode: MergeMode) -> Result<RequestId, AdapterError> {
        if !self.lifecycle.is_ready() {
            return Err(AdapterError::NotReady);
        }
        let identifier = self
            .cache
            .get(entry)
            .ok_or(AdapterError::UnknownEntry(entry))?
            .identifier()
            .to_string();
        if identifier.is_empty() {
            return Err(AdapterError::NotIdentifiable(entry));
        }

        self.materialize(entry);
        let started = self
            .cache
            .with_item(entry, Item::begin_load)
            .ok_or(AdapterError::UnknownEntry(entry))?;
        if let Err(status) = started {
            self.sync();
            return Err(AdapterError::ItemNotLoadable { entry, status });
        }

        let request = match self.backend.object_request(&identifier, None, &[], &[]) {
            Ok(request) => request,
            Err(err) => {
                let failure = Failure::request(err.to_string());
                self.cache.with_item(entry, |item| item.finish_load(Err(failure)));
                self.sync();
                return Err(err.into());
            }
        };
        debug!(entry = %entry, identifier = %identifier, ?mode, "loading item");
        let id = self.enqueue(None, request, Phase::ItemData { entry, mode });
        self.sync();
        Ok(id)
    }

    /// Hands a transport reply back to the state machine.
    ///
    /// Replies for detached requests or destroyed nodes are discarded.
    pub fn deliver<E: fmt::Display>(&mut self, id: RequestId, result: Result<Response, E>) {
        let Some(flight) = self.in_flight.remove(&id) else {
            debug!(?id, "discarding reply for detached request");
            return;
        };

        match flight.node {
            None => match flight.phase {
                Phase::ItemData { entry, mode } => {
                    let reply = self.decode(result);
                    self.on_item_data(entry, mode, reply);
                }
                phase => {
                    let method = match phase {
                        Phase::Arbitrary { method } => method,
                        _ => Method::Get,
                    };
                    let result = self.decode(result);
                    self.events.push(AdapterEvent::ArbitraryResponse {
                        request: id,
                        method,
                        result,
                    });
                }
            },
            Some(node_id) => {
                let Some(node) = self.stack.get(node_id) else {
                    debug!(?node_id, "discarding reply for destroyed node");
                    return;
                };
                if !flight.phase.expects(node) {
                    let message = format!("reply for {:?} arrived with no matching operation in progress", flight.phase);
                    self.fail(node_id, Failure::new(ErrorKind::OtherError, message));
                } else {
                    let reply = self.decode(result).and_then(|value| {
                        self.backend
                            .normalize_reply(&flight.path, value)
                            .into_map()
                            .ok_or_else(|| Failure::request("reply is not an object"))
                    });
                    match reply {
                        Ok(reply) => self.advance(node_id, flight.phase, &flight.path, reply),
                        Err(failure) => self.fail(node_id, failure),
                    }
                }
            }
        }
        self.sync();
    }

    fn decode<E: fmt::Display>(&self, result: Result<Response, E>) -> Result<Value, Failure> {
        let response = result.map_err(|e| Failure::request(e.to_string()))?;
        let value = match self.backend.parse_response(&response.body) {
            Ok(value) => value,
            Err(_) if !response.is_success() => {
                return Err(Failure::request(format!("HTTP {}", response.status)));
            }
            Err(err) => return Err(Failure::request(err.to_string())),
        };
        if let Some(message) = self.backend.response_error(&value) {
            return Err(Failure::request(message));
        }
        if !response.is_success() {
            return Err(Failure::request(format!("HTTP {}", response.status)));
        }
        Ok(value)
    }

    fn advance(&mut self, node_id: NodeId, phase: Phase, path: &str, reply: Map) {
        match phase {
            Phase::NodeData {
                requested,
                batched_alias,
            } => self.on_node_data(node_id, &requested, batched_alias, reply),
            Phase::TypeDetection => self.on_type_detection(node_id, reply),
            Phase::SecondaryFields => self.on_secondary_fields(node_id, reply),
            Phase::RelatedData { direction, queries } => {
                self.on_related_data(node_id, direction, &queries, path, reply)
            }
            Phase::Arbitrary { .. } | Phase::ItemData { .. } => {
                self.fail(node_id, Failure::new(ErrorKind::OtherError, "standalone reply bound to a node"))
            }
        }
    }

    fn on_item_data(&mut self, entry: EntryId, mode: MergeMode, reply: Result<Value, Failure>) {
        let Some(cached) = self.cache.get(entry) else {
            debug!(entry = %entry, "discarding item reply for evicted entry");
            return;
        };
        let tag = cached.type_tag();
        let fallback = cached.identifier().to_string();

        let outcome = reply
            .and_then(|value| {
                value
                    .into_map()
                    .ok_or_else(|| Failure::request("reply is not an object"))
            })
            .and_then(|mut data| {
                let identifier = self.backend.identifier_of(&data).unwrap_or(fallback);
                tag::stamp(&mut data, tag, &identifier);
                self.cache
                    .update(entry, data, mode)
                    .map_err(|err| Failure::new(ErrorKind::DataUpdateError, err.to_string()))
            });

        match outcome {
            Ok(changed) => {
                self.cache.with_item(entry, |item| item.finish_load(Ok(())));
                self.notify_changed(entry, changed);
            }
            Err(failure) => {
                warn!(entry = %entry, kind = ?failure.kind, message = %failure.message, "item load failed");
                self.cache.with_item(entry, |item| item.finish_load(Err(failure)));
            }
        }
    }

    fn start_node_data(&mut self, node_id: NodeId) {
        let Some(node) = self.stack.get(node_id) else {
            return;
        };
        let identifier = node.identifier().to_string();
        let requested = self.aliases.resolve(&identifier).to_string();
        let batched_alias = self
            .backend
            .self_alias()
            .filter(|_| self.backend.batches_self_alias())
            .filter(|alias| self.aliases.get(alias).is_none() && *alias != identifier)
            .map(str::to_string);

        let request = match &batched_alias {
            Some(alias) => self.backend.batch_request(&[alias.as_str(), requested.as_str()]),
            None => self.backend.object_request(&requested, None, &[], &[]),
        };

        self.set_status(node_id, NodeStatus::LoadingNodeData);
        self.issue(
            node_id,
            request,
            Phase::NodeData {
                requested,
                batched_alias,
            },
        );
    }

    fn on_node_data(&mut self, node_id: NodeId, requested: &str, batched_alias: Option<String>, mut data: Map) {
        if let Some(alias) = batched_alias {
            let own = data
                .get(&alias)
                .and_then(Value::as_map)
                .and_then(|m| self.backend.identifier_of(m));
            if let Some(own) = own {
                self.record_alias(&alias, &own);
            }
            data = match data.swap_remove(requested).and_then(Value::into_map) {
                Some(object) => object,
                None => {
                    let message = format!("batched reply has no object for {requested}");
                    return self.fail(node_id, Failure::request(message));
                }
            };
        }

        let Some(canonical) = self.backend.identifier_of(&data) else {
            return self.fail(node_id, Failure::request("object has no identifier"));
        };
        if self.backend.self_alias() == Some(requested) {
            self.record_alias(requested, &canonical);
        }

        let detected = self.backend.detect_type(&data).unwrap_or(TypeTag::UNKNOWN);
        tag::stamp(&mut data, detected, &canonical);
        let entry = match self.cache.get_or_create(&canonical, data) {
            Ok((entry, changed)) => {
                self.notify_changed(entry, changed);
                entry
            }
            Err(err) => {
                return self.fail(node_id, Failure::new(ErrorKind::DataUpdateError, err.to_string()));
            }
        };

        if let Some(node) = self.stack.get_mut(node_id) {
            node.bind_entry(&mut self.cache, entry);
        }
        if self.stack.is_current(node_id) {
            self.materialize(entry);
        }

        let resolved = self.cache.get(entry).map_or(TypeTag::UNKNOWN, CacheEntry::type_tag);
        if resolved.is_unknown() {
            self.start_type_detection(node_id, &canonical);
        } else {
            self.after_resolve(node_id);
        }
    }

    fn start_type_detection(&mut self, node_id: NodeId, identifier: &str) {
        let (fields, params) = self.backend.type_detection_query();
        let request = self.backend.object_request(identifier, None, &fields, &params);
        if let Some(node) = self.stack.get_mut(node_id) {
            node.extra.marker = Some(PassMarker::TypeDetection);
        }
        self.issue(node_id, request, Phase::TypeDetection);
    }

    fn on_type_detection(&mut self, node_id: NodeId, reply: Map) {
        self.set_marker(node_id, None);
        let Some(entry) = self.stack.get(node_id).and_then(Node::entry) else {
            return self.fail(node_id, Failure::new(ErrorKind::OtherError, "type detection without a node entry"));
        };

        match self.backend.detect_type(&reply) {
            Some(detected) => {
                let mut update = Map::new();
                update.insert(tag::TYPE_KEY.to_string(), Value::Int(i64::from(detected.0)));
                self.apply_update(node_id, entry, update);
            }
            None => warn!(?node_id, "type detection reply carries no type"),
        }
        if self.stack.get(node_id).is_some_and(|n| n.status == NodeStatus::Error) {
            return;
        }
        self.after_resolve(node_id);
    }

    /// Continues after the node's type is known: secondary fields first, then
    /// related data.
    fn after_resolve(&mut self, node_id: NodeId) {
        let Some(entry) = self.stack.get(node_id).and_then(Node::entry).and_then(|id| self.cache.get(id)) else {
            return self.fail(node_id, Failure::new(ErrorKind::OtherError, "node has no entry after resolve"));
        };
        let fields = self.backend.secondary_fields(entry.type_tag());
        if fields.is_empty() {
            return self.start_related(node_id, Direction::Replace);
        }

        let identifier = entry.identifier().to_string();
        let request = self.backend.object_request(&identifier, None, &fields, &[]);
        self.set_marker(node_id, Some(PassMarker::SecondaryFields));
        self.issue(node_id, request, Phase::SecondaryFields);
    }

    fn on_secondary_fields(&mut self, node_id: NodeId, mut reply: Map) {
        self.set_marker(node_id, None);
        let Some(entry) = self.stack.get(node_id).and_then(Node::entry) else {
            return self.fail(node_id, Failure::new(ErrorKind::OtherError, "secondary fields without a node entry"));
        };

        if let Some(identifier) = self.backend.identifier_of(&reply) {
            tag::stamp(&mut reply, TypeTag::UNKNOWN, &identifier);
        }
        self.apply_update(node_id, entry, reply);
        if self.stack.get(node_id).is_some_and(|n| n.status == NodeStatus::Error) {
            return;
        }
        self.start_related(node_id, Direction::Replace);
    }

    fn start_related(&mut self, node_id: NodeId, direction: Direction) {
        let Some(node) = self.stack.get(node_id) else {
            return;
        };

        if node.filters().is_empty() {
            if let Some(node) = self.stack.get_mut(node_id) {
                node.commit_related(&mut self.cache, Vec::new(), Direction::Replace);
                node.extra = ExtraInfo::default();
            }
            self.set_status(node_id, NodeStatus::Idle);
            self.project(node_id, Direction::Replace, Vec::new());
            return;
        }

        let queries = self.build_queries(node, direction);
        let identifier = node
            .entry()
            .and_then(|id| self.cache.get(id))
            .map(|e| e.identifier().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.aliases.resolve(node.identifier()).to_string());

        let request = self.backend.related_request(&identifier, &queries);
        self.set_status(node_id, NodeStatus::loading_related(direction));
        self.issue(node_id, request, Phase::RelatedData { direction, queries });
    }

    /// One query per distinct connection. Paging only asks connections that
    /// still have more in that direction.
    fn build_queries(&self, node: &Node, direction: Direction) -> Vec<ConnectionQuery> {
        let mut queries: Vec<ConnectionQuery> = Vec::new();
        for filter in node.filters() {
            if queries.iter().any(|q| q.connection.tag == filter.connection()) {
                debug!(connection = %filter.connection(), "ignoring duplicate filter");
                continue;
            }
            let Some(connection) = self.backend.connection(filter.connection()) else {
                continue;
            };

            let paging = node.extra().paging.get(&connection.tag);
            let cursor = match direction {
                Direction::Replace => Default::default(),
                Direction::Append => match paging {
                    Some(p) if p.next.has_more => p.next.cursor.clone(),
                    _ => continue,
                },
                Direction::Prepend => match paging {
                    Some(p) if p.previous.has_more => p.previous.cursor.clone(),
                    _ => continue,
                },
            };

            queries.push(ConnectionQuery {
                connection,
                limit: filter.limit(),
                fields: filter.fields().to_vec(),
                cursor,
            });
        }
        queries
    }

    fn on_related_data(&mut self, node_id: NodeId, direction: Direction, queries: &[ConnectionQuery], path: &str, reply: Map) {
        let decomposed = decompose(&self.backend, path, &reply, queries, direction);

        let Some(node) = self.stack.get_mut(node_id) else {
            return;
        };
        if direction == Direction::Replace {
            node.extra.paging.clear();
        }

        let mut acquired = Vec::new();
        let mut changed = Vec::new();
        for (batch, query) in decomposed.batches.into_iter().zip(queries) {
            node.extra.paging.entry(batch.tag).or_default().apply(
                batch.report.as_ref(),
                direction,
                batch.items.len(),
                query.connection.policy,
            );
            for (identifier, data) in batch.items {
                match self.cache.get_or_create(&identifier, data) {
                    Ok((entry, fields)) => {
                        acquired.push(entry);
                        changed.push((entry, fields));
                    }
                    Err(err) => warn!(identifier = %identifier, error = %err, "skipping related item"),
                }
            }
        }
        node.commit_related(&mut self.cache, acquired.clone(), direction);
        let own = node.entry();

        for (entry, fields) in changed {
            self.notify_changed(entry, fields);
        }
        if let (Some(own), false) = (own, decomposed.node_update.is_empty()) {
            self.apply_update(node_id, own, decomposed.node_update);
        }
        if self.stack.get(node_id).is_some_and(|n| n.status == NodeStatus::Error) {
            return;
        }

        self.set_status(node_id, NodeStatus::Idle);
        self.project(node_id, direction, acquired);
    }

    /// Mirrors a committed related-data change into the list model when the
    /// node is current.
    fn project(&mut self, node_id: NodeId, direction: Direction, added: Vec<EntryId>) {
        if !self.stack.is_current(node_id) {
            return;
        }
        let Some(node) = self.stack.get(node_id) else {
            return;
        };
        match direction {
            Direction::Replace => self.model.set_data(&self.cache, node.related().to_vec()),
            Direction::Append => self.model.append_data(&self.cache, added),
            Direction::Prepend => self.model.prepend_data(&self.cache, added),
        }
        self.model.set_paging(node.has_previous(), node.has_next());
    }

    /// Re-projects the current node after navigation.
    fn show_current(&mut self) {
        match self.stack.current() {
            Some(node) => {
                let entry = node.entry();
                self.model.set_data(&self.cache, node.related().to_vec());
                self.model.set_paging(node.has_previous(), node.has_next());
                if let Some(entry) = entry {
                    self.materialize(entry);
                }
            }
            None => {
                self.model.clear();
                self.model.set_paging(false, false);
            }
        }
    }

    fn materialize(&mut self, entry: EntryId) {
        let ready = self.lifecycle.is_ready();
        self.cache
            .materialize(entry, self.backend.item_factory(), self.id, ready);
    }

    fn apply_update(&mut self, node_id: NodeId, entry: EntryId, update: Map) {
        match self.cache.update(entry, update, MergeMode::Merge) {
            Ok(changed) => self.notify_changed(entry, changed),
            Err(err) => self.fail(node_id, Failure::new(ErrorKind::DataUpdateError, err.to_string())),
        }
    }

    fn notify_changed(&mut self, entry: EntryId, fields: Vec<ChangedField>) {
        if fields.is_empty() {
            return;
        }
        let rows: Vec<usize> = self.model.rows_of(entry).collect();
        for row in rows {
            self.model.notify_row_changed(row);
        }
        self.events.push(AdapterEvent::EntryChanged { entry, fields });
    }

    fn record_alias(&mut self, alias: &str, canonical: &str) {
        if self.aliases.insert(alias, canonical) {
            debug!(alias, canonical, "resolved identifier alias");
            if self.backend.self_alias() == Some(alias) {
                self.events
                    .push(AdapterEvent::CurrentUserChanged(canonical.to_string()));
            }
        }
    }

    fn check_filters(&self, filters: &[Arc<Filter>]) -> Result<(), AdapterError> {
        let mut connections = Vec::new();
        for filter in filters {
            let connection = self
                .backend
                .connection(filter.connection())
                .ok_or(AdapterError::UnsupportedConnection(filter.connection()))?;
            if !connections.iter().any(|c: &Connection| c.tag == connection.tag) {
                connections.push(connection);
            }
        }
        if connections.len() > 1 {
            if let Some(exclusive) = connections.iter().find(|c| c.exclusive) {
                warn!(connection = %exclusive.name, "exclusive connection combined with other filters");
                return Err(AdapterError::ExclusiveConnection(exclusive.name.clone()));
            }
        }
        Ok(())
    }

    fn issue(&mut self, node_id: NodeId, request: Result<Request, BackendError>, phase: Phase) {
        match request {
            Ok(request) => {
                self.enqueue(Some(node_id), request, phase);
            }
            Err(err) => self.fail(node_id, Failure::request(err.to_string())),
        }
    }

    fn enqueue(&mut self, node: Option<NodeId>, request: Request, phase: Phase) -> RequestId {
        self.next_request += 1;
        let id = RequestId(self.next_request);
        self.in_flight.insert(
            id,
            InFlight {
                node,
                path: request.url.path().to_string(),
                phase,
            },
        );
        self.outbox.push_back(Outgoing { id, request });
        id
    }

    /// Disconnects every request of destroyed nodes.
    fn detach(&mut self, destroyed: &[NodeId]) {
        if destroyed.is_empty() {
            return;
        }
        self.in_flight
            .retain(|_, f| f.node.is_none_or(|n| !destroyed.contains(&n)));
        let in_flight = &self.in_flight;
        self.outbox.retain(|o| in_flight.contains_key(&o.id));
    }

    fn set_status(&mut self, node_id: NodeId, status: NodeStatus) {
        if let Some(node) = self.stack.get_mut(node_id) {
            node.status = status;
            if status.is_loading() {
                node.failure = None;
            }
        }
    }

    fn set_marker(&mut self, node_id: NodeId, marker: Option<PassMarker>) {
        if let Some(node) = self.stack.get_mut(node_id) {
            node.extra.marker = marker;
        }
    }

    fn fail(&mut self, node_id: NodeId, failure: Failure) {
        warn!(?node_id, kind = ?failure.kind, message = %failure.message, "node operation failed");
        if let Some(node) = self.stack.get_mut(node_id) {
            node.status = NodeStatus::Error;
            node.extra.marker = None;
            node.failure = Some(failure);
        }
    }

    fn observe(&self) -> Snapshot {
        let current = self.stack.current();
        Snapshot {
            status: self.status(),
            failure: self.failure().cloned(),
            node: current.map(Node::id),
            entry: current.and_then(Node::entry),
            has_previous_node: self.stack.has_previous_node(),
            has_next_node: self.stack.has_next_node(),
            has_previous: self.model.has_previous(),
            has_next: self.model.has_next(),
        }
    }

    /// Turns state differences since the last call into events.
    fn sync(&mut self) {
        for change in self.model.take_changes() {
            self.events.push(AdapterEvent::Model(change));
        }
        for (entry, event) in self.cache.take_item_events() {
            self.events.push(AdapterEvent::ItemChanged { entry, event });
        }

        let now = self.observe();
        let before = std::mem::replace(&mut self.snapshot, now.clone());
        if before.status != now.status {
            self.events.push(AdapterEvent::StatusChanged(now.status));
        }
        if before.failure != now.failure {
            self.events.push(AdapterEvent::ErrorChanged(now.failure.clone()));
        }
        if (before.node, before.entry) != (now.node, now.entry) {
            self.events.push(AdapterEvent::NodeChanged {
                node: now.node,
                entry: now.entry,
            });
        }
        if (before.has_previous_node, before.has_next_node) != (now.has_previous_node, now.has_next_node) {
            self.events.push(AdapterEvent::NodePositionChanged {
                has_previous_node: now.has_previous_node,
                has_next_node: now.has_next_node,
            });
        }
        if (before.has_previous, before.has_next) != (now.has_previous, now.has_next) {
            self.events.push(AdapterEvent::PagingChanged {
                has_previous: now.has_previous,
                has_next: now.has_next,
            });
        }
    }
}

impl<B: Backend> fmt::Debug for Adapter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("nodes", &self.stack.len())
            .field("cache", &self.cache)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
