use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::cache::{Cache, EntryId};
use crate::error::Failure;
use crate::filter::{self, Filter};
use crate::paging::{ConnectionPaging, Direction};
use crate::tag::TypeTag;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u64);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Idle,
    LoadingNodeData,
    LoadingRelatedDataReplacing,
    LoadingRelatedDataAppending,
    LoadingRelatedDataPrepending,
    Error,
}

impl NodeStatus {
    pub fn is_loading(self) -> bool {
        !matches!(self, NodeStatus::Idle | NodeStatus::Error)
    }

    pub(crate) fn loading_related(direction: Direction) -> Self {
        match direction {
            Direction::Replace => NodeStatus::LoadingRelatedDataReplacing,
            Direction::Append => NodeStatus::LoadingRelatedDataAppending,
            Direction::Prepend => NodeStatus::LoadingRelatedDataPrepending,
        }
    }
}

/// Follow-up pass a node is currently waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMarker {
    TypeDetection,
    SecondaryFields,
}

/// Per-node state that is neither data nor status.
#[derive(Debug, Clone, Default)]
pub struct ExtraInfo {
    pub paging: IndexMap<TypeTag, ConnectionPaging>,
    pub marker: Option<PassMarker>,
}

impl ExtraInfo {
    pub fn has_previous(&self) -> bool {
        self.paging.values().any(|p| p.previous.has_more)
    }

    pub fn has_next(&self) -> bool {
        self.paging.values().any(|p| p.next.has_more)
    }
}

/// One browsed object: its own cache entry, its related list, its paging.
///
/// Every `EntryId` held here owns exactly one cache reference, returned by
/// `release`.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    identifier: String,
    filters: Vec<Arc<Filter>>,
    pub(crate) status: NodeStatus,
    entry: Option<EntryId>,
    related: Vec<EntryId>,
    pub(crate) extra: ExtraInfo,
    pub(crate) failure: Option<Failure>,
}

impl Node {
    pub(crate) fn new(id: NodeId, identifier: String, filters: Vec<Arc<Filter>>) -> Self {
        Node {
            id,
            identifier,
            filters,
            status: NodeStatus::Idle,
            entry: None,
            related: Vec::new(),
            extra: ExtraInfo::default(),
            failure: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn filters(&self) -> &[Arc<Filter>] {
        &self.filters
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn entry(&self) -> Option<EntryId> {
        self.entry
    }

    pub fn related(&self) -> &[EntryId] {
        &self.related
    }

    pub fn extra(&self) -> &ExtraInfo {
        &self.extra
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn has_previous(&self) -> bool {
        self.extra.has_previous()
    }

    pub fn has_next(&self) -> bool {
        self.extra.has_next()
    }

    /// True when this node targets the same identifier with the same filters.
    pub fn matches(&self, identifier: &str, filters: &[Arc<Filter>]) -> bool {
        self.identifier == identifier && filter::same_filters(&self.filters, filters)
    }

    /// Binds the node's own entry. `entry` must already carry a reference
    /// taken for this node.
    pub(crate) fn bind_entry(&mut self, cache: &mut Cache, entry: EntryId) {
        if let Some(old) = self.entry.replace(entry) {
            cache.release(old);
        }
    }

    /// Writes freshly acquired entries into the related list.
    pub(crate) fn commit_related(&mut self, cache: &mut Cache, entries: Vec<EntryId>, direction: Direction) {
        match direction {
            Direction::Replace => {
                let old = std::mem::replace(&mut self.related, entries);
                for id in old {
                    cache.release(id);
                }
            }
            Direction::Append => self.related.extend(entries),
            Direction::Prepend => {
                let mut merged = entries;
                merged.append(&mut self.related);
                self.related = merged;
            }
        }
    }

    /// Copies another node's entries, related list and paging, taking a
    /// reference for each entry.
    pub(crate) fn share_from(&mut self, cache: &mut Cache, entry: Option<EntryId>, related: &[EntryId], extra: &ExtraInfo) {
        if let Some(entry) = entry {
            cache.acquire(entry);
            self.bind_entry(cache, entry);
        }
        for &id in related {
            cache.acquire(id);
        }
        self.commit_related(cache, related.to_vec(), Direction::Replace);
        self.extra = ExtraInfo {
            paging: extra.paging.clone(),
            marker: None,
        };
    }

    /// Returns every reference this node holds, exactly once.
    pub(crate) fn release(&mut self, cache: &mut Cache) {
        if let Some(entry) = self.entry.take() {
            cache.release(entry);
        }
        for id in self.related.drain(..) {
            cache.release(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag;
    use crate::value::Map;

    fn entry(cache: &mut Cache, id: &str) -> EntryId {
        let mut data = Map::new();
        tag::stamp(&mut data, TypeTag(1), id);
        cache.get_or_create(id, data).unwrap().0
    }

    #[test]
    fn node_release_returns_every_reference() {
        let mut cache = Cache::new();
        let mut node = Node::new(NodeId(1), "42".into(), vec![]);

        let own = entry(&mut cache, "42");
        node.bind_entry(&mut cache, own);
        let related = vec![entry(&mut cache, "1"), entry(&mut cache, "2")];
        node.commit_related(&mut cache, related, Direction::Replace);
        assert_eq!(cache.len(), 3);

        node.release(&mut cache);
        assert!(cache.is_empty());
        assert!(node.related().is_empty());
        assert!(node.entry().is_none());
    }

    #[test]
    fn node_commit_directions() {
        let mut cache = Cache::new();
        let mut node = Node::new(NodeId(1), "42".into(), vec![]);

        let b = entry(&mut cache, "b");
        node.commit_related(&mut cache, vec![b], Direction::Replace);
        let c = entry(&mut cache, "c");
        node.commit_related(&mut cache, vec![c], Direction::Append);
        let a = entry(&mut cache, "a");
        node.commit_related(&mut cache, vec![a], Direction::Prepend);
        assert_eq!(node.related(), &[a, b, c]);

        let b2 = entry(&mut cache, "b");
        node.commit_related(&mut cache, vec![b2], Direction::Replace);
        assert_eq!(node.related(), &[b]);
        assert_eq!(cache.get(b).unwrap().refcount(), 1);
        assert!(cache.lookup("a").is_none());
        assert!(cache.lookup("c").is_none());
    }

    #[test]
    fn node_rebind_same_entry_keeps_one_reference() {
        let mut cache = Cache::new();
        let mut node = Node::new(NodeId(1), "42".into(), vec![]);

        let first = entry(&mut cache, "42");
        node.bind_entry(&mut cache, first);
        let again = entry(&mut cache, "42");
        node.bind_entry(&mut cache, again);

        assert_eq!(cache.get(first).unwrap().refcount(), 1);
    }

    #[test]
    fn node_matches_identifier_and_filters() {
        let comments = Filter::new(TypeTag(3)).shared();
        let node = Node::new(NodeId(1), "42".into(), vec![comments.clone()]);

        assert!(node.matches("42", &[comments]));
        assert!(!node.matches("42", &[]));
        assert!(!node.matches("43", node.filters()));
    }
}
