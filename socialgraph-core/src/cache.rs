use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{CacheError, ErrorKind, Failure};
use crate::item::{AdapterId, ChangeTable, ChangedField, ContentItemFactory, Item, ItemEvent, ItemStatus};
use crate::tag::{self, TypeTag};
use crate::value::{self, Map};

/// Handle to a cache entry. Stays valid until the entry's refcount drops to zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How incoming data is applied to an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// New keys overwrite, absent keys are preserved.
    Merge,
    /// The incoming map becomes the whole data.
    Replace,
}

/// Refcounted holder of one object's data and its materialized item.
#[derive(Debug)]
pub struct CacheEntry {
    identifier: String,
    data: Map,
    item: Option<Item>,
    refcount: usize,
}

impl CacheEntry {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn type_tag(&self) -> TypeTag {
        tag::tag_of(&self.data)
    }

    pub fn data(&self) -> &Map {
        &self.data
    }

    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn refcount(&self) -> usize {
        self.refcount
    }
}

/// Per-adapter object cache.
///
/// Responsibilities:
/// - Deduplication: a non-empty identifier maps to exactly one entry
/// - Reference counting: entries disappear when their last holder releases them
/// - Change notification: every data mutation goes through `update`, which
///   diffs old and new data with the registered per-type strategy
///
/// Whatever materialized items queue is collected here and drained with
/// `take_item_events`. An item an update invalidates is dropped from its
/// entry; the next `materialize` builds a fresh one.
pub struct Cache {
    entries: HashMap<EntryId, CacheEntry>,
    index: HashMap<String, EntryId>,
    changes: ChangeTable,
    item_events: Vec<(EntryId, ItemEvent)>,
    next_id: u64,
}

impl Cache {
    pub fn new() -> Self {
        Self::with_change_table(ChangeTable::default())
    }

    pub fn with_change_table(changes: ChangeTable) -> Self {
        Cache {
            entries: HashMap::new(),
            index: HashMap::new(),
            changes,
            item_events: Vec::new(),
            next_id: 1,
        }
    }

    /// Returns the shared entry for `identifier`, taking a reference to it.
    ///
    /// An existing entry gets `data` merged in and the changed fields are
    /// returned. Empty identifiers always produce a fresh uncached entry.
    pub fn get_or_create(&mut self, identifier: &str, data: Map) -> Result<(EntryId, Vec<ChangedField>), CacheError> {
        if identifier.is_empty() {
            return Ok((self.create_uncached(data), Vec::new()));
        }

        if let Some(&id) = self.index.get(identifier) {
            let changed = self.update(id, data, MergeMode::Merge)?;
            self.acquire(id);
            return Ok((id, changed));
        }

        let id = self.insert(identifier.to_string(), data);
        self.index.insert(identifier.to_string(), id);
        Ok((id, Vec::new()))
    }

    /// Creates a fresh, never-shared entry with refcount 1.
    pub fn create_uncached(&mut self, data: Map) -> EntryId {
        self.insert(String::new(), data)
    }

    fn insert(&mut self, identifier: String, data: Map) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            CacheEntry {
                identifier,
                data,
                item: None,
                refcount: 1,
            },
        );
        id
    }

    /// Takes an additional reference. Returns false for unknown entries.
    pub fn acquire(&mut self, id: EntryId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.refcount += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one reference; the entry and its item go away at zero.
    ///
    /// Returns true when the entry was removed.
    pub fn release(&mut self, id: EntryId) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };

        entry.refcount = entry.refcount.saturating_sub(1);
        if entry.refcount > 0 {
            return false;
        }

        if let Some(entry) = self.entries.remove(&id) {
            if !entry.identifier.is_empty() {
                self.index.remove(&entry.identifier);
            }
            debug!(entry = %id, identifier = %entry.identifier, "evicting cache entry");
        }
        true
    }

    /// Applies new data to an entry without changing its refcount.
    ///
    /// Returns the changed logical fields; an identical update returns none
    /// and notifies nobody.
    pub fn update(&mut self, id: EntryId, data: Map, mode: MergeMode) -> Result<Vec<ChangedField>, CacheError> {
        let entry = self.entries.get_mut(&id).ok_or(CacheError::NotFound(id))?;

        let incoming = tag::identifier_of(&data).unwrap_or_default();
        if !entry.identifier.is_empty() && !incoming.is_empty() && incoming != entry.identifier {
            let err = CacheError::IdentifierChanged {
                expected: entry.identifier.clone(),
                found: incoming.to_string(),
            };
            if let Some(item) = entry.item.as_mut() {
                item.invalidate(Failure::new(ErrorKind::DataUpdateError, err.to_string()));
            }
            collect_item_events(id, entry, &mut self.item_events);
            return Err(err);
        }

        let new = match mode {
            MergeMode::Merge => {
                let mut merged = entry.data.clone();
                value::merge(&mut merged, data);
                merged
            }
            MergeMode::Replace => data,
        };

        let tag = tag::tag_of(&new);
        let changed = self.changes.diff(tag, &entry.data, &new);
        if changed.is_empty() && tag == tag::tag_of(&entry.data) {
            return Ok(changed);
        }

        if let Some(item) = entry.item.as_mut() {
            if let Err(failure) = item.set_data(new.clone(), &changed) {
                debug!(entry = %id, error = %failure.message, "item refused update");
            }
        }
        collect_item_events(id, entry, &mut self.item_events);
        entry.data = new;
        Ok(changed)
    }

    /// Returns the entry's item, creating it through `factory` on first use.
    pub fn materialize(
        &mut self,
        id: EntryId,
        factory: &dyn ContentItemFactory,
        owner: AdapterId,
        host_ready: bool,
    ) -> Option<&Item> {
        let entry = self.entries.get_mut(&id)?;
        if entry.item.is_none() {
            let mut item = factory.create(tag::tag_of(&entry.data), &entry.data, owner);
            item.complete(host_ready);
            entry.item = Some(item);
        }
        collect_item_events(id, entry, &mut self.item_events);
        entry.item.as_ref()
    }

    /// Runs `f` on the entry's materialized item and collects what it queued.
    ///
    /// Returns `None` when the entry or its item does not exist.
    pub(crate) fn with_item<R>(&mut self, id: EntryId, f: impl FnOnce(&mut Item) -> R) -> Option<R> {
        let entry = self.entries.get_mut(&id)?;
        let result = f(entry.item.as_mut()?);
        collect_item_events(id, entry, &mut self.item_events);
        Some(result)
    }

    /// Moves every waiting item out of `Initializing`.
    pub(crate) fn on_host_ready(&mut self) {
        for (id, entry) in self.entries.iter_mut() {
            if let Some(item) = entry.item.as_mut() {
                item.on_host_ready();
            }
            collect_item_events(*id, entry, &mut self.item_events);
        }
    }

    /// Drains item notifications in the order they were queued.
    pub fn take_item_events(&mut self) -> Vec<(EntryId, ItemEvent)> {
        std::mem::take(&mut self.item_events)
    }

    pub fn get(&self, id: EntryId) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry> {
        self.entries.get_mut(&id)
    }

    /// Finds the shared entry for an identifier.
    pub fn lookup(&self, identifier: &str) -> Option<EntryId> {
        self.index.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// Number of live entries, shared and uncached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}

/// Moves an item's queued notifications into `events`. An invalid item is
/// dropped from its entry afterwards.
fn collect_item_events(id: EntryId, entry: &mut CacheEntry, events: &mut Vec<(EntryId, ItemEvent)>) {
    let Some(item) = entry.item.as_mut() else {
        return;
    };
    events.extend(item.take_events().into_iter().map(|event| (id, event)));
    if item.status() == ItemStatus::Invalid {
        debug!(entry = %id, identifier = %entry.identifier, "dropping invalidated item");
        entry.item = None;
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.entries.len())
            .field("shared", &self.index.len())
            .finish()
    }
}
