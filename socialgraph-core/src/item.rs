use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ErrorKind, Failure};
use crate::tag::{self, TypeTag};
use crate::value::Map;

/// One logical field whose value differs between two versions of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangedField(Cow<'static, str>);

impl ChangedField {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        ChangedField(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ChangedField {
    fn from(name: &'static str) -> Self {
        ChangedField(Cow::Borrowed(name))
    }
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pure per-type diff: old map, new map, changed logical fields.
pub type FieldDiff = fn(&Map, &Map) -> Vec<ChangedField>;

/// Reports every top-level key whose value differs, in key order.
///
/// Reserved tag keys are not reported.
pub fn diff_top_level(old: &Map, new: &Map) -> Vec<ChangedField> {
    let mut changed = Vec::new();
    for (key, value) in new {
        if is_reserved(key) {
            continue;
        }
        if old.get(key) != Some(value) {
            changed.push(ChangedField::new(key.clone()));
        }
    }
    for key in old.keys() {
        if !is_reserved(key) && !new.contains_key(key) {
            changed.push(ChangedField::new(key.clone()));
        }
    }
    changed
}

fn is_reserved(key: &str) -> bool {
    key == tag::TYPE_KEY || key == tag::IDENTIFIER_KEY
}

/// Strategy table mapping type tags to their field diff functions.
#[derive(Clone)]
pub struct ChangeTable {
    diffs: HashMap<TypeTag, FieldDiff>,
    fallback: FieldDiff,
}

impl ChangeTable {
    pub fn new() -> Self {
        Self {
            diffs: HashMap::new(),
            fallback: diff_top_level,
        }
    }

    /// Registers the diff for `tag`, replacing any previous registration.
    pub fn with(mut self, tag: TypeTag, diff: FieldDiff) -> Self {
        self.diffs.insert(tag, diff);
        self
    }

    pub fn diff(&self, tag: TypeTag, old: &Map, new: &Map) -> Vec<ChangedField> {
        let diff = self.diffs.get(&tag).copied().unwrap_or(self.fallback);
        diff(old, new)
    }
}

impl Default for ChangeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTable")
            .field("types", &self.diffs.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Identity of an adapter instance owning materialized items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterId(u64);

impl AdapterId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        AdapterId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Two-phase construction state shared by adapters and items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    AwaitingHost,
    Ready,
}

impl Lifecycle {
    /// Construction finished; ready only if the host already is.
    pub fn complete(self, host_ready: bool) -> Self {
        match self {
            Lifecycle::Created if host_ready => Lifecycle::Ready,
            Lifecycle::Created => Lifecycle::AwaitingHost,
            other => other,
        }
    }

    pub fn on_host_ready(self) -> Self {
        match self {
            Lifecycle::AwaitingHost => Lifecycle::Ready,
            other => other,
        }
    }

    pub fn is_ready(self) -> bool {
        self == Lifecycle::Ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Initializing,
    Idle,
    Busy,
    Error,
    /// Terminal. The item must be discarded.
    Invalid,
}

/// Notification queued by an item for its observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEvent {
    FieldChanged(ChangedField),
    StatusChanged(ItemStatus),
    ErrorChanged(Failure),
    Detached,
}

/// A materialized object: the observable view of one cache entry.
///
/// Identifiable items refuse updates that change their identifier; such an
/// update is a `DataUpdateError` that leaves the item `Invalid` and detached.
#[derive(Debug)]
pub struct Item {
    tag: TypeTag,
    identifier: String,
    identifiable: bool,
    data: Map,
    lifecycle: Lifecycle,
    status: ItemStatus,
    failure: Option<Failure>,
    owner: Option<AdapterId>,
    events: Vec<ItemEvent>,
}

impl Item {
    /// Creates an item that tracks identifier stability.
    pub fn identifiable(tag: TypeTag, data: Map, owner: AdapterId) -> Self {
        let identifier = tag::identifier_of(&data).unwrap_or_default().to_string();
        Self::build(tag, identifier, true, data, owner)
    }

    /// Creates an item without identity, such as a like edge.
    pub fn plain(tag: TypeTag, data: Map, owner: AdapterId) -> Self {
        Self::build(tag, String::new(), false, data, owner)
    }

    fn build(tag: TypeTag, identifier: String, identifiable: bool, data: Map, owner: AdapterId) -> Self {
        Item {
            tag,
            identifier,
            identifiable,
            data,
            lifecycle: Lifecycle::Created,
            status: ItemStatus::Initializing,
            failure: None,
            owner: Some(owner),
            events: Vec::new(),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_identifiable(&self) -> bool {
        self.identifiable
    }

    pub fn data(&self) -> &Map {
        &self.data
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn owner(&self) -> Option<AdapterId> {
        self.owner
    }

    /// Finishes construction. The item becomes `Idle` once its host is ready.
    pub fn complete(&mut self, host_ready: bool) {
        self.lifecycle = self.lifecycle.complete(host_ready);
        if self.lifecycle.is_ready() {
            self.set_status(ItemStatus::Idle);
        }
    }

    pub fn on_host_ready(&mut self) {
        self.lifecycle = self.lifecycle.on_host_ready();
        if self.lifecycle.is_ready() && self.status == ItemStatus::Initializing {
            self.set_status(ItemStatus::Idle);
        }
    }

    /// Replaces the item's data, queueing one notification per changed field.
    ///
    /// Fails without touching the data when the item is invalid or when an
    /// identifiable item would change its identifier.
    pub fn set_data(&mut self, data: Map, changed: &[ChangedField]) -> Result<(), Failure> {
        if self.status == ItemStatus::Invalid {
            return Err(Failure::new(ErrorKind::DataUpdateError, "item is invalid"));
        }

        if self.identifiable {
            let incoming = tag::identifier_of(&data).unwrap_or_default();
            if !self.identifier.is_empty() && !incoming.is_empty() && incoming != self.identifier {
                let failure = Failure::new(
                    ErrorKind::DataUpdateError,
                    format!("identifier changed from {} to {}", self.identifier, incoming),
                );
                self.invalidate(failure.clone());
                return Err(failure);
            }
            if self.identifier.is_empty() {
                self.identifier = incoming.to_string();
            }
        }

        self.data = data;
        self.events
            .extend(changed.iter().cloned().map(ItemEvent::FieldChanged));
        Ok(())
    }

    /// Enters `Busy` for a standalone reload.
    ///
    /// Refused with the current status while initializing, already busy or
    /// invalid.
    pub fn begin_load(&mut self) -> Result<(), ItemStatus> {
        match self.status {
            ItemStatus::Initializing | ItemStatus::Busy | ItemStatus::Invalid => Err(self.status),
            ItemStatus::Idle | ItemStatus::Error => {
                self.set_status(ItemStatus::Busy);
                Ok(())
            }
        }
    }

    /// Leaves `Busy`: back to `Idle`, or to `Error` carrying the failure.
    pub fn finish_load(&mut self, result: Result<(), Failure>) {
        if self.status != ItemStatus::Busy {
            return;
        }
        match result {
            Ok(()) => {
                self.failure = None;
                self.set_status(ItemStatus::Idle);
            }
            Err(failure) => {
                self.failure = Some(failure.clone());
                self.events.push(ItemEvent::ErrorChanged(failure));
                self.set_status(ItemStatus::Error);
            }
        }
    }

    /// Moves the item into its terminal state and detaches it from its owner.
    pub fn invalidate(&mut self, failure: Failure) {
        self.failure = Some(failure.clone());
        self.events.push(ItemEvent::ErrorChanged(failure));
        self.set_status(ItemStatus::Invalid);
        if self.owner.take().is_some() {
            self.events.push(ItemEvent::Detached);
        }
    }

    fn set_status(&mut self, status: ItemStatus) {
        if self.status != status {
            self.status = status;
            self.events.push(ItemEvent::StatusChanged(status));
        }
    }

    /// Drains queued notifications.
    pub fn take_events(&mut self) -> Vec<ItemEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Builds materialized items from tagged data.
pub trait ContentItemFactory {
    fn create(&self, tag: TypeTag, data: &Map, owner: AdapterId) -> Item;
}

/// Factory that makes every item identifiable.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentifiableFactory;

impl ContentItemFactory for IdentifiableFactory {
    fn create(&self, tag: TypeTag, data: &Map, owner: AdapterId) -> Item {
        Item::identifiable(tag, data.clone(), owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn data(pairs: &[(&str, &str)]) -> Map {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn top_level_diff_reports_each_changed_key_once() {
        let old = data(&[("id", "1"), ("name", "a"), ("gone", "x")]);
        let new = data(&[("id", "1"), ("name", "b"), ("added", "y")]);

        let changed = diff_top_level(&old, &new);
        let names: Vec<&str> = changed.iter().map(ChangedField::as_str).collect();
        assert_eq!(names, vec!["name", "added", "gone"]);
    }

    #[test]
    fn identical_maps_have_no_changes() {
        let old = data(&[("id", "1"), ("name", "a")]);
        assert!(diff_top_level(&old, &old.clone()).is_empty());
    }

    #[test]
    fn change_table_dispatches_per_type() {
        fn only_name(old: &Map, new: &Map) -> Vec<ChangedField> {
            if old.get("name") != new.get("name") {
                vec![ChangedField::from("displayName")]
            } else {
                vec![]
            }
        }

        let table = ChangeTable::new().with(TypeTag(1), only_name);
        let old = data(&[("name", "a"), ("x", "1")]);
        let new = data(&[("name", "b"), ("x", "2")]);

        assert_eq!(table.diff(TypeTag(1), &old, &new), vec![ChangedField::from("displayName")]);
        assert_eq!(table.diff(TypeTag(2), &old, &new).len(), 2);
    }

    #[test]
    fn lifecycle_waits_for_host() {
        let owner = AdapterId::next();
        let mut item = Item::plain(TypeTag(1), Map::new(), owner);
        item.complete(false);
        assert_eq!(item.lifecycle(), Lifecycle::AwaitingHost);
        assert_eq!(item.status(), ItemStatus::Initializing);

        item.on_host_ready();
        assert_eq!(item.lifecycle(), Lifecycle::Ready);
        assert_eq!(item.status(), ItemStatus::Idle);
    }

    #[test]
    fn identifier_change_invalidates() {
        let owner = AdapterId::next();
        let mut initial = Map::new();
        tag::stamp(&mut initial, TypeTag(1), "1");
        let mut item = Item::identifiable(TypeTag(1), initial, owner);
        item.complete(true);
        item.take_events();

        let mut other = Map::new();
        tag::stamp(&mut other, TypeTag(1), "2");
        let err = item.set_data(other, &[]).unwrap_err();

        assert_eq!(err.kind, ErrorKind::DataUpdateError);
        assert_eq!(item.status(), ItemStatus::Invalid);
        assert!(item.owner().is_none());
        assert!(item.take_events().contains(&ItemEvent::Detached));

        // Invalid is terminal.
        assert!(item.set_data(Map::new(), &[]).is_err());
    }

    #[test]
    fn set_data_queues_field_notifications() {
        let owner = AdapterId::next();
        let mut item = Item::plain(TypeTag(1), Map::new(), owner);
        item.set_data(data(&[("a", "1")]), &[ChangedField::from("a")])
            .unwrap();
        assert_eq!(
            item.take_events(),
            vec![ItemEvent::FieldChanged(ChangedField::from("a"))]
        );
        assert!(item.take_events().is_empty());
    }

    #[test]
    fn load_goes_busy_then_idle_or_error() {
        let owner = AdapterId::next();
        let mut item = Item::plain(TypeTag(1), Map::new(), owner);
        assert_eq!(item.begin_load(), Err(ItemStatus::Initializing));

        item.complete(true);
        item.take_events();
        item.begin_load().unwrap();
        assert_eq!(item.begin_load(), Err(ItemStatus::Busy));

        let failure = Failure::request("timeout");
        item.finish_load(Err(failure.clone()));
        assert_eq!(item.status(), ItemStatus::Error);
        assert_eq!(item.failure(), Some(&failure));

        item.begin_load().unwrap();
        item.finish_load(Ok(()));
        assert_eq!(item.status(), ItemStatus::Idle);
        assert!(item.failure().is_none());
        assert_eq!(
            item.take_events(),
            vec![
                ItemEvent::StatusChanged(ItemStatus::Busy),
                ItemEvent::ErrorChanged(failure),
                ItemEvent::StatusChanged(ItemStatus::Error),
                ItemEvent::StatusChanged(ItemStatus::Busy),
                ItemEvent::StatusChanged(ItemStatus::Idle),
            ]
        );

        item.invalidate(Failure::new(ErrorKind::DataUpdateError, "gone"));
        assert_eq!(item.begin_load(), Err(ItemStatus::Invalid));
    }
}
