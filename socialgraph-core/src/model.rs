use std::cmp::Ordering;

use crate::cache::{Cache, EntryId};
use crate::value::{Map, Value};

/// Structural or data change emitted by the list model.
///
/// Ranges are inclusive row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Inserted { first: usize, last: usize },
    Removed { first: usize, last: usize },
    /// Every row went away at once.
    Cleared,
    DataChanged { first: usize, last: usize },
}

/// Comparator over two rows' field maps.
pub trait Sorter {
    fn compare(&self, a: &Map, b: &Map) -> Ordering;
}

/// Sorts on one field; numbers compare numerically, everything else as text.
#[derive(Debug, Clone)]
pub struct FieldSorter {
    field: String,
    descending: bool,
}

impl FieldSorter {
    pub fn ascending(field: impl Into<String>) -> Self {
        FieldSorter {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        FieldSorter {
            field: field.into(),
            descending: true,
        }
    }
}

impl Sorter for FieldSorter {
    fn compare(&self, a: &Map, b: &Map) -> Ordering {
        let ordering = compare_values(a.get(&self.field), b.get(&self.field));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => {
                let x = a.to_plain_string().unwrap_or_default();
                let y = b.to_plain_string().unwrap_or_default();
                x.to_lowercase().cmp(&y.to_lowercase())
            }
        },
    }
}

/// Observable ordered projection of the current node's related entries.
///
/// Rows are views: they hold no cache references of their own.
#[derive(Default)]
pub struct ListModel {
    rows: Vec<EntryId>,
    sorters: Vec<Box<dyn Sorter>>,
    changes: Vec<ListChange>,
    has_previous: bool,
    has_next: bool,
}

impl ListModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[EntryId] {
        &self.rows
    }

    pub fn entry_at(&self, row: usize) -> Option<EntryId> {
        self.rows.get(row).copied()
    }

    pub fn has_previous(&self) -> bool {
        self.has_previous
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Replaces every row. An empty list clears the model.
    pub fn set_data(&mut self, cache: &Cache, entries: Vec<EntryId>) {
        if entries.is_empty() {
            self.clear();
            return;
        }

        if !self.rows.is_empty() {
            self.changes.push(ListChange::Removed {
                first: 0,
                last: self.rows.len() - 1,
            });
        }
        self.rows = entries;
        self.changes.push(ListChange::Inserted {
            first: 0,
            last: self.rows.len() - 1,
        });
        self.resort(cache);
    }

    pub fn prepend_data(&mut self, cache: &Cache, entries: Vec<EntryId>) {
        if entries.is_empty() {
            return;
        }
        let count = entries.len();
        let mut rows = entries;
        rows.append(&mut self.rows);
        self.rows = rows;
        self.changes.push(ListChange::Inserted {
            first: 0,
            last: count - 1,
        });
        self.resort(cache);
    }

    pub fn append_data(&mut self, cache: &Cache, entries: Vec<EntryId>) {
        if entries.is_empty() {
            return;
        }
        let first = self.rows.len();
        self.rows.extend(entries);
        self.changes.push(ListChange::Inserted {
            first,
            last: self.rows.len() - 1,
        });
        self.resort(cache);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.changes.push(ListChange::Cleared);
    }

    /// Adds a sorter after the existing ones and re-sorts.
    pub fn add_sorter(&mut self, cache: &Cache, sorter: Box<dyn Sorter>) {
        self.sorters.push(sorter);
        self.resort(cache);
    }

    /// Drops every sorter and puts the rows back in `order`, the order the
    /// entries were delivered in. Rows missing from `order` keep their
    /// relative position at the end.
    pub fn clear_sorters(&mut self, order: &[EntryId]) {
        self.sorters.clear();
        if self.rows.is_empty() {
            return;
        }
        let rank = |entry: &EntryId| order.iter().position(|e| e == entry).unwrap_or(order.len());
        self.rows.sort_by_key(rank);
        self.changes.push(ListChange::DataChanged {
            first: 0,
            last: self.rows.len() - 1,
        });
    }

    /// One stable sort pass per sorter, in the order they were added, so the
    /// sorter added last decides first and earlier ones break its ties.
    fn resort(&mut self, cache: &Cache) {
        if self.sorters.is_empty() || self.rows.is_empty() {
            return;
        }

        let empty = Map::new();
        for sorter in &self.sorters {
            self.rows.sort_by(|a, b| {
                let a = cache.get(*a).map_or(&empty, |e| e.data());
                let b = cache.get(*b).map_or(&empty, |e| e.data());
                sorter.compare(a, b)
            });
        }
        self.changes.push(ListChange::DataChanged {
            first: 0,
            last: self.rows.len() - 1,
        });
    }

    /// Rows showing `entry`, for per-row data change notifications.
    pub fn rows_of(&self, entry: EntryId) -> impl Iterator<Item = usize> + '_ {
        self.rows
            .iter()
            .enumerate()
            .filter(move |(_, e)| **e == entry)
            .map(|(i, _)| i)
    }

    pub(crate) fn set_paging(&mut self, has_previous: bool, has_next: bool) {
        self.has_previous = has_previous;
        self.has_next = has_next;
    }

    pub(crate) fn notify_row_changed(&mut self, row: usize) {
        self.changes.push(ListChange::DataChanged {
            first: row,
            last: row,
        });
    }

    pub fn take_changes(&mut self) -> Vec<ListChange> {
        std::mem::take(&mut self.changes)
    }
}

impl std::fmt::Debug for ListModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListModel")
            .field("rows", &self.rows)
            .field("sorters", &self.sorters.len())
            .field("has_previous", &self.has_previous)
            .field("has_next", &self.has_next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{self, TypeTag};

    fn entry(cache: &mut Cache, id: &str, name: &str, rank: i64) -> EntryId {
        let mut data = Map::new();
        data.insert("name".into(), Value::from(name));
        data.insert("rank".into(), Value::Int(rank));
        tag::stamp(&mut data, TypeTag(1), id);
        cache.get_or_create(id, data).unwrap().0
    }

    #[test]
    fn set_data_emits_remove_then_insert() {
        let mut cache = Cache::new();
        let a = entry(&mut cache, "a", "a", 1);
        let b = entry(&mut cache, "b", "b", 2);
        let mut model = ListModel::new();

        model.set_data(&cache, vec![a]);
        model.set_data(&cache, vec![a, b]);
        assert_eq!(
            model.take_changes(),
            vec![
                ListChange::Inserted { first: 0, last: 0 },
                ListChange::Removed { first: 0, last: 0 },
                ListChange::Inserted { first: 0, last: 1 },
            ]
        );
    }

    #[test]
    fn set_data_with_empty_list_clears() {
        let mut cache = Cache::new();
        let a = entry(&mut cache, "a", "a", 1);
        let mut model = ListModel::new();
        model.set_data(&cache, vec![a]);
        model.take_changes();

        model.set_data(&cache, vec![]);
        assert!(model.is_empty());
        assert_eq!(model.take_changes(), vec![ListChange::Cleared]);
    }

    #[test]
    fn prepend_and_append_insert_ranges() {
        let mut cache = Cache::new();
        let a = entry(&mut cache, "a", "a", 1);
        let b = entry(&mut cache, "b", "b", 2);
        let c = entry(&mut cache, "c", "c", 3);
        let mut model = ListModel::new();

        model.set_data(&cache, vec![b]);
        model.append_data(&cache, vec![c]);
        model.prepend_data(&cache, vec![a]);
        model.append_data(&cache, vec![]);

        assert_eq!(model.rows(), &[a, b, c]);
        assert_eq!(
            model.take_changes(),
            vec![
                ListChange::Inserted { first: 0, last: 0 },
                ListChange::Inserted { first: 1, last: 1 },
                ListChange::Inserted { first: 0, last: 0 },
            ]
        );
    }

    #[test]
    fn sorted_model_reports_data_change_not_structure() {
        let mut cache = Cache::new();
        let a = entry(&mut cache, "a", "Zed", 1);
        let b = entry(&mut cache, "b", "amy", 2);
        let mut model = ListModel::new();
        model.add_sorter(&cache, Box::new(FieldSorter::ascending("name")));

        model.set_data(&cache, vec![a, b]);
        assert_eq!(model.rows(), &[b, a]);
        assert_eq!(
            model.take_changes(),
            vec![
                ListChange::Inserted { first: 0, last: 1 },
                ListChange::DataChanged { first: 0, last: 1 },
            ]
        );
    }

    #[test]
    fn later_sorter_takes_precedence() {
        let mut cache = Cache::new();
        let a = entry(&mut cache, "a", "same", 2);
        let b = entry(&mut cache, "b", "same", 1);
        let c = entry(&mut cache, "c", "other", 1);
        let mut model = ListModel::new();
        model.add_sorter(&cache, Box::new(FieldSorter::descending("name")));

        model.set_data(&cache, vec![a, b, c]);
        assert_eq!(model.rows(), &[a, b, c]);

        // rank decides; name order survives among equal ranks
        model.add_sorter(&cache, Box::new(FieldSorter::ascending("rank")));
        assert_eq!(model.rows(), &[b, c, a]);
    }

    #[test]
    fn name_then_rank_sorts_by_rank() {
        let mut cache = Cache::new();
        let first = entry(&mut cache, "first", "b", 1);
        let second = entry(&mut cache, "second", "a", 2);
        let mut model = ListModel::new();
        model.add_sorter(&cache, Box::new(FieldSorter::ascending("name")));
        model.add_sorter(&cache, Box::new(FieldSorter::ascending("rank")));

        model.set_data(&cache, vec![second, first]);
        assert_eq!(model.rows(), &[first, second]);
    }

    #[test]
    fn clearing_sorters_restores_delivery_order() {
        let mut cache = Cache::new();
        let a = entry(&mut cache, "a", "Zed", 1);
        let b = entry(&mut cache, "b", "amy", 2);
        let mut model = ListModel::new();
        model.add_sorter(&cache, Box::new(FieldSorter::ascending("name")));
        model.set_data(&cache, vec![a, b]);
        assert_eq!(model.rows(), &[b, a]);
        model.take_changes();

        model.clear_sorters(&[a, b]);
        assert_eq!(model.rows(), &[a, b]);
        assert_eq!(model.take_changes(), vec![ListChange::DataChanged { first: 0, last: 1 }]);
    }

    #[test]
    fn numeric_fields_sort_numerically() {
        let mut cache = Cache::new();
        let a = entry(&mut cache, "a", "x", 10);
        let b = entry(&mut cache, "b", "x", 9);
        let mut model = ListModel::new();
        model.add_sorter(&cache, Box::new(FieldSorter::ascending("rank")));

        model.set_data(&cache, vec![a, b]);
        assert_eq!(model.rows(), &[b, a]);
        assert_eq!(model.rows_of(a).collect::<Vec<_>>(), vec![1]);
    }
}
