use indexmap::IndexMap;
use serde::Deserialize;

/// Which end of a node's related list a fetch writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Replace,
    Append,
    Prepend,
}

impl Direction {
    fn touches_previous(self) -> bool {
        matches!(self, Direction::Replace | Direction::Prepend)
    }

    fn touches_next(self) -> bool {
        matches!(self, Direction::Replace | Direction::Append)
    }
}

/// Continuation parameters for one direction of one connection.
///
/// Holds either a true cursor (`after=...`) or the offset/since/until
/// fragments a backend needs to repeat the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    params: IndexMap<String, String>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Continuation found in one response for one connection.
///
/// Cursors and advertisement are reported separately: a response may hand
/// out a cursor for a side without announcing a page there. The connection's
/// policy decides what that means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReport {
    pub previous: Option<Cursor>,
    pub next: Option<Cursor>,
    /// The response announces a page before this one.
    pub has_previous: bool,
    /// The response announces a page after this one.
    pub has_next: bool,
}

impl PageReport {
    /// A report announcing exactly the sides that carry a cursor.
    pub fn new(previous: Option<Cursor>, next: Option<Cursor>) -> Self {
        PageReport {
            has_previous: previous.is_some(),
            has_next: next.is_some(),
            previous,
            next,
        }
    }
}

/// How a connection's "has more" flags are derived from a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingPolicy {
    /// More exists exactly when the response announces a page and offers a
    /// cursor for it.
    #[default]
    Reported,
    /// Like `Reported`, but an empty page while paging ends that direction.
    UntilEmpty,
    /// Any cursor means more, announced or not, until a page comes back empty.
    AlwaysMore,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    pub cursor: Cursor,
    pub has_more: bool,
}

/// Paging bookkeeping for one connection of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionPaging {
    pub previous: PageState,
    pub next: PageState,
}

impl ConnectionPaging {
    /// Records a response's continuation for the sides `direction` touches.
    ///
    /// A missing report means the connection was absent from the response,
    /// which exhausts every touched side.
    pub fn apply(&mut self, report: Option<&PageReport>, direction: Direction, item_count: usize, policy: PagingPolicy) {
        if direction.touches_previous() {
            let side = report.map(|r| (r.previous.as_ref(), r.has_previous));
            update_side(&mut self.previous, side, direction, item_count, policy);
        }
        if direction.touches_next() {
            let side = report.map(|r| (r.next.as_ref(), r.has_next));
            update_side(&mut self.next, side, direction, item_count, policy);
        }
    }
}

fn update_side(
    side: &mut PageState,
    reported: Option<(Option<&Cursor>, bool)>,
    direction: Direction,
    item_count: usize,
    policy: PagingPolicy,
) {
    let Some((cursor, advertised)) = reported else {
        *side = PageState::default();
        return;
    };

    let exhausted = direction != Direction::Replace && item_count == 0;
    side.has_more = cursor.is_some()
        && match policy {
            PagingPolicy::Reported => advertised,
            PagingPolicy::UntilEmpty => advertised && !exhausted,
            PagingPolicy::AlwaysMore => !exhausted,
        };
    side.cursor = cursor.cloned().unwrap_or_default();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(previous: Option<&str>, next: Option<&str>) -> PageReport {
        PageReport::new(
            previous.map(|c| Cursor::new().with("before", c)),
            next.map(|c| Cursor::new().with("after", c)),
        )
    }

    /// Cursors on both sides, neither side announced.
    fn silent(previous: &str, next: &str) -> PageReport {
        PageReport {
            has_previous: false,
            has_next: false,
            ..report(Some(previous), Some(next))
        }
    }

    #[test]
    fn replace_sets_both_sides() {
        let mut paging = ConnectionPaging::default();
        paging.apply(Some(&report(Some("b"), Some("a"))), Direction::Replace, 2, PagingPolicy::Reported);

        assert!(paging.previous.has_more);
        assert!(paging.next.has_more);
        assert_eq!(paging.next.cursor.get("after"), Some("a"));
    }

    #[test]
    fn append_only_touches_next() {
        let mut paging = ConnectionPaging::default();
        paging.apply(Some(&report(Some("b"), Some("a"))), Direction::Replace, 2, PagingPolicy::Reported);
        paging.apply(Some(&report(None, None)), Direction::Append, 2, PagingPolicy::Reported);

        assert!(paging.previous.has_more);
        assert_eq!(paging.previous.cursor.get("before"), Some("b"));
        assert!(!paging.next.has_more);
        assert!(paging.next.cursor.is_empty());
    }

    #[test]
    fn missing_connection_exhausts_touched_sides() {
        let mut paging = ConnectionPaging::default();
        paging.apply(Some(&report(Some("b"), Some("a"))), Direction::Replace, 2, PagingPolicy::Reported);
        paging.apply(None, Direction::Prepend, 0, PagingPolicy::Reported);

        assert!(!paging.previous.has_more);
        assert!(paging.next.has_more);
    }

    #[test]
    fn until_empty_stops_on_empty_page() {
        let mut paging = ConnectionPaging::default();
        paging.apply(Some(&report(None, Some("a"))), Direction::Append, 0, PagingPolicy::UntilEmpty);
        assert!(!paging.next.has_more);

        paging.apply(Some(&report(None, Some("a"))), Direction::Append, 3, PagingPolicy::UntilEmpty);
        assert!(paging.next.has_more);
    }

    #[test]
    fn always_more_follows_unannounced_cursors() {
        let mut paging = ConnectionPaging::default();
        paging.apply(Some(&silent("B", "A")), Direction::Replace, 2, PagingPolicy::AlwaysMore);
        assert!(paging.previous.has_more);
        assert_eq!(paging.previous.cursor.get("before"), Some("B"));
        assert!(paging.next.has_more);

        paging.apply(Some(&silent("B0", "A0")), Direction::Prepend, 0, PagingPolicy::AlwaysMore);
        assert!(!paging.previous.has_more);
        assert!(paging.next.has_more);
        assert_eq!(paging.next.cursor.get("after"), Some("A"));
    }

    #[test]
    fn always_more_without_cursor_has_nothing_more() {
        let mut paging = ConnectionPaging::default();
        paging.next.cursor = Cursor::new().with("after", "stale");
        paging.apply(Some(&report(None, None)), Direction::Append, 5, PagingPolicy::AlwaysMore);

        assert!(!paging.next.has_more);
        assert!(paging.next.cursor.is_empty());
    }

    #[test]
    fn reported_ignores_unannounced_cursors() {
        let mut paging = ConnectionPaging::default();
        paging.apply(Some(&silent("B", "A")), Direction::Replace, 2, PagingPolicy::Reported);

        assert!(!paging.previous.has_more);
        assert!(!paging.next.has_more);
        assert_eq!(paging.next.cursor.get("after"), Some("A"));
    }
}
