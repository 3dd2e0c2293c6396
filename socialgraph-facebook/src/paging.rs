use socialgraph_core::{Cursor, Map, PageReport, Value};
use url::Url;

/// Extracts the continuation of one connection container.
///
/// Cursor-based paging is preferred. Both cursors are always kept; a side is
/// announced only when the reply also carries its `previous`/`next` link.
/// Without cursors the links themselves are parsed and the offset and time
/// bounds kept.
pub fn paging_report(container: &Map) -> PageReport {
    let Some(paging) = container.get("paging").and_then(Value::as_map) else {
        return PageReport::default();
    };

    if let Some(cursors) = paging.get("cursors").and_then(Value::as_map) {
        let cursor = |key: &str| {
            let value = cursors.get(key)?.to_plain_string()?;
            Some(Cursor::new().with(key, value))
        };
        return PageReport {
            previous: cursor("before"),
            next: cursor("after"),
            has_previous: paging.contains_key("previous"),
            has_next: paging.contains_key("next"),
        };
    }

    PageReport::new(
        link_cursor(paging.get("previous"), &["offset", "since"]),
        link_cursor(paging.get("next"), &["offset", "until"]),
    )
}

fn link_cursor(link: Option<&Value>, keep: &[&str]) -> Option<Cursor> {
    let url = Url::parse(link?.as_str()?).ok()?;
    let mut cursor = Cursor::new();
    for (key, value) in url.query_pairs() {
        if keep.iter().any(|k| *k == key) {
            cursor.insert(key.into_owned(), value.into_owned());
        }
    }
    (!cursor.is_empty()).then_some(cursor)
}
