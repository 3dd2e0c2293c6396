use socialgraph_core::{Cursor, Map, PageReport, Value};

/// Cursor value user lists report when there is no page on that side.
pub const NULL_CURSOR: &str = "0";

/// Continuation of a friends or followers list.
pub fn cursor_report(container: &Map) -> PageReport {
    let side = |key: &str| {
        let value = container
            .get(&format!("{key}_str"))
            .or_else(|| container.get(key))?
            .to_plain_string()?;
        (value != NULL_CURSOR).then(|| Cursor::new().with("cursor", value))
    };
    PageReport::new(side("previous_cursor"), side("next_cursor"))
}

/// Continuation of a tweet timeline, derived from the page's own tweets.
///
/// Newer tweets are asked for with `since_id` set to the first (newest)
/// tweet, older ones with `max_id` just below the last (oldest). An empty
/// page offers neither.
pub fn timeline_report(container: &Map) -> PageReport {
    let ids: Vec<u64> = container
        .get("data")
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(tweet_id)
        .collect();

    let previous = ids.first().map(|id| Cursor::new().with("since_id", id.to_string()));
    let next = ids
        .last()
        .and_then(|id| id.checked_sub(1))
        .map(|id| Cursor::new().with("max_id", id.to_string()));
    PageReport::new(previous, next)
}

fn tweet_id(tweet: &Value) -> Option<u64> {
    tweet
        .get("id_str")
        .or_else(|| tweet.get("id"))?
        .to_plain_string()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(json: &str) -> Map {
        Value::from_json(json.as_bytes()).unwrap().into_map().unwrap()
    }

    #[test]
    fn zero_cursor_means_no_page() {
        let report = cursor_report(&map(
            r#"{"data":[],"previous_cursor":0,"previous_cursor_str":"0","next_cursor_str":"1489467234237774933"}"#,
        ));
        assert!(report.previous.is_none());
        assert!(!report.has_previous);
        assert_eq!(report.next.unwrap().get("cursor"), Some("1489467234237774933"));
        assert!(report.has_next);
    }

    #[test]
    fn timeline_bounds_come_from_tweets() {
        let report = timeline_report(&map(
            r#"{"data":[{"id_str":"300","text":"c"},{"id_str":"200","text":"b"},{"id":100,"text":"a"}]}"#,
        ));
        assert_eq!(report.previous.unwrap().get("since_id"), Some("300"));
        assert_eq!(report.next.unwrap().get("max_id"), Some("99"));
    }

    #[test]
    fn empty_timeline_offers_nothing() {
        assert_eq!(timeline_report(&map(r#"{"data":[]}"#)), PageReport::default());
    }
}
