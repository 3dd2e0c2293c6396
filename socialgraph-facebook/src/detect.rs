use socialgraph_core::{Map, Value, tag_of};
use tracing::debug;

use crate::ontology::FacebookType;

/// Fields and parameters of the metadata-only detection request.
pub fn detection_query() -> (Vec<String>, Vec<(String, String)>) {
    (
        vec!["id".to_string(), "metadata".to_string()],
        vec![("metadata".to_string(), "1".to_string())],
    )
}

/// Resolves the type of a Graph object.
///
/// Reported metadata wins, then a type already stamped on the data, then
/// field heuristics.
pub fn detect_type(data: &Map) -> Option<FacebookType> {
    if let Some(name) = data
        .get("metadata")
        .and_then(|m| m.get("type"))
        .and_then(Value::as_str)
    {
        match FacebookType::from_metadata(name) {
            Some(t) => return Some(t),
            None => debug!(name, "unrecognised metadata type"),
        }
    }

    let tagged = tag_of(data);
    if let Some(t) = FacebookType::from_tag(tagged) {
        return Some(t);
    }

    heuristic(data)
}

fn heuristic(data: &Map) -> Option<FacebookType> {
    let has = |key: &str| data.contains_key(key);

    if has("message") && has("like_count") {
        Some(FacebookType::Comment)
    } else if has("privacy") && has("can_upload") {
        Some(FacebookType::Album)
    } else if has("width") && has("source") {
        Some(FacebookType::Photo)
    } else if has("first_name") || has("gender") {
        Some(FacebookType::User)
    } else if has("actions") && has("type") {
        Some(FacebookType::Post)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialgraph_core::stamp;

    fn map(json: &str) -> Map {
        Value::from_json(json.as_bytes()).unwrap().into_map().unwrap()
    }

    #[test]
    fn metadata_wins() {
        let data = map(r#"{"id":"1","first_name":"A","metadata":{"type":"album"}}"#);
        assert_eq!(detect_type(&data), Some(FacebookType::Album));
    }

    #[test]
    fn stamped_type_before_heuristics() {
        let mut data = map(r#"{"id":"1","first_name":"A"}"#);
        stamp(&mut data, FacebookType::Event.tag(), "1");
        assert_eq!(detect_type(&data), Some(FacebookType::Event));
    }

    #[test]
    fn heuristics() {
        let cases = [
            (r#"{"message":"m","like_count":2}"#, Some(FacebookType::Comment)),
            (r#"{"privacy":"everyone","can_upload":false}"#, Some(FacebookType::Album)),
            (r#"{"width":10,"source":"s"}"#, Some(FacebookType::Photo)),
            (r#"{"gender":"female"}"#, Some(FacebookType::User)),
            (r#"{"actions":[],"type":"status"}"#, Some(FacebookType::Post)),
            (r#"{"message":"m"}"#, None),
        ];
        for (json, expected) in cases {
            assert_eq!(detect_type(&map(json)), expected, "{json}");
        }
    }
}
