use socialgraph_core::{ChangeTable, ChangedField, Map, TypeTag, Value, diff_top_level};

use crate::ontology::FacebookType;

type Renames = &'static [(&'static str, &'static str)];

const USER_FIELDS: Renames = &[
    ("name", "name"),
    ("first_name", "name"),
    ("last_name", "name"),
    ("picture", "picture"),
    ("gender", "gender"),
];
const COMMENT_FIELDS: Renames = &[("message", "message"), ("like_count", "likeCount"), ("from", "from")];
const POST_FIELDS: Renames = &[("message", "message"), ("likes", "likesCount"), ("comments", "commentsCount")];
const MEDIA_FIELDS: Renames = &[("name", "name"), ("likes", "likesCount"), ("comments", "commentsCount")];

/// Reports changed raw keys under their logical field names.
fn renamed(old: &Map, new: &Map, renames: Renames) -> Vec<ChangedField> {
    let mut fields: Vec<ChangedField> = Vec::new();
    for raw in diff_top_level(old, new) {
        let field = match renames.iter().find(|(key, _)| *key == raw.as_str()) {
            Some((_, logical)) => ChangedField::from(*logical),
            None => raw,
        };
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    fields
}

fn user_diff(old: &Map, new: &Map) -> Vec<ChangedField> {
    renamed(old, new, USER_FIELDS)
}

fn comment_diff(old: &Map, new: &Map) -> Vec<ChangedField> {
    renamed(old, new, COMMENT_FIELDS)
}

fn post_diff(old: &Map, new: &Map) -> Vec<ChangedField> {
    renamed(old, new, POST_FIELDS)
}

fn media_diff(old: &Map, new: &Map) -> Vec<ChangedField> {
    renamed(old, new, MEDIA_FIELDS)
}

/// Per-type diff strategies for Graph objects.
pub fn change_table() -> ChangeTable {
    ChangeTable::new()
        .with(FacebookType::User.tag(), user_diff)
        .with(FacebookType::Comment.tag(), comment_diff)
        .with(FacebookType::Post.tag(), post_diff)
        .with(FacebookType::Photo.tag(), media_diff)
        .with(FacebookType::Album.tag(), media_diff)
}

/// Section label of a row: initial of a user's name, day of a post or comment.
pub fn section(tag: TypeTag, data: &Map) -> String {
    match FacebookType::from_tag(tag) {
        Some(FacebookType::User) => data
            .get("name")
            .and_then(Value::as_str)
            .and_then(|name| name.chars().next())
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default(),
        Some(FacebookType::Post | FacebookType::Comment) => data
            .get("created_time")
            .and_then(Value::as_str)
            .and_then(|time| time.get(..10))
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(json: &str) -> Map {
        Value::from_json(json.as_bytes()).unwrap().into_map().unwrap()
    }

    #[test]
    fn post_counts_are_logical_fields() {
        let old = map(r#"{"message":"m","likes":{"summary":{"total_count":1}}}"#);
        let new = map(r#"{"message":"m","likes":{"summary":{"total_count":2}},"story":"s"}"#);
        let changed = change_table().diff(FacebookType::Post.tag(), &old, &new);
        let names: Vec<&str> = changed.iter().map(ChangedField::as_str).collect();
        assert_eq!(names, vec!["likesCount", "story"]);
    }

    #[test]
    fn user_name_parts_collapse() {
        let old = map(r#"{"first_name":"A","last_name":"B"}"#);
        let new = map(r#"{"first_name":"C","last_name":"D"}"#);
        let changed = change_table().diff(FacebookType::User.tag(), &old, &new);
        assert_eq!(changed, vec![ChangedField::from("name")]);
    }

    #[test]
    fn sections() {
        let user = map(r#"{"name":"élise"}"#);
        assert_eq!(section(FacebookType::User.tag(), &user), "É");

        let post = map(r#"{"created_time":"2013-02-11T10:12:33+0000"}"#);
        assert_eq!(section(FacebookType::Post.tag(), &post), "2013-02-11");
        assert_eq!(section(FacebookType::Photo.tag(), &post), "");
    }
}
