use socialgraph_core::{ChangeTable, ChangedField, Map, TypeTag, Value, diff_top_level};

use crate::ontology::TwitterType;

type Renames = &'static [(&'static str, &'static str)];

const USER_FIELDS: Renames = &[
    ("screen_name", "screenName"),
    ("profile_image_url_https", "profileImage"),
    ("profile_image_url", "profileImage"),
    ("followers_count", "followersCount"),
    ("friends_count", "friendsCount"),
];
const TWEET_FIELDS: Renames = &[
    ("full_text", "text"),
    ("retweet_count", "retweetCount"),
    ("favorite_count", "favoriteCount"),
];

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

fn tweet_diff(old: &Map, new: &Map) -> Vec<ChangedField> {
    renamed(old, new, TWEET_FIELDS)
}

pub fn change_table() -> ChangeTable {
    ChangeTable::new()
        .with(TwitterType::User.tag(), user_diff)
        .with(TwitterType::Tweet.tag(), tweet_diff)
}

/// Section label of a row: initial of a user's name, day of a tweet.
///
/// Tweets carry `created_at` as `Wed Aug 27 13:08:45 +0000 2008`; the day
/// reads `Aug 27 2008`.
pub fn section(tag: TypeTag, data: &Map) -> String {
    match TwitterType::from_tag(tag) {
        Some(TwitterType::User) => data
            .get("name")
            .and_then(Value::as_str)
            .and_then(|name| name.chars().next())
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default(),
        Some(TwitterType::Tweet) => data
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(tweet_day)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn tweet_day(created_at: &str) -> Option<String> {
    let parts: Vec<&str> = created_at.split_whitespace().collect();
    match parts.as_slice() {
        [_, month, day, _, _, year] => Some(format!("{month} {day} {year}")),
        _ => None,
    }
}
