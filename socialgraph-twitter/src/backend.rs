use socialgraph_core::{
    Backend, BackendError, ChangeTable, Connection, ConnectionQuery, ContentItemFactory, Direction, IdentifiableFactory,
    Map, PageReport, Request, TypeTag, Value,
};
use tracing::debug;
use url::Url;

use crate::config::TwitterConfig;
use crate::diff;
use crate::ontology::{TwitterConnection, TwitterType};
use crate::paging;
use crate::request::{UrlBuilder, param};

/// Alias for the signed-in user, answered by `account/verify_credentials`.
pub const SELF_ALIAS: &str = "me";

const USER_SHOW: &str = "users/show.json";
const VERIFY_CREDENTIALS: &str = "account/verify_credentials.json";
const HOME_PAGE_SIZE: u32 = 200;

/// Resolves the type of a REST API object from its fields.
pub fn detect_type(data: &Map) -> Option<TwitterType> {
    if data.contains_key("screen_name") {
        Some(TwitterType::User)
    } else if data.contains_key("text") || data.contains_key("full_text") {
        Some(TwitterType::Tweet)
    } else if data.contains_key("place_type") {
        Some(TwitterType::Place)
    } else {
        None
    }
}

/// The Twitter REST API backend.
///
/// The API has no multi-object lookup, so the self alias is resolved only
/// when "me" is populated itself. Timelines come back as bare arrays and
/// user lists under `users`; both are reshaped into a `data` list before
/// the adapter reads them.
#[derive(Debug, Clone)]
pub struct TwitterBackend {
    urls: UrlBuilder,
    config: TwitterConfig,
}

impl TwitterBackend {
    pub fn new(config: TwitterConfig) -> Result<Self, BackendError> {
        let api_url = Url::parse(&config.api_url)?;
        Ok(TwitterBackend {
            urls: UrlBuilder::new(api_url, config.bearer_token.clone()),
            config,
        })
    }

    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    pub fn api_url(&self) -> &Url {
        self.urls.api_url()
    }
}

fn is_user_list(path: &str) -> bool {
    [TwitterConnection::Friends, TwitterConnection::Followers]
        .iter()
        .any(|c| path.ends_with(c.name()))
}

impl Backend for TwitterBackend {
    /// A user by id, or `subpath` with `{id}` replaced by the identifier.
    /// Field selection does not exist in this API and is ignored.
    fn object_request(
        &self,
        identifier: &str,
        subpath: Option<&str>,
        fields: &[String],
        params: &[(String, String)],
    ) -> Result<Request, BackendError> {
        if !fields.is_empty() {
            debug!(identifier, fields = ?fields, "ignoring field selection");
        }
        let mut query = params.to_vec();
        let path = match subpath {
            Some(subpath) => subpath.replace("{id}", identifier),
            None if identifier == SELF_ALIAS => VERIFY_CREDENTIALS.to_string(),
            None => {
                query.insert(0, param("user_id", identifier));
                USER_SHOW.to_string()
            }
        };
        self.urls.get(&path, &query)
    }

    fn batch_request(&self, _identifiers: &[&str]) -> Result<Request, BackendError> {
        Err(BackendError::Unsupported("batched object lookups".into()))
    }

    fn related_request(&self, identifier: &str, connections: &[ConnectionQuery]) -> Result<Request, BackendError> {
        let [query] = connections else {
            return Err(BackendError::Unsupported(format!(
                "{} connections in one request",
                connections.len()
            )));
        };
        let connection = TwitterConnection::from_tag(query.connection.tag)
            .ok_or_else(|| BackendError::Unsupported(format!("connection {}", query.connection.name)))?;

        let mut params = Vec::new();
        match connection {
            TwitterConnection::Friends | TwitterConnection::Followers => {
                params.push(param("user_id", identifier));
                params.push(param("skip_status", true));
                params.push(param("include_user_entities", true));
            }
            TwitterConnection::Tweets => {
                params.push(param("user_id", identifier));
                params.push(param("include_user_entities", true));
            }
            TwitterConnection::Home => {
                params.push(param("trim_user", false));
                params.push(param("exclude_replies", false));
                params.push(param("contributor_details", true));
                params.push(param("include_user_entities", true));
            }
        }
        let count = match connection {
            TwitterConnection::Home => Some(query.limit.unwrap_or(HOME_PAGE_SIZE)),
            _ => query.limit,
        };
        if let Some(count) = count {
            params.push(param("count", count));
        }
        params.extend(query.cursor.params().map(|(k, v)| param(k, v)));

        debug!(identifier, connection = connection.name(), "related data request");
        self.urls.get(connection.name(), &params)
    }

    fn type_detection_query(&self) -> (Vec<String>, Vec<(String, String)>) {
        (Vec::new(), Vec::new())
    }

    fn response_error(&self, value: &Value) -> Option<String> {
        if let Some(first) = value.get("errors").and_then(Value::as_list).and_then(<[Value]>::first) {
            let message = first.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            return Some(message.to_string());
        }
        value.get("error").and_then(Value::as_str).map(str::to_string)
    }

    fn self_alias(&self) -> Option<&str> {
        Some(SELF_ALIAS)
    }

    fn batches_self_alias(&self) -> bool {
        false
    }

    fn normalize_reply(&self, path: &str, value: Value) -> Value {
        match value {
            Value::List(items) => {
                let mut container = Map::new();
                container.insert("data".to_string(), Value::List(items));
                Value::Map(container)
            }
            Value::Map(mut container) if is_user_list(path) => {
                if let Some(users) = container.swap_remove("users") {
                    container.insert("data".to_string(), users);
                }
                Value::Map(container)
            }
            other => other,
        }
    }

    fn identifier_of(&self, data: &Map) -> Option<String> {
        data.get("id_str")
            .or_else(|| data.get("id"))
            .and_then(Value::to_plain_string)
    }

    fn detect_type(&self, data: &Map) -> Option<TypeTag> {
        detect_type(data).map(TwitterType::tag)
    }

    fn connection(&self, tag: TypeTag) -> Option<Connection> {
        let connection = TwitterConnection::from_tag(tag)?;
        Some(Connection {
            tag,
            name: connection.name().to_string(),
            item_type: connection.item_type().tag(),
            identifiable: true,
            exclusive: connection.is_exclusive(),
            policy: self.config.policy(connection),
        })
    }

    fn paging_report(&self, container: &Map, _direction: Direction, _item_count: usize) -> PageReport {
        if container.contains_key("next_cursor") || container.contains_key("next_cursor_str") {
            paging::cursor_report(container)
        } else {
            paging::timeline_report(container)
        }
    }

    fn section(&self, tag: TypeTag, data: &Map) -> String {
        diff::section(tag, data)
    }

    fn change_table(&self) -> ChangeTable {
        diff::change_table()
    }

    fn item_factory(&self) -> &dyn ContentItemFactory {
        &IdentifiableFactory
    }
}
