use socialgraph_core::{
    AdapterId, Backend, BackendError, ChangeTable, Connection, ConnectionQuery, ContentItemFactory, Direction, Item,
    Map, PageReport, Request, TypeTag,
};
use tracing::debug;
use url::Url;

use crate::config::FacebookConfig;
use crate::detect;
use crate::diff;
use crate::ontology::{FacebookConnection, FacebookType};
use crate::paging;
use crate::request::{self, UrlBuilder};

/// Alias the Graph API accepts for the authenticated user.
pub const SELF_ALIAS: &str = "me";

const NODE_FIELDS: [&str; 3] = ["picture", "name", "updated_time"];
const SECONDARY_FIELDS: [&str; 2] = ["likes.summary(true).limit(0)", "comments.summary(true).limit(0)"];

/// Creates plain items for likes, photo tags and pictures, identifiable
/// items for everything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacebookItemFactory;

impl ContentItemFactory for FacebookItemFactory {
    fn create(&self, tag: TypeTag, data: &Map, owner: AdapterId) -> Item {
        match FacebookType::from_tag(tag) {
            Some(t) if !t.is_identifiable() => Item::plain(tag, data.clone(), owner),
            _ => Item::identifiable(tag, data.clone(), owner),
        }
    }
}

/// The Facebook Graph API backend.
#[derive(Debug, Clone)]
pub struct FacebookBackend {
    urls: UrlBuilder,
    config: FacebookConfig,
}

impl FacebookBackend {
    pub fn new(config: FacebookConfig) -> Result<Self, BackendError> {
        let graph_url = Url::parse(&config.graph_url)?;
        Ok(FacebookBackend {
            urls: UrlBuilder::new(graph_url, config.access_token.clone()),
            config,
        })
    }

    pub fn config(&self) -> &FacebookConfig {
        &self.config
    }

    pub fn graph_url(&self) -> &Url {
        self.urls.graph_url()
    }
}

impl Backend for FacebookBackend {
    fn object_request(
        &self,
        identifier: &str,
        subpath: Option<&str>,
        fields: &[String],
        params: &[(String, String)],
    ) -> Result<Request, BackendError> {
        self.urls.object(identifier, subpath, fields, params)
    }

    fn batch_request(&self, identifiers: &[&str]) -> Result<Request, BackendError> {
        self.urls.batch(identifiers)
    }

    fn related_request(&self, identifier: &str, connections: &[ConnectionQuery]) -> Result<Request, BackendError> {
        if let [query] = connections {
            if query.connection.exclusive {
                let (fields, mut params) = request::path_params(query);
                if query.connection.name == FacebookConnection::Notifications.name() {
                    params.insert(0, ("include_read".to_string(), "1".to_string()));
                }
                return self
                    .urls
                    .object(identifier, Some(&query.connection.name), &fields, &params);
            }
        }

        let fields: Vec<String> = connections.iter().map(request::expansion).collect();
        debug!(identifier, fields = ?fields, "related data request");
        self.urls.object(identifier, None, &fields, &[])
    }

    fn type_detection_query(&self) -> (Vec<String>, Vec<(String, String)>) {
        detect::detection_query()
    }

    fn self_alias(&self) -> Option<&str> {
        Some(SELF_ALIAS)
    }

    fn detect_type(&self, data: &Map) -> Option<TypeTag> {
        detect::detect_type(data).map(FacebookType::tag)
    }

    fn secondary_fields(&self, tag: TypeTag) -> Vec<String> {
        match FacebookType::from_tag(tag) {
            Some(FacebookType::Post | FacebookType::Photo | FacebookType::Album) => {
                SECONDARY_FIELDS.iter().map(|f| f.to_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    fn connection(&self, tag: TypeTag) -> Option<Connection> {
        let connection = FacebookConnection::from_tag(tag)?;
        let item_type = connection.item_type();
        Some(Connection {
            tag,
            name: connection.name().to_string(),
            item_type: item_type.tag(),
            identifiable: item_type.is_identifiable(),
            exclusive: connection.is_exclusive(),
            policy: self.config.policy(connection),
        })
    }

    fn paging_report(&self, container: &Map, _direction: Direction, _item_count: usize) -> PageReport {
        paging::paging_report(container)
    }

    fn is_node_field(&self, key: &str) -> bool {
        NODE_FIELDS.contains(&key)
    }

    fn section(&self, tag: TypeTag, data: &Map) -> String {
        diff::section(tag, data)
    }

    fn change_table(&self) -> ChangeTable {
        diff::change_table()
    }

    fn item_factory(&self) -> &dyn ContentItemFactory {
        &FacebookItemFactory
    }
}
