use url::Url;

use crate::error::BackendError;
use crate::item::{ChangeTable, ContentItemFactory};
use crate::paging::{Cursor, Direction, PageReport, PagingPolicy};
use crate::tag::TypeTag;
use crate::value::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// A network request produced by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    /// Extra headers, such as an authorization header.
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Request {
            method: Method::Get,
            url,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A raw reply as delivered by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Response {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A related-content edge a backend knows how to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Tag filters use to select this edge.
    pub tag: TypeTag,
    /// Name of the edge in requests and replies.
    pub name: String,
    /// Type tag given to every item of the edge.
    pub item_type: TypeTag,
    /// Whether items carry an identifier and may be shared through the cache.
    pub identifiable: bool,
    /// Whether the edge must be requested on its own.
    pub exclusive: bool,
    pub policy: PagingPolicy,
}

/// One connection of a related-data request, with continuation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionQuery {
    pub connection: Connection,
    pub limit: Option<u32>,
    pub fields: Vec<String>,
    pub cursor: Cursor,
}

/// Network-specific request building and reply interpretation.
///
/// The population state machine is generic over this trait; everything
/// that depends on a particular social network's URL scheme, reply shape
/// or type system lives behind it.
pub trait Backend {
    /// Builds a request for one object, optionally a sub-path of it.
    fn object_request(
        &self,
        identifier: &str,
        subpath: Option<&str>,
        fields: &[String],
        params: &[(String, String)],
    ) -> Result<Request, BackendError>;

    /// Builds a single request fetching several objects at once.
    ///
    /// The reply is a map keyed by the requested identifiers.
    fn batch_request(&self, identifiers: &[&str]) -> Result<Request, BackendError>;

    /// Builds one combined request for every connection query.
    fn related_request(&self, identifier: &str, connections: &[ConnectionQuery]) -> Result<Request, BackendError>;

    /// Fields and parameters of the metadata-only type detection request.
    fn type_detection_query(&self) -> (Vec<String>, Vec<(String, String)>);

    /// Decodes a reply body.
    fn parse_response(&self, body: &[u8]) -> Result<Value, BackendError> {
        Ok(Value::from_json(body)?)
    }

    /// Extracts an error payload from a decoded reply.
    fn response_error(&self, value: &Value) -> Option<String> {
        let error = value.get("error")?;
        Some(
            error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        )
    }

    /// The alias for the authenticated user, if the network has one.
    fn self_alias(&self) -> Option<&str> {
        None
    }

    /// Whether an unresolved self alias rides along with the first node-data
    /// request through `batch_request`. Networks without multi-object
    /// lookups resolve the alias only when it is populated itself.
    fn batches_self_alias(&self) -> bool {
        true
    }

    /// Reshapes a decoded node-bound reply before it is read. Replies must
    /// come out as objects; `path` is the request path.
    fn normalize_reply(&self, _path: &str, value: Value) -> Value {
        value
    }

    /// Canonical identifier of an object.
    fn identifier_of(&self, data: &Map) -> Option<String> {
        data.get("id").and_then(Value::to_plain_string)
    }

    /// Resolves the type of an object, or `None` when it cannot tell.
    fn detect_type(&self, data: &Map) -> Option<TypeTag>;

    /// Extra fields some types need fetched in a second pass.
    fn secondary_fields(&self, _tag: TypeTag) -> Vec<String> {
        Vec::new()
    }

    /// The connection selected by a filter's type tag.
    fn connection(&self, tag: TypeTag) -> Option<Connection>;

    /// Continuation offered by a connection's reply container.
    fn paging_report(&self, container: &Map, direction: Direction, item_count: usize) -> PageReport;

    /// Whether a top-level key of a related reply updates the node itself.
    fn is_node_field(&self, _key: &str) -> bool {
        false
    }

    /// Section label of a row.
    fn section(&self, _tag: TypeTag, _data: &Map) -> String {
        String::new()
    }

    /// Per-type diff strategies used by the cache.
    fn change_table(&self) -> ChangeTable {
        ChangeTable::default()
    }

    fn item_factory(&self) -> &dyn ContentItemFactory;
}
