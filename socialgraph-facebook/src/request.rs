use socialgraph_core::{BackendError, ConnectionQuery, Request};
use url::Url;

/// Builds Graph API URLs for one access token.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    graph_url: Url,
    access_token: String,
}

impl UrlBuilder {
    pub fn new(graph_url: Url, access_token: impl Into<String>) -> Self {
        UrlBuilder {
            graph_url,
            access_token: access_token.into(),
        }
    }

    pub fn graph_url(&self) -> &Url {
        &self.graph_url
    }

    /// `<graph_url>/<segments..>?access_token=..&fields=..&<params>`
    pub fn url(&self, segments: &[&str], fields: &[String], params: &[(String, String)]) -> Result<Url, BackendError> {
        let mut url = self.graph_url.clone();
        if !segments.is_empty() {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| BackendError::Unsupported(format!("graph url {} cannot be a base", self.graph_url)))?;
            path.pop_if_empty();
            for segment in segments.iter().filter(|s| !s.is_empty()) {
                path.push(segment);
            }
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("access_token", &self.access_token);
            if !fields.is_empty() {
                query.append_pair("fields", &fields.join(","));
            }
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub fn object(&self, identifier: &str, subpath: Option<&str>, fields: &[String], params: &[(String, String)]) -> Result<Request, BackendError> {
        let mut segments = vec![identifier];
        segments.extend(subpath.into_iter().flat_map(|s| s.split('/')));
        Ok(Request::get(self.url(&segments, fields, params)?))
    }

    /// `<graph_url>/?ids=a,b`
    pub fn batch(&self, identifiers: &[&str]) -> Result<Request, BackendError> {
        let ids = vec![("ids".to_string(), identifiers.join(","))];
        Ok(Request::get(self.url(&[], &[], &ids)?))
    }
}

/// Field expansion of one connection: `comments.limit(20).fields(id,message).after(C)`.
pub fn expansion(query: &ConnectionQuery) -> String {
    let mut field = query.connection.name.clone();
    if let Some(limit) = query.limit {
        field.push_str(&format!(".limit({limit})"));
    }
    if !query.fields.is_empty() {
        field.push_str(&format!(".fields({})", query.fields.join(",")));
    }
    for (key, value) in query.cursor.params() {
        field.push_str(&format!(".{key}({value})"));
    }
    field
}

/// Plain query parameters of a path-based connection request.
pub fn path_params(query: &ConnectionQuery) -> (Vec<String>, Vec<(String, String)>) {
    let mut params = Vec::new();
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params.extend(query.cursor.params().map(|(k, v)| (k.to_string(), v.to_string())));
    (query.fields.clone(), params)
}
