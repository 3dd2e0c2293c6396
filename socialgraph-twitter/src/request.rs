use socialgraph_core::{BackendError, Request};
use url::Url;

/// Builds REST API requests for one bearer token.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    api_url: Url,
    bearer_token: String,
}

impl UrlBuilder {
    pub fn new(api_url: Url, bearer_token: impl Into<String>) -> Self {
        UrlBuilder {
            api_url,
            bearer_token: bearer_token.into(),
        }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// `<api_url>/<path>?<params>`
    pub fn url(&self, path: &str, params: &[(String, String)]) -> Result<Url, BackendError> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| BackendError::Unsupported(format!("api url {} cannot be a base", self.api_url)))?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// A GET request carrying the bearer token.
    pub fn get(&self, path: &str, params: &[(String, String)]) -> Result<Request, BackendError> {
        let request = Request::get(self.url(path, params)?);
        if self.bearer_token.is_empty() {
            return Ok(request);
        }
        Ok(request.with_header("Authorization", format!("Bearer {}", self.bearer_token)))
    }
}

pub(crate) fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(token: &str) -> UrlBuilder {
        UrlBuilder::new(Url::parse("https://api.twitter.com/1.1").unwrap(), token)
    }

    #[test]
    fn path_below_api_root() {
        let request = builder("T").get("users/show.json", &[param("user_id", 12)]).unwrap();
        assert_eq!(request.url.as_str(), "https://api.twitter.com/1.1/users/show.json?user_id=12");
        assert_eq!(request.header("authorization"), Some("Bearer T"));
    }

    #[test]
    fn no_token_no_header() {
        let request = builder("").get("account/verify_credentials.json", &[]).unwrap();
        assert_eq!(request.url.query(), None);
        assert!(request.headers.is_empty());
    }
}
