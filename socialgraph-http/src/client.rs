use std::time::Duration;

use socialgraph_core::{Method, Request, Response, Transport};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::HttpError;

const DEFAULT_USER_AGENT: &str = concat!("socialgraph/", env!("CARGO_PKG_VERSION"));

/// Transport sending backend requests over HTTP.
///
/// Non-success statuses are returned as responses; interpreting them is the
/// adapter's job. Only connection-level failures are errors.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with default client settings.
    pub fn new() -> Result<Self, HttpError> {
        Self::builder(None, None)
    }

    /// Creates a transport honouring the config's timeout and user agent.
    pub fn from_config(config: &Config) -> Result<Self, HttpError> {
        Self::builder(config.timeout_secs.map(Duration::from_secs), config.user_agent.as_deref())
    }

    fn builder(timeout: Option<Duration>, user_agent: Option<&str>) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self { http: builder.build()? })
    }

    /// Wraps an existing client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for HttpTransport {
    type Error = HttpError;

    #[instrument(skip(self, request), fields(method = ?request.method, path = %request.url.path()))]
    async fn send(&self, request: &Request) -> Result<Response, HttpError> {
        debug!("Sending request");

        let mut builder = self.http.request(method(request.method), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "Received response");
        Ok(Response { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mapping() {
        assert_eq!(method(Method::Get), reqwest::Method::GET);
        assert_eq!(method(Method::Delete), reqwest::Method::DELETE);
    }

    #[test]
    fn test_transport_from_config() {
        let config = Config {
            timeout_secs: Some(3),
            user_agent: Some("test-agent".into()),
            ..Default::default()
        };
        assert!(HttpTransport::from_config(&config).is_ok());
    }
}
