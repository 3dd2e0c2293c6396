use std::collections::HashMap;

use serde::Deserialize;
use socialgraph_core::PagingPolicy;

use crate::ontology::TwitterConnection;

pub const DEFAULT_API_URL: &str = "https://api.twitter.com/1.1";

/// Backend-level settings: API root, bearer token, and per-connection paging
/// overrides keyed by endpoint path.
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub bearer_token: String,
    #[serde(default)]
    pub paging: HashMap<String, PagingPolicy>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for TwitterConfig {
    fn default() -> Self {
        TwitterConfig {
            api_url: default_api_url(),
            bearer_token: String::new(),
            paging: HashMap::new(),
        }
    }
}

impl TwitterConfig {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        TwitterConfig {
            bearer_token: bearer_token.into(),
            ..Default::default()
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_paging(mut self, connection: TwitterConnection, policy: PagingPolicy) -> Self {
        self.paging.insert(connection.name().to_string(), policy);
        self
    }

    pub fn policy(&self, connection: TwitterConnection) -> PagingPolicy {
        self.paging
            .get(connection.name())
            .copied()
            .unwrap_or_else(|| connection.default_policy())
    }
}
