use std::collections::HashMap;

use serde::Deserialize;
use socialgraph_core::PagingPolicy;

use crate::ontology::FacebookConnection;

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

/// Backend-level settings: where the Graph API lives, who is asking, and
/// per-connection paging overrides keyed by connection name.
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookConfig {
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub paging: HashMap<String, PagingPolicy>,
}

fn default_graph_url() -> String {
    DEFAULT_GRAPH_URL.to_string()
}

impl Default for FacebookConfig {
    fn default() -> Self {
        FacebookConfig {
            graph_url: default_graph_url(),
            access_token: String::new(),
            paging: HashMap::new(),
        }
    }
}

impl FacebookConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        FacebookConfig {
            access_token: access_token.into(),
            ..Default::default()
        }
    }

    pub fn with_graph_url(mut self, graph_url: impl Into<String>) -> Self {
        self.graph_url = graph_url.into();
        self
    }

    pub fn with_paging(mut self, connection: FacebookConnection, policy: PagingPolicy) -> Self {
        self.paging.insert(connection.name().to_string(), policy);
        self
    }

    /// Effective paging policy of a connection.
    pub fn policy(&self, connection: FacebookConnection) -> PagingPolicy {
        self.paging
            .get(connection.name())
            .copied()
            .unwrap_or_else(|| connection.default_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let config = FacebookConfig::new("t").with_paging(FacebookConnection::Feed, PagingPolicy::UntilEmpty);
        assert_eq!(config.graph_url, DEFAULT_GRAPH_URL);
        assert_eq!(config.policy(FacebookConnection::Comments), PagingPolicy::AlwaysMore);
        assert_eq!(config.policy(FacebookConnection::Likes), PagingPolicy::UntilEmpty);
        assert_eq!(config.policy(FacebookConnection::Feed), PagingPolicy::UntilEmpty);
        assert_eq!(config.policy(FacebookConnection::Friends), PagingPolicy::Reported);
    }
}
