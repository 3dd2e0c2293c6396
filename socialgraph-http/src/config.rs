use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use socialgraph_core::PagingPolicy;
use socialgraph_facebook::{DEFAULT_GRAPH_URL, FacebookConfig};
use socialgraph_twitter::{DEFAULT_API_URL, TwitterConfig};

use crate::error::ConfigError;

pub const ACCESS_TOKEN_VAR: &str = "SOCIALGRAPH_ACCESS_TOKEN";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    pub access_token: Option<String>,
    pub graph_url: Option<String>,
    /// Root of the Twitter REST API.
    pub twitter_api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    /// Paging policy overrides keyed by connection name.
    #[serde(default)]
    pub paging: HashMap<String, PagingPolicy>,
}

impl Config {
    /// Backend settings for the given access token.
    pub fn facebook(&self, access_token: impl Into<String>) -> FacebookConfig {
        FacebookConfig {
            graph_url: self.graph_url.clone().unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string()),
            access_token: access_token.into(),
            paging: self.paging.clone(),
        }
    }

    /// Twitter backend settings for the given bearer token.
    pub fn twitter(&self, bearer_token: impl Into<String>) -> TwitterConfig {
        TwitterConfig {
            api_url: self.twitter_api_url.clone().unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            bearer_token: bearer_token.into(),
            paging: self.paging.clone(),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("socialgraph").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Config::default(),
    }
}

/// Reads a config file, falling back to defaults when it is missing or invalid.
pub fn load_config_from(path: &Path) -> Config {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Config::default();
    };

    toml::from_str(&content).unwrap_or_default()
}

pub fn load_access_token() -> Result<String, ConfigError> {
    resolve_access_token(std::env::var(ACCESS_TOKEN_VAR).ok(), &load_config())
}

/// The environment token wins over the config file; empty values count as absent.
pub fn resolve_access_token(env: Option<String>, config: &Config) -> Result<String, ConfigError> {
    env.into_iter()
        .chain(config.access_token.clone())
        .find(|token| !token.is_empty())
        .ok_or(ConfigError::AccessTokenNotFound)
}
