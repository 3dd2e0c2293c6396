use socialgraph_core::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no access token: set SOCIALGRAPH_ACCESS_TOKEN or access_token in the config file")]
    AccessTokenNotFound,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("client error: {0}")]
    Client(#[from] HttpError),
}
