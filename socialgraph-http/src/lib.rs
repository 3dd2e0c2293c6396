//! HTTP transport and configuration for socialgraph.
//!
//! Sessions are provided for the Facebook and Twitter backends.
//!
//! Sends the requests an adapter queues over `reqwest`, and loads access
//! tokens and backend settings from the environment and
//! `<config_dir>/socialgraph/config.toml`.
//!
//! # Example
//!
//! ```ignore
//! use socialgraph_facebook::FacebookConnection;
//! use socialgraph_http::{facebook_session, load_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = facebook_session(&load_config()).unwrap();
//!     session
//!         .adapter_mut()
//!         .populate("me", vec![FacebookConnection::Friends.filter().shared()])
//!         .unwrap();
//!     session.run().await;
//!
//!     for row in 0..session.adapter().model().len() {
//!         println!("{:?}", session.adapter().row(row));
//!     }
//! }
//! ```

mod client;
mod config;
mod error;

use socialgraph_core::{Adapter, Session};
use socialgraph_facebook::FacebookBackend;
use socialgraph_twitter::TwitterBackend;

pub use client::HttpTransport;
pub use config::{ACCESS_TOKEN_VAR, Config, load_access_token, load_config, load_config_from, resolve_access_token};
pub use error::{ConfigError, HttpError};

/// A ready Facebook adapter over HTTP, authenticated from the environment or
/// the config file.
pub fn facebook_session(config: &Config) -> Result<Session<FacebookBackend, HttpTransport>, ConfigError> {
    let token = resolve_access_token(std::env::var(ACCESS_TOKEN_VAR).ok(), config)?;
    facebook_session_with_token(config, token)
}

/// Like `facebook_session`, with an explicit access token.
pub fn facebook_session_with_token(
    config: &Config,
    access_token: impl Into<String>,
) -> Result<Session<FacebookBackend, HttpTransport>, ConfigError> {
    let backend = FacebookBackend::new(config.facebook(access_token))?;
    let transport = HttpTransport::from_config(config)?;
    Ok(Session::new(Adapter::ready(backend), transport))
}

/// A ready Twitter adapter over HTTP, sending `bearer_token` with every request.
pub fn twitter_session_with_token(
    config: &Config,
    bearer_token: impl Into<String>,
) -> Result<Session<TwitterBackend, HttpTransport>, ConfigError> {
    let backend = TwitterBackend::new(config.twitter(bearer_token))?;
    let transport = HttpTransport::from_config(config)?;
    Ok(Session::new(Adapter::ready(backend), transport))
}
