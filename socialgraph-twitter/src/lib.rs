//! Twitter REST API (v1.1) backend for socialgraph.
//!
//! Users are nodes; their friends, followers and tweet timelines are
//! connections. Timelines page by `since_id`/`max_id` derived from the
//! tweets themselves, user lists by the `previous_cursor`/`next_cursor`
//! pair where `"0"` means no more pages.
//!
//! # Example
//!
//! ```ignore
//! use socialgraph_core::Adapter;
//! use socialgraph_twitter::{TwitterBackend, TwitterConfig, TwitterConnection};
//!
//! let backend = TwitterBackend::new(TwitterConfig::new(bearer_token))?;
//! let mut adapter = Adapter::ready(backend);
//! adapter.populate("12", vec![TwitterConnection::Tweets.filter().shared()])?;
//! ```

mod backend;
mod config;
mod diff;
mod ontology;
mod paging;
mod request;

pub use backend::{SELF_ALIAS, TwitterBackend, detect_type};
pub use config::{DEFAULT_API_URL, TwitterConfig};
pub use diff::{change_table, section};
pub use ontology::{TwitterConnection, TwitterType};
pub use paging::{NULL_CURSOR, cursor_report, timeline_report};
pub use request::UrlBuilder;
