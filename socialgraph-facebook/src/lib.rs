//! Facebook Graph API backend for socialgraph.
//!
//! Builds Graph API requests (object, batched and field-expanded related
//! data), resolves object types from metadata or field heuristics, extracts
//! cursor and link based paging, and names changed fields per object type.
//!
//! # Example
//!
//! ```ignore
//! use socialgraph_core::Adapter;
//! use socialgraph_facebook::{FacebookBackend, FacebookConfig, FacebookConnection};
//!
//! let backend = FacebookBackend::new(FacebookConfig::new(token))?;
//! let mut adapter = Adapter::ready(backend);
//! adapter.populate("me", vec![FacebookConnection::Friends.filter().shared()])?;
//! ```

mod backend;
mod config;
mod detect;
mod diff;
mod ontology;
mod paging;
mod request;

pub use backend::{FacebookBackend, FacebookItemFactory, SELF_ALIAS};
pub use config::{DEFAULT_GRAPH_URL, FacebookConfig};
pub use detect::detect_type;
pub use diff::{change_table, section};
pub use ontology::{FacebookConnection, FacebookType};
pub use paging::paging_report;
pub use request::UrlBuilder;
