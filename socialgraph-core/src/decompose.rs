use std::collections::HashSet;

use tracing::warn;

use crate::backend::{Backend, ConnectionQuery};
use crate::paging::{Direction, PageReport};
use crate::tag::{self, TypeTag};
use crate::value::{Map, Value};

const DATA_KEY: &str = "data";

/// Items and continuation found for one requested connection.
#[derive(Debug, Default)]
pub(crate) struct ConnectionBatch {
    /// The connection's own tag, not its item type.
    pub tag: TypeTag,
    /// `(identifier, tagged data)`; empty identifiers are never shared.
    pub items: Vec<(String, Map)>,
    /// `None` when the connection was absent from the reply.
    pub report: Option<PageReport>,
}

#[derive(Debug, Default)]
pub(crate) struct Decomposed {
    pub batches: Vec<ConnectionBatch>,
    /// Piggy-backed fields for the node's own entry.
    pub node_update: Map,
    pub unexpected: Vec<String>,
}

/// Splits a related-data reply into per-connection item lists.
///
/// A connection's list sits at the top level when the request path ends
/// with the connection name, otherwise under a key of that name.
pub(crate) fn decompose<B: Backend + ?Sized>(
    backend: &B,
    request_path: &str,
    reply: &Map,
    queries: &[ConnectionQuery],
    direction: Direction,
) -> Decomposed {
    let mut decomposed = Decomposed::default();
    let mut consumed: HashSet<&str> = HashSet::from(["id"]);
    let mut top_level_used = false;

    for query in queries {
        let connection = &query.connection;
        let top_level = !top_level_used
            && request_path.ends_with(&format!("/{}", connection.name))
            && reply.contains_key(DATA_KEY);

        let container = if top_level {
            top_level_used = true;
            Some(reply)
        } else {
            reply.get(&connection.name).and_then(Value::as_map)
        };

        let mut batch = ConnectionBatch {
            tag: connection.tag,
            ..Default::default()
        };

        if let Some(container) = container {
            if !top_level {
                consumed.insert(connection.name.as_str());
            }
            let items: Vec<&Map> = match container.get(DATA_KEY) {
                Some(Value::List(list)) => list.iter().filter_map(Value::as_map).collect(),
                Some(Value::Map(single)) => vec![single],
                _ => Vec::new(),
            };
            for item in items {
                let mut data = item.clone();
                let identifier = if connection.identifiable {
                    backend.identifier_of(&data).unwrap_or_default()
                } else {
                    String::new()
                };
                tag::stamp(&mut data, connection.item_type, &identifier);
                batch.items.push((identifier, data));
            }
            batch.report = Some(backend.paging_report(container, direction, batch.items.len()));
        }

        decomposed.batches.push(batch);
    }

    if top_level_used {
        return decomposed;
    }

    for (key, value) in reply {
        if consumed.contains(key.as_str()) {
            continue;
        }
        if backend.is_node_field(key) {
            decomposed.node_update.insert(key.clone(), value.clone());
        } else {
            decomposed.unexpected.push(key.clone());
        }
    }

    if !decomposed.unexpected.is_empty() {
        warn!(keys = ?decomposed.unexpected, "unexpected keys in related data reply");
    }

    decomposed
}
