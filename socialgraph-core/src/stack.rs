use std::sync::Arc;

use crate::cache::Cache;
use crate::filter::Filter;
use crate::node::{Node, NodeId};

/// Browsing history of nodes with a cursor on the current one.
///
/// Nodes above the cursor are forward history, kept until the next push.
#[derive(Debug, Default)]
pub struct NodeStack {
    nodes: Vec<Node>,
    index: Option<usize>,
    next_id: u64,
}

impl NodeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn current(&self) -> Option<&Node> {
        self.index.and_then(|i| self.nodes.get(i))
    }

    pub fn current_mut(&mut self) -> Option<&mut Node> {
        self.index.and_then(|i| self.nodes.get_mut(i))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    pub fn is_current(&self, id: NodeId) -> bool {
        self.current().is_some_and(|n| n.id() == id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn has_previous_node(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    pub fn has_next_node(&self) -> bool {
        match self.index {
            Some(i) => i + 1 < self.nodes.len(),
            None => !self.nodes.is_empty(),
        }
    }

    /// Finds a node, anywhere in the history, targeting the same object.
    pub fn find_matching(&self, identifier: &str, filters: &[Arc<Filter>]) -> Option<&Node> {
        self.nodes.iter().find(|n| n.matches(identifier, filters))
    }

    /// Drops forward history and pushes a new current node.
    ///
    /// Returns the new node's id and the ids of destroyed nodes.
    pub(crate) fn push(&mut self, cache: &mut Cache, identifier: String, filters: Vec<Arc<Filter>>) -> (NodeId, Vec<NodeId>) {
        let keep = self.index.map_or(0, |i| i + 1);
        let mut destroyed = Vec::new();
        for mut node in self.nodes.drain(keep..) {
            node.release(cache);
            destroyed.push(node.id());
        }

        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.push(Node::new(id, identifier, filters));
        self.index = Some(self.nodes.len() - 1);
        (id, destroyed)
    }

    /// Moves the cursor forward. Returns false at the end of history.
    pub fn next(&mut self) -> bool {
        if !self.has_next_node() {
            return false;
        }
        self.index = Some(self.index.map_or(0, |i| i + 1));
        true
    }

    /// Moves the cursor back. Returns false at the start of history.
    pub fn previous(&mut self) -> bool {
        match self.index {
            Some(i) if i > 0 => {
                self.index = Some(i - 1);
                true
            }
            _ => false,
        }
    }

    /// Destroys the top node and releases its references.
    pub(crate) fn pop(&mut self, cache: &mut Cache) -> Option<NodeId> {
        let mut node = self.nodes.pop()?;
        node.release(cache);

        let len = self.nodes.len();
        self.index = match self.index {
            _ if len == 0 => None,
            Some(i) if i >= len => Some(len - 1),
            other => other,
        };
        Some(node.id())
    }

    pub(crate) fn clear(&mut self, cache: &mut Cache) -> Vec<NodeId> {
        let mut destroyed = Vec::new();
        while let Some(id) = self.pop(cache) {
            destroyed.push(id);
        }
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(stack: &mut NodeStack, cache: &mut Cache, identifier: &str) -> NodeId {
        stack.push(cache, identifier.to_string(), vec![]).0
    }

    #[test]
    fn stack_push_makes_top_current() {
        let mut cache = Cache::new();
        let mut stack = NodeStack::new();
        assert!(stack.current().is_none());

        push(&mut stack, &mut cache, "a");
        let b = push(&mut stack, &mut cache, "b");

        assert!(stack.is_current(b));
        assert!(stack.has_previous_node());
        assert!(!stack.has_next_node());
    }

    #[test]
    fn stack_navigation_keeps_forward_history() {
        let mut cache = Cache::new();
        let mut stack = NodeStack::new();
        let a = push(&mut stack, &mut cache, "a");
        let b = push(&mut stack, &mut cache, "b");

        assert!(stack.previous());
        assert!(stack.is_current(a));
        assert!(!stack.previous());
        assert!(stack.has_next_node());

        assert!(stack.next());
        assert!(stack.is_current(b));
        assert!(!stack.next());
    }

    #[test]
    fn stack_push_truncates_forward_history() {
        let mut cache = Cache::new();
        let mut stack = NodeStack::new();
        push(&mut stack, &mut cache, "a");
        let b = push(&mut stack, &mut cache, "b");
        stack.previous();

        let (c, destroyed) = stack.push(&mut cache, "c".into(), vec![]);
        assert_eq!(destroyed, vec![b]);
        assert_eq!(stack.len(), 2);
        assert!(stack.is_current(c));
        assert!(stack.get(b).is_none());
    }

    #[test]
    fn stack_pop_to_empty() {
        let mut cache = Cache::new();
        let mut stack = NodeStack::new();
        let a = push(&mut stack, &mut cache, "a");
        let b = push(&mut stack, &mut cache, "b");

        assert_eq!(stack.pop(&mut cache), Some(b));
        assert!(stack.is_current(a));
        assert_eq!(stack.pop(&mut cache), Some(a));
        assert!(stack.current().is_none());
        assert_eq!(stack.pop(&mut cache), None);
    }

    #[test]
    fn stack_clear_destroys_all() {
        let mut cache = Cache::new();
        let mut stack = NodeStack::new();
        push(&mut stack, &mut cache, "a");
        push(&mut stack, &mut cache, "b");

        assert_eq!(stack.clear(&mut cache).len(), 2);
        assert!(stack.is_empty());
    }
}
