use std::sync::Arc;

use crate::tag::TypeTag;

/// Selects one related-content connection to fetch for a node.
///
/// Filters are owned by the caller; nodes hold shared references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    connection: TypeTag,
    limit: Option<u32>,
    fields: Vec<String>,
}

impl Filter {
    pub fn new(connection: TypeTag) -> Self {
        Filter {
            connection,
            limit: None,
            fields: Vec::new(),
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn connection(&self) -> TypeTag {
        self.connection
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Wraps the filter for sharing with nodes.
    pub fn shared(self) -> Arc<Filter> {
        Arc::new(self)
    }
}

/// Order-insensitive comparison of two filter sets.
pub fn same_filters(a: &[Arc<Filter>], b: &[Arc<Filter>]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|f| b.iter().any(|g| Arc::ptr_eq(f, g) || f == g))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_sets_compare_by_value_in_any_order() {
        let comments = Filter::new(TypeTag(1)).with_limit(20).shared();
        let likes = Filter::new(TypeTag(2)).shared();

        let a = vec![comments.clone(), likes.clone()];
        let b = vec![likes, Filter::new(TypeTag(1)).with_limit(20).shared()];
        assert!(same_filters(&a, &b));
        assert!(!same_filters(&a, &[comments]));
        assert!(same_filters(&[], &[]));
    }

    #[test]
    fn limit_is_part_of_identity() {
        let a = Filter::new(TypeTag(1)).with_limit(10).shared();
        let b = Filter::new(TypeTag(1)).with_limit(20).shared();
        assert!(!same_filters(&[a], &[b]));
    }
}
