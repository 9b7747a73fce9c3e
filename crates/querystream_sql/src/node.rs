//! Immutable chain of query nodes describing a table query.

use std::sync::Arc;

use querystream::expr::Expr;
use querystream::{QueryError, Result};

use crate::connection::Connection;
use crate::record::TableSchema;

#[derive(Debug, Clone)]
pub enum QueryNode {
    Source(SourceNode),
    Filter(FilterNode),
}

/// Root of every chain, the table being read.
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub connection: Arc<dyn Connection>,
    pub table: TableSchema,
}

#[derive(Debug, Clone)]
pub struct FilterNode {
    pub predecessor: Arc<QueryNode>,
    pub predicate: Expr,
}

impl QueryNode {
    pub fn source(connection: Arc<dyn Connection>, table: TableSchema) -> Arc<Self> {
        Arc::new(QueryNode::Source(SourceNode { connection, table }))
    }

    /// Append a filter onto an existing chain.
    pub fn filter(predecessor: Arc<QueryNode>, predicate: Expr) -> Arc<Self> {
        Arc::new(QueryNode::Filter(FilterNode {
            predecessor,
            predicate,
        }))
    }

    pub fn predecessor(&self) -> Option<&Arc<QueryNode>> {
        match self {
            QueryNode::Source(_) => None,
            QueryNode::Filter(filter) => Some(&filter.predecessor),
        }
    }

    /// Iterate from this node to the root.
    pub fn walk(&self) -> impl Iterator<Item = &QueryNode> {
        std::iter::successors(Some(self), |node| node.predecessor().map(|p| p.as_ref()))
    }
}

/// Find the source node at the root of the chain.
pub fn find_root(node: &QueryNode) -> Result<&SourceNode> {
    node.walk()
        .find_map(|node| match node {
            QueryNode::Source(source) => Some(source),
            _ => None,
        })
        .ok_or(QueryError::MalformedChain)
}

/// AND together every filter in the chain.
///
/// Filters are combined in the order they were applied, so a chain of
/// `source -> filter(p1) -> filter(p2)` produces `p1 AND p2`.
pub fn merged_filter(node: &QueryNode) -> Option<Expr> {
    let mut predicates: Vec<&Expr> = node
        .walk()
        .filter_map(|node| match node {
            QueryNode::Filter(filter) => Some(&filter.predicate),
            _ => None,
        })
        .collect();
    predicates.reverse();
    Expr::and_all(predicates.into_iter().cloned())
}
