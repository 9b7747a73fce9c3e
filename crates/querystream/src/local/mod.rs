//! Operators evaluated in-process over the rows of another query.
//!
//! These are used whenever the underlying source can't execute an operator
//! natively. Each operator is itself a [`RowSource`](crate::query::RowSource)
//! so they compose freely.

mod filter;
mod join;
mod project;

pub use filter::LocalFilter;
pub use join::LocalInnerJoin;
pub use project::LocalProjector;
