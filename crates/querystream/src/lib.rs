//! Composable, lazily evaluated queries over pull-based row streams.
//!
//! A [`Query`] wraps a [`RowSource`]. Operators applied to a query are pushed
//! into the source when it says it can execute them natively, and otherwise
//! evaluated locally over the source's rows.

pub mod errors;
pub mod expr;
pub mod local;
pub mod query;
pub mod stream;
pub mod testutil;
pub mod value;

pub use errors::{QueryError, Result, TranslationError};
pub use query::{MemorySource, PushDown, PushDownOp, Query, RowSource};
pub use stream::SendableRowStream;
pub use value::{DataType, ScalarValue, StructValue};
