//! Interfaces to the underlying database driver.

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use querystream::{Result, ScalarValue};
use tokio_util::sync::CancellationToken;

use crate::dialect::Dialect;
use crate::parameters::{
    BoundParameter, NamedBinder, NumberedBinder, ParameterBinder, PositionalBinder,
};

/// Rows returned by a command, each holding values in selected column
/// order.
pub type RowReader = BoxStream<'static, Result<Vec<ScalarValue>>>;

/// An open connection to a database.
pub trait Connection: fmt::Debug + Sync + Send {
    fn dialect(&self) -> &dyn Dialect;

    fn driver_info(&self) -> &dyn DriverInfo;

    fn create_command(&self) -> Result<Box<dyn Command>>;
}

/// Driver specific behavior not covered by the dialect.
pub trait DriverInfo: fmt::Debug + Sync + Send {
    /// Create an empty set of parameters for a new command.
    fn create_parameters(&self) -> Box<dyn ParameterBinder>;
}

/// A single command to execute against a connection.
pub trait Command: Send {
    fn set_text(&mut self, text: &str);

    fn set_timeout(&mut self, timeout: Duration);

    fn add_parameter(&mut self, param: BoundParameter);

    /// Execute the command, returning a reader over the result rows.
    ///
    /// The driver should abort the command if `cancel` is triggered.
    fn execute_reader(
        self: Box<Self>,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<RowReader>>;
}

/// Placeholder styles used by common drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterStyle {
    /// `?`
    Positional,
    /// Prefix followed by a zero based index, e.g. `@p0`.
    Named(String),
    /// `$1`, `$2`, ...
    Numbered,
}

impl DriverInfo for ParameterStyle {
    fn create_parameters(&self) -> Box<dyn ParameterBinder> {
        match self {
            Self::Positional => Box::new(PositionalBinder::new()),
            Self::Named(prefix) => Box::new(NamedBinder::new(prefix.clone())),
            Self::Numbered => Box::new(NumberedBinder::new()),
        }
    }
}
