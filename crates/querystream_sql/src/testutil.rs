//! In-memory connection for tests.
//!
//! Records every command it's asked to execute and answers with canned rows.
//! It doesn't interpret command text.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, stream};
use parking_lot::Mutex;
use querystream::{QueryError, Result, ScalarValue};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::{Command, Connection, DriverInfo, ParameterStyle, RowReader};
use crate::dialect::{Dialect, GenericDialect};
use crate::parameters::BoundParameter;

#[derive(Debug, thiserror::Error)]
pub enum MemoryConnectionError {
    #[error("Injected failure: {0}")]
    Injected(String),
}

/// How a command responds when executed.
#[derive(Debug, Clone)]
pub enum ReaderBehavior {
    /// Return these rows.
    Rows(Vec<Vec<ScalarValue>>),
    /// Fail to execute.
    Fail(String),
    /// Never produce a reader.
    Pending,
}

/// A command as it was executed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCommand {
    pub text: String,
    pub parameters: Vec<BoundParameter>,
    pub timeout: Option<Duration>,
}

impl ExecutedCommand {
    pub fn parameter_values(&self) -> Vec<ScalarValue> {
        self.parameters.iter().map(|p| p.value.clone()).collect()
    }
}

#[derive(Debug)]
struct Shared {
    behavior: ReaderBehavior,
    executed: Vec<ExecutedCommand>,
}

/// Clones share recorded commands and behavior.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    dialect: Arc<dyn Dialect>,
    style: ParameterStyle,
    shared: Arc<Mutex<Shared>>,
}

impl MemoryConnection {
    pub fn new(dialect: impl Dialect + 'static, style: ParameterStyle) -> Self {
        MemoryConnection {
            dialect: Arc::new(dialect),
            style,
            shared: Arc::new(Mutex::new(Shared {
                behavior: ReaderBehavior::Rows(Vec::new()),
                executed: Vec::new(),
            })),
        }
    }

    pub fn with_rows(self, rows: Vec<Vec<ScalarValue>>) -> Self {
        self.with_behavior(ReaderBehavior::Rows(rows))
    }

    pub fn with_behavior(self, behavior: ReaderBehavior) -> Self {
        self.shared.lock().behavior = behavior;
        self
    }

    /// Commands executed so far, in order.
    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.shared.lock().executed.clone()
    }
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new(GenericDialect, ParameterStyle::Positional)
    }
}

impl Connection for MemoryConnection {
    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn driver_info(&self) -> &dyn DriverInfo {
        &self.style
    }

    fn create_command(&self) -> Result<Box<dyn Command>> {
        Ok(Box::new(MemoryCommand {
            shared: self.shared.clone(),
            command: ExecutedCommand {
                text: String::new(),
                parameters: Vec::new(),
                timeout: None,
            },
        }))
    }
}

struct MemoryCommand {
    shared: Arc<Mutex<Shared>>,
    command: ExecutedCommand,
}

impl Command for MemoryCommand {
    fn set_text(&mut self, text: &str) {
        self.command.text = text.to_string();
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.command.timeout = Some(timeout);
    }

    fn add_parameter(&mut self, param: BoundParameter) {
        self.command.parameters.push(param);
    }

    fn execute_reader(
        self: Box<Self>,
        _cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<RowReader>> {
        let MemoryCommand { shared, command } = *self;
        let behavior = {
            let mut shared = shared.lock();
            debug!(text = %command.text, "memory connection executing command");
            shared.executed.push(command);
            shared.behavior.clone()
        };

        match behavior {
            ReaderBehavior::Rows(rows) => {
                let reader: RowReader = stream::iter(rows.into_iter().map(Ok)).boxed();
                futures::future::ready(Ok(reader)).boxed()
            }
            ReaderBehavior::Fail(msg) => futures::future::ready(Err(QueryError::upstream(
                MemoryConnectionError::Injected(msg),
            )))
            .boxed(),
            ReaderBehavior::Pending => futures::future::pending().boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    #[tokio::test]
    async fn records_commands_and_serves_rows() {
        let conn = MemoryConnection::default().with_rows(vec![vec![1.into()], vec![2.into()]]);

        let mut command = conn.create_command().unwrap();
        command.set_text("SELECT a FROM t WHERE (a > ?)");
        command.add_parameter(BoundParameter {
            name: "?".to_string(),
            value: 0.into(),
        });
        let reader = command
            .execute_reader(&CancellationToken::new())
            .await
            .unwrap();
        let rows: Vec<_> = reader.try_collect().await.unwrap();

        assert_eq!(2, rows.len());
        let executed = conn.executed();
        assert_eq!("SELECT a FROM t WHERE (a > ?)", executed[0].text);
        assert_eq!(vec![ScalarValue::Int64(0)], executed[0].parameter_values());
        assert_eq!(None, executed[0].timeout);
    }
}
