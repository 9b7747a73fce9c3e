use crate::expr::binary::BinaryOperator;

/// Failures turning an expression into query text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslationError {
    #[error("Unsupported binary operator for translation: {0:?}")]
    UnsupportedOperator(BinaryOperator),

    #[error("Unsupported expression for translation: {kind} ({expr})")]
    UnsupportedNode { kind: &'static str, expr: String },

    #[error("Translation stack invariant violated: {0}")]
    Internal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("Query node chain does not terminate in a source node")]
    MalformedChain,

    #[error("Failed to evaluate expression: {0}")]
    Evaluation(String),

    #[error("Source does not support push down of {0}")]
    UnsupportedPushDown(&'static str),

    #[error(transparent)]
    Upstream(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Wrap an error coming from an underlying source or driver.
    pub fn upstream(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        QueryError::Upstream(Box::new(err))
    }
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

macro_rules! eval_error {
    ($($arg:tt)*) => {
        crate::errors::QueryError::Evaluation(std::format!($($arg)*))
    };
}
pub(crate) use eval_error;
