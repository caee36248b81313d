//! Error types for chain assembly and execution.

use thiserror::Error;

/// Main error type for chain operations.
///
/// The first group of variants is raised while a chain is being assembled and
/// always propagates. `OperationNotFound`, `OperationFailed` and
/// `ReceiverNotRegistered` are raised by `call()`; pull chains can turn them
/// into a nil result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("Not supported step type {found}, supported types are {supported}")]
    UnsupportedStepType {
        found: String,
        supported: &'static str,
    },

    #[error("Format wrong {descriptor}, expected format is {expected}")]
    MalformedDescriptor {
        descriptor: String,
        expected: &'static str,
    },

    #[error("Wrong format variable defined: {0:?}")]
    InvalidAliasName(String),

    #[error("Invalid expression {expression:?} at {position}: {message}")]
    InvalidExpression {
        expression: String,
        position: usize,
        message: String,
    },

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Undefined operation `{operation}` for {receiver}{}", in_context(.context))]
    OperationNotFound {
        receiver: String,
        operation: String,
        context: Option<String>,
    },

    #[error("{message}{}", in_context(.context))]
    OperationFailed {
        message: String,
        context: Option<String>,
    },

    #[error("Receiver not registered: {0}")]
    ReceiverNotRegistered(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

fn in_context(context: &Option<String>) -> String {
    match context {
        Some(context) => format!(" (in {})", context),
        None => String::new(),
    }
}

impl ChainError {
    /// `operation` is not defined on `receiver`.
    pub fn operation_not_found(receiver: impl Into<String>, operation: impl Into<String>) -> Self {
        ChainError::OperationNotFound {
            receiver: receiver.into(),
            operation: operation.into(),
            context: None,
        }
    }

    /// An operation exists but could not complete.
    pub fn failed(message: impl Into<String>) -> Self {
        ChainError::OperationFailed {
            message: message.into(),
            context: None,
        }
    }

    /// Attach `<receiver>.<expression>` style context to a call-time error.
    ///
    /// Construction-time errors are returned unchanged, and an existing
    /// context is kept so the innermost location wins.
    pub fn with_context(mut self, location: impl Into<String>) -> Self {
        match &mut self {
            ChainError::OperationNotFound { context, .. }
            | ChainError::OperationFailed { context, .. } => {
                if context.is_none() {
                    *context = Some(location.into());
                }
            }
            _ => {}
        }
        self
    }

    /// Whether this error is raised while executing a chain, as opposed to
    /// while assembling it.
    pub fn is_call_time(&self) -> bool {
        matches!(
            self,
            ChainError::OperationNotFound { .. }
                | ChainError::OperationFailed { .. }
                | ChainError::ReceiverNotRegistered(_)
        )
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Deserialization(e.to_string())
    }
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
