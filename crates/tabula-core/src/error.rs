use crate::{config::ConfigError, model::SchemaError, native::NativeError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// QueryError
///
/// Every failure a caller can observe from a terminal operation.
/// Translation-time kinds are raised while the graph is walked; execution-time
/// kinds are raised by the reducers. Nothing is retried internally.
///

#[derive(Debug, ThisError)]
pub enum QueryError {
    #[error("unsupported expression: {construct}")]
    UnsupportedExpression { construct: String },

    #[error("invalid comparison target '{property}': {reason}")]
    InvalidComparisonTarget { property: String, reason: String },

    #[error(
        "'{operator}' cannot follow an established primary ordering; use '{use_instead}' instead"
    )]
    AmbiguousSortSpecification {
        operator: &'static str,
        use_instead: &'static str,
    },

    #[error("sequence contains no matching element (table {table})")]
    SequenceEmpty { table: String },

    #[error("sequence contains more than one matching element (table {table})")]
    SequenceHasMultipleMatches { table: String },

    #[error("index {index} is out of range (table {table})")]
    IndexOutOfRange { table: String, index: usize },

    #[error("type mismatch on '{property}': expected {expected}, found {found}")]
    TypeMismatch {
        property: String,
        expected: String,
        found: &'static str,
    },

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Internal(#[from] InternalError),
}

impl QueryError {
    /// Construct an unsupported-expression error naming the offending construct.
    pub(crate) fn unsupported(construct: impl Into<String>) -> Self {
        Self::UnsupportedExpression {
            construct: construct.into(),
        }
    }

    pub(crate) fn invalid_target(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidComparisonTarget {
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Stable classification for diagnostics and metrics.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedExpression { .. } => ErrorClass::Unsupported,
            Self::InvalidComparisonTarget { .. }
            | Self::AmbiguousSortSpecification { .. }
            | Self::TypeMismatch { .. } => ErrorClass::InvalidQuery,
            Self::SequenceEmpty { .. } => ErrorClass::NotFound,
            Self::SequenceHasMultipleMatches { .. } => ErrorClass::Conflict,
            Self::IndexOutOfRange { .. } => ErrorClass::OutOfRange,
            Self::Schema(_) | Self::Config(_) => ErrorClass::InvalidQuery,
            Self::Internal(err) => err.class,
        }
    }

    /// True for failures raised while walking the query graph, before any
    /// native query handle exists.
    #[must_use]
    pub const fn is_translation_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedExpression { .. }
                | Self::InvalidComparisonTarget { .. }
                | Self::AmbiguousSortSpecification { .. }
                | Self::TypeMismatch { .. }
        )
    }
}

impl From<NativeError> for QueryError {
    fn from(err: NativeError) -> Self {
        Self::Internal(InternalError::from(err))
    }
}

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message.into(),
        )
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<NativeError> for InternalError {
    fn from(err: NativeError) -> Self {
        let class = match err {
            NativeError::UnknownTable(_) | NativeError::UnknownColumn { .. } => {
                ErrorClass::NotFound
            }
            NativeError::InvalidHandle { .. } | NativeError::UnbalancedGroup => {
                ErrorClass::InvariantViolation
            }
            NativeError::UnsupportedOperand { .. } => ErrorClass::Unsupported,
            NativeError::Engine(_) => ErrorClass::Internal,
        };

        Self::new(class, ErrorOrigin::Native, err.to_string())
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Unsupported,
    InvalidQuery,
    NotFound,
    Conflict,
    OutOfRange,
    InvariantViolation,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unsupported => "unsupported",
            Self::InvalidQuery => "invalid_query",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::OutOfRange => "out_of_range",
            Self::InvariantViolation => "invariant_violation",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Schema,
    Translate,
    Sort,
    Executor,
    Native,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Translate => "translate",
            Self::Sort => "sort",
            Self::Executor => "executor",
            Self::Native => "native",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}
