use crate::kind::EntityKind;
use thiserror::Error;

/// Everything that can go wrong while answering one query document.
///
/// A lookup that finds nothing is not an error; it resolves to `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Parse { line: usize, column: usize, message: String },

    #[error("cannot query field `{0}` on type `Query`")]
    UnknownOperation(String),

    #[error("field `{field}` is not permitted on type `{kind}`")]
    FieldNotPermitted { kind: EntityKind, field: String },

    #[error("field `{operation}` requires argument `{argument}`")]
    MissingArgument { operation: String, argument: String },

    #[error("unknown argument `{argument}` on field `{operation}`")]
    UnknownArgument { operation: String, argument: String },

    #[error("argument `{argument}` of `{operation}` expects {expected}")]
    InvalidArgument { operation: String, argument: String, expected: &'static str },

    #[error("variable `${0}` is not defined")]
    UnknownVariable(String),

    #[error("field `{field}` of type `{kind}` has no sub-fields")]
    SubselectionNotAllowed { kind: EntityKind, field: String },

    #[error("response key `{key}` is used for both `{first}` and `{second}`")]
    FieldsConflict { key: String, first: String, second: String },

    #[error("field `{0}` must have a selection of sub-fields")]
    SelectionRequired(String),

    #[error("{0} operations are not supported")]
    OperationNotSupported(String),

    #[error("introspection is disabled on this endpoint")]
    IntrospectionDisabled,

    #[error("unknown operation named `{0}`")]
    UnknownOperationName(String),

    #[error("document defines several operations; operationName is required")]
    AmbiguousOperation,

    #[error("backing store failure: {0}")]
    BackingStoreFailure(String),
}

impl GatewayError {
    /// Stable machine-readable code, rendered as `extensions.code`.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Parse { .. } => "GRAPHQL_PARSE_FAILED",
            GatewayError::UnknownOperation(_) => "UNKNOWN_OPERATION",
            GatewayError::FieldNotPermitted { .. } => "FIELD_NOT_PERMITTED",
            GatewayError::MissingArgument { .. } => "MISSING_ARGUMENT",
            GatewayError::UnknownArgument { .. } => "UNKNOWN_ARGUMENT",
            GatewayError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            GatewayError::UnknownVariable(_) => "UNKNOWN_VARIABLE",
            GatewayError::SubselectionNotAllowed { .. } => "SUBSELECTION_NOT_ALLOWED",
            GatewayError::FieldsConflict { .. } => "FIELDS_CONFLICT",
            GatewayError::SelectionRequired(_) => "SELECTION_REQUIRED",
            GatewayError::OperationNotSupported(_) => "OPERATION_NOT_SUPPORTED",
            GatewayError::IntrospectionDisabled => "INTROSPECTION_DISABLED",
            GatewayError::UnknownOperationName(_) => "UNKNOWN_OPERATION_NAME",
            GatewayError::AmbiguousOperation => "AMBIGUOUS_OPERATION",
            GatewayError::BackingStoreFailure(_) => "BACKING_STORE_FAILURE",
        }
    }

    /// True for request-shape problems caught before any store call.
    pub fn is_validation(&self) -> bool {
        !matches!(self, GatewayError::BackingStoreFailure(_))
    }
}
