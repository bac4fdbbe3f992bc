//! Error types for schema validation, marshaling, cursors and execution.
//!
//! Validation errors surface at the call that caused them. Store errors are
//! carried through untouched in [`Error::Store`].

use dynoschema_model::number::NumberError;
use dynoschema_model::{StoreError, WireType};
use thiserror::Error;

/// Top-level error type returned by builders and executors.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid schema or predicate definition.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A record could not be converted to a wire item.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    /// A wire item could not be converted to a record.
    #[error(transparent)]
    Unmarshal(#[from] UnmarshalError),
    /// A pagination token was malformed or belongs to another schema.
    #[error(transparent)]
    Cursor(#[from] CursorError),
    /// The external store client failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Invalid or inconsistent schema and predicate definitions.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The table name is empty.
    #[error("table name must not be empty")]
    EmptyTableName,
    /// Two attributes share a name.
    #[error("duplicate attribute: {name}")]
    DuplicateAttribute {
        /// The repeated name.
        name: String,
    },
    /// Two secondary indexes share a name.
    #[error("duplicate index: {name}")]
    DuplicateIndex {
        /// The repeated index name.
        name: String,
    },
    /// The schema declares no partition key.
    #[error("schema for table '{table}' declares no partition key")]
    MissingPartitionKey {
        /// The table name.
        table: String,
    },
    /// A key refers to an attribute the schema does not declare.
    #[error("key attribute '{name}' is not declared")]
    UndeclaredKey {
        /// The key attribute name.
        name: String,
    },
    /// A key attribute is nested, nullable or not a scalar key type.
    #[error("key attribute '{name}' must be a top-level, non-nullable S, N or B attribute")]
    InvalidKeyAttribute {
        /// The key attribute name.
        name: String,
    },
    /// An attribute path contains an empty segment.
    #[error("attribute '{name}' has an empty path segment")]
    EmptyPathSegment {
        /// The attribute name.
        name: String,
    },
    /// A nested attribute does not descend from a declared Map or List.
    #[error("nested attribute '{name}' must descend from a declared Map or List attribute")]
    InvalidNesting {
        /// The attribute name.
        name: String,
    },
    /// No attribute matches the name or path.
    #[error("attribute not found: {path}")]
    NotFound {
        /// The name or path that was looked up.
        path: String,
    },
    /// No secondary index has the given name.
    #[error("index not found: {name}")]
    IndexNotFound {
        /// The index name.
        name: String,
    },
    /// A path string could not be parsed.
    #[error("invalid attribute path '{path}': {reason}")]
    InvalidPath {
        /// The path as given.
        path: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Operand count does not match the operator's arity.
    #[error("operator {operator} expects {expected} operand(s), got {actual}")]
    Arity {
        /// The operator name.
        operator: String,
        /// Human-readable arity.
        expected: String,
        /// Operands supplied.
        actual: usize,
    },
    /// `IN` received more operands than configured.
    #[error("IN on '{path}' accepts at most {max} operands, got {actual}")]
    TooManyOperands {
        /// The attribute path.
        path: String,
        /// The configured bound.
        max: usize,
        /// Operands supplied.
        actual: usize,
    },
    /// The operator makes no sense for the attribute's wire type.
    #[error("operator {operator} cannot be applied to '{path}' of type {wire_type}")]
    UnsupportedOperator {
        /// The operator name.
        operator: String,
        /// The attribute path.
        path: String,
        /// The attribute's declared type.
        wire_type: WireType,
    },
    /// An operand's wire type differs from the attribute's declared type.
    #[error("operand for '{path}' must be {expected}, got {actual}")]
    OperandType {
        /// The attribute path.
        path: String,
        /// The declared type.
        expected: WireType,
        /// The operand's type.
        actual: WireType,
    },
    /// A number operand is not a valid decimal.
    #[error("invalid number operand for '{path}': {source}")]
    InvalidNumber {
        /// The attribute path.
        path: String,
        /// The validation failure.
        #[source]
        source: NumberError,
    },
    /// A key condition names an attribute that is not a key of the target.
    #[error("'{path}' is not a key attribute of {target}")]
    NotAKey {
        /// The attribute path.
        path: String,
        /// Table or index description.
        target: String,
    },
    /// The operator is not permitted in a key condition on this key.
    #[error("operator {operator} is not allowed in a key condition on '{path}'")]
    KeyOperator {
        /// The operator name.
        operator: String,
        /// The key attribute.
        path: String,
    },
    /// A second condition was added for the same key attribute.
    #[error("a condition on key '{name}' was already added")]
    DuplicateKeyCondition {
        /// The key attribute.
        name: String,
    },
    /// A query was built without an equality condition on the partition key.
    #[error("query on {target} requires a partition key condition")]
    MissingPartitionKeyCondition {
        /// Table or index description.
        target: String,
    },
    /// A query filter references a key attribute.
    #[error("filter may not reference key attribute '{name}'; use a key condition")]
    FilterOnKey {
        /// The key attribute.
        name: String,
    },
}

/// A record could not be converted into a wire item.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// The record's `Serialize` impl failed.
    #[error("record could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The record did not serialize to a struct or map.
    #[error("record must serialize to a map of fields")]
    NotAnObject,
    /// A non-nullable field is absent or null.
    #[error("missing value for non-nullable field '{name}'")]
    MissingField {
        /// The field name.
        name: String,
    },
    /// The record has a field the schema does not declare.
    #[error("field '{name}' is not declared in the schema")]
    UndeclaredField {
        /// The field name.
        name: String,
    },
    /// The field's runtime value does not fit its declared wire type.
    #[error("field '{name}' is declared {expected} but holds {actual}")]
    TypeMismatch {
        /// The field name.
        name: String,
        /// The declared type.
        expected: WireType,
        /// A description of the runtime value.
        actual: String,
    },
    /// A number field is not a valid store number.
    #[error("field '{name}' holds an invalid number: {source}")]
    InvalidNumber {
        /// The field name.
        name: String,
        /// The validation failure.
        #[source]
        source: NumberError,
    },
}

/// A wire item could not be converted into a record.
#[derive(Debug, Error)]
pub enum UnmarshalError {
    /// A required attribute is absent.
    #[error("missing required attribute '{name}'")]
    MissingAttribute {
        /// The attribute name.
        name: String,
    },
    /// An attribute's wire type differs from its declared type.
    #[error("attribute '{name}' is declared {expected} but the item holds {actual}")]
    TypeMismatch {
        /// The attribute name.
        name: String,
        /// The declared type.
        expected: WireType,
        /// The type found in the item.
        actual: WireType,
    },
    /// A number attribute is not a valid store number.
    #[error("attribute '{name}' holds an invalid number '{value}'")]
    InvalidNumber {
        /// The attribute name.
        name: String,
        /// The raw number string.
        value: String,
    },
    /// The record's `Deserialize` impl rejected the assembled fields.
    #[error("record could not be deserialized: {0}")]
    Deserialize(#[source] serde::de::value::Error),
}

/// A pagination token could not be accepted.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The token is malformed or refers to undeclared attributes.
    #[error("invalid cursor: {reason}")]
    InvalidCursor {
        /// What is wrong with the token.
        reason: String,
    },
    /// The token was issued for a different table or key schema.
    #[error("cursor was issued for schema {actual}, expected {expected}")]
    CursorMismatch {
        /// Fingerprint of the schema decoding the token.
        expected: String,
        /// Fingerprint embedded in the token.
        actual: String,
    },
    /// The cursor envelope could not be serialized.
    #[error("cursor could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CursorError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCursor {
            reason: reason.into(),
        }
    }
}
