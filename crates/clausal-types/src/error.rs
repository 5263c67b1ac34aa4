use thiserror::Error;

/// Errors raised at the schema boundary: defining record types, building
/// records, and navigating field paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A record of the wrong type was handed to a path or container
    #[error("Type mismatch: expected a '{expected}' record but got '{actual}'")]
    TypeMismatch {
        /// Name of the expected record type
        expected: String,
        /// Name of the record type that was supplied
        actual: String,
    },

    /// A field name does not exist on the record type
    #[error("Record type '{record_type}' has no field '{field}'")]
    UnknownField {
        /// Record type name
        record_type: String,
        /// Requested field
        field: String,
    },

    /// Attempted to navigate below a field that is not a complex term
    #[error("Field '{field}' is not a complex term and has no sub-fields")]
    NotComplex {
        /// Display form of the offending path
        field: String,
    },

    /// Wrong number of field values for a record type
    #[error("Record type '{record_type}' expects {expected} fields but {actual} were given")]
    Arity {
        /// Record type name
        record_type: String,
        /// Declared arity
        expected: usize,
        /// Supplied number of values
        actual: usize,
    },

    /// A field value was rejected by the field's codec
    #[error("Value '{term}' is not valid for field '{field}' ({codec})")]
    InvalidField {
        /// Field name
        field: String,
        /// Codec name
        codec: String,
        /// Display form of the rejected term
        term: String,
    },

    /// Invalid record type definition
    #[error("Invalid record type definition: {message}")]
    Definition {
        /// Description of the problem
        message: String,
    },
}

impl SchemaError {
    /// Create a definition error
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition { message: message.into() }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch { expected: expected.into(), actual: actual.into() }
    }
}
