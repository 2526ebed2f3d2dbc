//! # Error Types: Unmarshalling Error Taxonomy
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Schema problems (`InvalidSchema`, `FormatterNotFound`) surface when
//!   an unmarshaller is constructed; `ValidatorBuild` surfaces on the first
//!   structural check.
//! - Structural failures (`InvalidSchemaValue`) carry the offending value
//!   and every structural error reported by the validator.
//! - Format failures (`InvalidSchemaFormatValue`) mean the value passed
//!   structural validation but the formatter transform rejected it.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::schema::SchemaType;

/// Error raised while building an unmarshaller or unmarshalling a value.
#[derive(Error, Debug, Clone)]
pub enum UnmarshalError {
    /// The schema node is missing or malformed at the point of use.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// No custom or built-in formatter exists for the (type, format) pair.
    #[error("formatter not found for format '{format}' of type '{schema_type}'")]
    FormatterNotFound {
        /// The unmarshaller kind the lookup was made for.
        schema_type: SchemaType,
        /// The requested format name.
        format: String,
    },

    /// Structural validation failed.
    #[error("value {value} not valid for schema of type {schema_type}:\n{schema_errors}")]
    InvalidSchemaValue {
        /// The raw value that failed validation.
        value: Value,
        /// The declared type of the schema (`any` when absent).
        schema_type: SchemaType,
        /// Every structural error reported for the value.
        schema_errors: SchemaErrors,
    },

    /// Structural validation passed but the formatter transform failed.
    #[error("failed to format value {value} to format {}: {cause}", .format.as_deref().unwrap_or("<default>"))]
    InvalidSchemaFormatValue {
        /// The raw value the transform rejected.
        value: Value,
        /// The schema `format`, if any.
        format: Option<String>,
        /// Why the transform failed.
        cause: FormatError,
    },

    /// The validator backend could not compile the schema.
    #[error("validator build error for schema '{schema}': {reason}")]
    ValidatorBuild {
        /// JSON Pointer of the schema node.
        schema: String,
        /// Reason reported by the backend.
        reason: String,
    },
}

/// A formatter transform rejected a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FormatError(String);

impl FormatError {
    /// Create a format error with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// The reason text.
    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// A single structural validation error with location context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralError {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Ordered collection of structural errors for one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaErrors {
    errors: Vec<StructuralError>,
}

impl SchemaErrors {
    /// Wrap a list of structural errors.
    pub fn new(errors: Vec<StructuralError>) -> Self {
        Self { errors }
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns a slice of all errors.
    pub fn errors(&self) -> &[StructuralError] {
        &self.errors
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<StructuralError> {
        self.errors
    }
}

impl From<Vec<StructuralError>> for SchemaErrors {
    fn from(errors: Vec<StructuralError>) -> Self {
        Self::new(errors)
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("  (root): value rejected by formatter predicate");
        }
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}
