//! # Schema Unmarshallers
//!
//! A [`SchemaUnmarshaller`] is bound to one schema node, one structural
//! validator and one formatter. Calling [`SchemaUnmarshaller::unmarshal_value`]
//! runs the pipeline:
//!
//! 1. JSON `null` short-circuits to [`NativeValue::Null`].
//! 2. The structural validator must report no errors.
//! 3. The formatter converts the value. Complex kinds then recurse into
//!    the generic container through child unmarshallers built by the
//!    factory.
//!
//! Scalar kinds are leaves. Array, object and untyped kinds hold a
//! borrowed [`SchemaUnmarshallersFactory`] plus the traffic direction.

mod any;
mod array;
mod object;

use std::sync::Arc;

use oasu_core::{
    FormatError, NativeValue, SchemaErrors, SchemaNode, SchemaType, UnmarshalContext,
    UnmarshalError,
};
use serde_json::Value;

use crate::factory::SchemaUnmarshallersFactory;
use crate::formatters::Formatter;
use crate::validation::LazyValidator;

/// Factory handle shared by the complex kinds.
#[derive(Clone, Copy)]
pub(crate) struct Complex<'f> {
    pub(crate) factory: &'f SchemaUnmarshallersFactory,
    pub(crate) context: Option<UnmarshalContext>,
}

enum Kind<'f> {
    Scalar,
    Array(Complex<'f>),
    Object(Complex<'f>),
    Any(Complex<'f>),
}

/// Validates and converts raw values against one schema node.
pub struct SchemaUnmarshaller<'f> {
    schema: SchemaNode,
    schema_type: SchemaType,
    validator: LazyValidator<'f>,
    formatter: Arc<dyn Formatter>,
    kind: Kind<'f>,
}

impl std::fmt::Debug for SchemaUnmarshaller<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaUnmarshaller")
            .field("schema", &self.schema.pointer())
            .field("schema_type", &self.schema_type)
            .finish_non_exhaustive()
    }
}

impl<'f> SchemaUnmarshaller<'f> {
    pub(crate) fn new(
        schema: SchemaNode,
        schema_type: SchemaType,
        validator: LazyValidator<'f>,
        formatter: Arc<dyn Formatter>,
        complex: Option<Complex<'f>>,
    ) -> Self {
        let kind = match (schema_type, complex) {
            (SchemaType::Array, Some(cx)) => Kind::Array(cx),
            (SchemaType::Object, Some(cx)) => Kind::Object(cx),
            (SchemaType::Any, Some(cx)) => Kind::Any(cx),
            _ => Kind::Scalar,
        };
        Self {
            schema,
            schema_type,
            validator,
            formatter,
            kind,
        }
    }

    /// The bound schema node.
    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    /// The resolved unmarshaller kind.
    pub fn schema_type(&self) -> SchemaType {
        self.schema_type
    }

    /// Validate and convert `value`.
    ///
    /// # Errors
    ///
    /// - `InvalidSchemaValue` if structural validation fails.
    /// - `InvalidSchemaFormatValue` if the formatter cannot convert.
    /// - Any error raised while building or running child unmarshallers.
    pub fn unmarshal_value(&self, value: &Value) -> Result<NativeValue, UnmarshalError> {
        if value.is_null() {
            return Ok(NativeValue::Null);
        }
        self.validate(value)?;
        match &self.kind {
            Kind::Array(cx) => self.unmarshal_array(cx, value),
            _ => self.unmarshal(value),
        }
    }

    /// Structural validation only.
    ///
    /// # Errors
    ///
    /// - `InvalidSchemaValue` carrying every structural error.
    /// - `ValidatorBuild` if the schema cannot be compiled.
    pub fn validate(&self, value: &Value) -> Result<(), UnmarshalError> {
        let errors = self.validator.get(&self.schema)?.iter_errors(value);
        if errors.is_empty() {
            return Ok(());
        }
        Err(UnmarshalError::InvalidSchemaValue {
            value: value.clone(),
            schema_type: self.schema.declared_type(),
            schema_errors: SchemaErrors::new(errors),
        })
    }

    /// Convert without structural validation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchemaFormatValue` if the formatter cannot convert,
    /// plus any child unmarshaller error for object and untyped kinds.
    pub fn unmarshal(&self, value: &Value) -> Result<NativeValue, UnmarshalError> {
        match &self.kind {
            Kind::Scalar | Kind::Array(_) => self.format(value),
            Kind::Object(cx) => self.unmarshal_object(cx, value),
            Kind::Any(cx) => self.unmarshal_any(cx, value),
        }
    }

    /// Run only the formatter predicate.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchemaValue` with an empty error list.
    pub fn formatter_validate(&self, value: &Value) -> Result<(), UnmarshalError> {
        if self.formatter.validate(value) {
            return Ok(());
        }
        Err(UnmarshalError::InvalidSchemaValue {
            value: value.clone(),
            schema_type: self.schema.declared_type(),
            schema_errors: SchemaErrors::default(),
        })
    }

    fn format(&self, value: &Value) -> Result<NativeValue, UnmarshalError> {
        self.formatter
            .unmarshal(value)
            .map_err(|cause| self.format_error(value, cause))
    }

    /// Formatter output as a generic container for the complex kinds.
    fn format_generic(&self, value: &Value) -> Result<Value, UnmarshalError> {
        Ok(match self.format(value)? {
            NativeValue::Json(raw) => raw,
            other => other.to_json(),
        })
    }

    fn format_error(&self, value: &Value, cause: FormatError) -> UnmarshalError {
        UnmarshalError::InvalidSchemaFormatValue {
            value: value.clone(),
            format: self.schema.format().map(str::to_string),
            cause,
        }
    }
}
