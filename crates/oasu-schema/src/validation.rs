//! # Structural Validation: the Validator Adapter
//!
//! The unmarshallers never interpret JSON Schema themselves. They ask a
//! [`ValidatorBackend`] for a [`SchemaValidator`] scoped to one schema node
//! and read back the list of structural errors.
//!
//! The default backend, [`JsonSchemaBackend`], translates the node to
//! Draft 4 (see [`crate::dialect`]) and compiles it with the `jsonschema`
//! crate. Custom format predicates are registered with the compiled
//! validator so a value a custom formatter would reject also fails
//! validation.
//!
//! ## Schema Resolution
//!
//! Local `$ref`s are inlined during translation. Any other `$ref` URI is
//! looked up in a [`SchemaRegistry`] of externally loaded documents. The
//! retriever never performs network requests: an unknown URI resolves to
//! the permissive schema `{}`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use jsonschema::{Retrieve, Uri};
use oasu_core::{AccessMode, SchemaNode, StructuralError, UnmarshalError};
use serde_json::Value;

use crate::dialect;
use crate::formatters::FormatChecker;

/// A structural validator bound to one schema.
pub trait SchemaValidator: Send + Sync {
    /// Every structural error of `value` against the bound schema.
    fn iter_errors(&self, value: &Value) -> Vec<StructuralError>;
}

/// Builds a [`SchemaValidator`] per schema node.
pub trait ValidatorBackend: Send + Sync {
    /// Compile a validator for `schema`.
    ///
    /// `formats` holds the custom format predicates; `mode` selects
    /// `readOnly`/`writeOnly` enforcement.
    ///
    /// # Errors
    ///
    /// Returns `UnmarshalError::ValidatorBuild` if the schema cannot be compiled.
    fn build(
        &self,
        schema: &SchemaNode,
        formats: &FormatChecker,
        mode: Option<AccessMode>,
    ) -> Result<Box<dyn SchemaValidator>, UnmarshalError>;
}

/// A validator compiled on first use.
///
/// Unmarshallers built only for their formatter predicate (the untyped
/// type trial) never pay for compilation.
pub(crate) struct LazyValidator<'f> {
    backend: &'f dyn ValidatorBackend,
    formats: &'f FormatChecker,
    mode: Option<AccessMode>,
    compiled: OnceLock<Box<dyn SchemaValidator>>,
}

impl<'f> LazyValidator<'f> {
    pub(crate) fn new(
        backend: &'f dyn ValidatorBackend,
        formats: &'f FormatChecker,
        mode: Option<AccessMode>,
    ) -> Self {
        Self {
            backend,
            formats,
            mode,
            compiled: OnceLock::new(),
        }
    }

    /// The compiled validator for `schema`, building it on the first call.
    pub(crate) fn get(&self, schema: &SchemaNode) -> Result<&dyn SchemaValidator, UnmarshalError> {
        if let Some(validator) = self.compiled.get() {
            return Ok(&**validator);
        }
        let built = self.backend.build(schema, self.formats, self.mode)?;
        Ok(&**self.compiled.get_or_init(|| built))
    }
}

/// Externally loaded schema documents, keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    documents: Arc<HashMap<String, Value>>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `document` under `uri`.
    ///
    /// The document is also indexed by its `$id` (or Draft 4 `id`) and by
    /// the last path segment of `uri`, so relative references by file name
    /// resolve too.
    pub fn with_document(mut self, uri: impl Into<String>, document: Value) -> Self {
        let uri = uri.into();
        let documents = Arc::make_mut(&mut self.documents);

        if let Some(id) = document
            .get("$id")
            .or_else(|| document.get("id"))
            .and_then(Value::as_str)
        {
            documents.insert(id.to_string(), document.clone());
        }
        if let Some(filename) = uri.rsplit('/').next().filter(|f| *f != uri) {
            documents.insert(filename.to_string(), document.clone());
        }
        documents.insert(uri, document);
        self
    }

    /// Returns the number of indexed URIs.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up a document by exact URI, then by file name.
    pub fn get(&self, uri: &str) -> Option<&Value> {
        let without_fragment = uri.split('#').next().unwrap_or(uri);
        self.documents.get(without_fragment).or_else(|| {
            let filename = without_fragment.rsplit('/').next().unwrap_or(without_fragment);
            self.documents.get(filename)
        })
    }
}

/// Resolves `$ref` URIs against a [`SchemaRegistry`] without network access.
struct LocalSchemaRetriever {
    registry: SchemaRegistry,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        match self.registry.get(uri.as_str()) {
            Some(document) => Ok(document.clone()),
            None => {
                tracing::debug!(uri = uri.as_str(), "unregistered $ref resolved permissively");
                Ok(serde_json::json!({}))
            }
        }
    }
}

/// Validator backend built on the `jsonschema` crate.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaBackend {
    registry: SchemaRegistry,
}

impl JsonSchemaBackend {
    /// A backend resolving external references against `registry`.
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    /// The registry used for external references.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

impl ValidatorBackend for JsonSchemaBackend {
    fn build(
        &self,
        schema: &SchemaNode,
        formats: &FormatChecker,
        mode: Option<AccessMode>,
    ) -> Result<Box<dyn SchemaValidator>, UnmarshalError> {
        let translated = dialect::translate(schema, formats, mode);

        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft4);
        opts.should_validate_formats(true);
        opts.with_retriever(LocalSchemaRetriever {
            registry: self.registry.clone(),
        });
        for (name, formatter) in formats.iter() {
            let formatter = Arc::clone(formatter);
            opts.with_format(name.to_string(), move |s: &str| {
                formatter.validate(&Value::String(s.to_string()))
            });
        }

        let validator = opts
            .build(&translated)
            .map_err(|e| UnmarshalError::ValidatorBuild {
                schema: schema.pointer().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(JsonSchemaValidator { validator }))
    }
}

/// A compiled `jsonschema` validator.
struct JsonSchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator for JsonSchemaValidator {
    fn iter_errors(&self, value: &Value) -> Vec<StructuralError> {
        self.validator
            .iter_errors(value)
            .map(|e| StructuralError {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect()
    }
}
