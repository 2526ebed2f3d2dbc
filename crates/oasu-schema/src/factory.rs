//! # Unmarshaller Factory
//!
//! [`SchemaUnmarshallersFactory::create`] resolves the unmarshaller kind
//! for a schema node, picks its formatter (custom first, built-in second)
//! and wires a structural validator scoped to the node. The validator is
//! compiled on the first structural check. Complex kinds
//! (`array`, `object`, untyped) borrow the factory to build child
//! unmarshallers on demand.
//!
//! The factory is immutable once built and can be shared across threads;
//! every `create()` call allocates fresh unmarshaller state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use oasu_core::{NativeValue, SchemaNode, SchemaType, UnmarshalContext, UnmarshalError};
use serde_json::Value;

use crate::formatters::{BuiltinFormatter, CustomFormatters, FormatChecker, Formatter};
use crate::model::{DynamicModelFactory, ModelFactory};
use crate::unmarshallers::{Complex, SchemaUnmarshaller};
use crate::validation::{JsonSchemaBackend, LazyValidator, SchemaRegistry, ValidatorBackend};

/// Creates schema-bound unmarshallers.
pub struct SchemaUnmarshallersFactory {
    custom_formatters: CustomFormatters,
    format_checker: FormatChecker,
    context: Option<UnmarshalContext>,
    validator_backend: Arc<dyn ValidatorBackend>,
    model_factory: Arc<dyn ModelFactory>,
}

impl fmt::Debug for SchemaUnmarshallersFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaUnmarshallersFactory")
            .field("custom_formats", &self.format_checker)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Default for SchemaUnmarshallersFactory {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SchemaUnmarshallersFactory {
    /// A factory with no custom formatters and no context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start configuring a factory.
    pub fn builder() -> FactoryBuilder {
        FactoryBuilder::default()
    }

    /// The traffic direction this factory unmarshals for.
    pub fn context(&self) -> Option<UnmarshalContext> {
        self.context
    }

    /// The collaborator binding `x-model` objects.
    pub fn model_factory(&self) -> &dyn ModelFactory {
        self.model_factory.as_ref()
    }

    /// Create an unmarshaller for `schema`.
    ///
    /// The kind is `type_override`, else the schema's `type`, else untyped.
    ///
    /// # Errors
    ///
    /// - `InvalidSchema` if `schema` is `None` or has an unknown `type`.
    /// - `FormatterNotFound` if neither a custom nor a built-in formatter
    ///   matches the schema's `format` for the resolved kind.
    ///
    /// A schema the validator backend cannot compile is reported as
    /// `ValidatorBuild` by the first structural check.
    pub fn create(
        &self,
        schema: Option<&SchemaNode>,
        type_override: Option<SchemaType>,
    ) -> Result<SchemaUnmarshaller<'_>, UnmarshalError> {
        let schema = schema.ok_or_else(|| UnmarshalError::InvalidSchema("missing schema".to_string()))?;

        if schema.deprecated() {
            tracing::warn!(schema = schema.pointer(), "the schema is deprecated");
        }

        let schema_type = match type_override {
            Some(t) => t,
            None => schema.schema_type()?.unwrap_or(SchemaType::Any),
        };
        let formatter = self.get_formatter(schema_type, schema.format())?;
        let validator = self.get_validator();

        tracing::trace!(
            schema = schema.pointer(),
            schema_type = %schema_type,
            "created unmarshaller"
        );

        let complex = schema_type.is_complex().then_some(Complex {
            factory: self,
            context: self.context,
        });
        Ok(SchemaUnmarshaller::new(
            schema.clone(),
            schema_type,
            validator,
            formatter,
            complex,
        ))
    }

    /// Validate and unmarshal `value` against `schema` in one call.
    ///
    /// # Errors
    ///
    /// Any error from [`create`](Self::create) or from unmarshalling.
    pub fn unmarshal(&self, schema: &SchemaNode, value: &Value) -> Result<NativeValue, UnmarshalError> {
        self.create(Some(schema), None)?.unmarshal_value(value)
    }

    fn get_formatter(
        &self,
        schema_type: SchemaType,
        format: Option<&str>,
    ) -> Result<Arc<dyn Formatter>, UnmarshalError> {
        if let Some(custom) = format.and_then(|f| self.custom_formatters.get(f)) {
            return Ok(Arc::clone(custom));
        }
        BuiltinFormatter::lookup(schema_type, format)
            .map(|builtin| Arc::new(builtin) as Arc<dyn Formatter>)
            .ok_or_else(|| UnmarshalError::FormatterNotFound {
                schema_type,
                format: format.unwrap_or_default().to_string(),
            })
    }

    fn get_validator(&self) -> LazyValidator<'_> {
        let mode = self.context.map(UnmarshalContext::access_mode);
        LazyValidator::new(self.validator_backend.as_ref(), &self.format_checker, mode)
    }
}

/// Configuration for a [`SchemaUnmarshallersFactory`].
#[derive(Default)]
pub struct FactoryBuilder {
    custom_formatters: CustomFormatters,
    context: Option<UnmarshalContext>,
    validator_backend: Option<Arc<dyn ValidatorBackend>>,
    model_factory: Option<Arc<dyn ModelFactory>>,
    registry: SchemaRegistry,
}

impl FactoryBuilder {
    /// Register a custom formatter for `format`, overriding any built-in.
    pub fn custom_formatter(mut self, format: impl Into<String>, formatter: Arc<dyn Formatter>) -> Self {
        self.custom_formatters.insert(format.into(), formatter);
        self
    }

    /// Register several custom formatters.
    pub fn custom_formatters(mut self, formatters: CustomFormatters) -> Self {
        self.custom_formatters.extend(formatters);
        self
    }

    /// Set the traffic direction.
    pub fn context(mut self, context: UnmarshalContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Replace the `x-model` binding collaborator.
    pub fn model_factory(mut self, model_factory: Arc<dyn ModelFactory>) -> Self {
        self.model_factory = Some(model_factory);
        self
    }

    /// Replace the structural validator backend.
    ///
    /// Takes precedence over [`registry`](Self::registry).
    pub fn validator_backend(mut self, backend: Arc<dyn ValidatorBackend>) -> Self {
        self.validator_backend = Some(backend);
        self
    }

    /// External documents for the default backend's `$ref` resolution.
    pub fn registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Finish configuration.
    pub fn build(self) -> SchemaUnmarshallersFactory {
        let format_checker = FormatChecker::from_formatters(&self.custom_formatters);
        let registry = self.registry;
        SchemaUnmarshallersFactory {
            custom_formatters: self.custom_formatters,
            format_checker,
            context: self.context,
            validator_backend: self
                .validator_backend
                .unwrap_or_else(|| Arc::new(JsonSchemaBackend::new(registry))),
            model_factory: self
                .model_factory
                .unwrap_or_else(|| Arc::new(DynamicModelFactory)),
        }
    }
}

/// Custom formatter map from `(name, formatter)` pairs.
pub fn custom_formatters<I, S>(entries: I) -> CustomFormatters
where
    I: IntoIterator<Item = (S, Arc<dyn Formatter>)>,
    S: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Properties map type produced by object unmarshalling.
pub type Properties = BTreeMap<String, NativeValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::FnFormatter;
    use serde_json::json;

    #[test]
    fn missing_schema_is_invalid() {
        let factory = SchemaUnmarshallersFactory::new();
        assert!(matches!(
            factory.create(None, None),
            Err(UnmarshalError::InvalidSchema(_))
        ));
    }

    #[test]
    fn type_resolution_prefers_override() {
        let factory = SchemaUnmarshallersFactory::new();
        let node = SchemaNode::new(json!({"type": "string"})).unwrap();
        assert_eq!(factory.create(Some(&node), None).unwrap().schema_type(), SchemaType::String);
        assert_eq!(
            factory.create(Some(&node), Some(SchemaType::Integer)).unwrap().schema_type(),
            SchemaType::Integer
        );

        let untyped = SchemaNode::new(json!({})).unwrap();
        assert_eq!(factory.create(Some(&untyped), None).unwrap().schema_type(), SchemaType::Any);
    }

    #[test]
    fn unknown_format_is_formatter_not_found() {
        let factory = SchemaUnmarshallersFactory::new();
        let node = SchemaNode::new(json!({"type": "string", "format": "email"})).unwrap();
        match factory.create(Some(&node), None) {
            Err(UnmarshalError::FormatterNotFound { schema_type, format }) => {
                assert_eq!(schema_type, SchemaType::String);
                assert_eq!(format, "email");
            }
            other => panic!("expected FormatterNotFound, got {other:?}"),
        }
    }

    #[test]
    fn custom_formatter_overrides_builtin() {
        let shout: Arc<dyn Formatter> = Arc::new(FnFormatter::from_callables(
            |v: &Value| v.is_string(),
            |v: &Value| Ok(NativeValue::String(v.as_str().unwrap_or_default().to_uppercase())),
        ));
        let factory = SchemaUnmarshallersFactory::builder()
            .custom_formatters(custom_formatters([("date", shout)]))
            .build();
        let node = SchemaNode::new(json!({"type": "string", "format": "date"})).unwrap();
        assert_eq!(
            factory.unmarshal(&node, &json!("tuesday")).unwrap(),
            NativeValue::String("TUESDAY".to_string())
        );
    }

    /// Counts compilations and optionally refuses to compile.
    #[derive(Default)]
    struct CountingBackend {
        builds: std::sync::atomic::AtomicUsize,
        refuse: bool,
    }

    impl ValidatorBackend for CountingBackend {
        fn build(
            &self,
            schema: &SchemaNode,
            formats: &FormatChecker,
            mode: Option<oasu_core::AccessMode>,
        ) -> Result<Box<dyn crate::validation::SchemaValidator>, UnmarshalError> {
            self.builds.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if self.refuse {
                return Err(UnmarshalError::ValidatorBuild {
                    schema: schema.pointer().to_string(),
                    reason: "refused".to_string(),
                });
            }
            JsonSchemaBackend::default().build(schema, formats, mode)
        }
    }

    #[test]
    fn validators_compile_on_first_check_only() {
        let backend = Arc::new(CountingBackend::default());
        let factory = SchemaUnmarshallersFactory::builder()
            .validator_backend(backend.clone())
            .build();
        let builds = || backend.builds.load(std::sync::atomic::Ordering::SeqCst);

        let node = SchemaNode::new(json!({"type": "integer"})).unwrap();
        let unmarshaller = factory.create(Some(&node), None).unwrap();
        assert_eq!(builds(), 0);
        unmarshaller.validate(&json!(1)).unwrap();
        unmarshaller.validate(&json!(2)).unwrap();
        assert_eq!(builds(), 1);

        // Root check plus the matching trial kind; rejected kinds never compile.
        let untyped = SchemaNode::new(json!({})).unwrap();
        assert_eq!(
            factory.unmarshal(&untyped, &json!("s")).unwrap(),
            NativeValue::String("s".to_string())
        );
        assert_eq!(builds(), 3);
    }

    #[test]
    fn validator_build_failure_surfaces_on_validate() {
        let factory = SchemaUnmarshallersFactory::builder()
            .validator_backend(Arc::new(CountingBackend {
                refuse: true,
                ..CountingBackend::default()
            }))
            .build();
        let node = SchemaNode::new(json!({"type": "integer"})).unwrap();
        let unmarshaller = factory.create(Some(&node), None).unwrap();
        assert!(matches!(
            unmarshaller.unmarshal_value(&json!(1)),
            Err(UnmarshalError::ValidatorBuild { .. })
        ));
        assert_eq!(unmarshaller.unmarshal(&json!(1)).unwrap(), NativeValue::Integer(1));
    }

    #[test]
    fn debug_lists_custom_formats() {
        let factory = SchemaUnmarshallersFactory::builder()
            .context(UnmarshalContext::Request)
            .build();
        let text = format!("{factory:?}");
        assert!(text.contains("Request"));
    }
}
