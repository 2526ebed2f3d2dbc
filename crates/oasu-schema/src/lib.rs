//! # oasu-schema — Schema-Driven Unmarshalling Engine
//!
//! Turns a decoded JSON value plus an OpenAPI 3.0 Schema Object into a
//! validated, type-coerced [`NativeValue`](oasu_core::NativeValue).
//!
//! ## Pipeline
//!
//! [`SchemaUnmarshallersFactory::create`] builds a [`SchemaUnmarshaller`]
//! bound to one schema node. Unmarshalling a value then:
//!
//! 1. short-circuits JSON `null`,
//! 2. validates structurally through a [`ValidatorBackend`] (the default
//!    [`JsonSchemaBackend`] compiles a Draft 4 translation of the node
//!    with the `jsonschema` crate),
//! 3. converts through a [`Formatter`] chosen by `(type, format)`, custom
//!    formatters first,
//! 4. recurses into arrays, objects, `oneOf`/`allOf` compositions and
//!    untyped schemas.
//!
//! ## Modules
//!
//! - [`formatters`]: formatter trait, built-in table, boolean coercion.
//! - [`dialect`]: OpenAPI 3.0 → Draft 4 translation.
//! - [`validation`]: validator adapter and external schema registry.
//! - [`factory`]: unmarshaller construction and configuration.
//! - [`model`]: `x-model` binding.
//!
//! ## Crate Policy
//!
//! - Depends only on `oasu-core` internally.
//! - Factories are immutable after `build()`; unmarshallers borrow them.
//! - Every structural error is reported, never just the first.

pub mod dialect;
pub mod factory;
pub mod formatters;
pub mod model;
mod unmarshallers;
pub mod validation;

pub use factory::{custom_formatters, FactoryBuilder, Properties, SchemaUnmarshallersFactory};
pub use formatters::{BuiltinFormatter, CustomFormatters, FnFormatter, FormatChecker, Formatter};
pub use model::{DynamicModelFactory, ModelFactory};
pub use unmarshallers::SchemaUnmarshaller;
pub use validation::{JsonSchemaBackend, SchemaRegistry, SchemaValidator, ValidatorBackend};
