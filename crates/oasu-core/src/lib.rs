//! # oasu-core — Foundational Types for Schema Unmarshalling
//!
//! This crate is the leaf of the workspace. It defines the types shared by
//! the unmarshalling engine (`oasu-schema`) and the command-line front end
//! (`oasu-cli`); it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Schema nodes are handles, not copies.** A [`SchemaNode`] is an
//!    `Arc` to the owning OpenAPI document plus a JSON Pointer. Child
//!    accessors follow local `$ref`s against the same document, so a
//!    single parsed document serves every unmarshal call.
//!
//! 2. **Closed type enum.** [`SchemaType`] has exactly one variant per
//!    unmarshaller kind. An absent `type` is [`SchemaType::Any`].
//!
//! 3. **Native values keep their coercion.** [`NativeValue`] has distinct
//!    variants for dates, timestamps, UUIDs and bytes, plus a
//!    [`NativeValue::Json`] escape hatch for values passed through
//!    untouched.
//!
//! 4. **One error taxonomy.** [`UnmarshalError`] carries the offending
//!    value and the full structural error list, never just the first.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `oasu-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod context;
pub mod error;
pub mod schema;
pub mod temporal;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use context::{AccessMode, UnmarshalContext};
pub use error::{FormatError, SchemaErrors, StructuralError, UnmarshalError};
pub use schema::{AdditionalProperties, DeclaredProperties, SchemaNode, SchemaType};
pub use value::{Model, NativeValue};
