//! # oasu-cli — Command-Line Front End
//!
//! Thin wrapper over `oasu-schema`: loads an OpenAPI document and a value,
//! unmarshals, prints JSON.
//!
//! ## Subcommands
//!
//! - `unmarshal`: unmarshal a value against a schema addressed by JSON Pointer
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers live in modules.
//! - Handlers return an exit code; `anyhow` only at this layer.

pub mod document;
pub mod unmarshal;
