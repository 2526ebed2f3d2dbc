//! # Unmarshal Subcommand
//!
//! Unmarshals one value against a schema addressed by JSON Pointer inside
//! an OpenAPI document and prints the result as JSON.
//!
//! ## Usage
//!
//! ```bash
//! oasu unmarshal --spec openapi.yaml \
//!     --schema '#/components/schemas/Pet' \
//!     --value pet.json --context response --pretty
//!
//! echo '{"name": "Rex"}' | oasu unmarshal --spec openapi.yaml \
//!     --schema /components/schemas/NewPet --value -
//! ```
//!
//! Exit code 0 on success, 1 when the value does not unmarshal.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use oasu_core::{SchemaNode, UnmarshalContext};
use oasu_schema::{SchemaRegistry, SchemaUnmarshallersFactory};

use crate::document::{load_document, load_value};

/// Traffic direction, controlling `readOnly`/`writeOnly` visibility.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextArg {
    /// Request bodies and parameters (`readOnly` hidden).
    Request,
    /// Response bodies (`writeOnly` hidden).
    Response,
}

impl From<ContextArg> for UnmarshalContext {
    fn from(arg: ContextArg) -> Self {
        match arg {
            ContextArg::Request => UnmarshalContext::Request,
            ContextArg::Response => UnmarshalContext::Response,
        }
    }
}

/// Arguments for the unmarshal subcommand.
#[derive(Args, Debug)]
pub struct UnmarshalArgs {
    /// OpenAPI document (JSON or YAML).
    #[arg(long)]
    pub spec: PathBuf,

    /// JSON Pointer of the schema inside the document.
    #[arg(long)]
    pub schema: String,

    /// Value to unmarshal (JSON or YAML file, `-` for stdin).
    #[arg(long)]
    pub value: String,

    /// Traffic direction.
    #[arg(long, value_enum)]
    pub context: Option<ContextArg>,

    /// External schema documents for `$ref` resolution, as `URI=PATH`.
    #[arg(long = "ref", value_name = "URI=PATH")]
    pub refs: Vec<String>,

    /// Pretty-print the output.
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the unmarshal subcommand, writing the result to stdout.
pub fn run_unmarshal(args: &UnmarshalArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_unmarshal_to(args, &mut out)
}

/// Execute the unmarshal subcommand, writing the result to `out`.
///
/// Schema problems and I/O failures are errors; a value that fails to
/// unmarshal is reported on stderr and yields exit code 1.
pub fn run_unmarshal_to(args: &UnmarshalArgs, out: &mut impl Write) -> Result<u8> {
    let document = Arc::new(load_document(&args.spec)?);
    let schema = SchemaNode::from_document(document, &args.schema)
        .with_context(|| format!("cannot address schema '{}'", args.schema))?;
    let value = load_value(&args.value)?;

    let mut builder = SchemaUnmarshallersFactory::builder().registry(load_registry(&args.refs)?);
    if let Some(context) = args.context {
        builder = builder.context(context.into());
    }
    let factory = builder.build();
    tracing::debug!(schema = %args.schema, context = ?args.context, "unmarshalling value");

    let native = match factory.unmarshal(&schema, &value) {
        Ok(native) => native,
        Err(e) => {
            eprintln!("{e}");
            return Ok(1);
        }
    };

    let rendered = native.to_json();
    if args.pretty {
        serde_json::to_writer_pretty(&mut *out, &rendered)?;
    } else {
        serde_json::to_writer(&mut *out, &rendered)?;
    }
    writeln!(out)?;
    Ok(0)
}

fn load_registry(refs: &[String]) -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    for entry in refs {
        let (uri, path) = entry
            .split_once('=')
            .with_context(|| format!("--ref expects URI=PATH, got '{entry}'"))?;
        registry = registry.with_document(uri, load_document(path.as_ref())?);
    }
    Ok(registry)
}
