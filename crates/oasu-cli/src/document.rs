//! # Document Loading
//!
//! OpenAPI documents and input values are read from disk as JSON or YAML,
//! chosen by file extension. The value argument also accepts `-` for stdin.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Load a JSON or YAML document.
///
/// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
/// as JSON.
pub fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(&content, is_yaml(path))
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Load the value to unmarshal; `-` reads stdin.
pub fn load_value(source: &str) -> Result<Value> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read value from stdin")?;
        return parse_document(&content, false).context("failed to parse value from stdin");
    }
    load_document(Path::new(source))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Parse `content` into a JSON tree. YAML scalars used as mapping keys
/// are read as strings; syntax errors carry the YAML line and column.
fn parse_document(content: &str, yaml: bool) -> Result<Value> {
    if yaml {
        Ok(serde_yaml::from_str(content)?)
    } else {
        Ok(serde_json::from_str(content)?)
    }
}
