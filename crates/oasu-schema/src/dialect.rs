//! # OpenAPI 3.0 → JSON Schema Draft 4 Translation
//!
//! OpenAPI 3.0 Schema Objects are a Draft 4 dialect with a few extra
//! keywords. Before a node is handed to the `jsonschema` crate it is
//! rewritten so that plain Draft 4 semantics give OpenAPI behavior:
//!
//! - `nullable: true` adds `"null"` to `type` (and to `enum` if present).
//! - In [`AccessMode::Write`] every `readOnly` property is removed from
//!   `required` and replaced by an unsatisfiable schema; [`AccessMode::Read`]
//!   does the same for `writeOnly`.
//! - `format` survives only for names registered as custom formats;
//!   built-in formats are enforced by formatters, not by validation.
//! - Local `$ref`s are inlined from the owning document. A reference back
//!   into a schema already being expanded becomes `{}`; the nested value is
//!   validated again by the child unmarshaller anyway.
//!
//! Only schema-bearing keywords are walked. Literal keywords such as
//! `default`, `example` and `enum` are copied verbatim.

use oasu_core::{AccessMode, SchemaNode};
use serde_json::{json, Map, Value};

use crate::formatters::FormatChecker;

/// Upper bound on nested `$ref` expansion per translated node.
const MAX_INLINE_DEPTH: usize = 64;

/// Keywords whose value is a single subschema.
const SUBSCHEMA_KEYWORDS: &[&str] = &["items", "not", "additionalProperties"];

/// Keywords whose value is a list of subschemas.
const SUBSCHEMA_LIST_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// Keywords dropped from the translated schema.
const OPENAPI_ONLY_KEYWORDS: &[&str] = &["nullable", "discriminator", "xml", "externalDocs"];

/// Translate the schema node into a Draft 4 schema.
pub fn translate(node: &SchemaNode, formats: &FormatChecker, mode: Option<AccessMode>) -> Value {
    let mut translator = Translator {
        document: node.document(),
        formats,
        mode,
        expanding: Vec::new(),
    };
    translator.schema(node.as_value())
}

struct Translator<'a> {
    document: &'a Value,
    formats: &'a FormatChecker,
    mode: Option<AccessMode>,
    expanding: Vec<String>,
}

impl<'a> Translator<'a> {
    fn schema(&mut self, schema: &Value) -> Value {
        let Value::Object(map) = schema else {
            return schema.clone();
        };

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            if let Some(pointer) = reference.strip_prefix('#') {
                return self.inline(pointer);
            }
            // External reference: resolved by the validator's retriever.
            return schema.clone();
        }

        let mut out = Map::with_capacity(map.len());
        for (key, value) in map {
            let key = key.as_str();
            if OPENAPI_ONLY_KEYWORDS.contains(&key) || key.starts_with("x-") {
                continue;
            }
            let translated = match key {
                "format" => match value.as_str() {
                    Some(name) if self.formats.contains(name) => value.clone(),
                    _ => continue,
                },
                "properties" => self.properties(value),
                k if SUBSCHEMA_KEYWORDS.contains(&k) => self.schema(value),
                k if SUBSCHEMA_LIST_KEYWORDS.contains(&k) => match value {
                    Value::Array(items) => {
                        Value::Array(items.iter().map(|s| self.schema(s)).collect())
                    }
                    other => other.clone(),
                },
                _ => value.clone(),
            };
            out.insert(key.to_string(), translated);
        }

        if map.get("nullable").and_then(Value::as_bool) == Some(true) {
            make_nullable(&mut out);
        }
        self.apply_access_mode(map, &mut out);

        Value::Object(out)
    }

    fn properties(&mut self, value: &Value) -> Value {
        let Value::Object(props) = value else {
            return value.clone();
        };
        Value::Object(
            props
                .iter()
                .map(|(name, schema)| (name.clone(), self.schema(schema)))
                .collect(),
        )
    }

    fn inline(&mut self, pointer: &str) -> Value {
        if self.expanding.iter().any(|p| p == pointer) || self.expanding.len() >= MAX_INLINE_DEPTH {
            return json!({});
        }
        let Some(target) = self.document.pointer(pointer) else {
            tracing::debug!(pointer, "dangling $ref left unconstrained for validation");
            return json!({});
        };
        self.expanding.push(pointer.to_string());
        let translated = self.schema(target);
        self.expanding.pop();
        translated
    }

    /// Hide properties the access mode forbids.
    fn apply_access_mode(&self, original: &Map<String, Value>, out: &mut Map<String, Value>) {
        let Some(mode) = self.mode else {
            return;
        };
        let Some(Value::Object(props)) = original.get("properties") else {
            return;
        };
        let keyword = match mode {
            AccessMode::Write => "readOnly",
            AccessMode::Read => "writeOnly",
        };
        let hidden: Vec<&String> = props
            .iter()
            .filter(|(_, schema)| {
                self.resolve(schema)
                    .get(keyword)
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            })
            .map(|(name, _)| name)
            .collect();
        if hidden.is_empty() {
            return;
        }

        if let Some(Value::Array(required)) = out.get_mut("required") {
            required.retain(|r| !r.as_str().is_some_and(|r| hidden.iter().any(|h| *h == r)));
            if required.is_empty() {
                out.remove("required");
            }
        }
        if let Some(Value::Object(out_props)) = out.get_mut("properties") {
            for name in hidden {
                out_props.insert(name.clone(), json!({"not": {}}));
            }
        }
    }

    /// Follow local references without translating.
    fn resolve<'v>(&self, mut schema: &'v Value) -> &'v Value
    where
        'a: 'v,
    {
        for _ in 0..MAX_INLINE_DEPTH {
            match schema
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix('#'))
                .and_then(|p| self.document.pointer(p))
            {
                Some(target) => schema = target,
                None => break,
            }
        }
        schema
    }
}

fn make_nullable(out: &mut Map<String, Value>) {
    match out.get_mut("type") {
        Some(Value::String(t)) => {
            let t = std::mem::take(t);
            out.insert("type".to_string(), json!([t, "null"]));
        }
        Some(Value::Array(types)) => {
            if !types.iter().any(|t| t == "null") {
                types.push(json!("null"));
            }
        }
        _ => {}
    }
    if let Some(Value::Array(values)) = out.get_mut("enum") {
        if !values.contains(&Value::Null) {
            values.push(Value::Null);
        }
    }
}
