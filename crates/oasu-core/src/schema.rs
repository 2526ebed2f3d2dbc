//! # Schema Nodes: Read-Only Views into an OpenAPI Document
//!
//! A [`SchemaNode`] addresses one Schema Object inside a shared, immutable
//! document by JSON Pointer. Accessors expose the OpenAPI 3.0 keywords the
//! unmarshallers care about, with their documented defaults applied.
//!
//! ## Reference Resolution
//!
//! Child accessors (`items`, `properties`, `oneOf`, …) transparently follow
//! local `$ref`s of the form `#/components/schemas/Pet` against the owning
//! document. Chains are bounded by [`MAX_REF_HOPS`]; a dangling or cyclic
//! chain is reported as [`UnmarshalError::InvalidSchema`]. External
//! references are left in place for the validator's retriever.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::error::UnmarshalError;

/// Maximum number of `$ref` hops followed when resolving a node.
pub const MAX_REF_HOPS: usize = 32;

static NULL: Value = Value::Null;

/// The unmarshaller kind selected for a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    /// `type: string`
    String,
    /// `type: integer`
    Integer,
    /// `type: number`
    Number,
    /// `type: boolean`
    Boolean,
    /// `type: array`
    Array,
    /// `type: object`
    Object,
    /// No `type` (or `type: null`): inferred from the value.
    Any,
}

impl SchemaType {
    /// The OpenAPI name of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    /// Whether unmarshallers of this kind recurse through the factory.
    pub fn is_complex(self) -> bool {
        matches!(self, Self::Array | Self::Object | Self::Any)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaType {
    type Err = UnmarshalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            "object" => Ok(Self::Object),
            "any" | "null" => Ok(Self::Any),
            other => Err(UnmarshalError::InvalidSchema(format!(
                "unknown schema type {other:?}"
            ))),
        }
    }
}

/// The `additionalProperties` policy of an object schema.
#[derive(Debug, Clone)]
pub enum AdditionalProperties {
    /// `true` or absent: extra keys pass through verbatim.
    Allowed,
    /// `false`: extra keys are dropped.
    Denied,
    /// A schema: extra keys are unmarshalled through it.
    Schema(SchemaNode),
}

/// Declared property schemas in declaration order.
///
/// Re-declaring a name replaces its schema in place, so an overriding
/// `allOf` member keeps the position of the first declaration.
#[derive(Debug, Clone, Default)]
pub struct DeclaredProperties {
    entries: Vec<(String, SchemaNode)>,
}

impl DeclaredProperties {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name`, replacing an earlier declaration of the same name.
    pub fn insert(&mut self, name: String, schema: SchemaNode) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = schema,
            None => self.entries.push((name, schema)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(n, _)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaNode)> {
        self.entries.iter().map(|(n, s)| (n, s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<(String, SchemaNode)> for DeclaredProperties {
    fn extend<I: IntoIterator<Item = (String, SchemaNode)>>(&mut self, iter: I) {
        for (name, schema) in iter {
            self.insert(name, schema);
        }
    }
}

impl IntoIterator for DeclaredProperties {
    type Item = (String, SchemaNode);
    type IntoIter = std::vec::IntoIter<(String, SchemaNode)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Handle to one Schema Object inside a shared OpenAPI document.
#[derive(Clone)]
pub struct SchemaNode {
    document: Arc<Value>,
    pointer: String,
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("pointer", &self.pointer)
            .field("schema", self.as_value())
            .finish()
    }
}

impl SchemaNode {
    /// Wrap a standalone schema value; the value is its own document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if a top-level `$ref` cannot be resolved.
    pub fn new(schema: Value) -> Result<Self, UnmarshalError> {
        Self::from_document(Arc::new(schema), "")
    }

    /// Address the schema at `pointer` inside `document`.
    ///
    /// `pointer` is an RFC 6901 JSON Pointer (`""` for the root, or e.g.
    /// `/components/schemas/Pet`). A leading `#` is accepted and stripped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the pointer, or any `$ref` it leads to,
    /// does not address a value in the document.
    pub fn from_document(document: Arc<Value>, pointer: &str) -> Result<Self, UnmarshalError> {
        let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
        let resolved = resolve_pointer(&document, pointer)?;
        Ok(Self {
            document,
            pointer: resolved,
        })
    }

    /// The owning document.
    pub fn document(&self) -> &Arc<Value> {
        &self.document
    }

    /// JSON Pointer of this node within its document.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// The raw schema value.
    pub fn as_value(&self) -> &Value {
        self.document.pointer(&self.pointer).unwrap_or(&NULL)
    }

    /// Look up a raw keyword value.
    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.as_value().get(keyword)
    }

    /// Whether the schema declares `keyword`.
    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// The declared `type`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for unknown type names or non-string `type`.
    pub fn schema_type(&self) -> Result<Option<SchemaType>, UnmarshalError> {
        match self.get("type") {
            None => Ok(None),
            Some(Value::String(s)) => s.parse().map(Some),
            Some(other) => Err(UnmarshalError::InvalidSchema(format!(
                "type must be a string at '{}', got {other}",
                self.pointer
            ))),
        }
    }

    /// The declared type with `any` substituted for an absent or unknown one.
    ///
    /// Used for error reporting only.
    pub fn declared_type(&self) -> SchemaType {
        self.schema_type().ok().flatten().unwrap_or(SchemaType::Any)
    }

    /// The `format` keyword.
    pub fn format(&self) -> Option<&str> {
        self.get("format").and_then(Value::as_str)
    }

    /// `nullable`, default false.
    pub fn nullable(&self) -> bool {
        self.flag("nullable")
    }

    /// `readOnly`, default false.
    pub fn read_only(&self) -> bool {
        self.flag("readOnly")
    }

    /// `writeOnly`, default false.
    pub fn write_only(&self) -> bool {
        self.flag("writeOnly")
    }

    /// `deprecated`, default false.
    pub fn deprecated(&self) -> bool {
        self.flag("deprecated")
    }

    /// The `default` literal, if declared (a declared `null` is `Some`).
    pub fn default_value(&self) -> Option<&Value> {
        self.get("default")
    }

    /// The `x-model` tag naming the model to bind the object to.
    pub fn x_model(&self) -> Option<&str> {
        self.get("x-model").and_then(Value::as_str)
    }

    /// The `items` schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if `items` is a dangling `$ref`.
    pub fn items(&self) -> Result<Option<SchemaNode>, UnmarshalError> {
        if self.contains("items") {
            self.child(&["items"]).map(Some)
        } else {
            Ok(None)
        }
    }

    /// The `oneOf` branches, in declaration order (empty when absent).
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if a branch is a dangling `$ref`.
    pub fn one_of(&self) -> Result<Vec<SchemaNode>, UnmarshalError> {
        self.branches("oneOf")
    }

    /// The `allOf` members, in declaration order (empty when absent).
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if a member is a dangling `$ref`.
    pub fn all_of(&self) -> Result<Vec<SchemaNode>, UnmarshalError> {
        self.branches("allOf")
    }

    /// Declared properties, including those inherited through `allOf`.
    ///
    /// Own properties come first, in document order. Properties of later
    /// `allOf` members override earlier ones, and all of them override the
    /// schema's own `properties`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if a property schema is a dangling `$ref`.
    pub fn properties(&self) -> Result<DeclaredProperties, UnmarshalError> {
        let mut all = DeclaredProperties::new();
        self.collect_properties(&mut all, 0)?;
        Ok(all)
    }

    /// The `additionalProperties` policy, default [`AdditionalProperties::Allowed`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for a dangling `$ref` or a non-bool,
    /// non-object keyword value.
    pub fn additional_properties(&self) -> Result<AdditionalProperties, UnmarshalError> {
        match self.get("additionalProperties") {
            None | Some(Value::Bool(true)) => Ok(AdditionalProperties::Allowed),
            Some(Value::Bool(false)) => Ok(AdditionalProperties::Denied),
            Some(Value::Object(_)) => self
                .child(&["additionalProperties"])
                .map(AdditionalProperties::Schema),
            Some(other) => Err(UnmarshalError::InvalidSchema(format!(
                "additionalProperties must be a bool or schema at '{}', got {other}",
                self.pointer
            ))),
        }
    }

    fn flag(&self, keyword: &str) -> bool {
        self.get(keyword).and_then(Value::as_bool).unwrap_or(false)
    }

    fn branches(&self, keyword: &str) -> Result<Vec<SchemaNode>, UnmarshalError> {
        let count = self
            .get(keyword)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        (0..count)
            .map(|i| self.child(&[keyword, &i.to_string()]))
            .collect()
    }

    fn collect_properties(
        &self,
        into: &mut DeclaredProperties,
        depth: usize,
    ) -> Result<(), UnmarshalError> {
        if depth > MAX_REF_HOPS {
            return Err(UnmarshalError::InvalidSchema(format!(
                "allOf nesting too deep at '{}'",
                self.pointer
            )));
        }
        if let Some(Value::Object(props)) = self.get("properties") {
            for name in props.keys() {
                into.insert(name.clone(), self.child(&["properties", name])?);
            }
        }
        for member in self.all_of()? {
            member.collect_properties(into, depth + 1)?;
        }
        Ok(())
    }

    /// Address a descendant by raw (unescaped) path segments.
    fn child(&self, segments: &[&str]) -> Result<SchemaNode, UnmarshalError> {
        let mut pointer = self.pointer.clone();
        for segment in segments {
            pointer.push('/');
            pointer.push_str(&escape_segment(segment));
        }
        let resolved = resolve_pointer(&self.document, &pointer)?;
        Ok(Self {
            document: Arc::clone(&self.document),
            pointer: resolved,
        })
    }
}

/// Escape a JSON Pointer reference token (RFC 6901 §3).
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Follow local `$ref`s starting at `pointer` until a non-reference node.
fn resolve_pointer(document: &Value, pointer: &str) -> Result<String, UnmarshalError> {
    let mut current = pointer.to_string();
    for _ in 0..=MAX_REF_HOPS {
        let node = document.pointer(&current).ok_or_else(|| {
            UnmarshalError::InvalidSchema(format!("no schema at pointer '{current}'"))
        })?;
        match node.get("$ref").and_then(Value::as_str) {
            Some(reference) if reference.starts_with('#') => {
                current = reference.trim_start_matches('#').to_string();
            }
            _ => return Ok(current),
        }
    }
    Err(UnmarshalError::InvalidSchema(format!(
        "reference chain from '{pointer}' exceeds {MAX_REF_HOPS} hops"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn petstore() -> Arc<Value> {
        Arc::new(json!({
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "x-model": "Pet",
                        "properties": {
                            "id": {"type": "integer", "readOnly": true},
                            "name": {"type": "string"},
                            "tag": {"$ref": "#/components/schemas/Tag"}
                        },
                        "additionalProperties": false
                    },
                    "Tag": {"type": "string", "nullable": true, "default": "none"},
                    "PetAlias": {"$ref": "#/components/schemas/Pet"},
                    "Loop": {"$ref": "#/components/schemas/Loop"},
                    "Dangling": {"items": {"$ref": "#/components/schemas/Missing"}, "type": "array"},
                    "Cat": {
                        "allOf": [
                            {"$ref": "#/components/schemas/Pet"},
                            {"properties": {"lives": {"type": "integer"}}}
                        ],
                        "properties": {"name": {"type": "integer"}}
                    }
                }
            }
        }))
    }

    #[test]
    fn schema_type_parsing() {
        let node = SchemaNode::new(json!({"type": "integer"})).unwrap();
        assert_eq!(node.schema_type().unwrap(), Some(SchemaType::Integer));

        let any = SchemaNode::new(json!({})).unwrap();
        assert_eq!(any.schema_type().unwrap(), None);
        assert_eq!(any.declared_type(), SchemaType::Any);

        let bad = SchemaNode::new(json!({"type": "decimal"})).unwrap();
        assert!(matches!(
            bad.schema_type(),
            Err(UnmarshalError::InvalidSchema(_))
        ));
    }

    #[test]
    fn null_type_is_any() {
        assert_eq!("null".parse::<SchemaType>().unwrap(), SchemaType::Any);
    }

    #[test]
    fn defaults_apply_when_keywords_absent() {
        let node = SchemaNode::new(json!({"type": "string"})).unwrap();
        assert!(!node.nullable());
        assert!(!node.read_only());
        assert!(!node.write_only());
        assert!(!node.deprecated());
        assert!(node.default_value().is_none());
        assert!(matches!(
            node.additional_properties().unwrap(),
            AdditionalProperties::Allowed
        ));
    }

    #[test]
    fn from_document_follows_top_level_ref() {
        let node = SchemaNode::from_document(petstore(), "#/components/schemas/PetAlias").unwrap();
        assert_eq!(node.pointer(), "/components/schemas/Pet");
        assert_eq!(node.x_model(), Some("Pet"));
    }

    #[test]
    fn property_refs_are_followed() {
        let pet = SchemaNode::from_document(petstore(), "/components/schemas/Pet").unwrap();
        let props = pet.properties().unwrap();
        let names: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "name", "tag"]);

        let tag = props.get("tag").unwrap();
        assert_eq!(tag.pointer(), "/components/schemas/Tag");
        assert!(tag.nullable());
        assert_eq!(tag.default_value(), Some(&json!("none")));
        assert!(props.get("id").unwrap().read_only());
        assert!(matches!(
            pet.additional_properties().unwrap(),
            AdditionalProperties::Denied
        ));
    }

    #[test]
    fn all_of_properties_are_inherited_and_override() {
        let cat = SchemaNode::from_document(petstore(), "/components/schemas/Cat").unwrap();
        let props = cat.properties().unwrap();
        assert!(props.contains_key("id"));
        assert!(props.contains_key("lives"));
        // Inherited `name` from Pet overrides the local declaration.
        assert_eq!(
            props.get("name").unwrap().schema_type().unwrap(),
            Some(SchemaType::String)
        );
    }

    #[test]
    fn cyclic_reference_is_invalid_schema() {
        let err = SchemaNode::from_document(petstore(), "/components/schemas/Loop").unwrap_err();
        assert!(matches!(err, UnmarshalError::InvalidSchema(_)));
    }

    #[test]
    fn dangling_reference_is_invalid_schema() {
        let node = SchemaNode::from_document(petstore(), "/components/schemas/Dangling").unwrap();
        assert!(matches!(
            node.items(),
            Err(UnmarshalError::InvalidSchema(_))
        ));
    }

    #[test]
    fn pointer_segments_are_escaped() {
        let doc = Arc::new(json!({
            "properties": {"a/b": {"type": "string"}, "c~d": {"type": "integer"}}
        }));
        let node = SchemaNode::from_document(doc, "").unwrap();
        let props = node.properties().unwrap();
        assert_eq!(props.get("a/b").unwrap().pointer(), "/properties/a~1b");
        assert_eq!(props.get("c~d").unwrap().pointer(), "/properties/c~0d");
        assert_eq!(
            props.get("c~d").unwrap().schema_type().unwrap(),
            Some(SchemaType::Integer)
        );
    }

    #[test]
    fn properties_keep_declaration_order() {
        let node = SchemaNode::new(json!({
            "properties": {"zeta": {"type": "string"}, "alpha": {"type": "integer"}},
            "allOf": [{"properties": {"mid": {"type": "boolean"}, "zeta": {"type": "number"}}}]
        }))
        .unwrap();
        let props = node.properties().unwrap();
        let names: Vec<&str> = props.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(props.get("zeta").unwrap().schema_type().unwrap(), Some(SchemaType::Number));
    }

    #[test]
    fn branches_preserve_order() {
        let node = SchemaNode::new(json!({
            "oneOf": [{"type": "string"}, {"type": "integer"}]
        }))
        .unwrap();
        let branches = node.one_of().unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].pointer(), "/oneOf/0");
        assert_eq!(
            branches[1].schema_type().unwrap(),
            Some(SchemaType::Integer)
        );
        assert!(node.all_of().unwrap().is_empty());
    }
}
