use oasu_core::{
    AdditionalProperties, DeclaredProperties, FormatError, NativeValue, SchemaNode, UnmarshalError,
};
use serde_json::{Map, Value};

use super::{Complex, SchemaUnmarshaller};
use crate::factory::Properties;

impl<'f> SchemaUnmarshaller<'f> {
    pub(super) fn unmarshal_object(
        &self,
        cx: &Complex<'f>,
        value: &Value,
    ) -> Result<NativeValue, UnmarshalError> {
        let map = match self.format_generic(value)? {
            Value::Object(map) => map,
            Value::Null if self.schema.nullable() => return Ok(NativeValue::Null),
            other => {
                return Err(self.format_error(
                    value,
                    FormatError::new(format!("expected a mapping, got {other}")),
                ))
            }
        };

        let properties = if self.schema.contains("oneOf") {
            self.unmarshal_one_of(cx, value, &map)?
        } else {
            self.unmarshal_properties(cx, &map, &self.schema.properties()?)?
        };

        match self.schema.x_model() {
            Some(name) => Ok(cx.factory.model_factory().create(properties, name)),
            None => Ok(NativeValue::Object(properties)),
        }
    }

    /// Pick the first `oneOf` branch the value satisfies.
    ///
    /// A branch matches when the raw value passes its structural validation
    /// and every declared property (own plus branch) unmarshals. With no
    /// match only the `additionalProperties` policy is applied.
    fn unmarshal_one_of(
        &self,
        cx: &Complex<'f>,
        value: &Value,
        map: &Map<String, Value>,
    ) -> Result<Properties, UnmarshalError> {
        let mut matched: Option<Properties> = None;
        let mut first = 0;
        for (index, branch) in self.schema.one_of()?.iter().enumerate() {
            match self.unmarshal_branch(cx, value, map, branch) {
                Ok(_) if matched.is_some() => tracing::warn!(
                    schema = self.schema.pointer(),
                    first,
                    also = index,
                    "value matches more than one oneOf branch, keeping the first"
                ),
                Ok(properties) => {
                    first = index;
                    matched = Some(properties);
                }
                Err(e) => tracing::debug!(
                    schema = self.schema.pointer(),
                    branch = index,
                    error = %e,
                    "oneOf branch rejected"
                ),
            }
        }

        match matched {
            Some(properties) => Ok(properties),
            None => {
                tracing::warn!(schema = self.schema.pointer(), "valid oneOf schema not found");
                self.unmarshal_properties(cx, map, &DeclaredProperties::new())
            }
        }
    }

    fn unmarshal_branch(
        &self,
        cx: &Complex<'f>,
        value: &Value,
        map: &Map<String, Value>,
        branch: &SchemaNode,
    ) -> Result<Properties, UnmarshalError> {
        cx.factory.create(Some(branch), None)?.validate(value)?;
        let mut declared = self.schema.properties()?;
        declared.extend(branch.properties()?);
        self.unmarshal_properties(cx, map, &declared)
    }

    /// Extra keys first, then declared properties in declaration order,
    /// which win on collision.
    fn unmarshal_properties(
        &self,
        cx: &Complex<'f>,
        map: &Map<String, Value>,
        declared: &DeclaredProperties,
    ) -> Result<Properties, UnmarshalError> {
        let mut properties = Properties::new();
        let extras = map.iter().filter(|(key, _)| !declared.contains_key(*key));

        match self.schema.additional_properties()? {
            AdditionalProperties::Schema(schema) => {
                let additional = cx.factory.create(Some(&schema), None)?;
                for (key, raw) in extras {
                    properties.insert(key.clone(), additional.unmarshal_value(raw)?);
                }
            }
            AdditionalProperties::Allowed => {
                for (key, raw) in extras {
                    properties.insert(key.clone(), NativeValue::Json(raw.clone()));
                }
            }
            AdditionalProperties::Denied => {}
        }

        for (name, schema) in declared.iter() {
            if cx
                .context
                .is_some_and(|c| c.hides(schema.read_only(), schema.write_only()))
            {
                continue;
            }
            let raw = match map.get(name).or_else(|| schema.default_value()) {
                Some(raw) => raw,
                None => continue,
            };
            let unmarshalled = cx.factory.create(Some(schema), None)?.unmarshal_value(raw)?;
            properties.insert(name.clone(), unmarshalled);
        }

        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use oasu_core::{SchemaNode, UnmarshalContext};
    use serde_json::json;

    use crate::factory::SchemaUnmarshallersFactory;

    use super::*;

    fn unmarshal(schema: Value, value: Value) -> Result<NativeValue, UnmarshalError> {
        let node = SchemaNode::new(schema).unwrap();
        SchemaUnmarshallersFactory::new().unmarshal(&node, &value)
    }

    #[test]
    fn declared_properties_are_coerced() {
        let out = unmarshal(
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "format": "uuid"},
                    "born": {"type": "string", "format": "date"}
                }
            }),
            json!({"id": "a8098c1a-f86e-11da-bd1a-00112444be1e", "born": "2020-02-29"}),
        )
        .unwrap();
        assert!(matches!(out.get("id"), Some(NativeValue::Uuid(_))));
        assert!(matches!(out.get("born"), Some(NativeValue::Date(_))));
    }

    #[test]
    fn additional_properties_policies() {
        let value = json!({"a": 1, "extra": "x"});
        let props = json!({"a": {"type": "integer"}});

        let allowed = unmarshal(json!({"type": "object", "properties": props}), value.clone()).unwrap();
        assert_eq!(allowed.get("extra"), Some(&NativeValue::Json(json!("x"))));

        let schema = unmarshal(
            json!({"type": "object", "properties": props, "additionalProperties": {"type": "string"}}),
            value.clone(),
        )
        .unwrap();
        assert_eq!(schema.get("extra"), Some(&NativeValue::String("x".to_string())));

        let denied = json!({"type": "object", "properties": props, "additionalProperties": false});
        let node = SchemaNode::new(denied).unwrap();
        let factory = SchemaUnmarshallersFactory::new();
        let u = factory.create(Some(&node), None).unwrap();
        // `false` rejects the extra key structurally; bypass validation to see the drop.
        let out = u.unmarshal(&value).unwrap();
        assert_eq!(out.get("a"), Some(&NativeValue::Integer(1)));
        assert!(out.get("extra").is_none());
    }

    #[test]
    fn defaults_fill_missing_properties() {
        let out = unmarshal(
            json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "default": 20},
                    "tag": {"type": "string"}
                }
            }),
            json!({}),
        )
        .unwrap();
        assert_eq!(out.get("limit"), Some(&NativeValue::Integer(20)));
        assert!(out.get("tag").is_none());
    }

    #[test]
    fn context_skips_hidden_properties() {
        let schema = SchemaNode::new(json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "readOnly": true},
                "password": {"type": "string", "writeOnly": true},
                "name": {"type": "string"}
            }
        }))
        .unwrap();

        let request = SchemaUnmarshallersFactory::builder()
            .context(UnmarshalContext::Request)
            .build();
        let out = request
            .unmarshal(&schema, &json!({"password": "hunter2", "name": "n"}))
            .unwrap();
        assert!(out.get("id").is_none());
        assert!(out.get("password").is_some());

        let response = SchemaUnmarshallersFactory::builder()
            .context(UnmarshalContext::Response)
            .build();
        let out = response.unmarshal(&schema, &json!({"id": 1, "name": "n"})).unwrap();
        assert_eq!(out.get("id"), Some(&NativeValue::Integer(1)));
        assert!(out.get("password").is_none());
    }

    #[test]
    fn x_model_binds_a_model() {
        let out = unmarshal(
            json!({"type": "object", "x-model": "Pet", "properties": {"name": {"type": "string"}}}),
            json!({"name": "Rex"}),
        )
        .unwrap();
        match out {
            NativeValue::Model(model) => {
                assert_eq!(model.name, "Pet");
                assert_eq!(model.get("name"), Some(&NativeValue::String("Rex".to_string())));
            }
            other => panic!("expected a model, got {other:?}"),
        }
    }

    #[test]
    fn first_error_follows_declaration_order() {
        let err = unmarshal(
            json!({
                "type": "object",
                "properties": {
                    "zeta": {"type": "string", "format": "uuid"},
                    "alpha": {"type": "string", "format": "date"}
                }
            }),
            json!({"zeta": "not-a-uuid", "alpha": "not-a-date"}),
        )
        .unwrap_err();
        match err {
            UnmarshalError::InvalidSchemaFormatValue { value, .. } => {
                assert_eq!(value, json!("not-a-uuid"));
            }
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn one_of_picks_the_matching_branch() {
        let schema = json!({
            "type": "object",
            "oneOf": [
                {"required": ["bark"], "properties": {"bark": {"type": "boolean"}}},
                {"required": ["meow"], "properties": {"meow": {"type": "string", "format": "date"}}}
            ]
        });
        let out = unmarshal(schema, json!({"meow": "2024-05-01"})).unwrap();
        assert!(matches!(out.get("meow"), Some(NativeValue::Date(_))));
    }
}
