use oasu_core::{NativeValue, SchemaNode, SchemaType, UnmarshalError};
use serde_json::Value;

use super::{Complex, SchemaUnmarshaller};

/// Kinds tried, in order, for an untyped schema.
const TYPE_TRIAL_ORDER: [SchemaType; 6] = [
    SchemaType::Object,
    SchemaType::Array,
    SchemaType::Boolean,
    SchemaType::Integer,
    SchemaType::Number,
    SchemaType::String,
];

impl<'f> SchemaUnmarshaller<'f> {
    /// Resolve an untyped schema: `oneOf`, then typed `allOf` members,
    /// then the first kind whose formatter accepts the value.
    pub(super) fn unmarshal_any(
        &self,
        cx: &Complex<'f>,
        value: &Value,
    ) -> Result<NativeValue, UnmarshalError> {
        if let Some(branch) = self.first_valid(cx, value, self.schema.one_of()?, false)? {
            return cx.factory.create(Some(&branch), None)?.unmarshal_value(value);
        }
        if let Some(member) = self.first_valid(cx, value, self.schema.all_of()?, true)? {
            return cx.factory.create(Some(&member), None)?.unmarshal_value(value);
        }

        for schema_type in TYPE_TRIAL_ORDER {
            let unmarshaller = cx.factory.create(Some(&self.schema), Some(schema_type))?;
            if unmarshaller.formatter_validate(value).is_ok() {
                return unmarshaller.unmarshal_value(value);
            }
        }

        tracing::warn!(
            schema = self.schema.pointer(),
            "no unmarshaller kind matched an untyped value, returning it unchanged"
        );
        Ok(NativeValue::Json(value.clone()))
    }

    fn first_valid(
        &self,
        cx: &Complex<'f>,
        value: &Value,
        candidates: Vec<SchemaNode>,
        typed_only: bool,
    ) -> Result<Option<SchemaNode>, UnmarshalError> {
        for candidate in candidates {
            if typed_only && !candidate.contains("type") {
                continue;
            }
            if cx.factory.create(Some(&candidate), None)?.validate(value).is_ok() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
