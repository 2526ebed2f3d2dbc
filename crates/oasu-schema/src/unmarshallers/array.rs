use oasu_core::{FormatError, NativeValue, SchemaNode, SchemaType, UnmarshalError};
use serde_json::{Map, Value};

use super::{Complex, SchemaUnmarshaller};

impl<'f> SchemaUnmarshaller<'f> {
    /// Map the `items` unmarshaller over every element, in order.
    pub(super) fn unmarshal_array(
        &self,
        cx: &Complex<'f>,
        value: &Value,
    ) -> Result<NativeValue, UnmarshalError> {
        let generic = self.format_generic(value)?;
        let elements = match generic {
            Value::Array(elements) => elements,
            Value::Null if self.schema.nullable() => return Ok(NativeValue::Null),
            other => {
                return Err(self.format_error(
                    value,
                    FormatError::new(format!("expected a sequence, got {other}")),
                ))
            }
        };

        let items = match self.schema.items()? {
            Some(items) => items,
            // Untyped schema tried as an array: elements are untyped too.
            None if self.schema.declared_type() == SchemaType::Any => {
                SchemaNode::new(Value::Object(Map::new()))?
            }
            None => {
                return Err(UnmarshalError::InvalidSchema(format!(
                    "array schema without items at '{}'",
                    self.schema.pointer()
                )))
            }
        };
        let items_unmarshaller = cx.factory.create(Some(&items), None)?;

        elements
            .iter()
            .map(|element| items_unmarshaller.unmarshal_value(element))
            .collect::<Result<Vec<_>, _>>()
            .map(NativeValue::Array)
    }
}
