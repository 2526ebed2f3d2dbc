//! # Native Values
//!
//! The output of unmarshalling. Shape mirrors the schema: scalars become
//! typed scalars, arrays ordered vectors, objects string-keyed maps (or
//! bound [`Model`]s), and format coercions keep their richer type.
//!
//! [`NativeValue::Json`] carries a raw decoded value that was passed
//! through without validation or coercion.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::temporal::{format_date, format_datetime};

/// A named domain object built from an object schema tagged with `x-model`.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// The `x-model` name.
    pub name: String,
    /// The unmarshalled properties.
    pub properties: BTreeMap<String, NativeValue>,
}

impl Model {
    /// Look up a property by name.
    pub fn get(&self, name: &str) -> Option<&NativeValue> {
        self.properties.get(name)
    }
}

/// A schema-coerced native value.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// JSON `null`, or an absent nullable value.
    Null,
    /// `boolean`
    Bool(bool),
    /// `integer`
    Integer(i64),
    /// `number`
    Number(f64),
    /// `string` without a coercing format.
    String(String),
    /// `string` with format `byte` or `binary`.
    Bytes(Vec<u8>),
    /// `string` with format `date`.
    Date(NaiveDate),
    /// `string` with format `date-time`.
    DateTime(DateTime<FixedOffset>),
    /// `string` with format `uuid`.
    Uuid(Uuid),
    /// `array`
    Array(Vec<NativeValue>),
    /// `object` without `x-model`.
    Object(BTreeMap<String, NativeValue>),
    /// `object` bound to a named model.
    Model(Model),
    /// A raw value passed through untouched.
    Json(Value),
}

impl NativeValue {
    /// Returns true for [`NativeValue::Null`] and a raw JSON `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(Value::Null))
    }

    /// The object map, for both plain objects and models.
    pub fn as_object(&self) -> Option<&BTreeMap<String, NativeValue>> {
        match self {
            Self::Object(map) => Some(map),
            Self::Model(model) => Some(&model.properties),
            _ => None,
        }
    }

    /// Look up an object or model property.
    pub fn get(&self, name: &str) -> Option<&NativeValue> {
        self.as_object().and_then(|map| map.get(name))
    }

    /// The array elements.
    pub fn as_array(&self) -> Option<&[NativeValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Re-serialize into a decoded JSON value.
    ///
    /// Dates render as ISO 8601, byte payloads as padded base64, UUIDs in
    /// hyphenated form and models as plain objects. Non-finite numbers
    /// become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Bytes(bytes) => Value::String(STANDARD.encode(bytes)),
            Self::Date(d) => Value::String(format_date(d)),
            Self::DateTime(dt) => Value::String(format_datetime(dt)),
            Self::Uuid(u) => Value::String(u.hyphenated().to_string()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => object_to_json(map),
            Self::Model(model) => object_to_json(&model.properties),
            Self::Json(v) => v.clone(),
        }
    }
}

fn object_to_json(map: &BTreeMap<String, NativeValue>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

impl From<&Value> for NativeValue {
    /// Structural conversion with no schema: integers that fit `i64` become
    /// [`NativeValue::Integer`], other numbers [`NativeValue::Number`].
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .unwrap_or_else(|| Self::Number(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for NativeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Self::Date(d) => serializer.serialize_str(&format_date(d)),
            Self::DateTime(dt) => serializer.serialize_str(&format_datetime(dt)),
            Self::Uuid(u) => serializer.serialize_str(&u.hyphenated().to_string()),
            Self::Array(items) => items.serialize(serializer),
            Self::Object(map) => serialize_object(map, serializer),
            Self::Model(model) => serialize_object(&model.properties, serializer),
            Self::Json(v) => v.serialize(serializer),
        }
    }
}

fn serialize_object<S: Serializer>(
    map: &BTreeMap<String, NativeValue>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (k, v) in map {
        out.serialize_entry(k, v)?;
    }
    out.end()
}
