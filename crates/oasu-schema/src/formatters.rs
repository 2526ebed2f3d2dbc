//! # Formatters: Per-(Type, Format) Predicate and Transform Pairs
//!
//! A [`Formatter`] decides whether a raw value looks like its (type, format)
//! combination and converts it into a [`NativeValue`]. Lookup is two-tier:
//! caller-supplied custom formatters keyed by format name come first, then
//! the built-in table in [`BuiltinFormatter::lookup`]. Both tiers are fixed
//! when the factory is built.
//!
//! Array and object formatters produce a *generic* container
//! ([`NativeValue::Json`] for the built-ins); the complex unmarshallers
//! recurse into it afterwards.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use oasu_core::temporal::{parse_date, parse_datetime};
use oasu_core::{FormatError, NativeValue, SchemaType};
use serde_json::Value;
use uuid::Uuid;

/// Predicate and transform for one (type, format) combination.
pub trait Formatter: Send + Sync {
    /// Whether the raw value is acceptable for this formatter.
    fn validate(&self, value: &Value) -> bool;

    /// Convert the raw value into its native form.
    ///
    /// # Errors
    ///
    /// Returns a `FormatError` when the value cannot be converted.
    fn unmarshal(&self, value: &Value) -> Result<NativeValue, FormatError>;
}

/// A [`Formatter`] assembled from two closures.
pub struct FnFormatter<V, U> {
    validate: V,
    unmarshal: U,
}

impl<V, U> FnFormatter<V, U>
where
    V: Fn(&Value) -> bool + Send + Sync,
    U: Fn(&Value) -> Result<NativeValue, FormatError> + Send + Sync,
{
    /// Build a formatter from a predicate and a transform.
    pub fn from_callables(validate: V, unmarshal: U) -> Self {
        Self {
            validate,
            unmarshal,
        }
    }
}

impl<V, U> Formatter for FnFormatter<V, U>
where
    V: Fn(&Value) -> bool + Send + Sync,
    U: Fn(&Value) -> Result<NativeValue, FormatError> + Send + Sync,
{
    fn validate(&self, value: &Value) -> bool {
        (self.validate)(value)
    }

    fn unmarshal(&self, value: &Value) -> Result<NativeValue, FormatError> {
        (self.unmarshal)(value)
    }
}

/// Caller-supplied formatters keyed by format name.
pub type CustomFormatters = HashMap<String, Arc<dyn Formatter>>;

/// The built-in formatter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFormatter {
    /// Untyped schema: accepts anything, passes it through.
    Any,
    /// `string`
    String,
    /// `string`/`password`: kept as text, never coerced.
    Password,
    /// `string`/`date`
    Date,
    /// `string`/`date-time`
    DateTime,
    /// `string`/`binary`: the UTF-8 bytes of the string.
    Binary,
    /// `string`/`uuid`
    Uuid,
    /// `string`/`byte`: base64 payload.
    Byte,
    /// `integer`
    Integer,
    /// `integer`/`int32`
    Int32,
    /// `integer`/`int64`
    Int64,
    /// `number`
    Number,
    /// `number`/`float`
    Float,
    /// `number`/`double`
    Double,
    /// `boolean`
    Boolean,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl BuiltinFormatter {
    /// The built-in formatter for a kind and optional format.
    pub fn lookup(schema_type: SchemaType, format: Option<&str>) -> Option<Self> {
        let formatter = match (schema_type, format) {
            (SchemaType::Any, None) => Self::Any,
            (SchemaType::String, None) => Self::String,
            (SchemaType::String, Some("password")) => Self::Password,
            (SchemaType::String, Some("date")) => Self::Date,
            (SchemaType::String, Some("date-time")) => Self::DateTime,
            (SchemaType::String, Some("binary")) => Self::Binary,
            (SchemaType::String, Some("uuid")) => Self::Uuid,
            (SchemaType::String, Some("byte")) => Self::Byte,
            (SchemaType::Integer, None) => Self::Integer,
            (SchemaType::Integer, Some("int32")) => Self::Int32,
            (SchemaType::Integer, Some("int64")) => Self::Int64,
            (SchemaType::Number, None) => Self::Number,
            (SchemaType::Number, Some("float")) => Self::Float,
            (SchemaType::Number, Some("double")) => Self::Double,
            (SchemaType::Boolean, None) => Self::Boolean,
            (SchemaType::Array, None) => Self::Array,
            (SchemaType::Object, None) => Self::Object,
            _ => return None,
        };
        Some(formatter)
    }
}

impl Formatter for BuiltinFormatter {
    fn validate(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::String | Self::Password | Self::Binary => value.is_string(),
            Self::Date => value.as_str().is_some_and(|s| parse_date(s).is_ok()),
            Self::DateTime => value.as_str().is_some_and(|s| parse_datetime(s).is_ok()),
            Self::Uuid => value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok()),
            Self::Byte => value.as_str().is_some_and(|s| STANDARD.decode(s).is_ok()),
            Self::Int32 => value
                .as_i64()
                .is_some_and(|n| i32::try_from(n).is_ok()),
            Self::Integer | Self::Int64 => value.as_i64().is_some(),
            Self::Number | Self::Float | Self::Double => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    fn unmarshal(&self, value: &Value) -> Result<NativeValue, FormatError> {
        match self {
            Self::Any | Self::Array | Self::Object => Ok(NativeValue::Json(value.clone())),
            Self::String | Self::Password => to_text(value).map(NativeValue::String),
            Self::Date => expect_str(value)
                .and_then(parse_date)
                .map(NativeValue::Date),
            Self::DateTime => expect_str(value)
                .and_then(parse_datetime)
                .map(NativeValue::DateTime),
            Self::Binary => to_text(value).map(|s| NativeValue::Bytes(s.into_bytes())),
            Self::Uuid => expect_str(value).and_then(|s| {
                Uuid::parse_str(s)
                    .map(NativeValue::Uuid)
                    .map_err(|e| FormatError::new(format!("invalid uuid {s:?}: {e}")))
            }),
            Self::Byte => expect_str(value).and_then(|s| {
                STANDARD
                    .decode(s)
                    .map(NativeValue::Bytes)
                    .map_err(|e| FormatError::new(format!("invalid base64 {s:?}: {e}")))
            }),
            Self::Integer | Self::Int32 | Self::Int64 => to_integer(value).map(NativeValue::Integer),
            Self::Number | Self::Float | Self::Double => to_number(value).map(NativeValue::Number),
            Self::Boolean => forcebool(value).map(NativeValue::Bool),
        }
    }
}

/// Custom format predicates handed to the structural validator, so that
/// validation also fails on values a custom formatter would reject.
#[derive(Clone, Default)]
pub struct FormatChecker {
    checks: BTreeMap<String, Arc<dyn Formatter>>,
}

impl fmt::Debug for FormatChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.checks.keys()).finish()
    }
}

impl FormatChecker {
    /// Collect the predicates of every custom formatter.
    pub fn from_formatters(formatters: &CustomFormatters) -> Self {
        Self {
            checks: formatters
                .iter()
                .map(|(name, f)| (name.clone(), Arc::clone(f)))
                .collect(),
        }
    }

    /// Whether a check is registered for `format`.
    pub fn contains(&self, format: &str) -> bool {
        self.checks.contains_key(format)
    }

    /// Run the check for `format`; unknown formats pass.
    pub fn check(&self, format: &str, value: &Value) -> bool {
        self.checks.get(format).map_or(true, |f| f.validate(value))
    }

    /// Iterate registered checks in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Formatter>)> {
        self.checks.iter().map(|(name, f)| (name.as_str(), f))
    }
}

/// Permissive boolean coercion.
///
/// JSON booleans pass through; strings accept `y/yes/t/true/on/1` and
/// `n/no/f/false/off/0` in any case; numbers are true when non-zero; null
/// is false and containers are true when non-empty.
///
/// # Errors
///
/// Returns a `FormatError` for strings outside the token table.
pub fn forcebool(value: &Value) -> Result<bool, FormatError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
            "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
            _ => Err(FormatError::new(format!("invalid truth value {s:?}"))),
        },
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::Null => Ok(false),
        Value::Array(items) => Ok(!items.is_empty()),
        Value::Object(map) => Ok(!map.is_empty()),
    }
}

fn expect_str(value: &Value) -> Result<&str, FormatError> {
    value
        .as_str()
        .ok_or_else(|| FormatError::new(format!("expected a string, got {value}")))
}

fn to_text(value: &Value) -> Result<String, FormatError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        other => Err(FormatError::new(format!("cannot convert {other} to a string"))),
    }
}

fn to_integer(value: &Value) -> Result<i64, FormatError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            if n.is_u64() {
                return Err(FormatError::new(format!("integer {n} out of range")));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(FormatError::new(format!("{n} is not an integer"))),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| FormatError::new(format!("invalid integer {s:?}: {e}"))),
        other => Err(FormatError::new(format!("cannot convert {other} to an integer"))),
    }
}

fn to_number(value: &Value) -> Result<f64, FormatError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FormatError::new(format!("{n} is not representable as a float"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| FormatError::new(format!("invalid number {s:?}: {e}"))),
        other => Err(FormatError::new(format!("cannot convert {other} to a number"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_covers_builtin_table() {
        assert_eq!(
            BuiltinFormatter::lookup(SchemaType::String, Some("date-time")),
            Some(BuiltinFormatter::DateTime)
        );
        assert_eq!(
            BuiltinFormatter::lookup(SchemaType::Integer, Some("int32")),
            Some(BuiltinFormatter::Int32)
        );
        assert_eq!(
            BuiltinFormatter::lookup(SchemaType::Any, None),
            Some(BuiltinFormatter::Any)
        );
        assert_eq!(BuiltinFormatter::lookup(SchemaType::String, Some("email")), None);
        assert_eq!(BuiltinFormatter::lookup(SchemaType::Array, Some("csv")), None);
    }

    #[test]
    fn string_predicates_require_strings() {
        assert!(BuiltinFormatter::String.validate(&json!("x")));
        assert!(!BuiltinFormatter::String.validate(&json!(1)));
        assert!(BuiltinFormatter::Date.validate(&json!("2020-01-02")));
        assert!(!BuiltinFormatter::Date.validate(&json!("2020-01-02T00:00:00Z")));
        assert!(BuiltinFormatter::Byte.validate(&json!("aGVsbG8=")));
        assert!(!BuiltinFormatter::Byte.validate(&json!("aGVsbG8")));
    }

    #[test]
    fn numeric_predicates() {
        assert!(BuiltinFormatter::Integer.validate(&json!(42)));
        assert!(!BuiltinFormatter::Integer.validate(&json!(4.2)));
        assert!(!BuiltinFormatter::Integer.validate(&json!(true)));
        assert!(BuiltinFormatter::Number.validate(&json!(42)));
        assert!(BuiltinFormatter::Int32.validate(&json!(2_147_483_647)));
        assert!(!BuiltinFormatter::Int32.validate(&json!(2_147_483_648_i64)));
        assert!(!BuiltinFormatter::Integer.validate(&json!(u64::MAX)));
        assert!(BuiltinFormatter::Number.validate(&json!(u64::MAX)));
    }

    #[test]
    fn byte_requires_canonical_base64() {
        for raw in ["aGVsbG8=====", "aGl=", " aGk= ", "aGVs\nbG8="] {
            assert!(!BuiltinFormatter::Byte.validate(&json!(raw)), "{raw:?}");
            assert!(BuiltinFormatter::Byte.unmarshal(&json!(raw)).is_err(), "{raw:?}");
        }
        assert_eq!(
            BuiltinFormatter::Byte.unmarshal(&json!("aGk=")).unwrap(),
            NativeValue::Bytes(b"hi".to_vec())
        );
        assert_eq!(
            BuiltinFormatter::Byte.unmarshal(&json!("")).unwrap(),
            NativeValue::Bytes(Vec::new())
        );
    }

    #[test]
    fn number_transform_produces_float() {
        assert_eq!(
            BuiltinFormatter::Number.unmarshal(&json!(3)).unwrap(),
            NativeValue::Number(3.0)
        );
        assert_eq!(
            BuiltinFormatter::Double.unmarshal(&json!(0.5)).unwrap(),
            NativeValue::Number(0.5)
        );
    }

    #[test]
    fn integer_transform_rejects_fractions() {
        assert_eq!(
            BuiltinFormatter::Integer.unmarshal(&json!(7)).unwrap(),
            NativeValue::Integer(7)
        );
        assert_eq!(
            BuiltinFormatter::Integer.unmarshal(&json!(7.0)).unwrap(),
            NativeValue::Integer(7)
        );
        assert!(BuiltinFormatter::Integer.unmarshal(&json!(7.5)).is_err());
        assert!(BuiltinFormatter::Integer.unmarshal(&json!(u64::MAX)).is_err());
    }

    #[test]
    fn forcebool_tokens() {
        assert!(forcebool(&json!("YES")).unwrap());
        assert!(forcebool(&json!("on")).unwrap());
        assert!(!forcebool(&json!("off")).unwrap());
        assert!(!forcebool(&json!("0")).unwrap());
        assert!(forcebool(&json!(true)).unwrap());
        assert!(forcebool(&json!("maybe")).is_err());
    }

    #[test]
    fn string_format_transforms() {
        assert_eq!(
            BuiltinFormatter::Byte.unmarshal(&json!("aGVsbG8=")).unwrap(),
            NativeValue::Bytes(b"hello".to_vec())
        );
        assert_eq!(
            BuiltinFormatter::Binary.unmarshal(&json!("raw")).unwrap(),
            NativeValue::Bytes(b"raw".to_vec())
        );
        assert!(matches!(
            BuiltinFormatter::Uuid
                .unmarshal(&json!("a8098c1a-f86e-11da-bd1a-00112444be1e"))
                .unwrap(),
            NativeValue::Uuid(_)
        ));
        assert!(BuiltinFormatter::Uuid.unmarshal(&json!("nope")).is_err());
        assert!(BuiltinFormatter::DateTime.unmarshal(&json!("not-a-date")).is_err());
    }

    #[test]
    fn fn_formatter_and_checker() {
        let upper: Arc<dyn Formatter> = Arc::new(FnFormatter::from_callables(
            |v: &Value| v.as_str().is_some_and(|s| s.chars().all(|c| c.is_ascii_uppercase())),
            |v: &Value| Ok(NativeValue::String(v.as_str().unwrap_or_default().to_lowercase())),
        ));
        let mut custom = CustomFormatters::new();
        custom.insert("upper".to_string(), upper);
        let checker = FormatChecker::from_formatters(&custom);

        assert!(checker.contains("upper"));
        assert!(checker.check("upper", &json!("ABC")));
        assert!(!checker.check("upper", &json!("abc")));
        assert!(checker.check("unregistered", &json!("abc")));
        assert_eq!(format!("{checker:?}"), "{\"upper\"}");
    }
}
