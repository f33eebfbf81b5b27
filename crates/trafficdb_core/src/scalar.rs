use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single value bound to a statement parameter or read out of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Decimal(Decimal),
    Utf8(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl ScalarValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Try to read the value as an unsigned integer. Used for `COUNT(*)`
    /// results, which come back as different types depending on the backend.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int64(v) => u64::try_from(*v).ok(),
            Self::UInt64(v) => Some(*v),
            Self::Decimal(v) => v.to_u64(),
            Self::Utf8(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Convert a JSON value from a request body.
    ///
    /// Strings stay strings even if they look like dates. Both MySQL and
    /// SQLite coerce `'YYYY-MM-DD'` text into date columns.
    pub fn from_json(value: JsonValue) -> Result<Self, String> {
        Ok(match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Boolean(b),
            JsonValue::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Self::Int64(v)
                } else if let Some(v) = n.as_u64() {
                    Self::UInt64(v)
                } else {
                    match n.as_f64() {
                        Some(v) => Self::Float64(v),
                        None => return Err(format!("unsupported number: {n}")),
                    }
                }
            }
            JsonValue::String(s) => Self::Utf8(s),
            other @ (JsonValue::Array(_) | JsonValue::Object(_)) => {
                return Err(format!("expected a scalar value, got: {other}"));
            }
        })
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::Int64(v) => JsonValue::from(*v),
            Self::UInt64(v) => JsonValue::from(*v),
            Self::Float64(v) => Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Decimal(v) => v
                .to_f64()
                .and_then(Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(v.to_string())),
            Self::Utf8(s) => JsonValue::String(s.clone()),
            Self::Binary(b) => JsonValue::Array(b.iter().map(|v| JsonValue::from(*v)).collect()),
            Self::Date(d) => JsonValue::String(d.format(DATE_FORMAT).to_string()),
            Self::Time(t) => JsonValue::String(t.format(TIME_FORMAT).to_string()),
            Self::Timestamp(ts) => JsonValue::String(ts.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Binary(v) => write!(f, "<{} bytes>", v.len()),
            Self::Date(v) => write!(f, "{}", v.format(DATE_FORMAT)),
            Self::Time(v) => write!(f, "{}", v.format(TIME_FORMAT)),
            Self::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScalarValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        ScalarValue::from_json(value).map_err(D::Error::custom)
    }
}

macro_rules! impl_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for ScalarValue {
            fn from(v: $ty) -> Self {
                ScalarValue::$variant(v.into())
            }
        }
    };
}

impl_from!(bool, Boolean);
impl_from!(i8, Int64);
impl_from!(i16, Int64);
impl_from!(i32, Int64);
impl_from!(i64, Int64);
impl_from!(u8, UInt64);
impl_from!(u16, UInt64);
impl_from!(u32, UInt64);
impl_from!(u64, UInt64);
impl_from!(f32, Float64);
impl_from!(f64, Float64);
impl_from!(Decimal, Decimal);
impl_from!(String, Utf8);
impl_from!(&str, Utf8);
impl_from!(Vec<u8>, Binary);
impl_from!(NaiveDate, Date);
impl_from!(NaiveTime, Time);
impl_from!(NaiveDateTime, Timestamp);

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}
