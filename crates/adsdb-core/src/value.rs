//! Row cell values and bindable parameters.

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A decoded cell from a result row.
///
/// There is one variant per native wire format, so the integer width and
/// signedness reported by the engine are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    TinyInt(i8),
    UTinyInt(u8),
    SmallInt(i16),
    USmallInt(u16),
    Int(i32),
    UInt(u32),
    BigInt(i64),
    UBigInt(u64),
    Double(f64),
    /// Exact decimal, scale taken from the engine's text rendering
    Decimal(BigDecimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::TinyInt(_) => "TINYINT",
            Value::UTinyInt(_) => "UNSIGNED TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::USmallInt(_) => "UNSIGNED SMALLINT",
            Value::Int(_) => "INTEGER",
            Value::UInt(_) => "UNSIGNED INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::UBigInt(_) => "UNSIGNED BIGINT",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BINARY",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// Any integer variant widened to `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::TinyInt(v) => Some(i128::from(*v)),
            Value::UTinyInt(v) => Some(i128::from(*v)),
            Value::SmallInt(v) => Some(i128::from(*v)),
            Value::USmallInt(v) => Some(i128::from(*v)),
            Value::Int(v) => Some(i128::from(*v)),
            Value::UInt(v) => Some(i128::from(*v)),
            Value::BigInt(v) => Some(i128::from(*v)),
            Value::UBigInt(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// Try to convert this value to an f64.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Decimal(d) => d.to_string().parse().ok(),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&BigDecimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            Value::Timestamp(ts) => Some(ts.time()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }
}

/// A value supplied for a `?` placeholder.
///
/// When the engine cannot tell the parameter type, the variant decides it:
/// integers become 32- or 64-bit integers depending on magnitude, doubles
/// stay doubles, bytes are binary and everything else is bound as text.
/// The calendar and decimal variants are rendered with their `Display` form.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    /// Any integer; the range check happens when the parameter is encoded.
    Int(i128),
    Double(f64),
    Bytes(Vec<u8>),
    Text(String),
    Decimal(BigDecimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Param {
    pub const fn is_null(&self) -> bool {
        matches!(self, Param::Null)
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Param::Null => "NULL",
            Param::Int(_) => "INTEGER",
            Param::Double(_) => "DOUBLE",
            Param::Bytes(_) => "BINARY",
            Param::Text(_) => "TEXT",
            Param::Decimal(_) => "DECIMAL",
            Param::Date(_) => "DATE",
            Param::Time(_) => "TIME",
            Param::Timestamp(_) => "TIMESTAMP",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Null => f.write_str("NULL"),
            Param::Int(v) => write!(f, "{v}"),
            Param::Double(v) => write!(f, "{v}"),
            Param::Bytes(b) => write!(f, "{b:?}"),
            Param::Text(s) => f.write_str(s),
            Param::Decimal(d) => write!(f, "{d}"),
            Param::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Param::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Param::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

macro_rules! param_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Param {
                fn from(v: $ty) -> Self {
                    Param::Int(i128::from(v))
                }
            }
        )*
    };
}

param_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Int(i128::from(v))
    }
}

impl From<f32> for Param {
    fn from(v: f32) -> Self {
        Param::Double(f64::from(v))
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Double(v)
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Param {
    fn from(v: Vec<u8>) -> Self {
        Param::Bytes(v)
    }
}

impl From<&[u8]> for Param {
    fn from(v: &[u8]) -> Self {
        Param::Bytes(v.to_vec())
    }
}

impl From<BigDecimal> for Param {
    fn from(v: BigDecimal) -> Self {
        Param::Decimal(v)
    }
}

impl From<NaiveDate> for Param {
    fn from(v: NaiveDate) -> Self {
        Param::Date(v)
    }
}

impl From<NaiveTime> for Param {
    fn from(v: NaiveTime) -> Self {
        Param::Time(v)
    }
}

impl From<NaiveDateTime> for Param {
    fn from(v: NaiveDateTime) -> Self {
        Param::Timestamp(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        v.map_or(Param::Null, Into::into)
    }
}

/// Re-bind a fetched value.
impl From<Value> for Param {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Param::Null,
            Value::Double(d) => Param::Double(d),
            Value::Decimal(d) => Param::Decimal(d),
            Value::Text(s) => Param::Text(s),
            Value::Bytes(b) => Param::Bytes(b),
            Value::Date(d) => Param::Date(d),
            Value::Time(t) => Param::Time(t),
            Value::Timestamp(ts) => Param::Timestamp(ts),
            int => int.as_i128().map_or(Param::Null, Param::Int),
        }
    }
}

/// Conversion from a row cell into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> Error {
    Error::interface(format!(
        "cannot read {} value as {expected}",
        value.type_name()
    ))
}

macro_rules! from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self> {
                    value
                        .as_i128()
                        .and_then(|v| <$ty>::try_from(v).ok())
                        .ok_or_else(|| mismatch(stringify!($ty), value))
                }
            }
        )*
    };
}

from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("Vec<u8>", value))
    }
}

impl FromValue for BigDecimal {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Decimal(d) => Ok(d.clone()),
            Value::UBigInt(v) => Ok(BigDecimal::from(*v)),
            other => other
                .as_i64()
                .map(BigDecimal::from)
                .ok_or_else(|| mismatch("BigDecimal", other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_date().ok_or_else(|| mismatch("NaiveDate", value))
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_time().ok_or_else(|| mismatch("NaiveTime", value))
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_timestamp()
            .ok_or_else(|| mismatch("NaiveDateTime", value))
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn integer_accessors_widen() {
        assert_eq!(Value::UBigInt(u64::MAX).as_i128(), Some(i128::from(u64::MAX)));
        assert_eq!(Value::UBigInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::SmallInt(-3).as_i64(), Some(-3));
        assert_eq!(Value::Text("1".into()).as_i64(), None);
    }

    #[test]
    fn params_from_rust_values() {
        assert_eq!(Param::from(5_i32), Param::Int(5));
        assert_eq!(Param::from(u64::MAX), Param::Int(i128::from(u64::MAX)));
        assert_eq!(Param::from(true), Param::Int(1));
        assert_eq!(Param::from("x"), Param::Text("x".into()));
        assert_eq!(Param::from(None::<i32>), Param::Null);
        assert_eq!(Param::from(Some(2.5)), Param::Double(2.5));
    }

    #[test]
    fn params_from_fetched_values() {
        assert_eq!(Param::from(Value::UTinyInt(7)), Param::Int(7));
        assert_eq!(Param::from(Value::Null), Param::Null);
        let d = NaiveDate::from_ymd_opt(2015, 12, 19).unwrap();
        assert_eq!(Param::from(Value::Date(d)), Param::Date(d));
    }

    #[test]
    fn param_text_rendering() {
        let d = NaiveDate::from_ymd_opt(2015, 12, 19).unwrap();
        let t = NaiveTime::from_hms_opt(18, 10, 0).unwrap();
        assert_eq!(Param::Date(d).to_string(), "2015-12-19");
        assert_eq!(Param::Time(t).to_string(), "18:10:00");
        assert_eq!(
            Param::Timestamp(d.and_time(t)).to_string(),
            "2015-12-19 18:10:00"
        );
        assert_eq!(
            Param::Decimal(BigDecimal::from_str("1.10").unwrap()).to_string(),
            "1.10"
        );
        assert_eq!(Param::Int(-42).to_string(), "-42");
    }

    #[test]
    fn from_value_conversions() {
        assert_eq!(i16::from_value(&Value::Int(300)).unwrap(), 300);
        assert!(i8::from_value(&Value::Int(300)).is_err());
        assert_eq!(
            Option::<String>::from_value(&Value::Null).unwrap(),
            None
        );
        assert_eq!(
            String::from_value(&Value::Text("abc".into())).unwrap(),
            "abc"
        );
        assert!(String::from_value(&Value::Int(1)).is_err());
    }
}
