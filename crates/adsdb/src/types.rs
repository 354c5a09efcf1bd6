//! Type encoding and decoding between Rust and the Advantage wire format.
//!
//! The engine hands out every cell as a tagged byte buffer:
//! - fixed-width integers and doubles in native byte order
//! - BINARY as raw bytes
//! - STRING in the connection's single-byte code page, NCHAR as UTF-16
//! - DECIMAL, DATE, TIME and TIMESTAMP as ASCII text
//!
//! We map these to/from adsdb-core's `Value` and `Param` types.

use std::str::FromStr;
use std::sync::OnceLock;

use adsdb_core::error::DatabaseError;
use adsdb_core::{BigDecimal, DataType, Error, NaiveDate, NaiveTime, Param, Result, Value};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use regex::Regex;

use crate::native::{BindParam, NativeValue};

/// Decode a cell fetched from the engine.
pub fn decode(value: &NativeValue, encoding: &'static Encoding) -> Result<Value> {
    if value.is_null {
        return Ok(Value::Null);
    }
    let data_type = DataType::from_raw(value.data_type)
        .ok_or_else(|| Error::operational(format!("Unknown data type {}", value.data_type)))?;
    let bytes = value.bytes.as_slice();

    match data_type {
        DataType::Invalid => Err(Error::operational("Invalid type")),
        DataType::Binary => Ok(Value::Bytes(bytes.to_vec())),
        DataType::String => {
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            Ok(Value::Text(text.into_owned()))
        }
        DataType::NChar => utf16(bytes).map(Value::Text),
        DataType::Double => Ok(Value::Double(f64::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::Val64 => Ok(Value::BigInt(i64::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::UVal64 => Ok(Value::UBigInt(u64::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::Val32 => Ok(Value::Int(i32::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::UVal32 => Ok(Value::UInt(u32::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::Val16 => Ok(Value::SmallInt(i16::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::UVal16 => Ok(Value::USmallInt(u16::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::Val8 => Ok(Value::TinyInt(i8::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::UVal8 => Ok(Value::UTinyInt(u8::from_ne_bytes(fixed(data_type, bytes)?))),
        DataType::Decimal => parse_decimal(ascii(bytes)?),
        DataType::Date => parse_date(ascii(bytes)?),
        DataType::Time => parse_time(ascii(bytes)?),
        DataType::Timestamp => parse_timestamp(ascii(bytes)?),
    }
}

/// UTF-16 in either byte order, little-endian unless a BOM says otherwise.
fn utf16(bytes: &[u8]) -> Result<String> {
    let (encoding, bom) = match Encoding::for_bom(bytes) {
        Some((e, len)) if e == UTF_16LE || e == UTF_16BE => (e, len),
        _ => (UTF_16LE, 0),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom..])
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| Error::operational(format!("Invalid UTF-16 value {bytes:?}")))
}

fn fixed<const N: usize>(data_type: DataType, bytes: &[u8]) -> Result<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| {
        Error::operational(format!(
            "{data_type:?} value has {} bytes, expected {N}",
            bytes.len()
        ))
    })
}

fn ascii(bytes: &[u8]) -> Result<&str> {
    if !bytes.is_ascii() {
        return Err(Error::operational(format!(
            "non-ASCII data in textual value: {bytes:?}"
        )));
    }
    std::str::from_utf8(bytes)
        .map(str::trim)
        .map_err(|e| Error::operational(e.to_string()))
}

fn parse_decimal(text: &str) -> Result<Value> {
    BigDecimal::from_str(text)
        .map(Value::Decimal)
        .map_err(|_| Error::operational(format!("Invalid decimal value {text}")))
}

fn date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%m/%d/%Y")
        .map_err(|_| Error::operational(format!("Invalid date value {text}")))
}

fn parse_date(text: &str) -> Result<Value> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    date(text).map(Value::Date)
}

fn time_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?(?: (AM|PM))?$")
        })
        .as_ref()
        .map_err(|e| Error::Internal(DatabaseError::local(e.to_string())))
}

fn time(text: &str) -> Result<NaiveTime> {
    let invalid = || Error::operational(format!("Invalid time value {text}"));
    let caps = time_pattern()?.captures(text).ok_or_else(invalid)?;
    let field = |i: usize| -> Result<u32> {
        caps.get(i)
            .map_or(Ok(0), |m| m.as_str().parse::<u32>())
            .map_err(|_| invalid())
    };

    let mut hour = field(1)?;
    let minute = field(2)?;
    let second = field(3)?;
    if let Some(suffix) = caps.get(5) {
        if hour == 12 {
            hour = 0;
        }
        if suffix.as_str() == "PM" {
            hour += 12;
        }
    }
    // Fraction digits past the sixth are dropped, shorter ones padded.
    let micros = match caps.get(4) {
        Some(m) => {
            let digits: String = m.as_str().chars().take(6).collect();
            format!("{digits:0<6}").parse::<u32>().map_err(|_| invalid())?
        }
        None => 0,
    };

    NaiveTime::from_hms_micro_opt(hour, minute, second, micros).ok_or_else(invalid)
}

fn parse_time(text: &str) -> Result<Value> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    time(text).map(Value::Time)
}

fn parse_timestamp(text: &str) -> Result<Value> {
    if text.is_empty() {
        return Ok(Value::Null);
    }
    match text.split_once(' ') {
        Some((d, t)) => Ok(Value::Timestamp(date(d)?.and_time(time(t)?))),
        None => parse_date(text),
    }
}

/// Pick a wire type for a parameter the engine could not describe.
pub fn infer_type(value: &Param) -> Result<DataType> {
    match value {
        Param::Null => Ok(DataType::Val32),
        Param::Int(v) => {
            if i32::try_from(*v).is_ok() {
                Ok(DataType::Val32)
            } else if i64::try_from(*v).is_ok() {
                Ok(DataType::Val64)
            } else {
                Err(Error::data(format!("Value out of range {v}")))
            }
        }
        Param::Double(_) => Ok(DataType::Double),
        Param::Bytes(_) => Ok(DataType::Binary),
        _ => Ok(DataType::String),
    }
}

/// Serialize `value` into the buffers of a described parameter.
///
/// A NULL sets the null flag and still serializes a zero so the engine sees
/// a well-formed buffer. Text is always sent as UTF-16 and upgrades the
/// parameter to NCHAR.
pub fn encode(param: &mut BindParam, value: &Param) -> Result<()> {
    param.set_null(value.is_null());
    let zero = Param::Int(0);
    let value = if value.is_null() { &zero } else { value };

    if param.data_type == DataType::Invalid {
        param.data_type = infer_type(value)?;
    }

    if param.data_type.fixed_width().is_some() {
        let bytes = pack(param.data_type, value)?;
        let len = bytes.len();
        param.set_value(bytes, len);
        return Ok(());
    }

    match value {
        Param::Bytes(b) => {
            param.set_value(b.clone(), b.len());
        }
        Param::Text(s) => {
            param.data_type = DataType::NChar;
            let buf = utf16_with_bom(s);
            let len = buf.len();
            param.set_value(buf, len);
        }
        other => {
            let text = other.to_string();
            if !text.is_ascii() {
                return Err(Error::data(format!("Cannot convert value {text}")));
            }
            let bytes = text.into_bytes();
            let len = bytes.len();
            param.set_value(bytes, len);
        }
    }
    Ok(())
}

/// Little-endian UTF-16 with a leading BOM and a two-byte NUL terminator.
pub(crate) fn utf16_with_bom(text: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 * text.len() + 4);
    buf.extend_from_slice(&[0xFF, 0xFE]);
    for unit in text.encode_utf16() {
        buf.extend_from_slice(&unit.to_le_bytes());
    }
    buf.extend_from_slice(&[0, 0]);
    buf
}

#[allow(clippy::cast_precision_loss)]
fn pack(data_type: DataType, value: &Param) -> Result<Vec<u8>> {
    let out_of_range = || Error::data(format!("Value out of range {value} for {data_type:?}"));

    if data_type == DataType::Double {
        return match value {
            Param::Double(v) => Ok(v.to_ne_bytes().to_vec()),
            Param::Int(v) => Ok((*v as f64).to_ne_bytes().to_vec()),
            other => Err(cannot_pack(data_type, other)),
        };
    }

    let Param::Int(v) = value else {
        return Err(cannot_pack(data_type, value));
    };
    let v = *v;
    let bytes = match data_type {
        DataType::Val64 => i64::try_from(v).map(|x| x.to_ne_bytes().to_vec()),
        DataType::UVal64 => u64::try_from(v).map(|x| x.to_ne_bytes().to_vec()),
        DataType::Val32 => i32::try_from(v).map(|x| x.to_ne_bytes().to_vec()),
        DataType::UVal32 => u32::try_from(v).map(|x| x.to_ne_bytes().to_vec()),
        DataType::Val16 => i16::try_from(v).map(|x| x.to_ne_bytes().to_vec()),
        DataType::UVal16 => u16::try_from(v).map(|x| x.to_ne_bytes().to_vec()),
        DataType::Val8 => i8::try_from(v).map(|x| x.to_ne_bytes().to_vec()),
        DataType::UVal8 => u8::try_from(v).map(|x| x.to_ne_bytes().to_vec()),
        _ => return Err(cannot_pack(data_type, value)),
    };
    bytes.map_err(|_| out_of_range())
}

fn cannot_pack(data_type: DataType, value: &Param) -> Error {
    Error::data(format!(
        "Cannot convert {} value to {data_type:?}",
        value.type_name()
    ))
}
