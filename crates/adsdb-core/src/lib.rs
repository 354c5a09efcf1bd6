//! Core types for the adsdb driver.
//!
//! This crate holds everything that does not touch the native client
//! library:
//!
//! - `Error`, the DB-API style error taxonomy
//! - `Value` for decoded cells and `Param` for bound parameters
//! - `Row` and `ColumnDescription` for result sets
//! - `DataType`/`NativeType` codes and the `STRING`, `NUMBER`, ... markers

pub mod error;
pub mod row;
pub mod types;
pub mod value;

pub use error::{DatabaseError, Error, ErrorKind, Result};
pub use row::{ColumnDescription, ColumnInfo, Row};
pub use types::{BINARY, DATETIME, DataType, NUMBER, NativeType, ROWID, STRING, TypeObject};
pub use value::{FromValue, Param, Value};

// Re-exported so callers can name cell types without extra dependencies.
pub use bigdecimal::BigDecimal;
pub use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
