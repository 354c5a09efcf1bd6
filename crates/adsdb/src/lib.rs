//! Advantage Database Server driver.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate provides connections, cursors and typed rows on top of the
//! Advantage Client Engine (libace). The engine is reached through the
//! [`AceApi`] trait; with the `ace` feature, [`AceLibrary`] links the system
//! libace.
//!
//! # Example
//!
//! ```rust,ignore
//! use adsdb::{AdsConfig, Environment, Param, ServerType};
//!
//! let env = Environment::native()?;
//! let conn = env.connect(
//!     &AdsConfig::new()
//!         .data_source(r"\\server\share\sales.add")
//!         .server_type(ServerType::REMOTE),
//! )?;
//!
//! let mut cursor = conn.cursor()?;
//! cursor.execute("SELECT id, name FROM customers WHERE id > ?", &[Param::from(10)])?;
//! for row in cursor.rows() {
//!     let row = row?;
//!     println!("{}: {}", row.get_as::<i32>(0)?, row.get_named::<String>("name")?);
//! }
//! cursor.close()?;
//! conn.close()?;
//! ```
//!
//! # Type Mapping
//!
//! | Engine type | `Value` |
//! |-------------|---------|
//! | VAL8 .. VAL64, UVAL8 .. UVAL64 | integer variant of the same width |
//! | DOUBLE | `Double` |
//! | DECIMAL | `Decimal` (`BigDecimal`, textual scale kept) |
//! | STRING | `Text` (connection code page) |
//! | NCHAR | `Text` (UTF-16) |
//! | BINARY | `Bytes` |
//! | DATE, TIME, TIMESTAMP | `Date`, `Time`, `Timestamp` (chrono) |
//!
//! # Thread Safety
//!
//! None of the types here are `Send` or `Sync`: the engine handles must stay
//! on the thread that created them.

pub mod config;
pub mod connection;
pub mod cursor;
pub mod diagnostics;
pub mod environment;
pub mod ffi;
pub mod native;
mod statement;
pub mod types;

pub use adsdb_core::{
    BINARY, BigDecimal, ColumnDescription, DATETIME, DataType, DatabaseError, Error, ErrorKind,
    FromValue, NUMBER, NaiveDate, NaiveDateTime, NaiveTime, NativeType, Param, ROWID, Result, Row,
    STRING, TypeObject, Value,
};
pub use config::{AdsConfig, CommType, LockMode, ServerType};
pub use connection::Connection;
pub use cursor::{Cursor, Rows};
pub use environment::{Environment, LeakReport};
pub use ffi::{AE_TRANS_OUT_OF_SEQUENCE, AE_VALUE_OVERFLOW};
#[cfg(feature = "ace")]
pub use native::AceLibrary;
pub use native::{AceApi, BindParam, ConnHandle, Direction, NativeColumnInfo, NativeValue, StmtHandle};

/// DB-API level implemented.
pub const APILEVEL: &str = "2.0";
/// Threads may share the module but not connections.
pub const THREADSAFETY: u8 = 1;
/// Placeholder style: `?`.
pub const PARAMSTYLE: &str = "qmark";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_globals() {
        assert_eq!(APILEVEL, "2.0");
        assert_eq!(THREADSAFETY, 1);
        assert_eq!(PARAMSTYLE, "qmark");
    }
}
