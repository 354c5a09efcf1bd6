//! The native client engine as seen by the driver.
//!
//! [`AceApi`] has one method per engine entry point the driver uses. The
//! production implementation, [`AceLibrary`], forwards to libace through
//! [`crate::ffi`]; anything else implementing the trait (an in-memory engine
//! in tests, a tracing shim) can be plugged into an
//! [`Environment`](crate::Environment) instead.

#![allow(clippy::cast_possible_truncation)]

use std::ffi::{CStr, CString, c_uint, c_void};
use std::ptr::NonNull;

use adsdb_core::{DataType, NativeType};

use crate::ffi;

/// Engine connection handle. Copyable, non-owning: ownership lives in
/// [`Connection`](crate::Connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnHandle(NonNull<c_void>);

/// Engine statement handle. Ownership lives in the cursor's statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtHandle(NonNull<c_void>);

impl ConnHandle {
    pub fn from_ptr(ptr: NonNull<c_void>) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl StmtHandle {
    pub fn from_ptr(ptr: NonNull<c_void>) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Invalid,
    #[default]
    Input,
    Output,
    InputOutput,
}

impl Direction {
    pub fn from_raw(raw: c_uint) -> Self {
        match raw {
            ffi::DD_INPUT => Direction::Input,
            ffi::DD_OUTPUT => Direction::Output,
            ffi::DD_INPUT_OUTPUT => Direction::InputOutput,
            _ => Direction::Invalid,
        }
    }

    pub fn as_raw(self) -> c_uint {
        match self {
            Direction::Invalid => ffi::DD_INVALID,
            Direction::Input => ffi::DD_INPUT,
            Direction::Output => ffi::DD_OUTPUT,
            Direction::InputOutput => ffi::DD_INPUT_OUTPUT,
        }
    }
}

/// A parameter descriptor together with the buffers it points at.
///
/// The engine keeps raw pointers to the value buffer, the length cell and
/// the null cell after `bind_param` returns and reads them again during
/// `execute`. Each of them is a separate heap allocation, so moving a
/// `BindParam` (for example into a `Vec`) leaves those addresses intact; the
/// value must however not be dropped or re-encoded until the statement has
/// been executed or freed.
#[derive(Debug)]
pub struct BindParam {
    pub direction: Direction,
    pub data_type: DataType,
    name: Option<CString>,
    buffer: Box<[u8]>,
    length: Box<c_uint>,
    is_null: Box<c_uint>,
}

impl BindParam {
    /// An empty descriptor, as returned by `describe_bind_param`.
    pub fn new(direction: Direction, data_type: DataType, name: Option<CString>) -> Self {
        Self {
            direction,
            data_type,
            name,
            buffer: Box::default(),
            length: Box::new(0),
            is_null: Box::new(0),
        }
    }

    pub fn name(&self) -> Option<&CStr> {
        self.name.as_deref()
    }

    /// Serialized value bytes.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Length the engine is told to read.
    pub fn length(&self) -> u32 {
        *self.length
    }

    pub fn is_null(&self) -> bool {
        *self.is_null != 0
    }

    pub(crate) fn set_null(&mut self, is_null: bool) {
        *self.is_null = c_uint::from(is_null);
    }

    pub(crate) fn set_value(&mut self, buffer: Vec<u8>, length: usize) {
        self.buffer = buffer.into_boxed_slice();
        *self.length = length as c_uint;
    }

    /// Build the C descriptor. Its pointers borrow this value's heap cells.
    #[cfg_attr(not(feature = "ace"), allow(dead_code))]
    pub(crate) fn as_raw(&mut self) -> ffi::a_ads_bind_param {
        ffi::a_ads_bind_param {
            direction: self.direction.as_raw(),
            value: ffi::a_ads_data_value {
                buffer: self.buffer.as_mut_ptr().cast(),
                buffer_size: self.buffer.len() as c_uint,
                length: &raw mut *self.length,
                type_: self.data_type.as_raw(),
                is_null: &raw mut *self.is_null,
            },
            name: self
                .name
                .as_ref()
                .map_or(std::ptr::null_mut(), |n| n.as_ptr().cast_mut()),
        }
    }
}

/// A cell as handed out by `get_column`, copied out of engine memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeValue {
    /// Raw `a_ads_data_type` tag; may be outside the known table.
    pub data_type: u32,
    pub bytes: Vec<u8>,
    pub is_null: bool,
}

impl NativeValue {
    pub fn new(data_type: DataType, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data_type: data_type.as_raw(),
            bytes: bytes.into(),
            is_null: false,
        }
    }

    pub fn null(data_type: DataType) -> Self {
        Self {
            data_type: data_type.as_raw(),
            bytes: Vec::new(),
            is_null: true,
        }
    }

    /// A value with an arbitrary tag, as a misbehaving engine could report.
    pub fn with_raw_type(data_type: u32, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data_type,
            bytes: bytes.into(),
            is_null: false,
        }
    }
}

/// Column metadata as reported by the engine, sizes in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeColumnInfo {
    pub name: String,
    pub data_type: u32,
    pub native_type: NativeType,
    pub precision: u16,
    pub scale: u16,
    pub max_size: u32,
    pub nullable: bool,
}

/// Entry points of the native client engine.
///
/// Boolean results mirror the engine's success flag; details of a failure
/// are fetched afterwards with [`AceApi::error`]. None of these calls are
/// thread-safe; callers serialize access per connection.
pub trait AceApi {
    /// Initialize the engine. Returns the API version it offers.
    fn init(&self, app_name: &CStr, api_version: u32) -> Option<u32>;
    fn fini(&self);

    fn new_connection(&self) -> Option<ConnHandle>;
    fn free_connection(&self, conn: ConnHandle);
    fn connect(&self, conn: ConnHandle, target: &CStr) -> bool;
    fn disconnect(&self, conn: ConnHandle) -> bool;
    fn commit(&self, conn: ConnHandle) -> bool;
    fn rollback(&self, conn: ConnHandle) -> bool;

    /// Copy the last diagnostic into `buffer` (NUL-terminated if it fits)
    /// and return its code; `0` means there was no error.
    fn error(&self, conn: Option<ConnHandle>, buffer: &mut [u8]) -> i32;

    /// Prepare a statement. `sql` is UTF-16 text ending in a two-byte NUL.
    fn prepare(&self, conn: ConnHandle, sql: &[u8], unicode: bool) -> Option<StmtHandle>;
    fn free_stmt(&self, stmt: StmtHandle);

    /// Number of placeholders, negative on failure.
    fn num_params(&self, stmt: StmtHandle) -> i32;
    fn describe_bind_param(&self, stmt: StmtHandle, index: u32) -> Option<BindParam>;

    /// Bind a parameter.
    ///
    /// # Safety
    ///
    /// The engine retains pointers into `param`'s buffers. `param` must not
    /// be dropped or modified until `stmt` has been executed for the last
    /// time or freed.
    unsafe fn bind_param(&self, stmt: StmtHandle, index: u32, param: &mut BindParam) -> bool;

    fn execute(&self, stmt: StmtHandle) -> bool;
    /// Negative when unknown.
    fn affected_rows(&self, stmt: StmtHandle) -> i32;
    /// Negative on failure.
    fn num_cols(&self, stmt: StmtHandle) -> i32;
    /// Negative when unknown.
    fn num_rows(&self, stmt: StmtHandle) -> i32;
    fn get_column_info(&self, stmt: StmtHandle, index: u32) -> Option<NativeColumnInfo>;
    /// Advance to the next row; `false` once the result is exhausted.
    fn fetch_next(&self, stmt: StmtHandle) -> bool;
    fn get_column(&self, stmt: StmtHandle, index: u32) -> Option<NativeValue>;
}

#[cfg(feature = "ace")]
pub use library::AceLibrary;

#[cfg(feature = "ace")]
mod library {
    use super::*;
    use std::ptr;

    /// [`AceApi`] backed by the system libace.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct AceLibrary;

    fn conn_ptr(conn: ConnHandle) -> *mut ffi::a_ads_connection {
        conn.as_ptr().cast()
    }

    fn stmt_ptr(stmt: StmtHandle) -> *mut ffi::a_ads_stmt {
        stmt.as_ptr().cast()
    }

    impl AceApi for AceLibrary {
        fn init(&self, app_name: &CStr, api_version: u32) -> Option<u32> {
            let mut available: c_uint = api_version;
            // SAFETY: app_name is NUL-terminated, available is a valid out pointer
            let rc = unsafe { ffi::ads_init(app_name.as_ptr(), api_version, &mut available) };
            (rc != 0).then_some(available)
        }

        fn fini(&self) {
            // SAFETY: no preconditions
            unsafe { ffi::ads_fini() }
        }

        fn new_connection(&self) -> Option<ConnHandle> {
            // SAFETY: no preconditions, null is checked
            let raw = unsafe { ffi::ads_new_connection() };
            NonNull::new(raw.cast()).map(ConnHandle::from_ptr)
        }

        fn free_connection(&self, conn: ConnHandle) {
            // SAFETY: conn came from ads_new_connection and is released once
            unsafe { ffi::ads_free_connection(conn_ptr(conn)) }
        }

        fn connect(&self, conn: ConnHandle, target: &CStr) -> bool {
            // SAFETY: conn is live, target is NUL-terminated
            unsafe { ffi::ads_connect(conn_ptr(conn), target.as_ptr()) != 0 }
        }

        fn disconnect(&self, conn: ConnHandle) -> bool {
            // SAFETY: conn is live
            unsafe { ffi::ads_disconnect(conn_ptr(conn)) != 0 }
        }

        fn commit(&self, conn: ConnHandle) -> bool {
            // SAFETY: conn is live
            unsafe { ffi::ads_commit(conn_ptr(conn)) != 0 }
        }

        fn rollback(&self, conn: ConnHandle) -> bool {
            // SAFETY: conn is live
            unsafe { ffi::ads_rollback(conn_ptr(conn)) != 0 }
        }

        fn error(&self, conn: Option<ConnHandle>, buffer: &mut [u8]) -> i32 {
            let conn = conn.map_or(ptr::null_mut(), conn_ptr);
            // SAFETY: buffer is writable for buffer.len() bytes; conn is live or null
            unsafe { ffi::ads_error(conn, buffer.as_mut_ptr().cast(), buffer.len()) }
        }

        fn prepare(&self, conn: ConnHandle, sql: &[u8], unicode: bool) -> Option<StmtHandle> {
            // SAFETY: conn is live, sql ends with a two-byte NUL
            let raw =
                unsafe { ffi::ads_prepare(conn_ptr(conn), sql.as_ptr().cast(), i32::from(unicode)) };
            NonNull::new(raw.cast()).map(StmtHandle::from_ptr)
        }

        fn free_stmt(&self, stmt: StmtHandle) {
            // SAFETY: stmt came from ads_prepare and is released once
            unsafe { ffi::ads_free_stmt(stmt_ptr(stmt)) }
        }

        fn num_params(&self, stmt: StmtHandle) -> i32 {
            // SAFETY: stmt is live
            unsafe { ffi::ads_num_params(stmt_ptr(stmt)) }
        }

        fn describe_bind_param(&self, stmt: StmtHandle, index: u32) -> Option<BindParam> {
            // SAFETY: all-zero is a valid bit pattern (null pointers, zero ints)
            let mut raw: ffi::a_ads_bind_param = unsafe { std::mem::zeroed() };
            // SAFETY: stmt is live, raw is a valid out pointer
            if unsafe { ffi::ads_describe_bind_param(stmt_ptr(stmt), index, &mut raw) } == 0 {
                return None;
            }
            let name = if raw.name.is_null() {
                None
            } else {
                // SAFETY: the engine returns a NUL-terminated name
                Some(unsafe { CStr::from_ptr(raw.name) }.to_owned())
            };
            let data_type = DataType::from_raw(raw.value.type_).unwrap_or(DataType::Invalid);
            Some(BindParam::new(
                Direction::from_raw(raw.direction),
                data_type,
                name,
            ))
        }

        unsafe fn bind_param(&self, stmt: StmtHandle, index: u32, param: &mut BindParam) -> bool {
            let mut raw = param.as_raw();
            // SAFETY: stmt is live; the caller keeps param's buffers alive
            unsafe { ffi::ads_bind_param(stmt_ptr(stmt), index, &mut raw) != 0 }
        }

        fn execute(&self, stmt: StmtHandle) -> bool {
            // SAFETY: stmt is live and its bound buffers are kept by the caller
            unsafe { ffi::ads_execute(stmt_ptr(stmt)) != 0 }
        }

        fn affected_rows(&self, stmt: StmtHandle) -> i32 {
            // SAFETY: stmt is live
            unsafe { ffi::ads_affected_rows(stmt_ptr(stmt)) }
        }

        fn num_cols(&self, stmt: StmtHandle) -> i32 {
            // SAFETY: stmt is live
            unsafe { ffi::ads_num_cols(stmt_ptr(stmt)) }
        }

        fn num_rows(&self, stmt: StmtHandle) -> i32 {
            // SAFETY: stmt is live
            unsafe { ffi::ads_num_rows(stmt_ptr(stmt)) }
        }

        fn get_column_info(&self, stmt: StmtHandle, index: u32) -> Option<NativeColumnInfo> {
            // SAFETY: all-zero is a valid bit pattern
            let mut raw: ffi::a_ads_column_info = unsafe { std::mem::zeroed() };
            // SAFETY: stmt is live, raw is a valid out pointer
            if unsafe { ffi::ads_get_column_info(stmt_ptr(stmt), index, &mut raw) } == 0 {
                return None;
            }
            let name = if raw.name.is_null() {
                String::new()
            } else {
                // SAFETY: the engine returns a NUL-terminated name valid until the next call
                let bytes = unsafe { CStr::from_ptr(raw.name) }.to_bytes();
                bytes.iter().filter(|b| b.is_ascii()).map(|&b| char::from(b)).collect()
            };
            Some(NativeColumnInfo {
                name,
                data_type: raw.type_,
                native_type: NativeType(raw.native_type),
                precision: raw.precision,
                scale: raw.scale,
                max_size: raw.max_size,
                nullable: raw.nullable != 0,
            })
        }

        fn fetch_next(&self, stmt: StmtHandle) -> bool {
            // SAFETY: stmt is live
            unsafe { ffi::ads_fetch_next(stmt_ptr(stmt)) != 0 }
        }

        fn get_column(&self, stmt: StmtHandle, index: u32) -> Option<NativeValue> {
            // SAFETY: all-zero is a valid bit pattern
            let mut raw: ffi::a_ads_data_value = unsafe { std::mem::zeroed() };
            // SAFETY: stmt is live and positioned on a row
            if unsafe { ffi::ads_get_column(stmt_ptr(stmt), index, &mut raw) } == 0 {
                return None;
            }
            // SAFETY: the engine's pointers are valid until the next fetch; we
            // copy out immediately
            let is_null = !raw.is_null.is_null() && unsafe { *raw.is_null } != 0;
            let length = if raw.length.is_null() {
                0
            } else {
                // SAFETY: see above
                unsafe { *raw.length as usize }
            };
            let bytes = if is_null || raw.buffer.is_null() || length == 0 {
                Vec::new()
            } else {
                // SAFETY: buffer holds at least `length` bytes
                unsafe { std::slice::from_raw_parts(raw.buffer.cast::<u8>(), length) }.to_vec()
            };
            Some(NativeValue {
                data_type: raw.type_,
                bytes,
                is_null,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_tags() {
        for dir in [
            Direction::Invalid,
            Direction::Input,
            Direction::Output,
            Direction::InputOutput,
        ] {
            assert_eq!(Direction::from_raw(dir.as_raw()), dir);
        }
        assert_eq!(Direction::from_raw(42), Direction::Invalid);
    }

    #[test]
    fn raw_descriptor_points_into_owned_buffers() {
        let mut param = BindParam::new(Direction::Input, DataType::Binary, None);
        param.set_value(b"ciao".to_vec(), 4);
        param.set_null(false);

        let raw = param.as_raw();
        assert_eq!(raw.value.buffer.cast_const(), param.buffer().as_ptr().cast());
        assert_eq!(raw.value.buffer_size, 4);
        assert_eq!(raw.value.type_, DataType::Binary.as_raw());
        assert_eq!(raw.direction, ffi::DD_INPUT);
        assert!(raw.name.is_null());
        // SAFETY: the pointers reference param's live boxes
        unsafe {
            assert_eq!(*raw.value.length, 4);
            assert_eq!(*raw.value.is_null, 0);
        }
    }

    #[test]
    fn moving_a_param_keeps_bound_addresses() {
        let mut param = BindParam::new(
            Direction::Input,
            DataType::String,
            Some(CString::new("p1").unwrap()),
        );
        param.set_value(b"abc".to_vec(), 3);
        let raw = param.as_raw();

        let mut arena = Vec::with_capacity(1);
        arena.push(param);
        let moved = arena.last_mut().unwrap();
        let again = moved.as_raw();

        assert_eq!(raw.value.buffer, again.value.buffer);
        assert_eq!(raw.value.length, again.value.length);
        assert_eq!(raw.value.is_null, again.value.is_null);
        assert_eq!(raw.name, again.name);
    }

    #[test]
    fn native_value_constructors() {
        let v = NativeValue::new(DataType::Val8, [5]);
        assert_eq!(v.data_type, DataType::Val8.as_raw());
        assert!(!v.is_null);
        assert!(NativeValue::null(DataType::String).is_null);
        assert_eq!(NativeValue::with_raw_type(99, []).data_type, 99);
    }
}
