//! Low-level FFI bindings to the Advantage Client Engine (libace).
//!
//! These bindings are manually written from `ace.h`. We only expose what we
//! need for the driver implementation. The `extern` block is only compiled
//! with the `ace` feature so the crate builds on machines without the
//! vendor library.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_uint, c_ushort};
#[cfg(feature = "ace")]
use std::ffi::c_int;

/// Size of the buffer `ads_error` is allowed to fill.
pub const ADS_MAX_ERROR_LEN: usize = 600;

/// Returned by commit/rollback when the connection is not in a transaction.
pub const AE_TRANS_OUT_OF_SEQUENCE: i32 = 5047;
/// A value does not fit its column.
pub const AE_VALUE_OVERFLOW: i32 = 5179;
/// Generic ODBC-layer failure; the real code is embedded in the message.
pub const AE_GENERIC_NATIVE_ERROR: i32 = 7200;

/// API version this driver speaks.
pub const API_VERSION: c_uint = 1;

/// Opaque connection handle.
#[repr(C)]
pub struct a_ads_connection {
    _private: [u8; 0],
}

/// Opaque statement handle.
#[repr(C)]
pub struct a_ads_stmt {
    _private: [u8; 0],
}

// a_ads_data_direction
pub const DD_INVALID: c_uint = 0x0;
pub const DD_INPUT: c_uint = 0x1;
pub const DD_OUTPUT: c_uint = 0x2;
pub const DD_INPUT_OUTPUT: c_uint = 0x3;

/// A value buffer. For parameters every pointer is owned by the caller and
/// must stay valid until the statement is executed or freed.
#[repr(C)]
pub struct a_ads_data_value {
    pub buffer: *mut c_char,
    pub buffer_size: c_uint,
    pub length: *mut c_uint,
    /// `a_ads_data_type`
    pub type_: c_uint,
    pub is_null: *mut c_uint,
}

#[repr(C)]
pub struct a_ads_bind_param {
    /// `a_ads_data_direction`
    pub direction: c_uint,
    pub value: a_ads_data_value,
    pub name: *mut c_char,
}

#[repr(C)]
pub struct a_ads_column_info {
    pub name: *mut c_char,
    /// `a_ads_data_type`
    pub type_: c_uint,
    /// `a_ads_native_type`
    pub native_type: c_uint,
    pub precision: c_ushort,
    pub scale: c_ushort,
    pub max_size: c_uint,
    pub nullable: c_uint,
}

#[cfg(feature = "ace")]
#[link(name = "ace")]
unsafe extern "C" {
    pub fn ads_init(app_name: *const c_char, api_version: c_uint, version_available: *mut c_uint)
    -> c_int;
    pub fn ads_fini();

    pub fn ads_new_connection() -> *mut a_ads_connection;
    pub fn ads_free_connection(ads_conn: *mut a_ads_connection);
    pub fn ads_connect(ads_conn: *mut a_ads_connection, str: *const c_char) -> c_int;
    pub fn ads_disconnect(ads_conn: *mut a_ads_connection) -> c_int;
    pub fn ads_commit(ads_conn: *mut a_ads_connection) -> c_int;
    pub fn ads_rollback(ads_conn: *mut a_ads_connection) -> c_int;
    pub fn ads_error(ads_conn: *mut a_ads_connection, buffer: *mut c_char, size: usize) -> c_int;
    pub fn ads_clear_error(ads_conn: *mut a_ads_connection);

    pub fn ads_prepare(
        ads_conn: *mut a_ads_connection,
        sql_str: *const c_char,
        is_unicode: c_int,
    ) -> *mut a_ads_stmt;
    pub fn ads_free_stmt(ads_stmt: *mut a_ads_stmt);
    pub fn ads_num_params(ads_stmt: *mut a_ads_stmt) -> c_int;
    pub fn ads_describe_bind_param(
        ads_stmt: *mut a_ads_stmt,
        index: c_uint,
        param: *mut a_ads_bind_param,
    ) -> c_int;
    pub fn ads_bind_param(
        ads_stmt: *mut a_ads_stmt,
        index: c_uint,
        param: *mut a_ads_bind_param,
    ) -> c_int;
    pub fn ads_execute(ads_stmt: *mut a_ads_stmt) -> c_int;
    pub fn ads_fetch_next(ads_stmt: *mut a_ads_stmt) -> c_int;
    pub fn ads_affected_rows(ads_stmt: *mut a_ads_stmt) -> c_int;
    pub fn ads_num_cols(ads_stmt: *mut a_ads_stmt) -> c_int;
    pub fn ads_num_rows(ads_stmt: *mut a_ads_stmt) -> c_int;
    pub fn ads_get_column(
        ads_stmt: *mut a_ads_stmt,
        col_index: c_uint,
        buffer: *mut a_ads_data_value,
    ) -> c_int;
    pub fn ads_get_column_info(
        ads_stmt: *mut a_ads_stmt,
        col_index: c_uint,
        buffer: *mut a_ads_column_info,
    ) -> c_int;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes() {
        assert_eq!(AE_TRANS_OUT_OF_SEQUENCE, 5047);
        assert_eq!(AE_VALUE_OVERFLOW, 5179);
        assert_eq!(AE_GENERIC_NATIVE_ERROR, 7200);
    }

    #[test]
    fn directions() {
        assert_eq!(DD_INPUT_OUTPUT, DD_INPUT | DD_OUTPUT);
        assert_eq!(DD_INVALID, 0);
    }
}
