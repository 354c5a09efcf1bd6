//! Engine diagnostics to error payloads.

use std::sync::OnceLock;

use adsdb_core::{DatabaseError, Error};
use regex::Regex;

use crate::ffi::{ADS_MAX_ERROR_LEN, AE_GENERIC_NATIVE_ERROR};
use crate::native::{AceApi, ConnHandle};

/// Fetch and clean up the most recent diagnostic for `conn`, or the
/// context-free one when there is no handle.
pub fn last_error(api: &dyn AceApi, conn: Option<ConnHandle>) -> DatabaseError {
    // One spare byte so the text is always NUL-terminated.
    let mut buffer = vec![0_u8; ADS_MAX_ERROR_LEN + 1];
    let code = api.error(conn, &mut buffer[..ADS_MAX_ERROR_LEN]);
    parse_diagnostic(code, &buffer)
}

/// Turn a raw code and message buffer into a [`DatabaseError`].
///
/// The message stops at the first NUL, loses non-ASCII bytes and trailing
/// whitespace. Code 7200 is a generic wrapper; when the message embeds
/// `NativeError = N;` the more specific `N` is reported instead.
pub fn parse_diagnostic(code: i32, buffer: &[u8]) -> DatabaseError {
    if code == 0 {
        return DatabaseError::new("internal error: success", 0);
    }
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    let message: String = buffer[..end]
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| char::from(b))
        .collect();
    let message = message.trim_end().to_string();

    let code = if code == AE_GENERIC_NATIVE_ERROR {
        embedded_native_code(&message).unwrap_or(code)
    } else {
        code
    };
    DatabaseError::new(message, code)
}

fn embedded_native_code(message: &str) -> Option<i32> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"NativeError\s*=\s*(\d+);"))
        .as_ref()
        .ok()?;
    pattern.captures(message)?.get(1)?.as_str().parse().ok()
}

/// Operational error carrying the current diagnostic.
pub(crate) fn operational(api: &dyn AceApi, conn: Option<ConnHandle>) -> Error {
    Error::Operational(last_error(api, conn))
}
